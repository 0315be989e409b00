pub mod normalize;
pub mod password;
pub mod validation;

pub use normalize::{normalize_email, normalize_external_id, normalize_name};
pub use password::{hash_password, verify_password, Password, PasswordHashString};
pub use validation::ValidatedForm;

pub mod affiliation;
pub mod auth;
pub mod error;
pub mod identity;
pub mod reset_token;
pub mod school;

pub use affiliation::AffiliationService;
pub use auth::{ActivationInput, AuthService, PreRegisterOutcome};
pub use error::ServiceError;
pub use identity::IdentityService;
pub use reset_token::ResetTokenService;
pub use school::SchoolService;

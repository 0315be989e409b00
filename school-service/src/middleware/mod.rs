pub mod session;

pub use session::{clear_session, remembered_days, write_session, CurrentSession};

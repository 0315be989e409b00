//! The per-request authorization core: session context, gate, and scoping.

pub mod gate;
pub mod scope;
pub mod session;

pub use gate::{authorize, authorize_on, SchoolOwned};
pub use scope::VisibleSchools;
pub use session::{state_of, SessionContext, SessionState, ViewAs};

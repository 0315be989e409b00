pub mod affiliation;
pub mod principal;
pub mod profile;
pub mod role;
pub mod school;

pub use affiliation::{Affiliation, AffiliationDetail, AffiliationEdge};
pub use principal::{Principal, PrincipalResponse, UnknownRole};
pub use profile::{Class, InstructorProfile, StudentProfile};
pub use role::{Capability, Role};
pub use school::{School, SchoolResponse};

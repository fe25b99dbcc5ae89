pub mod audit;
pub mod clinic;
pub mod doctor;
pub mod lead;
pub mod link;
pub mod membership;
pub mod physician;

pub use audit::AuditEntry;
pub use clinic::{Clinic, NewClinic};
pub use doctor::{DoctorProfile, NewDoctorProfile};
pub use lead::{NewLead, QuizLead};
pub use link::{LinkMapping, NewLink};
pub use membership::{
    ClinicMembership, MemberRole, MemberStatus, NewInvite, PermissionSet,
};
pub use physician::{NewPhysician, Physician};

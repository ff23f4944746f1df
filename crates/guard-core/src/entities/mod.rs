//! Domain entities - core business objects

mod audit;
mod join_request;
mod member;
mod records;
mod snapshot;

pub use audit::AuditDecision;
pub use join_request::{JoinRequest, RequestSubType};
pub use member::{GroupMember, MemberRole, StrangerInfo};
pub use records::{JoinRecord, QuitRecord, QuitTally, QuitType};
pub use snapshot::MembershipSnapshot;

pub mod activities;
pub mod activity_participants;
pub mod roster;

pub use activities::ActivitiesRow;
pub use activity_participants::ActivityParticipantsRow;
pub use roster::{ActivityView, ErrorResponse, MessageResponse, RosterSnapshot, SeedActivity};

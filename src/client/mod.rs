pub mod api;
pub mod enrollment;
pub mod http;
pub mod messages;

pub use api::{LocalRosterApi, RosterApi};
pub use enrollment::{EnrollmentClient, EnrollmentOutcome, OutcomeStatus};
pub use http::HttpRosterApi;
pub use messages::{MessageBoard, MessageKind, MutationPhase, OutcomeMessage, MESSAGE_TIMEOUT};

use std::time::Duration;
use tracing::{info, warn};

use crate::client::api::RosterApi;
use crate::client::messages::{MessageBoard, MutationPhase, OutcomeMessage};
use crate::error::ClientError;
use crate::models::RosterSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentOutcome {
    pub status: OutcomeStatus,
    pub message: String,
    /// Why the mutation failed, if it did.
    pub error: Option<ClientError>,
    /// The mutation went through but the follow-up refresh did not; the
    /// cache still shows the state from before the mutation.
    pub refresh_error: Option<ClientError>,
}

impl EnrollmentOutcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Signup,
    Unregister,
}

impl Mutation {
    fn as_str(self) -> &'static str {
        match self {
            Mutation::Signup => "signup",
            Mutation::Unregister => "unregister",
        }
    }

    fn transport_failure(self) -> &'static str {
        match self {
            Mutation::Signup => "Failed to sign up. Please try again.",
            Mutation::Unregister => "Failed to unregister. Please try again.",
        }
    }
}

/// Drives the roster on behalf of one user session and keeps a cached
/// snapshot for display.
///
/// The cache is only ever replaced wholesale by [`refresh`](Self::refresh),
/// which runs after every confirmed mutation. A failed mutation leaves it
/// alone. Taking `&mut self` keeps one mutation in flight per session.
pub struct EnrollmentClient<A> {
    api: A,
    cache: Option<RosterSnapshot>,
    board: MessageBoard,
}

impl<A: RosterApi> EnrollmentClient<A> {
    pub fn new(api: A) -> Self {
        Self::with_board(api, MessageBoard::new())
    }

    pub fn with_message_timeout(api: A, timeout: Duration) -> Self {
        Self::with_board(api, MessageBoard::with_timeout(timeout))
    }

    fn with_board(api: A, board: MessageBoard) -> Self {
        Self {
            api,
            cache: None,
            board,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cached(&self) -> Option<&RosterSnapshot> {
        self.cache.as_ref()
    }

    pub fn message(&self) -> Option<OutcomeMessage> {
        self.board.message()
    }

    pub fn phase(&self) -> MutationPhase {
        self.board.phase()
    }

    /// Handle on the message board, for display code that outlives a borrow
    /// of the client.
    pub fn board(&self) -> MessageBoard {
        self.board.clone()
    }

    /// Replace the cache with the roster's current view. On failure the old
    /// cache stays.
    pub async fn refresh(&mut self) -> Result<&RosterSnapshot, ClientError> {
        match self.api.fetch_activities().await {
            Ok(snapshot) => Ok(&*self.cache.insert(snapshot)),
            Err(e) => {
                warn!(error = %e, "roster refresh failed, keeping cached view");
                Err(e)
            }
        }
    }

    pub async fn request_signup(&mut self, activity: &str, email: &str) -> EnrollmentOutcome {
        self.submit(Mutation::Signup, activity, email).await
    }

    pub async fn request_unregister(&mut self, activity: &str, email: &str) -> EnrollmentOutcome {
        self.submit(Mutation::Unregister, activity, email).await
    }

    async fn submit(&mut self, mutation: Mutation, activity: &str, email: &str) -> EnrollmentOutcome {
        let submission = self.board.begin();

        let result = match mutation {
            Mutation::Signup => self.api.signup(activity, email).await,
            Mutation::Unregister => self.api.unregister(activity, email).await,
        };

        let outcome = match result {
            Ok(message) => {
                info!(op = mutation.as_str(), activity, email, "enrollment request confirmed");
                let refresh_error = self.refresh().await.err();
                EnrollmentOutcome {
                    status: OutcomeStatus::Succeeded,
                    message,
                    error: None,
                    refresh_error,
                }
            }
            Err(e) => {
                warn!(op = mutation.as_str(), activity, email, error = %e, "enrollment request failed");
                let message = match &e {
                    ClientError::Rejected(rejection) => rejection.to_string(),
                    ClientError::Transport(_) => mutation.transport_failure().to_string(),
                };
                EnrollmentOutcome {
                    status: OutcomeStatus::Failed,
                    message,
                    error: Some(e),
                    refresh_error: None,
                }
            }
        };

        let posted = match outcome.status {
            OutcomeStatus::Succeeded => OutcomeMessage::success(&outcome.message),
            OutcomeStatus::Failed => OutcomeMessage::error(&outcome.message),
        };
        submission.settle(posted);
        outcome
    }
}

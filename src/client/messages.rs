use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the most recent mutation request is: `Idle -> Submitted ->
/// {Succeeded, Failed} -> Idle`, the last step happening when its message
/// expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    Submitted,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl OutcomeMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

struct BoardState {
    ticket: u64,
    phase: MutationPhase,
    message: Option<OutcomeMessage>,
    expiry: Option<JoinHandle<()>>,
}

impl BoardState {
    fn cancel_expiry(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}

/// Holds at most one outcome message. Every request takes a fresh ticket;
/// only the holder of the newest ticket may post, and each posted message
/// clears itself after the timeout unless a newer request replaced it.
#[derive(Clone)]
pub struct MessageBoard {
    inner: Arc<Mutex<BoardState>>,
    timeout: Duration,
}

impl Default for MessageBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBoard {
    pub fn new() -> Self {
        Self::with_timeout(MESSAGE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BoardState {
                ticket: 0,
                phase: MutationPhase::Idle,
                message: None,
                expiry: None,
            })),
            timeout,
        }
    }

    pub fn message(&self) -> Option<OutcomeMessage> {
        self.inner.lock().message.clone()
    }

    pub fn phase(&self) -> MutationPhase {
        self.inner.lock().phase
    }

    /// Start a new request, wiping whatever the previous one left behind.
    pub fn begin(&self) -> Submission {
        let mut state = self.inner.lock();
        state.cancel_expiry();
        state.ticket += 1;
        state.message = None;
        state.phase = MutationPhase::Submitted;
        Submission {
            board: self.clone(),
            ticket: state.ticket,
            settled: false,
        }
    }

    fn post(&self, ticket: u64, message: OutcomeMessage) -> bool {
        let mut state = self.inner.lock();
        if state.ticket != ticket {
            return false;
        }

        state.cancel_expiry();
        state.phase = match message.kind {
            MessageKind::Success => MutationPhase::Succeeded,
            MessageKind::Error => MutationPhase::Failed,
        };
        state.message = Some(message);
        state.expiry = Some(tokio::spawn(expire(
            Arc::downgrade(&self.inner),
            ticket,
            self.timeout,
        )));
        true
    }

    fn abandon(&self, ticket: u64) {
        let mut state = self.inner.lock();
        if state.ticket == ticket && state.phase == MutationPhase::Submitted {
            state.phase = MutationPhase::Idle;
        }
    }
}

async fn expire(board: Weak<Mutex<BoardState>>, ticket: u64, timeout: Duration) {
    tokio::time::sleep(timeout).await;
    let Some(board) = board.upgrade() else {
        return;
    };
    let mut state = board.lock();
    if state.ticket == ticket {
        state.message = None;
        state.phase = MutationPhase::Idle;
        state.expiry = None;
    }
}

/// One in-flight request. Dropping it unsettled (the caller gave up on the
/// response) puts the board back to idle without posting anything.
pub struct Submission {
    board: MessageBoard,
    ticket: u64,
    settled: bool,
}

impl Submission {
    /// Post the outcome. Returns false if a newer request superseded this one.
    pub fn settle(mut self, message: OutcomeMessage) -> bool {
        self.settled = true;
        self.board.post(self.ticket, message)
    }
}

impl Drop for Submission {
    fn drop(&mut self) {
        if !self.settled {
            self.board.abandon(self.ticket);
        }
    }
}

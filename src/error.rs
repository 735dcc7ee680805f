use thiserror::Error;

/// Everything the roster can refuse a mutation with. Exactly one per call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("Activity not found")]
    NotFound,

    #[error("Student is already signed up")]
    DuplicateRegistration,

    #[error("Activity is full")]
    CapacityExceeded,

    #[error("Student is not signed up for this activity")]
    NotRegistered,

    #[error("{0}")]
    Validation(String),

    // A 409 whose payload names none of the conflicts above. Never raised by
    // the store itself.
    #[error("{0}")]
    Conflict(String),

    // Write-through to the database failed; the in-memory roster is untouched.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RosterError {
    pub fn code(&self) -> &'static str {
        match self {
            RosterError::NotFound => "not_found",
            RosterError::DuplicateRegistration => "duplicate_registration",
            RosterError::CapacityExceeded => "capacity_exceeded",
            RosterError::NotRegistered => "not_registered",
            RosterError::Validation(_) => "validation",
            RosterError::Conflict(_) => "conflict",
            RosterError::Storage(_) => "storage",
        }
    }

    /// Recognise a detail text this crate (or an older server) sends for a
    /// fixed-text variant.
    pub fn from_detail(detail: &str) -> Option<RosterError> {
        [
            RosterError::NotFound,
            RosterError::DuplicateRegistration,
            RosterError::CapacityExceeded,
            RosterError::NotRegistered,
        ]
        .into_iter()
        .find(|e| e.to_string() == detail.trim())
    }

    /// Rebuild an error from its wire code. `detail` only survives for the
    /// variants that carry text.
    pub fn from_code(code: &str, detail: &str) -> Option<RosterError> {
        let err = match code {
            "not_found" => RosterError::NotFound,
            "duplicate_registration" => RosterError::DuplicateRegistration,
            "capacity_exceeded" => RosterError::CapacityExceeded,
            "not_registered" => RosterError::NotRegistered,
            "validation" => RosterError::Validation(detail.to_string()),
            "conflict" => RosterError::Conflict(detail.to_string()),
            "storage" => RosterError::Storage(
                detail
                    .strip_prefix("Storage error: ")
                    .unwrap_or(detail)
                    .to_string(),
            ),
            _ => return None,
        };
        Some(err)
    }
}

impl From<sqlx::Error> for RosterError {
    fn from(e: sqlx::Error) -> Self {
        RosterError::Storage(e.to_string())
    }
}

/// Client-side failures. `Transport` means the effect of the call is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rejected(#[from] RosterError),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors raised while building a roster store from seed data or the database.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Activity {activity} needs a positive capacity")]
    InvalidCapacity { activity: String },

    #[error("Activity {0} is provisioned twice")]
    DuplicateActivity(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Configuration lookup failed: no {kind} entry for '{key}'")]
    ConfigurationLookup { kind: LookupKind, key: String },

    #[error("Scenario '{id}' is protected and cannot be {operation}")]
    ProtectedScenario { id: String, operation: &'static str },

    #[error("Scenario '{id}' not found")]
    ScenarioNotFound { id: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type PlanResult<T> = Result<T, PlanError>;

/// Which table a failed lookup consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Level,
    Band,
    Grade,
}

impl std::fmt::Display for LookupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Level => f.write_str("level"),
            Self::Band  => f.write_str("band"),
            Self::Grade => f.write_str("performance grade"),
        }
    }
}

/// Failures at the durable scenario boundary.
/// These never roll back in-memory state.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("storage error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("record encoding error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    #[error("request rejected: {reason}")]
    Rejected { reason: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

use thiserror::Error;

/// Boxed failure produced by a gateway or a queued operation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PriorisError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Verification failed for {operation} on '{entity_id}'")]
    VerificationFailed { operation: String, entity_id: String },

    #[error("Persistence error during {operation}: {source}")]
    Persistence {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Operation '{name}' ({id}) was cancelled before execution")]
    Cancelled { id: String, name: String },

    #[error("Operation '{name}' failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        name: String,
        attempts: u32,
        #[source]
        source: BoxError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PriorisError>;

impl PriorisError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn persistence(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Persistence {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn verification_failed(operation: impl ToString, entity_id: impl Into<String>) -> Self {
        Self::VerificationFailed {
            operation: operation.to_string(),
            entity_id: entity_id.into(),
        }
    }

    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::VerificationFailed { .. } => "verification_failed",
            Self::Persistence { .. } => "persistence",
            Self::Cancelled { .. } => "cancelled",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Internal(_) => "internal",
        }
    }

    /// Message suitable for showing to an end user.
    ///
    /// Storage vocabulary stays in the `Display` output and the logs; the
    /// UI only ever sees these strings.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { kind, .. } => format!("The requested {kind} no longer exists."),
            Self::VerificationFailed { .. } => {
                "The change could not be confirmed by storage and was undone.".to_string()
            }
            Self::Persistence { .. } => {
                "Saving failed. Your previous data has been kept.".to_string()
            }
            Self::Cancelled { .. } => "The operation was cancelled.".to_string(),
            Self::RetriesExhausted { attempts, .. } => {
                format!("The operation kept failing after {attempts} attempt(s).")
            }
            Self::InvalidConfig(_) | Self::Internal(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }

    /// Whether repeating the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Persistence { .. } | Self::VerificationFailed { .. }
        )
    }
}

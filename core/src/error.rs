use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmlError {
    /// The engine broke one of its own contracts. Never caused by user input.
    #[error("Internal invariant violated: {detail}")]
    InvariantViolation { detail: String },

    #[error("Account '{account_id}' not found in transaction graph")]
    UnknownAccount { account_id: String },

    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Invalid transaction at row {row}: {reason}")]
    InvalidTransaction { row: usize, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AmlError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation { detail: detail.into() }
    }

    /// True for engine-side failures, false for anything the caller supplied.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

pub type AmlResult<T> = Result<T, AmlError>;

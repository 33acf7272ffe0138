use thiserror::Error;
use uuid::Uuid;

/// Result alias used throughout the core.
pub type CmmcResult<T> = Result<T, CmmcError>;

/// Typed failures raised by the scoring, lifecycle, and wizard operations.
#[derive(Debug, Error)]
pub enum CmmcError {
    #[error("unknown objective: {0}")]
    UnknownObjective(Uuid),

    #[error("invalid transition from '{from}' via '{action}': {reason}")]
    InvalidTransition {
        from: String,
        action: String,
        reason: String,
    },

    #[error("assessment incomplete: {0}")]
    IncompleteAssessment(String),

    #[error("invalid wizard step {0}: must be within 1..=5")]
    InvalidStep(u8),

    #[error(
        "out of order validation: step {requested} requested but steps are only validated through {validated_through}"
    )]
    OutOfOrderValidation { requested: u8, validated_through: u8 },

    #[error("stale write rejected for {entity} {id}")]
    StaleWrite { entity: &'static str, id: Uuid },

    #[error("referential integrity violation: {0}")]
    ReferentialIntegrityViolation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("catalog load failed: {0}")]
    CatalogLoad(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CmmcError {
    pub fn invalid_transition(
        from: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Only stale writes are expected to succeed after the caller re-reads state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleWrite { .. })
    }
}

/// Failures at the persistence boundary that are not domain conflicts.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {entity} id: {id}")]
    Duplicate { entity: &'static str, id: Uuid },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

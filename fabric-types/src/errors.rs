//! The closed error taxonomy (spec §7). Every adapter translates its
//! driver-specific errors into one of these variants at the adapter
//! boundary; nothing upstream of an adapter ever sees a driver type.

use thiserror::Error;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum FabricError {
    #[error("unknown database kind: {0}")]
    UnknownKind(String),

    #[error("invalid configuration for {kind}.{field}: {reason}")]
    ConfigurationError {
        kind: String,
        field: String,
        reason: String,
    },

    #[error("failed to connect to {kind} at {endpoint}: {cause}")]
    ConnectionError {
        kind: String,
        endpoint: String,
        #[source]
        cause: BoxedError,
    },

    #[error("connection {id} was lost")]
    ConnectionLost { id: String },

    #[error("{kind} does not support operation: {operation}")]
    Unsupported { operation: String, kind: String },

    #[error("type translation loss ({severity:?}): {notes}")]
    TranslationLoss {
        severity: LossSeverity,
        notes: String,
    },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("constraint violation: {kind:?}")]
    ConstraintViolation { kind: ConstraintKind },

    #[error("transient error: {cause}")]
    Transient {
        #[source]
        cause: BoxedError,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("internal invariant breach: {cause}")]
    Internal {
        #[source]
        cause: BoxedError,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossSeverity {
    None,
    Widening,
    Narrowing,
    Representational,
    Unsupported,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
    NotNull,
}

impl FabricError {
    pub fn internal<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FabricError::Internal {
            cause: Box::new(cause),
        }
    }

    pub fn transient<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FabricError::Transient {
            cause: Box::new(cause),
        }
    }

    pub fn unsupported(operation: impl Into<String>, kind: impl Into<String>) -> Self {
        FabricError::Unsupported {
            operation: operation.into(),
            kind: kind.into(),
        }
    }

    /// Whether the caller's Snapshot/CDC loop should retry this error with
    /// backoff (spec §7 propagation policy), as opposed to surfacing it or
    /// demoting the relationship to `error`.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FabricError::Transient { .. } | FabricError::DeadlineExceeded)
    }
}

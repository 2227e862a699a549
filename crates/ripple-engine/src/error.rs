//! Engine error taxonomy
//!
//! Two layers: [`EngineError`] for request-level failures that stop a call
//! outright, and [`RuleOpError`] for per-rule operation failures that are
//! collected into the change result rather than aborting siblings.

use ripple_model::FailureReason;
use ripple_store::StoreError;

/// Request-level engine error
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// Schema or attribute referenced by the request does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Apply was called without `confirm_propagation`
    #[error("propagation not confirmed; analyze and confirm before applying")]
    NotConfirmed,

    /// Store failure outside the per-rule fan-out
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            other => Self::Store(other),
        }
    }
}

/// Per-rule operation failure
///
/// Never aborts sibling rule operations; collected into the change result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleOpError {
    /// Rule no longer exists
    #[error("rule not found")]
    NotFound,

    /// Optimistic concurrency failure on persist
    #[error("concurrent modification: {0}")]
    Conflict(String),

    /// Rewrite would change semantics; requires human resolution
    #[error("unsafe rewrite: {0}")]
    UnsafeRewrite(String),

    /// Derived representation regeneration failed
    #[error("compile error: {0}")]
    CompileError(String),

    /// Rule changed between analysis and apply
    #[error("stale plan: {0}")]
    StalePlan(String),

    /// Caller aborted before this rule was attempted
    #[error("cancelled")]
    Cancelled,
}

impl RuleOpError {
    /// Classification for the caller-facing result
    #[must_use]
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::NotFound => FailureReason::NotFound,
            Self::Conflict(_) => FailureReason::Conflict,
            Self::UnsafeRewrite(_) => FailureReason::UnsafeRewrite,
            Self::CompileError(_) => FailureReason::CompileError,
            Self::StalePlan(_) => FailureReason::StalePlan,
            Self::Cancelled => FailureReason::Cancelled,
        }
    }

    /// Whether re-running analysis and apply can resolve this on its own
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::StalePlan(_) | Self::Cancelled
        )
    }

    /// Whether a human must resolve this before propagation can converge
    #[inline]
    #[must_use]
    pub fn needs_human(&self) -> bool {
        matches!(self, Self::UnsafeRewrite(_))
    }
}

impl From<StoreError> for RuleOpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::Conflict(what) => Self::Conflict(what),
        }
    }
}

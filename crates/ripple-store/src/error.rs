//! Store and compiler error types

/// Storage collaborator errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Referenced schema, attribute, or rule does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency failure: the record changed since it was read
    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Not-found shorthand
    #[inline]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Conflict shorthand
    #[inline]
    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }
}

/// Derived-representation regeneration failure
#[derive(Debug, Clone, thiserror::Error)]
#[error("compile failed: {0}")]
pub struct CompileError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        assert_eq!(
            StoreError::not_found("rule abc").to_string(),
            "not found: rule abc"
        );
        assert_eq!(
            StoreError::conflict("revision 3").to_string(),
            "conflict: revision 3"
        );
    }
}

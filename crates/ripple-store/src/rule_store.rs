//! Rule store contract

use crate::error::StoreError;
use async_trait::async_trait;
use ripple_model::{Rule, RuleId, SchemaId};

/// Owns rule definitions and their persistence
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Every rule bound to the schema as input or output contract
    ///
    /// Read-only query, no locking. Order is deterministic per store but
    /// otherwise unspecified.
    async fn list_rules_referencing_schema(
        &self,
        schema_id: SchemaId,
    ) -> Result<Vec<Rule>, StoreError>;

    /// Fetch a rule by id
    async fn get_rule(&self, id: RuleId) -> Result<Rule, StoreError>;

    /// Persist a rule, optimistically
    ///
    /// Fails with [`StoreError::Conflict`] when the rule was modified since
    /// `rule.revision` was read. On success the stored copy is returned with
    /// its revision bumped.
    async fn persist_rule(&self, rule: Rule) -> Result<Rule, StoreError>;
}

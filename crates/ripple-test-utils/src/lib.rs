//! Testing utilities for the Ripple workspace
//!
//! Shared fixtures and failure-injection collaborators.

#![allow(missing_docs)]

use async_trait::async_trait;
use dashmap::DashMap;
use ripple_model::{
    ActionNode, AttributeType, CompareOp, ConditionNode, DerivedRepresentation, ProjectId, Rule,
    RuleId, Schema, SchemaAttribute, SchemaId,
};
use ripple_store::{
    CompileError, MemoryRuleStore, RuleCompiler, RuleStore, StoreError, TextRuleCompiler,
};
use serde_json::json;

/// Order schema with the attributes the scenario tests revolve around:
/// `total: number`, `status: string`, `quantity: integer`.
pub fn order_schema() -> Schema {
    Schema::new("Order")
        .with_attribute(SchemaAttribute::new("total", AttributeType::Number).required())
        .with_attribute(SchemaAttribute::new("status", AttributeType::String))
        .with_attribute(SchemaAttribute::new("quantity", AttributeType::Integer))
}

/// Rule with a single `attr > threshold` condition and one unrelated action
pub fn threshold_rule(
    name: &str,
    project: ProjectId,
    input: SchemaId,
    output: SchemaId,
    attr: &str,
    threshold: i64,
) -> Rule {
    Rule::new(name, project, input, output)
        .with_condition(ConditionNode::compare(attr, CompareOp::Gt, json!(threshold)))
        .with_action(ActionNode::assign("priority", json!("high")))
}

/// Rule whose only condition references `attr`, so deleting `attr` would
/// empty it
pub fn single_condition_rule(
    name: &str,
    project: ProjectId,
    input: SchemaId,
    output: SchemaId,
    attr: &str,
) -> Rule {
    Rule::new(name, project, input, output)
        .with_condition(ConditionNode::compare(attr, CompareOp::Eq, json!("open")))
        .with_action(ActionNode::assign("priority", json!("low")))
}

/// Compiler that fails for configured rules and otherwise delegates to the
/// text compiler
#[derive(Debug, Default)]
pub struct FailingCompiler {
    inner: TextRuleCompiler,
    fail_for: DashMap<RuleId, String>,
}

impl FailingCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make compilation of the given rule fail with the given message
    pub fn fail_rule(&self, rule_id: RuleId, message: impl Into<String>) {
        self.fail_for.insert(rule_id, message.into());
    }

    /// Stop failing the given rule
    pub fn fix_rule(&self, rule_id: RuleId) {
        self.fail_for.remove(&rule_id);
    }
}

#[async_trait]
impl RuleCompiler for FailingCompiler {
    async fn regenerate_derived(&self, rule: &Rule) -> Result<DerivedRepresentation, CompileError> {
        if let Some(message) = self.fail_for.get(&rule.id) {
            return Err(CompileError(message.value().clone()));
        }
        self.inner.regenerate_derived(rule).await
    }
}

/// Rule store that injects persist conflicts for configured rules and
/// otherwise delegates to an in-memory store
#[derive(Debug, Default)]
pub struct ConflictingRuleStore {
    inner: MemoryRuleStore,
    conflict_on_persist: DashMap<RuleId, ()>,
}

impl ConflictingRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a rule into the underlying store
    pub fn put_rule(&self, rule: Rule) {
        self.inner.put_rule(rule);
    }

    /// Make every persist of the given rule fail with a conflict
    pub fn conflict_on(&self, rule_id: RuleId) {
        self.conflict_on_persist.insert(rule_id, ());
    }

    /// Stop conflicting the given rule
    pub fn resolve(&self, rule_id: RuleId) {
        self.conflict_on_persist.remove(&rule_id);
    }
}

#[async_trait]
impl RuleStore for ConflictingRuleStore {
    async fn list_rules_referencing_schema(
        &self,
        schema_id: SchemaId,
    ) -> Result<Vec<Rule>, StoreError> {
        self.inner.list_rules_referencing_schema(schema_id).await
    }

    async fn get_rule(&self, id: RuleId) -> Result<Rule, StoreError> {
        self.inner.get_rule(id).await
    }

    async fn persist_rule(&self, rule: Rule) -> Result<Rule, StoreError> {
        if self.conflict_on_persist.contains_key(&rule.id) {
            return Err(StoreError::conflict(format!(
                "injected conflict for rule {}",
                rule.id
            )));
        }
        self.inner.persist_rule(rule).await
    }
}

//! In-memory reference stores
//!
//! DashMap-backed implementations of the collaborator contracts. They back
//! the engine's tests and suit embedders that do not need durable storage.
//! Mutations take the map shard lock for the whole read-check-write, so
//! each mutation is a single committed step.

use crate::attribute_store::AttributeStore;
use crate::error::StoreError;
use crate::rule_store::RuleStore;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use indexmap::IndexMap;
use ripple_model::{AttributeType, Rule, RuleId, Schema, SchemaAttribute, SchemaId};

/// In-memory attribute store
#[derive(Debug, Default)]
pub struct MemoryAttributeStore {
    schemas: DashMap<SchemaId, Schema>,
}

impl MemoryAttributeStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a schema
    pub fn put_schema(&self, schema: Schema) {
        self.schemas.insert(schema.id, schema);
    }

    /// Number of stored schemas
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[async_trait]
impl AttributeStore for MemoryAttributeStore {
    async fn get_schema(&self, schema_id: SchemaId) -> Result<Schema, StoreError> {
        self.schemas
            .get(&schema_id)
            .map(|s| s.clone())
            .ok_or_else(|| StoreError::not_found(format!("schema {schema_id}")))
    }

    async fn get_attribute(
        &self,
        schema_id: SchemaId,
        name: &str,
    ) -> Result<SchemaAttribute, StoreError> {
        let schema = self
            .schemas
            .get(&schema_id)
            .ok_or_else(|| StoreError::not_found(format!("schema {schema_id}")))?;
        schema
            .attribute(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("attribute {name} in schema {schema_id}")))
    }

    async fn rename_attribute(
        &self,
        schema_id: SchemaId,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), StoreError> {
        let mut schema = self
            .schemas
            .get_mut(&schema_id)
            .ok_or_else(|| StoreError::not_found(format!("schema {schema_id}")))?;

        if !schema.attributes.contains_key(old_name) {
            return Err(StoreError::conflict(format!(
                "attribute {old_name} no longer exists"
            )));
        }
        if schema.attributes.contains_key(new_name) {
            return Err(StoreError::conflict(format!(
                "attribute {new_name} already exists"
            )));
        }

        schema.attributes = reinsert_renamed(&schema.attributes, old_name, new_name);
        schema.touch();
        tracing::debug!(schema = %schema_id, %old_name, %new_name, "attribute renamed");
        Ok(())
    }

    async fn retype_attribute(
        &self,
        schema_id: SchemaId,
        name: &str,
        expected_type: AttributeType,
        new_type: AttributeType,
    ) -> Result<(), StoreError> {
        let mut schema = self
            .schemas
            .get_mut(&schema_id)
            .ok_or_else(|| StoreError::not_found(format!("schema {schema_id}")))?;

        let attribute = schema.attributes.get_mut(name).ok_or_else(|| {
            StoreError::conflict(format!("attribute {name} no longer exists"))
        })?;
        if attribute.ty != expected_type {
            return Err(StoreError::conflict(format!(
                "attribute {name} is {}, expected {expected_type}",
                attribute.ty
            )));
        }

        attribute.ty = new_type;
        schema.touch();
        tracing::debug!(schema = %schema_id, %name, %new_type, "attribute retyped");
        Ok(())
    }

    async fn delete_attribute(&self, schema_id: SchemaId, name: &str) -> Result<(), StoreError> {
        let mut schema = self
            .schemas
            .get_mut(&schema_id)
            .ok_or_else(|| StoreError::not_found(format!("schema {schema_id}")))?;

        if schema.attributes.shift_remove(name).is_none() {
            return Err(StoreError::conflict(format!(
                "attribute {name} no longer exists"
            )));
        }
        schema.touch();
        tracing::debug!(schema = %schema_id, %name, "attribute deleted");
        Ok(())
    }
}

/// Rebuild the attribute map with one key renamed, preserving order
fn reinsert_renamed(
    attributes: &IndexMap<String, SchemaAttribute>,
    old_name: &str,
    new_name: &str,
) -> IndexMap<String, SchemaAttribute> {
    attributes
        .iter()
        .map(|(key, attribute)| {
            if key == old_name {
                let mut renamed = attribute.clone();
                renamed.name = new_name.to_string();
                (new_name.to_string(), renamed)
            } else {
                (key.clone(), attribute.clone())
            }
        })
        .collect()
}

/// In-memory rule store with optimistic concurrency
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: DashMap<RuleId, Rule>,
}

impl MemoryRuleStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a rule as-is, bypassing the revision check
    pub fn put_rule(&self, rule: Rule) {
        self.rules.insert(rule.id, rule);
    }

    /// Number of stored rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn list_rules_referencing_schema(
        &self,
        schema_id: SchemaId,
    ) -> Result<Vec<Rule>, StoreError> {
        let mut rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|entry| entry.value().is_bound_to(schema_id))
            .map(|entry| entry.value().clone())
            .collect();
        // Deterministic listing order
        rules.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rules)
    }

    async fn get_rule(&self, id: RuleId) -> Result<Rule, StoreError> {
        self.rules
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::not_found(format!("rule {id}")))
    }

    async fn persist_rule(&self, rule: Rule) -> Result<Rule, StoreError> {
        let mut stored = self
            .rules
            .get_mut(&rule.id)
            .ok_or_else(|| StoreError::not_found(format!("rule {}", rule.id)))?;

        if stored.revision != rule.revision {
            return Err(StoreError::conflict(format!(
                "rule {} is at revision {}, caller read {}",
                rule.id, stored.revision, rule.revision
            )));
        }

        let mut updated = rule;
        updated.revision += 1;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        tracing::debug!(rule = %updated.id, revision = updated.revision, "rule persisted");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ripple_model::{CompareOp, ConditionNode, ProjectId};
    use serde_json::json;

    fn order_schema() -> Schema {
        Schema::new("Order")
            .with_attribute(SchemaAttribute::new("total", AttributeType::Number))
            .with_attribute(SchemaAttribute::new("status", AttributeType::String))
            .with_attribute(SchemaAttribute::new("quantity", AttributeType::Integer))
    }

    #[tokio::test]
    async fn rename_preserves_attribute_order_and_identity() {
        let store = MemoryAttributeStore::new();
        let schema = order_schema();
        let schema_id = schema.id;
        store.put_schema(schema);

        store
            .rename_attribute(schema_id, "status", "orderStatus")
            .await
            .unwrap();

        let schema = store.get_schema(schema_id).await.unwrap();
        let names: Vec<&str> = schema.attributes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["total", "orderStatus", "quantity"]);
        assert_eq!(
            schema.attribute("orderStatus").unwrap().ty,
            AttributeType::String
        );
        assert_eq!(schema.version, 2);
    }

    #[tokio::test]
    async fn rename_conflicts_on_missing_or_taken_name() {
        let store = MemoryAttributeStore::new();
        let schema = order_schema();
        let schema_id = schema.id;
        store.put_schema(schema);

        let missing = store.rename_attribute(schema_id, "ghost", "x").await;
        assert!(matches!(missing, Err(StoreError::Conflict(_))));

        let taken = store.rename_attribute(schema_id, "total", "status").await;
        assert!(matches!(taken, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn retype_checks_expected_type() {
        let store = MemoryAttributeStore::new();
        let schema = order_schema();
        let schema_id = schema.id;
        store.put_schema(schema);

        let wrong = store
            .retype_attribute(
                schema_id,
                "quantity",
                AttributeType::String,
                AttributeType::Number,
            )
            .await;
        assert!(matches!(wrong, Err(StoreError::Conflict(_))));

        store
            .retype_attribute(
                schema_id,
                "quantity",
                AttributeType::Integer,
                AttributeType::Number,
            )
            .await
            .unwrap();
        let attribute = store.get_attribute(schema_id, "quantity").await.unwrap();
        assert_eq!(attribute.ty, AttributeType::Number);
    }

    #[tokio::test]
    async fn delete_removes_attribute() {
        let store = MemoryAttributeStore::new();
        let schema = order_schema();
        let schema_id = schema.id;
        store.put_schema(schema);

        store.delete_attribute(schema_id, "status").await.unwrap();
        let result = store.get_attribute(schema_id, "status").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));

        let again = store.delete_attribute(schema_id, "status").await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn persist_rule_is_optimistic() {
        let store = MemoryRuleStore::new();
        let schema_id = SchemaId::new();
        let rule = Rule::new("r1", ProjectId::new(), schema_id, SchemaId::new())
            .with_condition(ConditionNode::compare("total", CompareOp::Gt, json!(100)));
        store.put_rule(rule.clone());

        // First writer wins
        let updated = store.persist_rule(rule.clone()).await.unwrap();
        assert_eq!(updated.revision, 1);

        // Second writer with the stale revision loses
        let stale = store.persist_rule(rule).await;
        assert!(matches!(stale, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn listing_filters_by_binding_and_is_sorted() {
        let store = MemoryRuleStore::new();
        let schema_id = SchemaId::new();
        let other = SchemaId::new();
        let project = ProjectId::new();

        store.put_rule(Rule::new("beta", project, schema_id, other));
        store.put_rule(Rule::new("alpha", project, other, schema_id));
        store.put_rule(Rule::new("unrelated", project, other, other));

        let rules = store.list_rules_referencing_schema(schema_id).await.unwrap();
        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }
}

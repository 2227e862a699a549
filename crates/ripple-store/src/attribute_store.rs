//! Attribute store contract
//!
//! The attribute store exclusively owns attribute identity and type. The
//! engine reads from it during analysis and performs exactly one committed
//! mutation at the end of a successful propagation.

use crate::error::StoreError;
use async_trait::async_trait;
use ripple_model::{AttributeType, Schema, SchemaAttribute, SchemaId};

/// Owns schema attribute definitions and their persistence
///
/// Each mutation is a single committed write. Mutations fail with
/// [`StoreError::Conflict`] when the attribute no longer has the expected
/// prior identity (it was renamed, retyped, or removed since it was read).
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Fetch a whole schema
    async fn get_schema(&self, schema_id: SchemaId) -> Result<Schema, StoreError>;

    /// Fetch a single attribute
    async fn get_attribute(
        &self,
        schema_id: SchemaId,
        name: &str,
    ) -> Result<SchemaAttribute, StoreError>;

    /// Rename an attribute, preserving its identity and position
    async fn rename_attribute(
        &self,
        schema_id: SchemaId,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), StoreError>;

    /// Change an attribute's declared type
    ///
    /// `expected_type` is the identity check: the mutation fails with
    /// `Conflict` when the stored type no longer matches it.
    async fn retype_attribute(
        &self,
        schema_id: SchemaId,
        name: &str,
        expected_type: AttributeType,
        new_type: AttributeType,
    ) -> Result<(), StoreError>;

    /// Remove an attribute
    async fn delete_attribute(&self, schema_id: SchemaId, name: &str) -> Result<(), StoreError>;
}

//! Ripple data model
//!
//! Defines the shared vocabulary of the workspace:
//! - Schemas and their typed attributes
//! - Rules with condition/action logic trees
//! - Attribute references produced by scanning
//! - Change requests, impact read models, and change results

#![warn(unreachable_pub)]

pub mod change;
pub mod reference;
pub mod rule;
pub mod schema;

// Re-exports for convenience
pub use change::{
    AffectedRule, AttributeImpact, ChangeKind, ChangeRequest, ChangeResult, FailureReason,
    RiskLevel, RuleOpFailure,
};
pub use reference::{AttributeReference, ClausePath, RefLocation};
pub use rule::{
    ActionExpr, ActionNode, AttributePath, CompareOp, ConditionNode, DerivedRepresentation,
    LogicOp, Rule, RuleId,
};
pub use schema::{AttributeType, ProjectId, Schema, SchemaAttribute, SchemaId, SchemaSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

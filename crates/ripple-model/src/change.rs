//! Change requests, impact read models, and change results
//!
//! These are the caller-facing shapes: a proposed attribute change goes in,
//! an impact report comes back for confirmation, and an apply call returns
//! an itemized per-rule result.

use crate::reference::AttributeReference;
use crate::rule::RuleId;
use crate::schema::{AttributeType, ProjectId, SchemaId};
use serde::{Deserialize, Serialize};

/// The kind of attribute change being proposed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeKind {
    /// Rename the attribute, identity preserved
    Rename { new_name: String },
    /// Change the attribute's declared type
    Retype { new_type: AttributeType },
    /// Remove the attribute
    Delete,
}

impl ChangeKind {
    /// Short name for logging and messages
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Rename { .. } => "rename",
            Self::Retype { .. } => "retype",
            Self::Delete => "delete",
        }
    }
}

/// A proposed schema attribute change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Schema that owns the attribute
    pub schema_id: SchemaId,
    /// Current attribute name
    pub old_name: String,
    /// What to do to it
    pub change: ChangeKind,
    /// False means preview only: plan but never write
    pub confirm_propagation: bool,
}

impl ChangeRequest {
    /// Rename request
    #[must_use]
    pub fn rename(schema_id: SchemaId, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            schema_id,
            old_name: old.into(),
            change: ChangeKind::Rename {
                new_name: new.into(),
            },
            confirm_propagation: false,
        }
    }

    /// Retype request
    #[must_use]
    pub fn retype(schema_id: SchemaId, name: impl Into<String>, new_type: AttributeType) -> Self {
        Self {
            schema_id,
            old_name: name.into(),
            change: ChangeKind::Retype { new_type },
            confirm_propagation: false,
        }
    }

    /// Delete request
    #[must_use]
    pub fn delete(schema_id: SchemaId, name: impl Into<String>) -> Self {
        Self {
            schema_id,
            old_name: name.into(),
            change: ChangeKind::Delete,
            confirm_propagation: false,
        }
    }

    /// Confirm propagation, consuming and returning the request
    #[inline]
    #[must_use]
    pub fn confirmed(mut self) -> Self {
        self.confirm_propagation = true;
        self
    }
}

/// Coarse severity of a proposed change's blast radius
///
/// Ordered: `None < Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// No rule references the attribute
    #[default]
    None,
    /// Mechanically safe to propagate (e.g. rename)
    Low,
    /// May change rule semantics; review advised
    Medium,
    /// Likely to change matching behavior, or wide blast radius
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        write!(f, "{s}")
    }
}

/// One rule touched by a proposed change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectedRule {
    /// Rule identifier
    pub rule_id: RuleId,
    /// Rule name
    pub rule_name: String,
    /// Owning project
    pub project_id: ProjectId,
    /// Owning project's display name
    pub project_name: String,
    /// Every reference found, in scan order
    pub usages: Vec<AttributeReference>,
}

/// Impact report for a proposed attribute change
///
/// Computed fresh per request; never cached across requests, since rules
/// can change between analysis and apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeImpact {
    /// Attribute under analysis
    pub attribute_name: String,
    /// Schema that owns it
    pub schema_id: SchemaId,
    /// Rules with at least one reference, with their usages
    pub affected_rules: Vec<AffectedRule>,
    /// Count of affected rules (not of individual references)
    pub total_affected_rules: usize,
    /// Risk classification for the proposed change
    pub risk: RiskLevel,
}

/// Why a per-rule operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Rule no longer exists
    NotFound,
    /// Optimistic concurrency failure on persist
    Conflict,
    /// Rewrite would change semantics; needs human resolution
    UnsafeRewrite,
    /// Derived representation regeneration failed
    CompileError,
    /// Rule changed between analysis and apply
    StalePlan,
    /// Caller aborted before this rule was attempted
    Cancelled,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::UnsafeRewrite => "unsafe_rewrite",
            Self::CompileError => "compile_error",
            Self::StalePlan => "stale_plan",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Itemized failure entry in a change result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOpFailure {
    /// Rule that failed
    pub rule_id: RuleId,
    /// Failure classification
    pub reason: FailureReason,
    /// Human-readable detail
    pub message: String,
}

/// Outcome of an apply call
///
/// Partial failure is a first-class outcome: successfully rewritten rules
/// stay persisted even when `success` is false, and the report always
/// itemizes both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeResult {
    /// True when every rule op succeeded and the schema mutation committed
    pub success: bool,
    /// Summary message
    pub message: String,
    /// Rules rewritten, persisted, and recompiled
    pub updated_rule_ids: Vec<RuleId>,
    /// Rules that failed, in no particular order
    pub failed_rule_ids: Vec<RuleId>,
    /// One entry per failed rule
    pub errors: Vec<RuleOpFailure>,
}

impl ChangeResult {
    /// Successful no-op result
    #[must_use]
    pub fn noop(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            updated_rule_ids: Vec::new(),
            failed_rule_ids: Vec::new(),
            errors: Vec::new(),
        }
    }
}

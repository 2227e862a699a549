//! Change planning
//!
//! Translates a change request plus its impact analysis into an ordered
//! list of per-rule rewrite operations. Pure: no I/O happens here, and a
//! plan built from an unconfirmed request is a preview the executor will
//! refuse to run.

use crate::rewrite::RewriteInstruction;
use ripple_model::{AttributeImpact, AttributeReference, ChangeRequest, RuleId, SchemaAttribute};

/// One planned rewrite of one rule
#[derive(Debug, Clone)]
pub struct RuleRewriteOp {
    /// Rule to rewrite
    pub rule_id: RuleId,
    /// Rule name, for reporting
    pub rule_name: String,
    /// References recorded at analysis time, in scan order
    pub usages: Vec<AttributeReference>,
    /// What to do to the rule
    pub instruction: RewriteInstruction,
}

/// Ordered propagation plan for one change request
#[derive(Debug, Clone)]
pub struct PropagationPlan {
    /// The request the plan was built for
    pub request: ChangeRequest,
    /// Attribute snapshot taken at planning time; the schema commit uses it
    /// as the expected prior identity
    pub attribute: SchemaAttribute,
    /// Per-rule operations, in analysis order
    pub ops: Vec<RuleRewriteOp>,
}

impl PropagationPlan {
    /// Whether this plan is a read-only preview
    #[inline]
    #[must_use]
    pub fn is_preview(&self) -> bool {
        !self.request.confirm_propagation
    }

    /// Whether there is nothing to rewrite
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Build the propagation plan for a confirmed (or previewed) change
///
/// Rule order follows the impact report; within each rule the recorded
/// usages keep the scanner's deterministic traversal order, which the
/// executor re-validates and applies in that same order.
#[must_use]
pub fn plan(
    request: &ChangeRequest,
    attribute: &SchemaAttribute,
    impact: &AttributeImpact,
) -> PropagationPlan {
    let instruction = RewriteInstruction::for_change(&request.change, &request.old_name, attribute.ty);

    let ops = impact
        .affected_rules
        .iter()
        .map(|affected| RuleRewriteOp {
            rule_id: affected.rule_id,
            rule_name: affected.rule_name.clone(),
            usages: affected.usages.clone(),
            instruction: instruction.clone(),
        })
        .collect();

    PropagationPlan {
        request: request.clone(),
        attribute: attribute.clone(),
        ops,
    }
}

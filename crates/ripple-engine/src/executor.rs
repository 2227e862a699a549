//! Propagation execution
//!
//! Applies a propagation plan rule-by-rule with bounded concurrency. Rule
//! operations are independent units of work: one failure never blocks
//! siblings (partial-failure semantics, not whole-batch atomicity). The
//! single schema-attribute mutation is committed only when zero rule
//! operations failed, so the schema never drifts ahead of rules that still
//! reference the old identifier or type.
//!
//! Successfully rewritten rules stay persisted even when the overall apply
//! reports failure: they already reflect the pending new name/type, so
//! re-running apply after fixing the blocking rules converges.

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::error::{EngineError, RuleOpError};
use crate::op_state::{OpProgress, OpState};
use crate::planner::{PropagationPlan, RuleRewriteOp};
use crate::rewrite::apply_instruction;
use crate::scanner::scan;
use futures::stream::{self, StreamExt};
use ripple_model::{ChangeKind, ChangeResult, RuleId, RuleOpFailure};
use ripple_store::{AttributeStore, RuleCompiler, RuleStore, StoreError};
use std::sync::Arc;

/// Applies planned rewrites and commits the schema mutation
#[derive(Debug)]
pub struct PropagationExecutor<A, R, C> {
    attributes: Arc<A>,
    rules: Arc<R>,
    compiler: Arc<C>,
    config: EngineConfig,
}

impl<A, R, C> PropagationExecutor<A, R, C>
where
    A: AttributeStore,
    R: RuleStore,
    C: RuleCompiler,
{
    /// Create an executor over the given collaborators
    #[must_use]
    pub fn new(attributes: Arc<A>, rules: Arc<R>, compiler: Arc<C>, config: EngineConfig) -> Self {
        Self {
            attributes,
            rules,
            compiler,
            config,
        }
    }

    /// Execute the plan and, when every rule op succeeded, commit the
    /// schema mutation
    ///
    /// # Errors
    /// - `EngineError::NotConfirmed` when the plan is a preview
    ///
    /// Per-rule failures are not errors at this level; they are itemized in
    /// the returned [`ChangeResult`].
    pub async fn apply(
        &self,
        plan: &PropagationPlan,
        cancel: &CancelToken,
    ) -> Result<ChangeResult, EngineError> {
        if plan.is_preview() {
            return Err(EngineError::NotConfirmed);
        }

        tracing::info!(
            schema = %plan.request.schema_id,
            attribute = %plan.request.old_name,
            change = plan.request.change.verb(),
            rules = plan.ops.len(),
            "applying propagation plan"
        );

        let outcomes: Vec<(RuleId, Result<(), RuleOpError>)> = stream::iter(plan.ops.iter())
            .map(|op| self.execute_op(op, plan, cancel))
            .buffer_unordered(self.config.max_concurrent_rule_ops)
            .collect()
            .await;

        let mut updated_rule_ids = Vec::new();
        let mut failed_rule_ids = Vec::new();
        let mut errors = Vec::new();
        for (rule_id, result) in outcomes {
            match result {
                Ok(()) => updated_rule_ids.push(rule_id),
                Err(err) => {
                    failed_rule_ids.push(rule_id);
                    errors.push(RuleOpFailure {
                        rule_id,
                        reason: err.reason(),
                        message: err.to_string(),
                    });
                }
            }
        }
        // Fan-out completes out of order; sort for a reproducible report.
        updated_rule_ids.sort();
        failed_rule_ids.sort();
        errors.sort_by_key(|failure| failure.rule_id);

        if !failed_rule_ids.is_empty() {
            tracing::warn!(
                failed = failed_rule_ids.len(),
                updated = updated_rule_ids.len(),
                "propagation incomplete; schema left unchanged"
            );
            return Ok(ChangeResult {
                success: false,
                message: format!(
                    "{} of {} rule update(s) failed; schema attribute left unchanged",
                    failed_rule_ids.len(),
                    plan.ops.len()
                ),
                updated_rule_ids,
                failed_rule_ids,
                errors,
            });
        }

        match self.commit_schema(plan).await {
            Ok(()) => {
                tracing::info!(updated = updated_rule_ids.len(), "schema mutation committed");
                Ok(ChangeResult {
                    success: true,
                    message: format!(
                        "{} applied; {} rule(s) updated",
                        plan.request.change.verb(),
                        updated_rule_ids.len()
                    ),
                    updated_rule_ids,
                    failed_rule_ids,
                    errors,
                })
            }
            Err(err) => {
                tracing::error!(error = %err, "schema mutation failed after rule updates");
                Ok(ChangeResult {
                    success: false,
                    message: format!("rules updated but schema mutation failed: {err}"),
                    updated_rule_ids,
                    failed_rule_ids,
                    errors,
                })
            }
        }
    }

    async fn execute_op(
        &self,
        op: &RuleRewriteOp,
        plan: &PropagationPlan,
        cancel: &CancelToken,
    ) -> (RuleId, Result<(), RuleOpError>) {
        let result = self.try_execute_op(op, plan, cancel).await;
        if let Err(err) = &result {
            tracing::warn!(rule = %op.rule_id, name = %op.rule_name, error = %err, "rule op failed");
        } else {
            tracing::debug!(rule = %op.rule_id, name = %op.rule_name, "rule op completed");
        }
        (op.rule_id, result)
    }

    async fn try_execute_op(
        &self,
        op: &RuleRewriteOp,
        plan: &PropagationPlan,
        cancel: &CancelToken,
    ) -> Result<(), RuleOpError> {
        let mut progress = OpProgress::new();

        if cancel.is_cancelled() {
            return Err(RuleOpError::Cancelled);
        }

        let current = self.rules.get_rule(op.rule_id).await?;

        // Analysis and apply are separate calls; the rule may have changed
        // in between. Re-scan and require the recorded usages to still hold
        // before touching anything.
        let fresh = scan(&current, plan.request.schema_id, &plan.request.old_name);
        if fresh != op.usages {
            return Err(RuleOpError::StalePlan(format!(
                "rule {} changed since analysis",
                op.rule_id
            )));
        }

        let mut rewritten = apply_instruction(&current, &op.instruction)?;
        advance(&mut progress, OpState::Rewritten);

        // Compile before persisting so the new logic and its derived text
        // land in a single write. A compile failure leaves the stored rule
        // untouched, and a persist conflict can never strand rewritten
        // logic behind a stale derived cache.
        let derived = self
            .compiler
            .regenerate_derived(&rewritten)
            .await
            .map_err(|err| RuleOpError::CompileError(err.to_string()))?;
        rewritten.derived = Some(derived);

        if cancel.is_cancelled() {
            return Err(RuleOpError::Cancelled);
        }

        self.rules.persist_rule(rewritten).await?;
        advance(&mut progress, OpState::Persisted);
        advance(&mut progress, OpState::Compiled);
        Ok(())
    }

    async fn commit_schema(&self, plan: &PropagationPlan) -> Result<(), StoreError> {
        let request = &plan.request;
        match &request.change {
            ChangeKind::Rename { new_name } => {
                self.attributes
                    .rename_attribute(request.schema_id, &request.old_name, new_name)
                    .await
            }
            ChangeKind::Retype { new_type } => {
                self.attributes
                    .retype_attribute(
                        request.schema_id,
                        &request.old_name,
                        plan.attribute.ty,
                        *new_type,
                    )
                    .await
            }
            ChangeKind::Delete => {
                self.attributes
                    .delete_attribute(request.schema_id, &request.old_name)
                    .await
            }
        }
    }
}

/// Transitions are hardcoded in the happy path above; a violation here is
/// a bug, not a runtime condition.
fn advance(progress: &mut OpProgress, to: OpState) {
    if let Err(err) = progress.advance(to) {
        debug_assert!(false, "{err}");
        tracing::error!(error = %err, "op state machine violated");
    }
}

//! Ripple Engine - Schema Attribute Change Impact & Propagation
//!
//! Given a proposed attribute change (rename, retype, delete), the engine:
//! - discovers every rule that references the attribute (scanner)
//! - classifies and risk-scores the blast radius (analyzer)
//! - translates the confirmed change into ordered per-rule rewrites (planner)
//! - applies the rewrites with bounded concurrency, regenerates each rule's
//!   derived representation, and commits the schema mutation only when every
//!   rule op succeeded (executor)
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_engine::{ChangeEngine, EngineConfig};
//! use ripple_model::ChangeRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ChangeEngine::new(attributes, rules, compiler, EngineConfig::new());
//!
//! let request = ChangeRequest::rename(schema_id, "total", "orderTotal");
//! let impact = engine.analyze(&request).await?;
//! println!("{} rule(s) affected, risk {}", impact.total_affected_rules, impact.risk);
//!
//! let result = engine.apply_change(&request.confirmed()).await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod analyzer;
pub mod cancel;
pub mod config;
pub mod error;
pub mod executor;
pub mod op_state;
pub mod planner;
pub mod rewrite;
pub mod scanner;

// Re-exports for convenience
pub use analyzer::{classify_risk, ImpactAnalyzer};
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use config::EngineConfig;
pub use error::{EngineError, RuleOpError};
pub use executor::PropagationExecutor;
pub use op_state::{allowed_transitions, validate_transition, OpProgress, OpState};
pub use planner::{plan, PropagationPlan, RuleRewriteOp};
pub use rewrite::{apply_instruction, RewriteInstruction};
pub use scanner::scan;

use ripple_model::{AttributeImpact, ChangeKind, ChangeRequest, ChangeResult};
use ripple_store::{AttributeStore, RuleCompiler, RuleStore, StoreError};
use std::sync::Arc;

/// Façade wiring analyzer, planner, and executor together
///
/// This is the caller-facing surface: `analyze` for the read-only impact
/// report shown for confirmation, `apply_change` for the confirmed
/// propagation.
#[derive(Debug)]
pub struct ChangeEngine<A, R, C> {
    attributes: Arc<A>,
    analyzer: ImpactAnalyzer<A, R>,
    executor: PropagationExecutor<A, R, C>,
}

impl<A, R, C> ChangeEngine<A, R, C>
where
    A: AttributeStore,
    R: RuleStore,
    C: RuleCompiler,
{
    /// Create an engine over the given collaborators
    #[must_use]
    pub fn new(attributes: Arc<A>, rules: Arc<R>, compiler: Arc<C>, config: EngineConfig) -> Self {
        Self {
            attributes: Arc::clone(&attributes),
            analyzer: ImpactAnalyzer::new(
                Arc::clone(&attributes),
                Arc::clone(&rules),
                config.clone(),
            ),
            executor: PropagationExecutor::new(attributes, rules, compiler, config),
        }
    }

    /// Read-only impact analysis for the proposed change
    ///
    /// # Errors
    /// - `EngineError::NotFound` when the schema or attribute does not exist
    pub async fn analyze(&self, request: &ChangeRequest) -> Result<AttributeImpact, EngineError> {
        self.analyzer.analyze(request).await
    }

    /// Analyze, plan, and apply a confirmed change
    ///
    /// Re-applying an already-propagated request is a successful no-op.
    ///
    /// # Errors
    /// - `EngineError::NotConfirmed` when `confirm_propagation` is false
    /// - `EngineError::NotFound` when the schema or attribute does not exist
    ///   and the change is not detectably already applied
    pub async fn apply_change(&self, request: &ChangeRequest) -> Result<ChangeResult, EngineError> {
        self.apply_change_with_cancel(request, &CancelToken::never())
            .await
    }

    /// `apply_change` with caller-driven cancellation
    pub async fn apply_change_with_cancel(
        &self,
        request: &ChangeRequest,
        cancel: &CancelToken,
    ) -> Result<ChangeResult, EngineError> {
        if !request.confirm_propagation {
            return Err(EngineError::NotConfirmed);
        }

        let attribute = match self
            .attributes
            .get_attribute(request.schema_id, &request.old_name)
            .await
        {
            Ok(attribute) => attribute,
            Err(StoreError::NotFound(what)) => {
                return self.resolve_missing_attribute(request, what).await;
            }
            Err(other) => return Err(other.into()),
        };

        // A retype that already took effect must not re-persist every rule.
        if let ChangeKind::Retype { new_type } = &request.change {
            if attribute.ty == *new_type {
                return Ok(ChangeResult::noop(format!(
                    "attribute {} is already {new_type}",
                    request.old_name
                )));
            }
        }

        let impact = self.analyzer.analyze(request).await?;
        let plan = planner::plan(request, &attribute, &impact);
        self.executor.apply(&plan, cancel).await
    }

    /// The old attribute name no longer resolves. For a rename whose new
    /// name exists, or a delete, that is the already-applied case and a
    /// successful no-op; anything else is a genuine not-found.
    async fn resolve_missing_attribute(
        &self,
        request: &ChangeRequest,
        what: String,
    ) -> Result<ChangeResult, EngineError> {
        // Distinguish a missing schema from a missing attribute.
        let schema = self.attributes.get_schema(request.schema_id).await?;

        match &request.change {
            ChangeKind::Rename { new_name } if schema.attribute(new_name).is_some() => {
                Ok(ChangeResult::noop(format!(
                    "attribute {} is already renamed to {new_name}",
                    request.old_name
                )))
            }
            ChangeKind::Delete => Ok(ChangeResult::noop(format!(
                "attribute {} is already deleted",
                request.old_name
            ))),
            _ => Err(EngineError::NotFound(what)),
        }
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

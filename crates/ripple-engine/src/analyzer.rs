//! Impact analysis
//!
//! Read-only: fetches every rule bound to the schema, scans each for
//! references, and classifies the blast radius of the proposed change.
//! Results are computed fresh per request; rules can change between
//! analysis and apply, so nothing here is cached (the executor re-validates
//! at apply time).

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::scanner::scan;
use ripple_model::{
    AffectedRule, AttributeImpact, ChangeKind, ChangeRequest, RefLocation, RiskLevel,
};
use ripple_store::{AttributeStore, RuleStore};
use std::sync::Arc;

/// Classify the risk of a proposed change given the affected rules
///
/// Priority list, evaluated top down:
/// - `None`: nothing references the attribute
/// - `High`: deleting an attribute referenced in a condition (matching
///   behavior can silently change), or more affected rules than the
///   large-impact threshold
/// - `Medium`: any retype with matches, or a delete referenced only in
///   actions
/// - `Low`: the rest (a rename is mechanically safe to propagate)
#[must_use]
pub fn classify_risk(
    change: &ChangeKind,
    affected_rules: &[AffectedRule],
    large_impact_threshold: usize,
) -> RiskLevel {
    let total = affected_rules.len();
    if total == 0 {
        return RiskLevel::None;
    }

    let any_condition_use = affected_rules
        .iter()
        .flat_map(|rule| rule.usages.iter())
        .any(|usage| usage.location == RefLocation::Condition);

    if total > large_impact_threshold
        || (matches!(change, ChangeKind::Delete) && any_condition_use)
    {
        return RiskLevel::High;
    }

    match change {
        ChangeKind::Retype { .. } | ChangeKind::Delete => RiskLevel::Medium,
        ChangeKind::Rename { .. } => RiskLevel::Low,
    }
}

/// Computes the impact of a proposed attribute change
#[derive(Debug)]
pub struct ImpactAnalyzer<A, R> {
    attributes: Arc<A>,
    rules: Arc<R>,
    config: EngineConfig,
}

impl<A: AttributeStore, R: RuleStore> ImpactAnalyzer<A, R> {
    /// Create an analyzer over the given stores
    #[must_use]
    pub fn new(attributes: Arc<A>, rules: Arc<R>, config: EngineConfig) -> Self {
        Self {
            attributes,
            rules,
            config,
        }
    }

    /// Analyze the impact of the proposed change
    ///
    /// An attribute name nothing references (including one that no longer
    /// exists, e.g. after a completed rename) yields an empty impact with
    /// risk `None`; only a missing schema is an error. Attribute existence
    /// is enforced on the apply path, where it matters.
    ///
    /// # Errors
    /// - `EngineError::NotFound` when the schema does not exist
    pub async fn analyze(&self, request: &ChangeRequest) -> Result<AttributeImpact, EngineError> {
        tracing::info!(
            schema = %request.schema_id,
            attribute = %request.old_name,
            change = request.change.verb(),
            "analyzing attribute change impact"
        );

        // Surface a bad schema immediately.
        self.attributes.get_schema(request.schema_id).await?;

        let rules = self
            .rules
            .list_rules_referencing_schema(request.schema_id)
            .await?;
        tracing::debug!(candidates = rules.len(), "scanning bound rules");

        let mut affected_rules = Vec::new();
        for rule in &rules {
            let usages = scan(rule, request.schema_id, &request.old_name);
            if usages.is_empty() {
                continue;
            }
            affected_rules.push(AffectedRule {
                rule_id: rule.id,
                rule_name: rule.name.clone(),
                project_id: rule.project_id,
                project_name: rule.project_name.clone(),
                usages,
            });
        }

        let risk = classify_risk(
            &request.change,
            &affected_rules,
            self.config.large_impact_threshold,
        );
        let total_affected_rules = affected_rules.len();
        tracing::info!(affected = total_affected_rules, risk = %risk, "impact computed");

        Ok(AttributeImpact {
            attribute_name: request.old_name.clone(),
            schema_id: request.schema_id,
            affected_rules,
            total_affected_rules,
            risk,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_model::{AttributeReference, AttributeType, ClausePath, RuleId};

    fn affected(usages: Vec<AttributeReference>) -> AffectedRule {
        AffectedRule {
            rule_id: RuleId::new(),
            rule_name: "r".into(),
            project_id: Default::default(),
            project_name: "p".into(),
            usages,
        }
    }

    fn usage(location: RefLocation) -> AttributeReference {
        AttributeReference {
            rule_id: RuleId::new(),
            location,
            path: ClausePath::root(0),
            detail: "status == \"open\"".into(),
        }
    }

    fn rename() -> ChangeKind {
        ChangeKind::Rename {
            new_name: "x".into(),
        }
    }

    fn retype() -> ChangeKind {
        ChangeKind::Retype {
            new_type: AttributeType::String,
        }
    }

    #[test]
    fn no_affected_rules_is_no_risk() {
        assert_eq!(classify_risk(&ChangeKind::Delete, &[], 10), RiskLevel::None);
    }

    #[test]
    fn rename_with_matches_is_low() {
        let rules = vec![affected(vec![usage(RefLocation::Condition)])];
        assert_eq!(classify_risk(&rename(), &rules, 10), RiskLevel::Low);
    }

    #[test]
    fn retype_with_matches_is_medium() {
        let rules = vec![affected(vec![usage(RefLocation::Action)])];
        assert_eq!(classify_risk(&retype(), &rules, 10), RiskLevel::Medium);
    }

    #[test]
    fn delete_from_condition_is_high() {
        let rules = vec![affected(vec![usage(RefLocation::Condition)])];
        assert_eq!(classify_risk(&ChangeKind::Delete, &rules, 10), RiskLevel::High);
    }

    #[test]
    fn delete_from_actions_only_is_medium() {
        let rules = vec![affected(vec![usage(RefLocation::Action)])];
        assert_eq!(
            classify_risk(&ChangeKind::Delete, &rules, 10),
            RiskLevel::Medium
        );
    }

    #[test]
    fn wide_blast_radius_is_high_regardless_of_change() {
        let rules: Vec<AffectedRule> = (0..11)
            .map(|_| affected(vec![usage(RefLocation::Action)]))
            .collect();
        assert_eq!(classify_risk(&rename(), &rules, 10), RiskLevel::High);

        // At the threshold it is not yet high.
        let rules: Vec<AffectedRule> = (0..10)
            .map(|_| affected(vec![usage(RefLocation::Action)]))
            .collect();
        assert_eq!(classify_risk(&rename(), &rules, 10), RiskLevel::Low);
    }

    #[test]
    fn risk_is_monotone_across_change_kinds() {
        // Identical usage sets: delete >= retype >= rename.
        for usages in [
            vec![usage(RefLocation::Condition)],
            vec![usage(RefLocation::Action)],
            vec![usage(RefLocation::Condition), usage(RefLocation::Action)],
        ] {
            let rules = vec![affected(usages)];
            let delete_risk = classify_risk(&ChangeKind::Delete, &rules, 10);
            let retype_risk = classify_risk(&retype(), &rules, 10);
            let rename_risk = classify_risk(&rename(), &rules, 10);
            assert!(delete_risk >= retype_risk, "{delete_risk:?} < {retype_risk:?}");
            assert!(retype_risk >= rename_risk, "{retype_risk:?} < {rename_risk:?}");
        }
    }
}

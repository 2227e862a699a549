//! Rule compiler contract and the text reference compiler

use crate::error::CompileError;
use async_trait::async_trait;
use chrono::Utc;
use ripple_model::{DerivedRepresentation, Rule};

/// Regenerates a rule's derived executable representation
///
/// The derived form is a cache of the logical definition and must be
/// regenerated on every logic change.
#[async_trait]
pub trait RuleCompiler: Send + Sync {
    /// Compile the rule's current logical definition
    async fn regenerate_derived(&self, rule: &Rule) -> Result<DerivedRepresentation, CompileError>;
}

/// Reference compiler producing a deterministic executable text form
///
/// Rendering is purely a function of the logic trees, so two rules with the
/// same logic compile to the same text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRuleCompiler;

impl TextRuleCompiler {
    /// Create a text compiler
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn render(rule: &Rule) -> String {
        let mut out = format!("rule \"{}\"\n", rule.name);
        if !rule.conditions.is_empty() {
            let when: Vec<String> = rule.conditions.iter().map(|c| c.render()).collect();
            out.push_str(&format!("when {}\n", when.join(" and ")));
        }
        if !rule.actions.is_empty() {
            let then: Vec<String> = rule.actions.iter().map(|a| a.render()).collect();
            out.push_str(&format!("then {}\n", then.join("; ")));
        }
        out
    }
}

#[async_trait]
impl RuleCompiler for TextRuleCompiler {
    async fn regenerate_derived(&self, rule: &Rule) -> Result<DerivedRepresentation, CompileError> {
        if rule.conditions.is_empty() && rule.actions.is_empty() {
            return Err(CompileError(format!(
                "rule {} has no conditions or actions",
                rule.id
            )));
        }
        Ok(DerivedRepresentation {
            text: Self::render(rule),
            compiled_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_model::{ActionNode, CompareOp, ConditionNode, ProjectId, Rule, SchemaId};
    use serde_json::json;

    fn sample_rule() -> Rule {
        Rule::new("big order", ProjectId::new(), SchemaId::new(), SchemaId::new())
            .with_condition(ConditionNode::compare("total", CompareOp::Gt, json!(100)))
            .with_action(ActionNode::assign("priority", json!("high")))
    }

    #[tokio::test]
    async fn compiles_conditions_and_actions() {
        let derived = TextRuleCompiler::new()
            .regenerate_derived(&sample_rule())
            .await
            .unwrap();

        assert!(derived.text.contains("rule \"big order\""));
        assert!(derived.text.contains("when total > 100"));
        assert!(derived.text.contains("then priority = \"high\""));
    }

    #[tokio::test]
    async fn compilation_is_deterministic() {
        let rule = sample_rule();
        let compiler = TextRuleCompiler::new();
        let a = compiler.regenerate_derived(&rule).await.unwrap();
        let b = compiler.regenerate_derived(&rule).await.unwrap();
        assert_eq!(a.text, b.text);
    }

    #[tokio::test]
    async fn empty_rule_fails_to_compile() {
        let mut rule = sample_rule();
        rule.conditions.clear();
        rule.actions.clear();
        let result = TextRuleCompiler::new().regenerate_derived(&rule).await;
        assert!(result.is_err());
    }
}

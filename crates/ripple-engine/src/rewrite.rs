//! Pure rule rewriting
//!
//! Applies a single rewrite instruction to a rule's logic trees. No I/O;
//! the executor persists the result. Every rewrite either produces a rule
//! that is valid against the post-change schema, or refuses with
//! `UnsafeRewrite` — there is no silent coercion and no implicit rule
//! deletion.

use crate::error::RuleOpError;
use ripple_model::{
    ActionExpr, ActionNode, AttributeType, ChangeKind, CompareOp, ConditionNode, Rule,
};
use serde_json::Value;

/// Concrete per-rule rewrite instruction
///
/// Carries the identity captured at planning time so the final schema
/// commit can detect concurrent drift.
#[derive(Debug, Clone, PartialEq)]
pub enum RewriteInstruction {
    /// Replace the attribute identifier everywhere it is referenced
    Rename { old_name: String, new_name: String },
    /// Re-validate literals against the new declared type
    Retype {
        name: String,
        old_type: AttributeType,
        new_type: AttributeType,
    },
    /// Remove every referencing clause, pruning emptied groups
    Delete { name: String },
}

impl RewriteInstruction {
    /// Build the instruction for a change against the given attribute type
    #[must_use]
    pub fn for_change(change: &ChangeKind, name: &str, current_type: AttributeType) -> Self {
        match change {
            ChangeKind::Rename { new_name } => Self::Rename {
                old_name: name.to_string(),
                new_name: new_name.clone(),
            },
            ChangeKind::Retype { new_type } => Self::Retype {
                name: name.to_string(),
                old_type: current_type,
                new_type: *new_type,
            },
            ChangeKind::Delete => Self::Delete {
                name: name.to_string(),
            },
        }
    }
}

/// Apply the instruction to the rule, returning the rewritten rule
///
/// # Errors
/// - `RuleOpError::UnsafeRewrite` when the rewrite would change semantics:
///   a literal that is not representable in the new type, or a delete that
///   would leave the rule's conditions or actions empty
pub fn apply_instruction(rule: &Rule, instruction: &RewriteInstruction) -> Result<Rule, RuleOpError> {
    match instruction {
        RewriteInstruction::Rename { old_name, new_name } => {
            Ok(rename_in_rule(rule, old_name, new_name))
        }
        RewriteInstruction::Retype { name, new_type, .. } => {
            validate_retype(rule, name, *new_type)?;
            // The declared type lives in the schema; the logic trees are
            // unchanged once every literal is known to be representable.
            Ok(rule.clone())
        }
        RewriteInstruction::Delete { name } => delete_in_rule(rule, name),
    }
}

fn rename_in_rule(rule: &Rule, old_name: &str, new_name: &str) -> Rule {
    let mut rewritten = rule.clone();
    for node in &mut rewritten.conditions {
        rename_condition(node, old_name, new_name);
    }
    for node in &mut rewritten.actions {
        rename_action(node, old_name, new_name);
    }
    rewritten
}

fn rename_condition(node: &mut ConditionNode, old_name: &str, new_name: &str) {
    match node {
        ConditionNode::Compare { attribute, .. } => {
            if attribute.root() == old_name {
                attribute.rename_root(new_name);
            }
        }
        ConditionNode::Group { children, .. } => {
            for child in children {
                rename_condition(child, old_name, new_name);
            }
        }
    }
}

fn rename_action(node: &mut ActionNode, old_name: &str, new_name: &str) {
    match node {
        ActionNode::Assign { target, expr } => {
            if target.root() == old_name {
                target.rename_root(new_name);
            }
            if let ActionExpr::Attribute { path } = expr {
                if path.root() == old_name {
                    path.rename_root(new_name);
                }
            }
        }
        ActionNode::Group { children, .. } => {
            for child in children {
                rename_action(child, old_name, new_name);
            }
        }
    }
}

fn validate_retype(rule: &Rule, name: &str, new_type: AttributeType) -> Result<(), RuleOpError> {
    for node in &rule.conditions {
        validate_retype_condition(node, name, new_type)?;
    }
    for node in &rule.actions {
        validate_retype_action(node, name, new_type)?;
    }
    Ok(())
}

fn validate_retype_condition(
    node: &ConditionNode,
    name: &str,
    new_type: AttributeType,
) -> Result<(), RuleOpError> {
    match node {
        ConditionNode::Compare {
            attribute,
            op,
            value,
        } => {
            if attribute.root() != name {
                return Ok(());
            }
            if literal_fits(*op, value, new_type) {
                Ok(())
            } else {
                Err(RuleOpError::UnsafeRewrite(format!(
                    "literal in `{}` is not representable as {new_type}",
                    node.render()
                )))
            }
        }
        ConditionNode::Group { children, .. } => {
            for child in children {
                validate_retype_condition(child, name, new_type)?;
            }
            Ok(())
        }
    }
}

fn validate_retype_action(
    node: &ActionNode,
    name: &str,
    new_type: AttributeType,
) -> Result<(), RuleOpError> {
    match node {
        ActionNode::Assign { target, expr } => {
            // Only literal assignments into the retyped attribute can
            // become unrepresentable; attribute-valued reads carry no
            // literal to re-check here.
            if target.root() == name {
                if let ActionExpr::Literal { value } = expr {
                    if !new_type.accepts(value) {
                        return Err(RuleOpError::UnsafeRewrite(format!(
                            "literal in `{}` is not representable as {new_type}",
                            node.render()
                        )));
                    }
                }
            }
            Ok(())
        }
        ActionNode::Group { children, .. } => {
            for child in children {
                validate_retype_action(child, name, new_type)?;
            }
            Ok(())
        }
    }
}

/// Membership literals are element-wise; everything else compares whole
/// values against the new type.
fn literal_fits(op: CompareOp, value: &Value, new_type: AttributeType) -> bool {
    match op {
        CompareOp::In => match value {
            Value::Array(candidates) => candidates.iter().all(|v| new_type.accepts(v)),
            other => new_type.accepts(other),
        },
        _ => new_type.accepts(value),
    }
}

fn delete_in_rule(rule: &Rule, name: &str) -> Result<Rule, RuleOpError> {
    let mut rewritten = rule.clone();

    let had_conditions = !rewritten.conditions.is_empty();
    rewritten.conditions = rewritten
        .conditions
        .into_iter()
        .filter_map(|node| prune_condition(node, name))
        .collect();
    if had_conditions && rewritten.conditions.is_empty() {
        return Err(RuleOpError::UnsafeRewrite(format!(
            "deleting `{name}` would leave rule `{}` with no conditions",
            rule.name
        )));
    }

    let had_actions = !rewritten.actions.is_empty();
    rewritten.actions = rewritten
        .actions
        .into_iter()
        .filter_map(|node| prune_action(node, name))
        .collect();
    if had_actions && rewritten.actions.is_empty() {
        return Err(RuleOpError::UnsafeRewrite(format!(
            "deleting `{name}` would leave rule `{}` with no actions",
            rule.name
        )));
    }

    Ok(rewritten)
}

fn prune_condition(node: ConditionNode, name: &str) -> Option<ConditionNode> {
    match node {
        ConditionNode::Compare { ref attribute, .. } => {
            if attribute.root() == name {
                None
            } else {
                Some(node)
            }
        }
        ConditionNode::Group { op, children } => {
            let kept: Vec<ConditionNode> = children
                .into_iter()
                .filter_map(|child| prune_condition(child, name))
                .collect();
            // An emptied group is removed rather than left dangling.
            if kept.is_empty() {
                None
            } else {
                Some(ConditionNode::Group { op, children: kept })
            }
        }
    }
}

fn prune_action(node: ActionNode, name: &str) -> Option<ActionNode> {
    match node {
        ActionNode::Assign {
            ref target,
            ref expr,
        } => {
            let reads = matches!(expr, ActionExpr::Attribute { path } if path.root() == name);
            if target.root() == name || reads {
                None
            } else {
                Some(node)
            }
        }
        ActionNode::Group { op, children } => {
            let kept: Vec<ActionNode> = children
                .into_iter()
                .filter_map(|child| prune_action(child, name))
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(ActionNode::Group { op, children: kept })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ripple_model::{LogicOp, ProjectId, SchemaId};
    use serde_json::json;

    fn rule() -> Rule {
        Rule::new("r", ProjectId::new(), SchemaId::new(), SchemaId::new())
    }

    fn rename(old: &str, new: &str) -> RewriteInstruction {
        RewriteInstruction::Rename {
            old_name: old.into(),
            new_name: new.into(),
        }
    }

    #[test]
    fn rename_rewrites_conditions_and_actions() {
        let original = rule()
            .with_condition(ConditionNode::compare("total", CompareOp::Gt, json!(100)))
            .with_action(ActionNode::assign_from("tier", "total"));

        let rewritten = apply_instruction(&original, &rename("total", "orderTotal")).unwrap();

        assert_eq!(rewritten.conditions[0].render(), "orderTotal > 100");
        assert_eq!(rewritten.actions[0].render(), "tier = orderTotal");
    }

    #[test]
    fn rename_preserves_structure_and_ignores_other_attributes() {
        let original = rule().with_condition(ConditionNode::group(
            LogicOp::Any,
            vec![
                ConditionNode::compare("total", CompareOp::Gt, json!(100)),
                ConditionNode::compare("totalWeight", CompareOp::Lt, json!(5)),
            ],
        ));

        let rewritten = apply_instruction(&original, &rename("total", "orderTotal")).unwrap();

        assert_eq!(
            rewritten.conditions[0].render(),
            "(orderTotal > 100 or totalWeight < 5)"
        );
    }

    #[test]
    fn retype_flags_unrepresentable_literal() {
        let original =
            rule().with_condition(ConditionNode::compare("quantity", CompareOp::Gt, json!(5)));

        let to_string = RewriteInstruction::Retype {
            name: "quantity".into(),
            old_type: AttributeType::Integer,
            new_type: AttributeType::String,
        };
        let result = apply_instruction(&original, &to_string);
        assert!(matches!(result, Err(RuleOpError::UnsafeRewrite(_))));
    }

    #[test]
    fn widening_retype_is_safe() {
        let original =
            rule().with_condition(ConditionNode::compare("quantity", CompareOp::Gt, json!(5)));

        let to_number = RewriteInstruction::Retype {
            name: "quantity".into(),
            old_type: AttributeType::Integer,
            new_type: AttributeType::Number,
        };
        let rewritten = apply_instruction(&original, &to_number).unwrap();
        assert_eq!(rewritten.conditions, original.conditions);
    }

    #[test]
    fn retype_checks_membership_literals_element_wise() {
        let original = rule().with_condition(ConditionNode::compare(
            "status",
            CompareOp::In,
            json!(["open", "held"]),
        ));

        let to_integer = RewriteInstruction::Retype {
            name: "status".into(),
            old_type: AttributeType::String,
            new_type: AttributeType::Integer,
        };
        assert!(matches!(
            apply_instruction(&original, &to_integer),
            Err(RuleOpError::UnsafeRewrite(_))
        ));
    }

    #[test]
    fn retype_only_checks_the_named_attribute() {
        let original = rule()
            .with_condition(ConditionNode::compare("status", CompareOp::Eq, json!("x")))
            .with_condition(ConditionNode::compare("quantity", CompareOp::Gt, json!(5)));

        let instruction = RewriteInstruction::Retype {
            name: "quantity".into(),
            old_type: AttributeType::Integer,
            new_type: AttributeType::Number,
        };
        assert!(apply_instruction(&original, &instruction).is_ok());
    }

    #[test]
    fn delete_removes_leaf_and_keeps_siblings() {
        let original = rule()
            .with_condition(ConditionNode::compare("status", CompareOp::Eq, json!("x")))
            .with_condition(ConditionNode::compare("total", CompareOp::Gt, json!(9)))
            .with_action(ActionNode::assign("out", json!(1)));

        let instruction = RewriteInstruction::Delete {
            name: "status".into(),
        };
        let rewritten = apply_instruction(&original, &instruction).unwrap();
        assert_eq!(rewritten.conditions.len(), 1);
        assert_eq!(rewritten.conditions[0].render(), "total > 9");
    }

    #[test]
    fn delete_prunes_emptied_groups_recursively() {
        let original = rule()
            .with_condition(ConditionNode::group(
                LogicOp::All,
                vec![ConditionNode::group(
                    LogicOp::Any,
                    vec![
                        ConditionNode::compare("status", CompareOp::Eq, json!("a")),
                        ConditionNode::compare("status", CompareOp::Eq, json!("b")),
                    ],
                )],
            ))
            .with_condition(ConditionNode::compare("total", CompareOp::Gt, json!(1)))
            .with_action(ActionNode::assign("out", json!(1)));

        let instruction = RewriteInstruction::Delete {
            name: "status".into(),
        };
        let rewritten = apply_instruction(&original, &instruction).unwrap();
        assert_eq!(rewritten.conditions.len(), 1);
        assert_eq!(rewritten.conditions[0].render(), "total > 1");
    }

    #[test]
    fn delete_refuses_to_empty_a_rule() {
        let original = rule()
            .with_condition(ConditionNode::compare("status", CompareOp::Eq, json!("x")))
            .with_action(ActionNode::assign("out", json!(1)));

        let instruction = RewriteInstruction::Delete {
            name: "status".into(),
        };
        let result = apply_instruction(&original, &instruction);
        assert!(matches!(result, Err(RuleOpError::UnsafeRewrite(_))));
    }

    #[test]
    fn delete_refuses_to_empty_actions_too() {
        let original = rule()
            .with_condition(ConditionNode::compare("total", CompareOp::Gt, json!(1)))
            .with_action(ActionNode::assign("status", json!("done")));

        let instruction = RewriteInstruction::Delete {
            name: "status".into(),
        };
        let result = apply_instruction(&original, &instruction);
        assert!(matches!(result, Err(RuleOpError::UnsafeRewrite(_))));
    }

    #[test]
    fn instruction_for_change_captures_identity() {
        let change = ChangeKind::Retype {
            new_type: AttributeType::String,
        };
        let instruction = RewriteInstruction::for_change(&change, "qty", AttributeType::Integer);
        assert_eq!(
            instruction,
            RewriteInstruction::Retype {
                name: "qty".into(),
                old_type: AttributeType::Integer,
                new_type: AttributeType::String,
            }
        );
    }
}

//! Attribute reference scanner
//!
//! Walks a rule's condition and action trees and extracts every reference
//! to a schema attribute. Pure function of its inputs: no I/O, bounded by
//! rule size (rule definitions are trees, cycles are rejected upstream).
//!
//! Matching is on the attribute path's root segment, exact only, so
//! `orderId` never matches a scan for `order`. Traversal is depth-first and
//! left-to-right over conditions then actions; output order is traversal
//! order and is relied on downstream as the rewrite application order.

use ripple_model::{
    ActionExpr, ActionNode, AttributeReference, ClausePath, ConditionNode, RefLocation, Rule,
    SchemaId,
};

/// Extract every reference to `attribute_name` inside the rule
///
/// Returns an empty list when the rule is not bound to `schema_id` (not an
/// error: the rule simply has nothing to say about that schema).
#[must_use]
pub fn scan(rule: &Rule, schema_id: SchemaId, attribute_name: &str) -> Vec<AttributeReference> {
    if !rule.is_bound_to(schema_id) {
        return Vec::new();
    }

    let mut refs = Vec::new();
    for (index, node) in rule.conditions.iter().enumerate() {
        scan_condition(rule, node, ClausePath::root(index), attribute_name, &mut refs);
    }
    for (index, node) in rule.actions.iter().enumerate() {
        scan_action(rule, node, ClausePath::root(index), attribute_name, &mut refs);
    }
    refs
}

fn scan_condition(
    rule: &Rule,
    node: &ConditionNode,
    path: ClausePath,
    attribute_name: &str,
    refs: &mut Vec<AttributeReference>,
) {
    match node {
        ConditionNode::Compare { attribute, .. } => {
            if attribute.root() == attribute_name {
                refs.push(AttributeReference {
                    rule_id: rule.id,
                    location: RefLocation::Condition,
                    path,
                    detail: node.render(),
                });
            }
        }
        ConditionNode::Group { children, .. } => {
            for (index, child) in children.iter().enumerate() {
                scan_condition(rule, child, path.child(index), attribute_name, refs);
            }
        }
    }
}

fn scan_action(
    rule: &Rule,
    node: &ActionNode,
    path: ClausePath,
    attribute_name: &str,
    refs: &mut Vec<AttributeReference>,
) {
    match node {
        ActionNode::Assign { target, expr } => {
            let reads_attribute = matches!(
                expr,
                ActionExpr::Attribute { path: source } if source.root() == attribute_name
            );
            if target.root() == attribute_name || reads_attribute {
                refs.push(AttributeReference {
                    rule_id: rule.id,
                    location: RefLocation::Action,
                    path,
                    detail: node.render(),
                });
            }
        }
        ActionNode::Group { children, .. } => {
            for (index, child) in children.iter().enumerate() {
                scan_action(rule, child, path.child(index), attribute_name, refs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use ripple_model::{CompareOp, LogicOp, ProjectId};
    use serde_json::json;

    fn bound_rule(schema_id: SchemaId) -> Rule {
        Rule::new("r", ProjectId::new(), schema_id, SchemaId::new())
    }

    #[test]
    fn unbound_schema_yields_empty() {
        let schema_id = SchemaId::new();
        let rule = bound_rule(schema_id)
            .with_condition(ConditionNode::compare("total", CompareOp::Gt, json!(100)));

        assert!(scan(&rule, SchemaId::new(), "total").is_empty());
    }

    #[test]
    fn exact_root_match_only() {
        let schema_id = SchemaId::new();
        let rule = bound_rule(schema_id)
            .with_condition(ConditionNode::compare("orderId", CompareOp::Eq, json!("x")))
            .with_condition(ConditionNode::compare("order", CompareOp::Ne, json!("y")));

        let refs = scan(&rule, schema_id, "order");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].detail, "order != \"y\"");
        assert_eq!(refs[0].path, ClausePath::root(1));
    }

    #[test]
    fn dotted_paths_match_on_root_segment() {
        let schema_id = SchemaId::new();
        let rule = bound_rule(schema_id).with_condition(ConditionNode::Compare {
            attribute: "customer.address.city".parse().unwrap(),
            op: CompareOp::Eq,
            value: json!("Oslo"),
        });

        assert_eq!(scan(&rule, schema_id, "customer").len(), 1);
        assert!(scan(&rule, schema_id, "address").is_empty());
    }

    #[test]
    fn nested_groups_are_traversed_depth_first() {
        let schema_id = SchemaId::new();
        let rule = bound_rule(schema_id)
            .with_condition(ConditionNode::group(
                LogicOp::Any,
                vec![
                    ConditionNode::compare("status", CompareOp::Eq, json!("open")),
                    ConditionNode::group(
                        LogicOp::All,
                        vec![ConditionNode::compare("status", CompareOp::Ne, json!("void"))],
                    ),
                ],
            ))
            .with_condition(ConditionNode::compare("status", CompareOp::Eq, json!("held")));

        let refs = scan(&rule, schema_id, "status");
        let paths: Vec<String> = refs.iter().map(|r| r.path.to_string()).collect();
        assert_eq!(paths, vec!["0.0", "0.1.0", "1"]);
        assert!(refs.iter().all(|r| r.location == RefLocation::Condition));
    }

    #[test]
    fn actions_match_targets_and_attribute_reads() {
        let schema_id = SchemaId::new();
        let rule = bound_rule(schema_id)
            .with_action(ActionNode::assign("discount", json!(0.1)))
            .with_action(ActionNode::assign_from("tier", "total"));

        let as_target = scan(&rule, schema_id, "discount");
        assert_eq!(as_target.len(), 1);
        assert_eq!(as_target[0].location, RefLocation::Action);

        let as_read = scan(&rule, schema_id, "total");
        assert_eq!(as_read.len(), 1);
        assert_eq!(as_read[0].detail, "tier = total");
    }

    #[test]
    fn conditions_come_before_actions_in_scan_order() {
        let schema_id = SchemaId::new();
        let rule = bound_rule(schema_id)
            .with_condition(ConditionNode::compare("total", CompareOp::Gt, json!(100)))
            .with_action(ActionNode::assign_from("copy", "total"));

        let refs = scan(&rule, schema_id, "total");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].location, RefLocation::Condition);
        assert_eq!(refs[1].location, RefLocation::Action);
    }

    fn arb_condition() -> impl Strategy<Value = ConditionNode> {
        let leaf = (
            prop_oneof!["total", "status", "quantity", "orderId"],
            prop_oneof![
                Just(CompareOp::Eq),
                Just(CompareOp::Gt),
                Just(CompareOp::Lt)
            ],
            any::<i64>(),
        )
            .prop_map(|(name, op, value)| ConditionNode::compare(name, op, json!(value)));

        leaf.prop_recursive(3, 24, 4, |inner| {
            (
                prop_oneof![Just(LogicOp::All), Just(LogicOp::Any)],
                prop::collection::vec(inner, 1..4),
            )
                .prop_map(|(op, children)| ConditionNode::group(op, children))
        })
    }

    proptest! {
        // An attribute that appears nowhere in the rule is never reported.
        #[test]
        fn absent_attribute_scans_empty(conditions in prop::collection::vec(arb_condition(), 0..4)) {
            let schema_id = SchemaId::new();
            let mut rule = bound_rule(schema_id);
            rule.conditions = conditions;

            prop_assert!(scan(&rule, schema_id, "ghost").is_empty());
        }
    }
}

//! Attribute references
//!
//! Analysis artifacts produced by scanning a rule for uses of a schema
//! attribute. References live for the duration of one impact-analysis or
//! propagation request and are never persisted.

use crate::rule::RuleId;
use serde::{Deserialize, Serialize};

/// Which side of the rule a reference was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefLocation {
    /// Found in the condition tree
    Condition,
    /// Found in the action tree
    Action,
}

impl std::fmt::Display for RefLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Condition => write!(f, "condition"),
            Self::Action => write!(f, "action"),
        }
    }
}

/// Child-index path from a tree's root list down to a clause
///
/// The first index selects among the rule's root nodes; each further index
/// selects a child within a group. Paths follow the scanner's depth-first,
/// left-to-right traversal, so sorting by path reproduces scan order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClausePath(pub Vec<usize>);

impl ClausePath {
    /// Path to a root node
    #[inline]
    #[must_use]
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    /// Extend with a child index
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

impl std::fmt::Display for ClausePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// One use of a schema attribute inside a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeReference {
    /// Rule the reference was found in
    pub rule_id: RuleId,
    /// Condition or action side
    pub location: RefLocation,
    /// Path to the referencing clause
    pub path: ClausePath,
    /// Human-readable clause rendering (e.g. `orderTotal > 100`)
    pub detail: String,
}

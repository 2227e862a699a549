//! Rules and their logic trees
//!
//! A rule is bound to input and output schemas and carries a logical
//! definition: conditions over input attributes and actions over output
//! attributes. Both sides are tagged recursive trees (leaf or group), so
//! traversal and rewriting are exhaustive pattern matches.
//!
//! The derived representation is a compiled cache of the logical
//! definition. It is regenerated whenever the logic changes and is never a
//! second source of truth.

use crate::schema::{ProjectId, SchemaId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique rule identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub Uuid);

impl RuleId {
    /// Generate new rule ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dotted attribute path (e.g. `customer.address.city`)
///
/// The root segment names a schema attribute; deeper segments navigate into
/// object-typed attributes. Reference matching is on the root segment only,
/// and only as an exact match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct AttributePath {
    segments: Vec<String>,
}

impl AttributePath {
    /// Build a path from segments
    ///
    /// Empty segment lists are not constructible through the public API;
    /// parsing rejects them.
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        debug_assert!(!segments.is_empty(), "attribute path must have a root");
        Self { segments }
    }

    /// Single-segment path naming a schema attribute directly
    #[must_use]
    pub fn root_only(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// The root segment (the schema attribute name)
    #[inline]
    #[must_use]
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// All segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Replace the root segment, preserving the rest of the path
    pub fn rename_root(&mut self, new_root: impl Into<String>) {
        self.segments[0] = new_root.into();
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl std::str::FromStr for AttributePath {
    type Err = EmptyAttributePath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.split('.').any(str::is_empty) {
            return Err(EmptyAttributePath);
        }
        Ok(Self {
            segments: s.split('.').map(str::to_string).collect(),
        })
    }
}

// Deserialization goes through TryFrom so the non-empty invariant also
// holds for rules loaded from serialized form.
impl TryFrom<Vec<String>> for AttributePath {
    type Error = EmptyAttributePath;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(EmptyAttributePath);
        }
        Ok(Self { segments })
    }
}

impl From<AttributePath> for Vec<String> {
    fn from(path: AttributePath) -> Self {
        path.segments
    }
}

/// Attribute path with no root segment
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("attribute path must be non-empty dotted segments")]
pub struct EmptyAttributePath;

/// Comparison operator in a condition leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    In,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Contains => "contains",
            Self::In => "in",
        };
        write!(f, "{s}")
    }
}

/// Logical combinator for group nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicOp {
    /// All children must hold (AND)
    All,
    /// Any child suffices (OR)
    Any,
}

impl std::fmt::Display for LogicOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "and"),
            Self::Any => write!(f, "or"),
        }
    }
}

/// A node in the condition tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionNode {
    /// Leaf comparison of an input attribute against a literal
    Compare {
        attribute: AttributePath,
        op: CompareOp,
        value: Value,
    },
    /// Nested AND/OR group
    Group {
        op: LogicOp,
        children: Vec<ConditionNode>,
    },
}

impl ConditionNode {
    /// Leaf comparison shorthand
    #[must_use]
    pub fn compare(attribute: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self::Compare {
            attribute: AttributePath::root_only(attribute),
            op,
            value,
        }
    }

    /// Group shorthand
    #[must_use]
    pub fn group(op: LogicOp, children: Vec<ConditionNode>) -> Self {
        Self::Group { op, children }
    }

    /// Human-readable rendering of this clause (e.g. `orderTotal > 100`)
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Compare {
                attribute,
                op,
                value,
            } => format!("{attribute} {op} {value}"),
            Self::Group { op, children } => {
                let parts: Vec<String> = children.iter().map(ConditionNode::render).collect();
                format!("({})", parts.join(&format!(" {op} ")))
            }
        }
    }
}

/// Right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionExpr {
    /// Literal value
    Literal { value: Value },
    /// Copy/derive from an input attribute
    Attribute { path: AttributePath },
}

impl std::fmt::Display for ActionExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal { value } => write!(f, "{value}"),
            Self::Attribute { path } => write!(f, "{path}"),
        }
    }
}

/// A node in the action tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionNode {
    /// Leaf assignment to an output attribute
    Assign {
        target: AttributePath,
        expr: ActionExpr,
    },
    /// Nested group of assignments
    Group {
        op: LogicOp,
        children: Vec<ActionNode>,
    },
}

impl ActionNode {
    /// Literal assignment shorthand
    #[must_use]
    pub fn assign(target: impl Into<String>, value: Value) -> Self {
        Self::Assign {
            target: AttributePath::root_only(target),
            expr: ActionExpr::Literal { value },
        }
    }

    /// Attribute-copy assignment shorthand
    #[must_use]
    pub fn assign_from(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self::Assign {
            target: AttributePath::root_only(target),
            expr: ActionExpr::Attribute {
                path: AttributePath::root_only(source),
            },
        }
    }

    /// Human-readable rendering of this clause (e.g. `discount = 0.1`)
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Assign { target, expr } => format!("{target} = {expr}"),
            Self::Group { op, children } => {
                let parts: Vec<String> = children.iter().map(ActionNode::render).collect();
                format!("({})", parts.join(&format!(" {op} ")))
            }
        }
    }
}

/// Compiled executable form of a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRepresentation {
    /// Executable rule text
    pub text: String,
    /// When it was compiled
    pub compiled_at: DateTime<Utc>,
}

/// A business rule bound to input/output schemas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier
    pub id: RuleId,
    /// Rule name
    pub name: String,
    /// Owning project
    pub project_id: ProjectId,
    /// Owning project's display name
    pub project_name: String,
    /// Optional source template
    pub template_id: Option<Uuid>,
    /// Schemas whose attributes conditions read
    pub input_schemas: Vec<SchemaId>,
    /// Schemas whose attributes actions write
    pub output_schemas: Vec<SchemaId>,
    /// Condition tree roots
    pub conditions: Vec<ConditionNode>,
    /// Action tree roots
    pub actions: Vec<ActionNode>,
    /// Compiled cache of the logic, if compiled
    pub derived: Option<DerivedRepresentation>,
    /// Optimistic concurrency token, bumped on every persist
    pub revision: u64,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// Create an empty rule bound to one input and one output schema
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        project_id: ProjectId,
        input_schema: SchemaId,
        output_schema: SchemaId,
    ) -> Self {
        Self {
            id: RuleId::new(),
            name: name.into(),
            project_id,
            project_name: String::new(),
            template_id: None,
            input_schemas: vec![input_schema],
            output_schemas: vec![output_schema],
            conditions: Vec::new(),
            actions: Vec::new(),
            derived: None,
            revision: 0,
            updated_at: Utc::now(),
        }
    }

    /// Whether the rule reads or writes the given schema
    #[inline]
    #[must_use]
    pub fn is_bound_to(&self, schema_id: SchemaId) -> bool {
        self.input_schemas.contains(&schema_id) || self.output_schemas.contains(&schema_id)
    }

    /// Add a condition root
    #[must_use]
    pub fn with_condition(mut self, condition: ConditionNode) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add an action root
    #[must_use]
    pub fn with_action(mut self, action: ActionNode) -> Self {
        self.actions.push(action);
        self
    }
}

//! Schemas and their attributes
//!
//! A schema is a named, versioned record type made of attributes. The
//! attribute store owns attribute identity; everything here is plain data.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique schema identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaId(pub Uuid);

impl SchemaId {
    /// Generate new schema ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SchemaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique project identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    /// Generate new project ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value kind an attribute declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl AttributeType {
    /// All known attribute types
    pub const ALL: [AttributeType; 6] = [
        Self::String,
        Self::Number,
        Self::Integer,
        Self::Boolean,
        Self::Array,
        Self::Object,
    ];

    /// Whether a JSON literal is representable under this type
    ///
    /// Used when retyping an attribute: a comparison literal that cannot be
    /// reinterpreted in the new type makes the rewrite unsafe.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AttributeType {
    type Err = UnknownAttributeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            other => Err(UnknownAttributeType(other.to_string())),
        }
    }
}

/// Unknown attribute type name
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown attribute type: {0}")]
pub struct UnknownAttributeType(pub String);

/// A named, typed field within a schema
///
/// `name` is unique within its schema and stable until renamed. A rename is
/// a single identity-preserving mutation, never a delete+create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaAttribute {
    /// Attribute name, unique within the schema
    pub name: String,
    /// Declared value kind
    #[serde(rename = "type")]
    pub ty: AttributeType,
    /// Optional format hint (e.g. "date-time")
    pub format: Option<String>,
    /// Human-readable description
    pub description: Option<String>,
    /// Whether the attribute must be present
    pub required: bool,
    /// Allowed values, when enumerated
    pub enum_values: Option<Vec<Value>>,
    /// Default value, when declared
    pub default_value: Option<Value>,
    /// Additional constraints (min/max/pattern/...)
    pub constraints: BTreeMap<String, Value>,
}

impl SchemaAttribute {
    /// Create a minimal attribute of the given type
    #[must_use]
    pub fn new(name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            name: name.into(),
            ty,
            format: None,
            description: None,
            required: false,
            enum_values: None,
            default_value: None,
            constraints: BTreeMap::new(),
        }
    }

    /// Mark as required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With default value
    #[inline]
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Provenance of a schema definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaSource {
    /// Authored by hand
    Manual,
    /// Imported from an OpenAPI document
    OpenApi,
    /// Imported from a JSON Schema document
    JsonSchema,
    /// Inferred from example documents
    Example,
}

/// A named, versioned collection of attributes
///
/// Attribute order is authoring order; `attributes` is keyed by attribute
/// name so uniqueness is structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema identifier
    pub id: SchemaId,
    /// Schema name
    pub name: String,
    /// Monotonic schema version
    pub version: u32,
    /// Owning project, if project-scoped
    pub project_id: Option<ProjectId>,
    /// Optional grouping label
    pub group: Option<String>,
    /// Where the definition came from
    pub source: SchemaSource,
    /// Attributes keyed by name, in authoring order
    pub attributes: IndexMap<String, SchemaAttribute>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Schema {
    /// Create an empty manual schema
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SchemaId::new(),
            name: name.into(),
            version: 1,
            project_id: None,
            group: None,
            source: SchemaSource::Manual,
            attributes: IndexMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Add an attribute, consuming and returning the schema
    ///
    /// Replaces any existing attribute with the same name.
    #[must_use]
    pub fn with_attribute(mut self, attribute: SchemaAttribute) -> Self {
        self.attributes.insert(attribute.name.clone(), attribute);
        self
    }

    /// Look up an attribute by name
    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.get(name)
    }

    /// Bump the version and modification time
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

//! Schema metadata consulted while resolving attribute paths.
//!
//! The compiler only needs two questions answered: "which entity does this
//! selector name" and "what is the type of attribute `x` of entity `E`". Any
//! metadata source can answer them by implementing [`SchemaResolver`];
//! [`StaticSchema`] is an in-memory implementation that can also be loaded
//! from JSON:
//!
//! ```
//! use mql_lang::schema::{SchemaResolver, StaticSchema, ValueType};
//!
//! let schema = StaticSchema::from_json(r#"{
//!     "entities": {
//!         "Employee": {"attributes": {"name": "string", "department": {"entity": "Department"}}},
//!         "Department": {"attributes": {"title": "string"}}
//!     }
//! }"#).unwrap();
//!
//! let employee = schema.resolve_entity("Employee").unwrap();
//! let department = schema.resolve_attribute(&employee, "department").unwrap();
//! assert_eq!(department.target_entity(), Some("Department"));
//! assert_eq!(department.value_type, ValueType::Entity("Department".into()));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MqlError;

/// Declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Integer,
    Float,
    Decimal,
    String,
    Char,
    /// Relation to another entity; paths may continue through it
    Entity(String),
}

impl ValueType {
    pub fn name(&self) -> &str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Decimal => "decimal",
            ValueType::String => "string",
            ValueType::Char => "char",
            ValueType::Entity(name) => name,
        }
    }
}

/// An entity as known to the schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityType {
    /// Name used in emitted query text
    pub name: String,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        EntityType { name: name.into() }
    }
}

/// An attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    pub name: String,
    pub value_type: ValueType,
}

impl AttributeType {
    /// Entity a relational attribute points to.
    pub fn target_entity(&self) -> Option<&str> {
        match &self.value_type {
            ValueType::Entity(name) => Some(name),
            _ => None,
        }
    }
}

/// Answers entity and attribute lookups for the compiler.
///
/// Unknown names are reported as [`MqlError::Syntax`]: they come from the
/// filter text.
pub trait SchemaResolver {
    fn resolve_entity(&self, selector: &str) -> Result<EntityType, MqlError>;

    fn resolve_attribute(&self, entity: &EntityType, name: &str) -> Result<AttributeType, MqlError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EntityDef {
    #[serde(default)]
    attributes: BTreeMap<String, ValueType>,
}

/// In-memory schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticSchema {
    #[serde(default)]
    entities: BTreeMap<String, EntityDef>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an entity with the given attributes.
    pub fn with_entity<I, S>(mut self, name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (S, ValueType)>,
        S: Into<String>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(n, t)| (n.into(), t))
            .collect();
        self.entities.insert(name.into(), EntityDef { attributes });
        self
    }

    /// Loads a schema from its JSON description.
    pub fn from_json(text: &str) -> Result<Self, MqlError> {
        serde_json::from_str(text)
            .map_err(|e| MqlError::configuration(format!("Invalid schema: {}", e)))
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

impl SchemaResolver for StaticSchema {
    fn resolve_entity(&self, selector: &str) -> Result<EntityType, MqlError> {
        if self.entities.contains_key(selector) {
            Ok(EntityType::new(selector))
        } else {
            Err(MqlError::syntax(format!("Entity type {} is not found", selector)))
        }
    }

    fn resolve_attribute(&self, entity: &EntityType, name: &str) -> Result<AttributeType, MqlError> {
        let def = self
            .entities
            .get(&entity.name)
            .ok_or_else(|| MqlError::syntax(format!("Entity type {} is not found", entity.name)))?;

        def.attributes
            .get(name)
            .map(|value_type| AttributeType {
                name: name.to_string(),
                value_type: value_type.clone(),
            })
            .ok_or_else(|| {
                MqlError::syntax(format!(
                    "Entity type {} has no attribute {}",
                    entity.name, name
                ))
            })
    }
}

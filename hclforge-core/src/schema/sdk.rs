//! SDK schema representation
//!
//! A resource is a map of attribute name to [`Schema`]. Lists and sets carry
//! their element description in `elem`: either a nested [`Resource`]
//! (a repeated block) or a scalar [`Schema`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{DEPENDS_ON, ExtractionError, FieldExtractor, TimeoutsConfig};
use crate::field::{Field, FieldKind, Presence, sort_by_name};

const REPRESENTATION: &str = "sdk";

/// Attribute value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Invalid,
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
    Set,
}

/// Element type of a list, set or map attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Elem {
    Resource(Box<Resource>),
    Schema(Box<Schema>),
}

/// Schema for one attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elem: Option<Elem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Schema {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            max_items: None,
            elem: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Element is a nested block
    pub fn with_block(mut self, resource: Resource) -> Self {
        self.elem = Some(Elem::Resource(Box::new(resource)));
        self
    }

    /// Element is a scalar
    pub fn with_elem(mut self, schema: Schema) -> Self {
        self.elem = Some(Elem::Schema(Box::new(schema)));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Timeout defaults declared by a resource, e.g. `"20m"`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTimeout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

/// A resource (or nested block) schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub schema: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<ResourceTimeout>,
}

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.schema.insert(name.into(), schema);
        self
    }

    pub fn with_timeouts(mut self, timeouts: ResourceTimeout) -> Self {
        self.timeouts = Some(timeouts);
        self
    }
}

impl FieldExtractor for Resource {
    fn extract_fields(&self) -> Result<Vec<Field>, ExtractionError> {
        let fields = extract_schema_map(&self.schema)?;
        if fields.is_empty() {
            return Err(ExtractionError::Empty {
                representation: REPRESENTATION,
            });
        }
        Ok(fields)
    }

    fn timeouts(&self) -> TimeoutsConfig {
        match &self.timeouts {
            Some(t) => TimeoutsConfig {
                create: t.create.is_some(),
                read: t.read.is_some(),
                update: t.update.is_some(),
                delete: t.delete.is_some(),
            },
            None => TimeoutsConfig::default(),
        }
    }

    fn has_depends_on(&self) -> bool {
        self.schema.contains_key(DEPENDS_ON)
    }
}

fn extract_schema_map(schema: &BTreeMap<String, Schema>) -> Result<Vec<Field>, ExtractionError> {
    let mut fields = Vec::new();
    for (name, attr) in schema {
        if Presence::from_flags(attr.required, attr.optional, attr.computed) == Presence::Omitted {
            continue;
        }
        if let Some(field) = extract_attribute(name, attr)? {
            fields.push(field.with_flags(attr.required, attr.optional, attr.computed));
        }
    }
    Ok(sort_by_name(fields))
}

fn extract_attribute(name: &str, attr: &Schema) -> Result<Option<Field>, ExtractionError> {
    let field = match attr.value_type {
        ValueType::Bool => Field::new(name, FieldKind::Bool),
        ValueType::Int | ValueType::Float => Field::new(name, FieldKind::Number),
        ValueType::String => Field::new(name, FieldKind::String),
        ValueType::Map => Field::new(name, FieldKind::Map),
        ValueType::List | ValueType::Set => {
            let is_set = attr.value_type == ValueType::Set;
            match &attr.elem {
                Some(Elem::Resource(block)) => {
                    let nested = extract_schema_map(&block.schema)?;
                    match Field::object(name, nested) {
                        Some(field) => field.collection(is_set),
                        None => {
                            log::debug!("Skipping block '{}' without settable attributes", name);
                            return Ok(None);
                        }
                    }
                }
                Some(Elem::Schema(_)) | None => {
                    Field::new(name, FieldKind::Collection).collection(is_set)
                }
            }
        }
        ValueType::Invalid => {
            return Err(ExtractionError::UnsupportedAttribute {
                representation: REPRESENTATION,
                name: name.to_string(),
                type_name: "invalid".to_string(),
            });
        }
    };
    Ok(Some(field))
}

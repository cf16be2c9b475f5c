//! Framework schema representation
//!
//! Attributes are typed by variant (`string`, `list_nested`, ...) and carry
//! their own required/optional/computed flags. A `timeouts` single-nested
//! attribute declares which timeout operations are supported.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{DEPENDS_ON, ExtractionError, FieldExtractor, TimeoutsConfig};
use crate::field::{Field, FieldKind, Presence, sort_by_name};

const REPRESENTATION: &str = "framework";
const TIMEOUTS: &str = "timeouts";

/// Flags shared by every attribute variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flags {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Attribute holding nested attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedAttribute {
    #[serde(flatten)]
    pub flags: Flags,
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

/// A framework attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attribute {
    String(Flags),
    Bool(Flags),
    Int64(Flags),
    Float64(Flags),
    Number(Flags),
    Map(Flags),
    List(Flags),
    Set(Flags),
    ListNested(NestedAttribute),
    SetNested(NestedAttribute),
    SingleNested(NestedAttribute),
    /// Object typed attribute without nested attribute definitions
    Object(Flags),
    /// Dynamically typed attribute
    Dynamic(Flags),
}

/// Field shape an attribute variant maps to
struct Shape<'a> {
    kind: FieldKind,
    is_collection: bool,
    is_set: bool,
    nested: Option<&'a BTreeMap<String, Attribute>>,
}

impl Attribute {
    pub fn string() -> Self {
        Attribute::String(Flags::default())
    }

    pub fn bool() -> Self {
        Attribute::Bool(Flags::default())
    }

    pub fn int64() -> Self {
        Attribute::Int64(Flags::default())
    }

    pub fn float64() -> Self {
        Attribute::Float64(Flags::default())
    }

    pub fn map() -> Self {
        Attribute::Map(Flags::default())
    }

    pub fn list() -> Self {
        Attribute::List(Flags::default())
    }

    pub fn set() -> Self {
        Attribute::Set(Flags::default())
    }

    pub fn list_nested<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        Attribute::ListNested(nested(attributes))
    }

    pub fn set_nested<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        Attribute::SetNested(nested(attributes))
    }

    pub fn single_nested<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        Attribute::SingleNested(nested(attributes))
    }

    pub fn required(mut self) -> Self {
        self.flags_mut().required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.flags_mut().optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.flags_mut().computed = true;
        self
    }

    pub fn flags(&self) -> &Flags {
        match self {
            Attribute::String(f)
            | Attribute::Bool(f)
            | Attribute::Int64(f)
            | Attribute::Float64(f)
            | Attribute::Number(f)
            | Attribute::Map(f)
            | Attribute::List(f)
            | Attribute::Set(f)
            | Attribute::Object(f)
            | Attribute::Dynamic(f) => f,
            Attribute::ListNested(n) | Attribute::SetNested(n) | Attribute::SingleNested(n) => {
                &n.flags
            }
        }
    }

    fn flags_mut(&mut self) -> &mut Flags {
        match self {
            Attribute::String(f)
            | Attribute::Bool(f)
            | Attribute::Int64(f)
            | Attribute::Float64(f)
            | Attribute::Number(f)
            | Attribute::Map(f)
            | Attribute::List(f)
            | Attribute::Set(f)
            | Attribute::Object(f)
            | Attribute::Dynamic(f) => f,
            Attribute::ListNested(n) | Attribute::SetNested(n) | Attribute::SingleNested(n) => {
                &mut n.flags
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Attribute::String(_) => "string",
            Attribute::Bool(_) => "bool",
            Attribute::Int64(_) => "int64",
            Attribute::Float64(_) => "float64",
            Attribute::Number(_) => "number",
            Attribute::Map(_) => "map",
            Attribute::List(_) => "list",
            Attribute::Set(_) => "set",
            Attribute::ListNested(_) => "list_nested",
            Attribute::SetNested(_) => "set_nested",
            Attribute::SingleNested(_) => "single_nested",
            Attribute::Object(_) => "object",
            Attribute::Dynamic(_) => "dynamic",
        }
    }

    /// Mapping from attribute variant to field shape
    fn shape(&self) -> Option<Shape<'_>> {
        let scalar = |kind| Shape {
            kind,
            is_collection: false,
            is_set: false,
            nested: None,
        };
        let shape = match self {
            Attribute::String(_) => scalar(FieldKind::String),
            Attribute::Bool(_) => scalar(FieldKind::Bool),
            Attribute::Int64(_) | Attribute::Float64(_) | Attribute::Number(_) => {
                scalar(FieldKind::Number)
            }
            Attribute::Map(_) => scalar(FieldKind::Map),
            Attribute::List(_) => Shape {
                is_collection: true,
                ..scalar(FieldKind::Collection)
            },
            Attribute::Set(_) => Shape {
                is_collection: true,
                is_set: true,
                ..scalar(FieldKind::Collection)
            },
            Attribute::ListNested(n) => Shape {
                kind: FieldKind::Object,
                is_collection: true,
                is_set: false,
                nested: Some(&n.attributes),
            },
            Attribute::SetNested(n) => Shape {
                kind: FieldKind::Object,
                is_collection: true,
                is_set: true,
                nested: Some(&n.attributes),
            },
            Attribute::SingleNested(n) => Shape {
                kind: FieldKind::Object,
                is_collection: false,
                is_set: false,
                nested: Some(&n.attributes),
            },
            Attribute::Object(_) | Attribute::Dynamic(_) => return None,
        };
        Some(shape)
    }
}

fn nested<I, K>(attributes: I) -> NestedAttribute
where
    I: IntoIterator<Item = (K, Attribute)>,
    K: Into<String>,
{
    NestedAttribute {
        flags: Flags::default(),
        attributes: attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect(),
    }
}

/// A framework resource or data source schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }
}

impl FieldExtractor for Schema {
    fn extract_fields(&self) -> Result<Vec<Field>, ExtractionError> {
        let attributes = self
            .attributes
            .iter()
            .filter(|(name, _)| name.as_str() != TIMEOUTS);
        let fields = extract_attributes(attributes)?;
        if fields.is_empty() {
            return Err(ExtractionError::Empty {
                representation: REPRESENTATION,
            });
        }
        Ok(fields)
    }

    fn timeouts(&self) -> TimeoutsConfig {
        let nested = match self.attributes.get(TIMEOUTS) {
            Some(Attribute::SingleNested(n) | Attribute::ListNested(n)) => &n.attributes,
            _ => return TimeoutsConfig::default(),
        };
        TimeoutsConfig {
            create: nested.contains_key("create"),
            read: nested.contains_key("read"),
            update: nested.contains_key("update"),
            delete: nested.contains_key("delete"),
        }
    }

    fn has_depends_on(&self) -> bool {
        self.attributes.contains_key(DEPENDS_ON)
    }
}

fn extract_attributes<'a>(
    attributes: impl Iterator<Item = (&'a String, &'a Attribute)>,
) -> Result<Vec<Field>, ExtractionError> {
    let mut fields = Vec::new();
    for (name, attribute) in attributes {
        let flags = attribute.flags();
        if Presence::from_flags(flags.required, flags.optional, flags.computed) == Presence::Omitted
        {
            continue;
        }

        let shape = attribute
            .shape()
            .ok_or_else(|| ExtractionError::UnsupportedAttribute {
                representation: REPRESENTATION,
                name: name.clone(),
                type_name: attribute.type_name().to_string(),
            })?;

        let field = match shape.nested {
            Some(nested) => {
                let nested_fields = extract_attributes(nested.iter())?;
                match Field::object(name.as_str(), nested_fields) {
                    Some(field) if shape.is_collection => field.collection(shape.is_set),
                    Some(field) => field,
                    None => {
                        log::debug!("Skipping nested attribute '{}' without settable attributes", name);
                        continue;
                    }
                }
            }
            None if shape.is_collection => {
                Field::new(name.as_str(), shape.kind).collection(shape.is_set)
            }
            None => Field::new(name.as_str(), shape.kind),
        };
        fields.push(field.with_flags(flags.required, flags.optional, flags.computed));
    }
    Ok(sort_by_name(fields))
}

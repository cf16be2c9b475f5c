//! Schema - Provider schema representations and field extraction
//!
//! Two unrelated schema representations are supported: the classic SDK
//! layout (`sdk`) and the attribute-typed framework layout (`framework`).
//! Both implement [`FieldExtractor`], so everything downstream only sees
//! [`Field`] values.

pub mod framework;
pub mod sdk;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::Field;

/// Name of the attribute carrying explicit dependencies
pub const DEPENDS_ON: &str = "depends_on";

/// Whether a schema describes a managed resource or a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Resource,
    #[serde(alias = "data")]
    DataSource,
}

impl ResourceKind {
    /// Block keyword in the generated configuration
    pub fn keyword(self) -> &'static str {
        match self {
            ResourceKind::Resource => "resource",
            ResourceKind::DataSource => "data",
        }
    }

    /// Registry key of a schema-derived template, e.g. `resource.aiven_pg`
    pub fn template_key(self, resource_type: &str) -> String {
        format!("{}.{}", self.keyword(), resource_type)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Resource => write!(f, "resource"),
            ResourceKind::DataSource => write!(f, "data source"),
        }
    }
}

/// Which timeout operations a schema supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutsConfig {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

impl TimeoutsConfig {
    pub fn any(&self) -> bool {
        self.create || self.read || self.update || self.delete
    }

    /// Supported operation names, in create/read/update/delete order
    pub fn operations(&self) -> Vec<&'static str> {
        [
            ("create", self.create),
            ("read", self.read),
            ("update", self.update),
            ("delete", self.delete),
        ]
        .into_iter()
        .filter_map(|(name, supported)| supported.then_some(name))
        .collect()
    }
}

/// Extraction error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no fields could be extracted from {representation} schema, schema may be empty")]
    Empty { representation: &'static str },

    #[error("unsupported attribute '{name}' of type {type_name} in {representation} schema")]
    UnsupportedAttribute {
        representation: &'static str,
        name: String,
        type_name: String,
    },

    #[error("invalid schema description: {0}")]
    Invalid(String),
}

/// Turns one schema representation into the unified field model
pub trait FieldExtractor {
    /// Fields sorted by name at every level, computed-only fields dropped
    fn extract_fields(&self) -> Result<Vec<Field>, ExtractionError>;

    /// Timeout operations the schema declares
    fn timeouts(&self) -> TimeoutsConfig {
        TimeoutsConfig::default()
    }

    /// Whether the schema accepts a `depends_on` list
    fn has_depends_on(&self) -> bool {
        false
    }
}

/// A schema in either supported representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "representation", rename_all = "snake_case")]
pub enum SchemaDescriptor {
    Sdk(sdk::Resource),
    Framework(framework::Schema),
}

impl SchemaDescriptor {
    /// Parse a JSON schema description
    pub fn from_json(json: &str) -> Result<Self, ExtractionError> {
        serde_json::from_str(json).map_err(|e| ExtractionError::Invalid(e.to_string()))
    }

    /// The extractor for this representation
    pub fn extractor(&self) -> &dyn FieldExtractor {
        match self {
            SchemaDescriptor::Sdk(resource) => resource,
            SchemaDescriptor::Framework(schema) => schema,
        }
    }
}

impl From<sdk::Resource> for SchemaDescriptor {
    fn from(resource: sdk::Resource) -> Self {
        SchemaDescriptor::Sdk(resource)
    }
}

impl From<framework::Schema> for SchemaDescriptor {
    fn from(schema: framework::Schema) -> Self {
        SchemaDescriptor::Framework(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_key() {
        assert_eq!(ResourceKind::Resource.template_key("aiven_pg"), "resource.aiven_pg");
        assert_eq!(ResourceKind::DataSource.template_key("aiven_pg"), "data.aiven_pg");
    }

    #[test]
    fn test_timeouts_operations() {
        let timeouts = TimeoutsConfig {
            create: true,
            delete: true,
            ..Default::default()
        };
        assert!(timeouts.any());
        assert_eq!(timeouts.operations(), vec!["create", "delete"]);
        assert!(!TimeoutsConfig::default().any());
    }

    #[test]
    fn test_descriptor_from_json_sdk() {
        let descriptor = SchemaDescriptor::from_json(
            r#"{
                "representation": "sdk",
                "schema": {
                    "project": {"type": "string", "required": true},
                    "id": {"type": "string", "computed": true}
                }
            }"#,
        )
        .unwrap();
        let fields = descriptor.extractor().extract_fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name(), "project");
        assert!(fields[0].is_required());
    }

    #[test]
    fn test_descriptor_from_json_framework() {
        let descriptor = SchemaDescriptor::from_json(
            r#"{
                "representation": "framework",
                "attributes": {
                    "name": {"type": "string", "required": true},
                    "timeouts": {
                        "type": "single_nested",
                        "optional": true,
                        "attributes": {
                            "create": {"type": "string", "optional": true}
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        let extractor = descriptor.extractor();
        assert_eq!(extractor.extract_fields().unwrap().len(), 1);
        assert!(extractor.timeouts().create);
        assert!(!extractor.timeouts().delete);
    }

    #[test]
    fn test_descriptor_from_json_unknown_representation() {
        let err = SchemaDescriptor::from_json(r#"{"representation": "openapi"}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::Invalid(_)));
    }
}

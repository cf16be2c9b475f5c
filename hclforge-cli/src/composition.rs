//! Composition files and schema directories read by the CLI

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use hclforge_core::builder::CompositionBuilder;
use hclforge_core::schema::SchemaDescriptor;
use hclforge_core::store::{SchemaSource, Store};
use hclforge_core::value::Config;

/// Prefix marking a descriptor file as a data source
const DATA_PREFIX: &str = "data.";

/// Schema descriptors loaded from `<type>.json` and `data.<type>.json` files
#[derive(Debug, Default)]
pub struct DirectorySource {
    resources: BTreeMap<String, SchemaDescriptor>,
    data_sources: BTreeMap<String, SchemaDescriptor>,
}

impl DirectorySource {
    pub fn load(dir: &Path) -> Result<Self, String> {
        let entries = fs::read_dir(dir)
            .map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut source = DirectorySource::default();
        for path in files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            let descriptor = SchemaDescriptor::from_json(&content)
                .map_err(|e| format!("{}: {}", path.display(), e))?;

            match stem.strip_prefix(DATA_PREFIX) {
                Some(resource_type) => {
                    source
                        .data_sources
                        .insert(resource_type.to_string(), descriptor);
                }
                None => {
                    source.resources.insert(stem.to_string(), descriptor);
                }
            }
        }

        log::debug!(
            "Loaded {} resource and {} data source schemas from {}",
            source.resources.len(),
            source.data_sources.len(),
            dir.display()
        );
        Ok(source)
    }
}

impl SchemaSource for DirectorySource {
    fn resources(&self) -> BTreeMap<String, SchemaDescriptor> {
        self.resources.clone()
    }

    fn data_sources(&self) -> BTreeMap<String, SchemaDescriptor> {
        self.data_sources.clone()
    }
}

/// A composition file: hand-written templates plus the entries to render
#[derive(Debug, Deserialize)]
pub struct CompositionFile {
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
    pub entries: Vec<EntryDef>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryDef {
    Resource {
        #[serde(rename = "type")]
        resource_type: String,
        #[serde(default)]
        config: serde_json::Map<String, serde_json::Value>,
    },
    Data {
        #[serde(rename = "type")]
        resource_type: String,
        #[serde(default)]
        config: serde_json::Map<String, serde_json::Value>,
    },
    Template {
        key: String,
        #[serde(default)]
        config: serde_json::Map<String, serde_json::Value>,
    },
}

impl CompositionFile {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    /// Register the file's templates in `store`
    pub fn register_templates(&self, store: &mut Store) -> Result<(), String> {
        for (name, source) in &self.templates {
            store
                .add_external_template(name, source)
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// Add every entry to `builder` in file order
    pub fn apply(self, builder: &mut CompositionBuilder) -> Result<(), String> {
        for entry in self.entries {
            match entry {
                EntryDef::Resource {
                    resource_type,
                    config,
                } => {
                    builder.add_resource(resource_type, to_config(config)?);
                }
                EntryDef::Data {
                    resource_type,
                    config,
                } => {
                    builder.add_data_source(resource_type, to_config(config)?);
                }
                EntryDef::Template { key, config } => {
                    builder.add_template(key, to_config(config)?);
                }
            }
        }
        Ok(())
    }
}

fn to_config(map: serde_json::Map<String, serde_json::Value>) -> Result<Config, String> {
    Config::try_from(serde_json::Value::Object(map)).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_directory_source_splits_data_sources() {
        let dir = tempdir().unwrap();
        let schema = r#"{"representation": "sdk", "schema": {"project": {"type": "string", "required": true}}}"#;
        fs::write(dir.path().join("aiven_project.json"), schema).unwrap();
        fs::write(dir.path().join("data.aiven_project.json"), schema).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = DirectorySource::load(dir.path()).unwrap();
        assert_eq!(
            source.resources().keys().collect::<Vec<_>>(),
            vec!["aiven_project"]
        );
        assert_eq!(
            source.data_sources().keys().collect::<Vec<_>>(),
            vec!["aiven_project"]
        );
    }

    #[test]
    fn test_directory_source_reports_bad_descriptor() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        let err = DirectorySource::load(dir.path()).unwrap_err();
        assert!(err.contains("broken.json"));
    }

    #[test]
    fn test_composition_file_entries() {
        let json = r#"{
            "templates": {"aiven_provider": "provider \"aiven\" {}"},
            "entries": [
                {"kind": "template", "key": "aiven_provider"},
                {"kind": "data", "type": "aiven_project", "config": {"resource_name": "p"}},
                {"kind": "resource", "type": "aiven_pg", "config": {"resource_name": "db"}}
            ]
        }"#;
        let file: CompositionFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.templates.len(), 1);
        assert!(matches!(&file.entries[0], EntryDef::Template { key, .. } if key == "aiven_provider"));
        assert!(
            matches!(&file.entries[1], EntryDef::Data { resource_type, .. } if resource_type == "aiven_project")
        );
        assert!(
            matches!(&file.entries[2], EntryDef::Resource { config, .. } if config.contains_key("resource_name"))
        );
    }
}

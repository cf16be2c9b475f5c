//! Builder - Ordered composition of rendered templates
//!
//! A [`CompositionBuilder`] holds `(template, configuration)` entries in
//! insertion order and renders them into one document. Builders are cheap
//! to clone; use [`CompositionBuilder::factory`] to hand every test step its
//! own copy of a shared base composition.

use std::fmt;
use std::sync::Arc;

use crate::normalizer;
use crate::registry::{Registry, RenderError};
use crate::schema::ResourceKind;
use crate::value::{Config, RESOURCE_NAME_KEY, Value};

/// Kind of a composition entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Resource,
    DataSource,
    /// Hand-authored template
    Other,
}

impl From<ResourceKind> for EntryKind {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Resource => EntryKind::Resource,
            ResourceKind::DataSource => EntryKind::DataSource,
        }
    }
}

/// One entry of a composition
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionEntry {
    pub template_key: String,
    pub resource_type: String,
    pub kind: EntryKind,
    pub config: Config,
}

impl CompositionEntry {
    pub fn resource_name(&self) -> Option<&str> {
        self.config.resource_name()
    }

    fn matches(&self, resource_type: &str, name: &str) -> bool {
        self.resource_type == resource_type && self.resource_name() == Some(name)
    }
}

/// Rendering failure of one entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFailure {
    pub template_key: String,
    pub resource_name: String,
    pub error: RenderError,
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            RenderError::NotFound { .. } => write!(
                f,
                "template {:?} not found, check that the resource type is correct",
                self.template_key
            ),
            RenderError::Execution { source, .. } if source.is_missing_required() => {
                let field = source
                    .action
                    .strip_prefix("required(")
                    .and_then(|s| s.strip_suffix(')'))
                    .unwrap_or(&source.action);
                write!(
                    f,
                    "missing required field {} for key {:?} of resource {:?}",
                    field, self.template_key, self.resource_name
                )
            }
            RenderError::Execution { source, .. } => write!(
                f,
                "failed to render key {:?} of resource {:?}: {}",
                self.template_key, self.resource_name, source
            ),
        }
    }
}

/// Composition error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComposeError {
    #[error("no templates added to composition")]
    Empty,

    #[error("configuration error(s):\n{}\n\n{dump}", join_failures(failures))]
    Render {
        failures: Vec<EntryFailure>,
        dump: String,
    },

    #[error("invalid HCL generated:\n{text}\n\nError: {message}")]
    MalformedOutput { text: String, message: String },
}

fn join_failures(failures: &[EntryFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("  - {}", failure))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ordered list of entries rendered against a shared registry
#[derive(Debug, Clone)]
pub struct CompositionBuilder {
    registry: Arc<Registry>,
    entries: Vec<CompositionEntry>,
}

impl CompositionBuilder {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            entries: Vec::new(),
        }
    }

    /// Append a hand-authored template entry
    pub fn add_template(&mut self, key: impl Into<String>, config: Config) -> &mut Self {
        let key = key.into();
        self.entries.push(CompositionEntry {
            resource_type: key.clone(),
            template_key: key,
            kind: EntryKind::Other,
            config: config.without_nulls(),
        });
        self
    }

    pub fn add_resource(&mut self, resource_type: impl Into<String>, config: Config) -> &mut Self {
        self.add_schema_entry(ResourceKind::Resource, resource_type.into(), config)
    }

    pub fn add_data_source(
        &mut self,
        resource_type: impl Into<String>,
        config: Config,
    ) -> &mut Self {
        self.add_schema_entry(ResourceKind::DataSource, resource_type.into(), config)
    }

    /// Append a resource entry only when `condition` holds
    pub fn add_resource_if(
        &mut self,
        condition: bool,
        resource_type: impl Into<String>,
        config: Config,
    ) -> &mut Self {
        if condition {
            self.add_resource(resource_type, config);
        }
        self
    }

    fn add_schema_entry(
        &mut self,
        kind: ResourceKind,
        resource_type: String,
        config: Config,
    ) -> &mut Self {
        self.entries.push(CompositionEntry {
            template_key: kind.template_key(&resource_type),
            resource_type,
            kind: kind.into(),
            config: config.without_nulls(),
        });
        self
    }

    /// Remove every entry addressed by `"<type>.<name>"`. Malformed or
    /// unmatched paths leave the composition unchanged.
    pub fn remove(&mut self, path: &str) -> &mut Self {
        if let Some((resource_type, name)) = parse_path(path) {
            let before = self.entries.len();
            self.entries.retain(|entry| !entry.matches(resource_type, name));
            log::debug!("Removed {} entries for {}", before - self.entries.len(), path);
        }
        self
    }

    /// Replace the configuration of the first entry addressed by
    /// `"<type>.<name>"`, or append a new resource entry when none matches.
    pub fn replace(&mut self, path: &str, config: Config) -> &mut Self {
        let Some((resource_type, name)) = parse_path(path) else {
            log::warn!("Ignoring replace with malformed path {:?}", path);
            return self;
        };
        let config = config.with(RESOURCE_NAME_KEY, Value::from(name));

        match self
            .entries
            .iter_mut()
            .find(|entry| entry.matches(resource_type, name))
        {
            Some(entry) => entry.config = config.without_nulls(),
            None => {
                let resource_type = resource_type.to_string();
                self.add_resource(resource_type, config);
            }
        }
        self
    }

    /// A function producing fresh copies of the current composition
    pub fn factory(&self) -> impl Fn() -> CompositionBuilder + Send + Sync + 'static {
        let snapshot = self.clone();
        move || snapshot.clone()
    }

    pub fn clear(&mut self) -> &mut Self {
        self.entries.clear();
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CompositionEntry] {
        &self.entries
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all entries in order, separated by blank lines
    pub fn render(&self) -> Result<String, ComposeError> {
        if self.entries.is_empty() {
            return Err(ComposeError::Empty);
        }

        let mut parts = Vec::with_capacity(self.entries.len());
        let mut failures = Vec::new();
        for entry in &self.entries {
            log::debug!(
                "Rendering {} ({})",
                entry.template_key,
                entry.resource_name().unwrap_or("unnamed")
            );
            match self.registry.render(&entry.template_key, &entry.config) {
                Ok(text) => parts.push(text),
                Err(error) => failures.push(EntryFailure {
                    template_key: entry.template_key.clone(),
                    resource_name: entry.resource_name().unwrap_or("unknown").to_string(),
                    error,
                }),
            }
        }

        if !failures.is_empty() {
            return Err(ComposeError::Render {
                failures,
                dump: self.dump(),
            });
        }

        let text = parts.join("\n\n");
        normalizer::validate(&text).map_err(|message| ComposeError::MalformedOutput {
            text: text.clone(),
            message,
        })?;
        Ok(text)
    }

    /// Human-readable listing of the composition, grouped by kind
    pub fn dump(&self) -> String {
        let mut out = String::from("Current configuration:");
        for (title, kind) in [
            ("Data sources", EntryKind::DataSource),
            ("Resources", EntryKind::Resource),
            ("Other", EntryKind::Other),
        ] {
            let entries: Vec<_> = self.entries.iter().filter(|e| e.kind == kind).collect();
            if entries.is_empty() {
                continue;
            }
            out.push_str(&format!("\n\n{}:", title));
            for entry in entries {
                out.push_str(&format!(
                    "\n  - {} (name: {})",
                    entry.resource_type,
                    entry.resource_name().unwrap_or("unnamed")
                ));
            }
        }
        out
    }
}

/// Split `"<type>.<name>"`
fn parse_path(path: &str) -> Option<(&str, &str)> {
    let mut parts = path.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(resource_type), Some(name), None)
            if !resource_type.is_empty() && !name.is_empty() =>
        {
            Some((resource_type, name))
        }
        _ => None,
    }
}

//! Export - Render a single resource as normalized configuration

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::builder::ComposeError;
use crate::normalizer;
use crate::store::Store;
use crate::transform::TransformerRegistry;
use crate::value::{Config, RESOURCE_NAME_KEY};

/// Local name used when the configuration does not carry one
pub const DEFAULT_RESOURCE_NAME: &str = "this";

/// Export error
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("failed to write export to {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// What surrounds the exported resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Text placed before the resource, typically [`providers_header`]
    pub header: Option<String>,
    /// File the exported document is also written to
    pub output: Option<PathBuf>,
}

/// A `terraform { required_providers }` block declaring `provider` from
/// `source`, followed by an empty provider block.
pub fn providers_header(provider: &str, source: &str) -> String {
    format!(
        "terraform {{\n  required_providers {{\n    {provider} = {{\n      source = {}\n    }}\n  }}\n}}\n\nprovider {} {{\n}}\n",
        crate::registry::quote(source),
        crate::registry::quote(provider),
    )
}

/// Render `config` through the `resource.<type>` template after applying
/// the type's transformers, normalize the result and prepend the header.
pub fn export_resource(
    store: &Store,
    resource_type: &str,
    config: Config,
    transformers: &TransformerRegistry,
    options: &ExportOptions,
) -> Result<String, ExportError> {
    let mut config = transformers.transform(resource_type, config);
    if config.resource_name().is_none() {
        config.insert(RESOURCE_NAME_KEY, DEFAULT_RESOURCE_NAME);
    }

    let mut builder = store.builder();
    builder.add_resource(resource_type, config);
    let text = normalizer::normalize(&builder.render()?);

    let document = match &options.header {
        Some(header) => format!("{}\n\n{}", header.trim_end(), text),
        None => text,
    };

    if let Some(path) = &options.output {
        write_document(path, &document).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
        log::debug!("Exported {} to {}", resource_type, path.display());
    }
    Ok(document)
}

fn write_document(path: &Path, document: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, document)
}

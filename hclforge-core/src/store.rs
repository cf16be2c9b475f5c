//! Store - Registry populated from provider schemas
//!
//! [`Store::initialize`] lists every schema exposed by a [`SchemaSource`],
//! synthesizes a template for each and registers it under
//! `resource.<type>` / `data.<type>`. Schemas hidden behind a feature flag
//! are exposed by raising an environment variable for the duration of the
//! listing. [`SharedStore`] runs the initialization once per process.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::builder::CompositionBuilder;
use crate::registry::{Registry, RegistryError};
use crate::schema::{ExtractionError, ResourceKind, SchemaDescriptor};
use crate::synthesizer::{Synthesizer, SynthesizerConfig};

/// Guards process environment changes made while listing schemas
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Provider of schemas, keyed by resource type
pub trait SchemaSource {
    fn resources(&self) -> BTreeMap<String, SchemaDescriptor>;

    fn data_sources(&self) -> BTreeMap<String, SchemaDescriptor> {
        BTreeMap::new()
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Environment variable set to `true` while schemas are listed
    pub beta_env_var: Option<String>,
    pub synthesizer: SynthesizerConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            beta_env_var: Some("PROVIDER_ENABLE_BETA".to_string()),
            synthesizer: SynthesizerConfig::default(),
        }
    }
}

/// Store error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("failed to extract fields for {key}: {source}")]
    Extraction {
        key: String,
        source: ExtractionError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Template registry plus the synthesizer that feeds it
#[derive(Debug, Clone)]
pub struct Store {
    registry: Arc<Registry>,
    synthesizer: Synthesizer,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(SynthesizerConfig::default())
    }
}

impl Store {
    /// An empty store
    pub fn new(config: SynthesizerConfig) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            synthesizer: Synthesizer::new(config),
        }
    }

    /// Build a store holding a template for every schema `source` lists
    pub fn initialize(source: &dyn SchemaSource, config: StoreConfig) -> Result<Self, StoreError> {
        let (resources, data_sources) = {
            let _flag = config.beta_env_var.as_deref().map(EnvFlagGuard::raise);
            (source.resources(), source.data_sources())
        };

        let mut store = Store::new(config.synthesizer);
        for (resource_type, descriptor) in &resources {
            store.register_schema(resource_type, ResourceKind::Resource, descriptor)?;
        }
        for (resource_type, descriptor) in &data_sources {
            store.register_schema(resource_type, ResourceKind::DataSource, descriptor)?;
        }
        log::info!(
            "Registered {} resource and {} data source templates",
            resources.len(),
            data_sources.len()
        );
        Ok(store)
    }

    /// Synthesize and register the template for one schema
    pub fn register_schema(
        &mut self,
        resource_type: &str,
        kind: ResourceKind,
        descriptor: &SchemaDescriptor,
    ) -> Result<&mut Self, StoreError> {
        let key = kind.template_key(resource_type);
        let source = self
            .synthesizer
            .synthesize(descriptor.extractor(), resource_type, kind)
            .map_err(|source| StoreError::Extraction {
                key: key.clone(),
                source,
            })?;
        self.registry_mut().add(key, &source)?;
        Ok(self)
    }

    /// Register a hand-authored template under `key`
    pub fn add_template(&mut self, key: &str, source: &str) -> Result<&mut Self, StoreError> {
        self.registry_mut().add(key, source)?;
        Ok(self)
    }

    /// Register a template written outside the schema set. `data.*`,
    /// `provider.*` and `*_provider` names keep their key, anything else is
    /// registered as `resource.<name>`.
    pub fn add_external_template(
        &mut self,
        name: &str,
        source: &str,
    ) -> Result<&mut Self, StoreError> {
        let key = external_template_key(name);
        self.add_template(&key, source)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Copy-on-write access: builders created earlier keep their snapshot
    fn registry_mut(&mut self) -> &mut Registry {
        Arc::make_mut(&mut self.registry)
    }

    /// A new, empty composition over this store's templates
    pub fn builder(&self) -> CompositionBuilder {
        CompositionBuilder::new(Arc::clone(&self.registry))
    }
}

fn external_template_key(name: &str) -> String {
    if name.starts_with("data.") || name.starts_with("provider.") || name.ends_with("_provider") {
        name.to_string()
    } else {
        ResourceKind::Resource.template_key(name)
    }
}

/// Sets an environment variable to `true` and restores the previous value
/// on drop, holding [`ENV_LOCK`] throughout.
struct EnvFlagGuard {
    name: String,
    previous: Option<OsString>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvFlagGuard {
    fn raise(name: &str) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = env::var_os(name);
        // SAFETY: environment writes in this crate happen only under ENV_LOCK
        unsafe { env::set_var(name, "true") };
        log::debug!("Raised {} while listing schemas", name);
        Self {
            name: name.to_string(),
            previous,
            _lock: lock,
        }
    }
}

impl Drop for EnvFlagGuard {
    fn drop(&mut self) {
        // SAFETY: ENV_LOCK is still held, it is released after this body runs
        unsafe {
            match &self.previous {
                Some(value) => env::set_var(&self.name, value),
                None => env::remove_var(&self.name),
            }
        }
    }
}

/// Lazily initialized store shared by a test harness
pub struct SharedStore {
    cell: OnceLock<Result<Store, StoreError>>,
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// The store, initializing it on first use. Concurrent callers block
    /// until the first initialization finishes; a failure is cached.
    pub fn get_or_init(
        &self,
        source: &dyn SchemaSource,
        config: StoreConfig,
    ) -> Result<&Store, StoreError> {
        self.cell
            .get_or_init(|| Store::initialize(source, config))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The store if initialization already succeeded
    pub fn get(&self) -> Option<&Store> {
        self.cell.get().and_then(|result| result.as_ref().ok())
    }
}

//! Registry mapping model types onto Megatron implementations.
//!
//! Families are registered into a [`RegistryBuilder`] and frozen into a
//! [`MegatronRegistry`]. A process-wide registry can be installed once with
//! [`install`]; [`global`] falls back to [`crate::default_registry`].

use crate::error::{MegatronError, MegatronResult};
use crate::gpt::{ConversionPlan, ConversionRequest, MegatronConfig, ProviderSpec};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

pub type ModelProviderFn = fn(&MegatronConfig) -> MegatronResult<ProviderSpec>;
pub type ConvertHfConfigFn = fn(&Value) -> MegatronResult<MegatronConfig>;
pub type ConvertCheckpointFn = fn(&ConversionRequest) -> MegatronResult<ConversionPlan>;

/// One Megatron implementation and the model types it serves.
#[derive(Clone)]
pub struct MegatronModelMeta {
    pub megatron_model_type: &'static str,
    /// Supported model types, in registration order.
    pub model_types: Vec<&'static str>,
    pub model_provider: ModelProviderFn,
    pub convert_hf_config: ConvertHfConfigFn,
    pub convert_mcore2hf: ConvertCheckpointFn,
    pub convert_hf2mcore: ConvertCheckpointFn,
}

impl fmt::Debug for MegatronModelMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MegatronModelMeta")
            .field("megatron_model_type", &self.megatron_model_type)
            .field("model_types", &self.model_types)
            .finish_non_exhaustive()
    }
}

impl MegatronModelMeta {
    #[must_use]
    pub fn supports(&self, model_type: &str) -> bool {
        self.model_types.iter().any(|t| *t == model_type)
    }
}

/// Collects families before the registry is frozen.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    families: BTreeMap<&'static str, MegatronModelMeta>,
    owners: HashMap<&'static str, &'static str>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn build(self) -> MegatronRegistry {
        MegatronRegistry { families: self.families, owners: self.owners }
    }
}

/// Add a family to the builder.
///
/// Fails if the family id is taken or one of its model types is already
/// served by another family; the builder is left unchanged on failure.
pub fn register_megatron_model(builder: &mut RegistryBuilder, meta: MegatronModelMeta) -> MegatronResult<()> {
    if builder.families.contains_key(meta.megatron_model_type) {
        return Err(MegatronError::DuplicateFamily(meta.megatron_model_type.to_string()));
    }
    for model_type in &meta.model_types {
        if let Some(family) = builder.owners.get(model_type) {
            return Err(MegatronError::DuplicateModelType {
                model_type: (*model_type).to_string(),
                family: (*family).to_string(),
            });
        }
    }

    for model_type in &meta.model_types {
        builder.owners.insert(*model_type, meta.megatron_model_type);
    }
    debug!(family = meta.megatron_model_type, model_types = meta.model_types.len(), "Registered megatron family");
    builder.families.insert(meta.megatron_model_type, meta);
    Ok(())
}

/// Read-only view of every registered family.
#[derive(Debug, Clone)]
pub struct MegatronRegistry {
    families: BTreeMap<&'static str, MegatronModelMeta>,
    owners: HashMap<&'static str, &'static str>,
}

impl MegatronRegistry {
    /// The family serving `model_type`.
    #[must_use]
    pub fn get(&self, model_type: &str) -> Option<&MegatronModelMeta> {
        self.owners.get(model_type).and_then(|family| self.families.get(family))
    }

    /// Like [`get`](Self::get) but reports unsupported types as an error.
    pub fn require(&self, model_type: &str) -> MegatronResult<&MegatronModelMeta> {
        self.get(model_type)
            .ok_or_else(|| MegatronError::UnsupportedModelType(model_type.to_string()))
    }

    #[must_use]
    pub fn family(&self, megatron_model_type: &str) -> Option<&MegatronModelMeta> {
        self.families.get(megatron_model_type)
    }

    /// Families sorted by id.
    pub fn families(&self) -> impl Iterator<Item = &MegatronModelMeta> {
        self.families.values()
    }

    #[must_use]
    pub fn supports(&self, model_type: &str) -> bool {
        self.owners.contains_key(model_type)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.families.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

static GLOBAL: OnceCell<MegatronRegistry> = OnceCell::new();

/// Install the process-wide registry. Only the first call succeeds.
pub fn install(registry: MegatronRegistry) -> MegatronResult<()> {
    GLOBAL.set(registry).map_err(|_| MegatronError::AlreadyInstalled)
}

/// The process-wide registry, installing the built-in one on first use.
pub fn global() -> MegatronResult<&'static MegatronRegistry> {
    GLOBAL.get_or_try_init(crate::default_registry)
}

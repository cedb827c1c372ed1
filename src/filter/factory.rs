//! Filter construction: per-listener factories and the name registry.
//!
//! Filter kinds are installed into a [`FilterRegistry`] by ordinary
//! constructor calls at proxy startup; nothing registers itself through
//! static initialization. Resolving a listener's filter configuration
//! against the registry yields a [`FilterFactory`], which then mints one
//! filter per stream.

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::MixerClient;
use crate::config::{FilterConfig, FilterSettings};
use crate::error::{Error, Result};
use crate::filter::gate::MixerGate;
use crate::filter::stream::{RequestFilter, StreamCallbacks};

/// Name under which the mixer filter registers.
pub const MIXER_FILTER: &str = "mixer";

/// Per-listener factory: mints one filter per stream.
pub trait FilterFactory: Send + Sync {
    fn create(&self, callbacks: Arc<dyn StreamCallbacks>) -> Box<dyn RequestFilter>;
}

/// Factory producing [`MixerGate`] filters that share one compiled config.
pub struct MixerGateFactory {
    config: Arc<FilterConfig>,
}

impl MixerGateFactory {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The shared per-listener configuration.
    pub fn config(&self) -> &Arc<FilterConfig> {
        &self.config
    }
}

impl FilterFactory for MixerGateFactory {
    fn create(&self, callbacks: Arc<dyn StreamCallbacks>) -> Box<dyn RequestFilter> {
        Box::new(MixerGate::new(self.config.clone(), callbacks))
    }
}

type FactoryBuilder = Box<dyn Fn(&serde_json::Value) -> Result<Arc<dyn FilterFactory>> + Send + Sync>;

/// Table of named filter kinds, populated at startup.
#[derive(Default)]
pub struct FilterRegistry {
    builders: HashMap<String, FactoryBuilder>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a named filter kind.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        builder: impl Fn(&serde_json::Value) -> Result<Arc<dyn FilterFactory>> + Send + Sync + 'static,
    ) {
        self.builders.insert(name.into(), Box::new(builder));
    }

    /// Resolve a listener's filter configuration into a factory.
    pub fn build(&self, name: &str, settings: &serde_json::Value) -> Result<Arc<dyn FilterFactory>> {
        let builder = self
            .builders
            .get(name)
            .ok_or_else(|| Error::unknown_filter(name))?;
        builder(settings)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }
}

/// Install the mixer filter into a registry, closing over the shared
/// remote client.
pub fn register_mixer(registry: &mut FilterRegistry, client: Arc<dyn MixerClient>) {
    registry.register(MIXER_FILTER, move |value| {
        let settings = FilterSettings::from_value(value)?;
        let config = FilterConfig::new(&settings, client.clone());
        Ok(Arc::new(MixerGateFactory::new(config)))
    });
}

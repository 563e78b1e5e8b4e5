//! Variant registry keyed on `(service, log_type)`

use super::ConnectorContract;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lookup table from `(service, log_type)` to a connector variant
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    variants: BTreeMap<(String, String), Arc<dyn ConnectorContract>>,
}

impl ConnectorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every shipped variant at its public API
    pub fn with_builtin() -> Result<Self> {
        crate::connectors::builtin_registry(&BTreeMap::new())
    }

    /// Register a variant; a second variant for the same key is rejected
    pub fn register(&mut self, variant: Arc<dyn ConnectorContract>) -> Result<()> {
        let key = (variant.service().to_string(), variant.log_type().to_string());
        if self.variants.contains_key(&key) {
            return Err(Error::DuplicateConnector {
                service: key.0,
                log_type: key.1,
            });
        }
        self.variants.insert(key, variant);
        Ok(())
    }

    /// Register a variant, builder style
    pub fn with(mut self, variant: Arc<dyn ConnectorContract>) -> Result<Self> {
        self.register(variant)?;
        Ok(self)
    }

    /// Look up a variant
    pub fn get(&self, service: &str, log_type: &str) -> Result<Arc<dyn ConnectorContract>> {
        self.variants
            .get(&(service.to_string(), log_type.to_string()))
            .cloned()
            .ok_or_else(|| Error::UnknownConnector {
                service: service.to_string(),
                log_type: log_type.to_string(),
            })
    }

    /// Check if a variant is registered
    pub fn contains(&self, service: &str, log_type: &str) -> bool {
        self.variants
            .contains_key(&(service.to_string(), log_type.to_string()))
    }

    /// All registered variants, sorted by `(service, log_type)`
    pub fn list(&self) -> Vec<Arc<dyn ConnectorContract>> {
        self.variants.values().cloned().collect()
    }

    /// Number of registered variants
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether no variant is registered
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("variants", &self.variants.keys().collect::<Vec<_>>())
            .finish()
    }
}

//! Built-in connector variants shipped with the binary
//!
//! Every variant here is registered by [`builtin_registry`], which is what
//! the CLI and [`ConnectorRegistry::with_builtin`] use.

pub mod slack;

pub use slack::{SlackAccessLogs, SlackIntegrationLogs};

use crate::connector::{ConnectorContract, ConnectorRegistry};
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Build a registry holding every shipped variant.
///
/// `base_url_overrides` maps a service name (e.g. "slack") to the base URL
/// its variants should use instead of the vendor's public API.
pub fn builtin_registry(base_url_overrides: &BTreeMap<String, String>) -> Result<ConnectorRegistry> {
    let slack_base = base_url_overrides.get("slack");

    let mut access = SlackAccessLogs::new()?;
    let mut integration = SlackIntegrationLogs::new()?;
    if let Some(base) = slack_base {
        access = access.with_base_url(base.clone());
        integration = integration.with_base_url(base.clone());
    }

    let variants: Vec<Arc<dyn ConnectorContract>> = vec![Arc::new(access), Arc::new(integration)];

    let mut registry = ConnectorRegistry::new();
    for variant in variants {
        registry.register(variant)?;
    }
    Ok(registry)
}

/// `(service, log_type)` pairs of every shipped variant
pub fn list_builtin() -> Vec<(&'static str, &'static str)> {
    vec![("slack", "access"), ("slack", "integration")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_variants_registered() {
        let registry = builtin_registry(&BTreeMap::new()).unwrap();
        assert_eq!(registry.len(), list_builtin().len());
        for (service, log_type) in list_builtin() {
            assert!(registry.contains(service, log_type), "{service}/{log_type}");
        }
    }

    #[test]
    fn test_base_url_override() {
        let overrides = BTreeMap::from([("slack".to_string(), "http://localhost:1234".to_string())]);
        let registry = builtin_registry(&overrides).unwrap();
        let access = registry.get("slack", "access").unwrap();
        assert_eq!(access.base_url(), "http://localhost:1234");

        let default = ConnectorRegistry::with_builtin().unwrap();
        let access = default.get("slack", "access").unwrap();
        assert_eq!(access.base_url(), slack::SLACK_API_BASE_URL);
    }
}

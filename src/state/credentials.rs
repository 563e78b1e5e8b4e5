//! Credential store contract
//!
//! The engine only reads credentials; provisioning them is someone else's job.

use crate::auth::AuthConfig;
use crate::connector::ConnectorIdentity;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Read-only source of per-instance credentials
#[async_trait]
pub trait AuthConfigStore: Send + Sync {
    /// Credentials of an instance; an unknown instance yields an empty config
    async fn get(&self, identity: &ConnectorIdentity) -> Result<AuthConfig>;
}

/// Credential store backed by a fixed map (usually the configuration file)
#[derive(Debug, Clone, Default)]
pub struct StaticAuthStore {
    configs: HashMap<ConnectorIdentity, AuthConfig>,
}

impl StaticAuthStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add credentials for an instance
    #[must_use]
    pub fn with(mut self, identity: ConnectorIdentity, config: AuthConfig) -> Self {
        self.configs.insert(identity, config);
        self
    }

    /// Set credentials for an instance
    pub fn insert(&mut self, identity: ConnectorIdentity, config: AuthConfig) {
        self.configs.insert(identity, config);
    }
}

#[async_trait]
impl AuthConfigStore for StaticAuthStore {
    async fn get(&self, identity: &ConnectorIdentity) -> Result<AuthConfig> {
        Ok(self.configs.get(identity).cloned().unwrap_or_default())
    }
}

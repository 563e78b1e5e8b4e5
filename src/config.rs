//! Application configuration loaded from YAML
//!
//! One file describes the engine knobs, the HTTP transport, where poll
//! state lives, the sink, and every connector instance with its credentials.
//!
//! ```yaml
//! engine:
//!   default_lookback_seconds: 3600
//!   max_pages: 100
//! http:
//!   rate_limit: { requests_per_second: 5, burst_size: 5 }
//! state:
//!   path: ./state.json
//! sink:
//!   type: json_lines
//!   path: ./events.jsonl
//! instances:
//!   - service: slack
//!     log_type: access
//!     instance_id: acme
//!     auth:
//!       auth_token: ${SLACK_TOKEN}
//! ```
//!
//! Credential values of the form `${NAME}` are read from the environment.

use crate::auth::AuthConfig;
use crate::connector::ConnectorIdentity;
use crate::engine::EngineConfig;
use crate::error::{Error, Result};
use crate::http::{HttpTransportConfig, RateLimiterConfig};
use crate::sink::{JsonLinesSink, ParquetSink, Sink, StdoutSink};
use crate::state::{FileStateStore, InMemoryStateStore, PollStateStore, StaticAuthStore};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Poll engine settings
    #[serde(default)]
    pub engine: EngineSection,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpSection,

    /// Poll state storage
    #[serde(default)]
    pub state: StateSection,

    /// Downstream sink
    #[serde(default)]
    pub sink: SinkSection,

    /// Configured connector instances
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

// ============================================================================
// Engine
// ============================================================================

/// Engine settings, all in whole seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Lookback used for an instance's first cycle
    #[serde(default = "default_lookback")]
    pub default_lookback_seconds: u64,

    /// Page bound per cycle
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Per-request timeout
    #[serde(default = "default_call_timeout")]
    pub request_timeout_seconds: u64,

    /// Sink acknowledgement timeout
    #[serde(default = "default_call_timeout")]
    pub sink_timeout_seconds: u64,

    /// Overall cycle timeout
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_seconds: u64,

    /// Lease time-to-live
    #[serde(default = "default_lease_ttl")]
    pub lease_ttl_seconds: u64,

    /// Cycles run at once by `run`
    #[serde(default = "default_concurrency")]
    pub max_concurrent_cycles: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            default_lookback_seconds: default_lookback(),
            max_pages: default_max_pages(),
            request_timeout_seconds: default_call_timeout(),
            sink_timeout_seconds: default_call_timeout(),
            cycle_timeout_seconds: default_cycle_timeout(),
            lease_ttl_seconds: default_lease_ttl(),
            max_concurrent_cycles: default_concurrency(),
        }
    }
}

fn default_lookback() -> u64 {
    3600
}

fn default_max_pages() -> u32 {
    100
}

fn default_call_timeout() -> u64 {
    30
}

fn default_cycle_timeout() -> u64 {
    300
}

fn default_lease_ttl() -> u64 {
    600
}

fn default_concurrency() -> usize {
    4
}

impl EngineSection {
    /// Convert to the engine's runtime configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_default_lookback(Duration::from_secs(self.default_lookback_seconds))
            .with_max_pages(self.max_pages)
            .with_request_timeout(Duration::from_secs(self.request_timeout_seconds))
            .with_sink_timeout(Duration::from_secs(self.sink_timeout_seconds))
            .with_cycle_timeout(Duration::from_secs(self.cycle_timeout_seconds))
            .with_lease_ttl(Duration::from_secs(self.lease_ttl_seconds))
            .with_max_concurrent_cycles(self.max_concurrent_cycles)
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// HTTP transport settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    /// User agent; defaults to `auditpull/<version>`
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Per-host token bucket; absent disables rate limiting
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,

    /// Base URL per service, replacing the vendor's public API
    #[serde(default)]
    pub base_url_overrides: BTreeMap<String, String>,
}

// ============================================================================
// State
// ============================================================================

/// Poll state storage settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSection {
    /// JSON state file; absent keeps state in memory for this process only
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ============================================================================
// Sink
// ============================================================================

/// Kind of downstream sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// JSON lines on standard output
    #[default]
    Stdout,
    /// JSON lines appended to a file
    JsonLines,
    /// Parquet files under a directory
    Parquet,
}

/// Downstream sink settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkSection {
    /// Sink kind
    #[serde(rename = "type", default)]
    pub kind: SinkKind,

    /// File (json_lines) or directory (parquet)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Rows per write call / row group
    #[serde(default)]
    pub chunk_size: Option<usize>,
}

// ============================================================================
// Instances
// ============================================================================

/// One configured connector instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceConfig {
    /// Vendor identifier
    pub service: String,

    /// Log type within the vendor
    pub log_type: String,

    /// Operator-chosen instance name
    pub instance_id: String,

    /// Credentials, checked against the variant's auth spec before use
    #[serde(default)]
    pub auth: AuthConfig,
}

impl InstanceConfig {
    /// Identity of this instance
    pub fn identity(&self) -> ConnectorIdentity {
        ConnectorIdentity::new(&self.service, &self.log_type, &self.instance_id)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load configuration from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {e}",
            path.display()
        ))
    })?;
    load_config_from_str(&content)
}

/// Load configuration from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<AppConfig> {
    let config: AppConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))?;
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        let e = &self.engine;
        for (field, value) in [
            ("engine.request_timeout_seconds", e.request_timeout_seconds),
            ("engine.sink_timeout_seconds", e.sink_timeout_seconds),
            ("engine.cycle_timeout_seconds", e.cycle_timeout_seconds),
            ("engine.lease_ttl_seconds", e.lease_ttl_seconds),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }
        if e.max_pages == 0 {
            return Err(invalid("engine.max_pages", "must be greater than zero"));
        }
        if e.lease_ttl_seconds < e.cycle_timeout_seconds {
            return Err(invalid(
                "engine.lease_ttl_seconds",
                "must not be shorter than engine.cycle_timeout_seconds",
            ));
        }

        if let Some(limit) = &self.http.rate_limit {
            if limit.requests_per_second == 0 || limit.burst_size == 0 {
                return Err(invalid("http.rate_limit", "values must be greater than zero"));
            }
        }

        if self.sink.kind != SinkKind::Stdout && self.sink.path.is_none() {
            return Err(invalid("sink.path", "required for json_lines and parquet sinks"));
        }

        let mut seen = HashSet::new();
        for instance in &self.instances {
            if instance.service.is_empty()
                || instance.log_type.is_empty()
                || instance.instance_id.is_empty()
            {
                return Err(invalid(
                    "instances",
                    "service, log_type and instance_id cannot be empty",
                ));
            }
            let identity = instance.identity();
            if !seen.insert(identity.clone()) {
                return Err(invalid("instances", format!("duplicate instance {identity}")));
            }
        }

        Ok(())
    }

    /// Identities of every configured instance, in file order
    pub fn identities(&self) -> Vec<ConnectorIdentity> {
        self.instances.iter().map(InstanceConfig::identity).collect()
    }

    /// Find instances by `instance_id`
    pub fn instances_named(&self, instance_id: &str) -> Vec<&InstanceConfig> {
        self.instances
            .iter()
            .filter(|i| i.instance_id == instance_id)
            .collect()
    }

    /// Engine runtime configuration
    pub fn engine_config(&self) -> EngineConfig {
        self.engine.engine_config()
    }

    /// HTTP transport configuration
    pub fn transport_config(&self) -> HttpTransportConfig {
        let mut config = HttpTransportConfig::default()
            .with_timeout(Duration::from_secs(self.engine.request_timeout_seconds))
            .with_rate_limit(self.http.rate_limit.clone());
        if let Some(agent) = &self.http.user_agent {
            config = config.with_user_agent(agent.clone());
        }
        config
    }

    /// Credential store over every instance, with `${NAME}` values resolved
    pub fn auth_store(&self) -> Result<StaticAuthStore> {
        let mut store = StaticAuthStore::new();
        for instance in &self.instances {
            store.insert(instance.identity(), resolve_env(&instance.auth)?);
        }
        Ok(store)
    }

    /// Build the configured poll state store
    pub fn state_store(&self) -> Result<Arc<dyn PollStateStore>> {
        Ok(match &self.state.path {
            Some(path) => Arc::new(FileStateStore::open(path)?),
            None => Arc::new(InMemoryStateStore::new()),
        })
    }

    /// Build the configured sink
    pub fn sink(&self) -> Result<Arc<dyn Sink>> {
        let path = || {
            self.sink
                .path
                .clone()
                .ok_or_else(|| invalid("sink.path", "required for json_lines and parquet sinks"))
        };
        Ok(match self.sink.kind {
            SinkKind::Stdout => Arc::new(StdoutSink::new()),
            SinkKind::JsonLines => {
                let mut sink = JsonLinesSink::new(path()?);
                if let Some(size) = self.sink.chunk_size {
                    sink = sink.with_chunk_size(size);
                }
                Arc::new(sink)
            }
            SinkKind::Parquet => {
                let mut sink = ParquetSink::new(path()?);
                if let Some(size) = self.sink.chunk_size {
                    sink = sink.with_chunk_size(size);
                }
                Arc::new(sink)
            }
        })
    }
}

fn invalid(field: &str, message: impl Into<String>) -> Error {
    Error::InvalidConfigValue {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Replace `${NAME}` references in credential values with environment values
fn resolve_env(auth: &AuthConfig) -> Result<AuthConfig> {
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| Error::config(format!("invalid env pattern: {e}")))?;

    let mut resolved = AuthConfig::new();
    for (field, value) in auth.iter() {
        let mut out = String::with_capacity(value.len());
        let mut last = 0;
        for caps in pattern.captures_iter(value) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let var = std::env::var(name.as_str()).map_err(|_| {
                invalid(
                    &format!("auth.{field}"),
                    format!("environment variable {} is not set", name.as_str()),
                )
            })?;
            out.push_str(&value[last..whole.start()]);
            out.push_str(&var);
            last = whole.end();
        }
        out.push_str(&value[last..]);
        resolved.insert(field, out);
    }
    Ok(resolved)
}

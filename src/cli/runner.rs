//! CLI runner - executes commands

use crate::auth::validate;
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_config, AppConfig};
use crate::connector::ConnectorRegistry;
use crate::connectors::builtin_registry;
use crate::engine::{CycleReport, PollEngine};
use crate::error::Error;
use crate::http::HttpTransport;
use crate::state::AuthConfigStore;
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Connectors => self.list_connectors(),
            Commands::Validate => self.validate().await,
            Commands::Run { instance } => self.run_cycles(instance.as_deref()).await,
        }
    }

    /// Load the configuration file
    fn load_config(&self) -> Result<AppConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .context("Config file not specified (use -c flag)")?;
        load_config(path).with_context(|| format!("Loading {}", path.display()))
    }

    fn registry(&self, config: Option<&AppConfig>) -> Result<ConnectorRegistry> {
        let overrides = config.map_or_else(BTreeMap::new, |c| c.http.base_url_overrides.clone());
        Ok(builtin_registry(&overrides)?)
    }

    /// List variants with their credential fields
    fn list_connectors(&self) -> Result<()> {
        let registry = self.registry(None)?;
        for variant in registry.list() {
            let fields: Vec<Value> = variant
                .required_auth_info()
                .fields()
                .map(|(name, field)| json!({"name": name, "description": field.description}))
                .collect();
            self.output_message(&json!({
                "type": "CONNECTOR",
                "service": variant.service(),
                "log_type": variant.log_type(),
                "endpoint": variant.endpoint(),
                "base_url": variant.base_url(),
                "auth_fields": fields,
            }));
        }
        Ok(())
    }

    /// Validate every instance's credentials offline
    async fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        let registry = self.registry(Some(&config))?;
        let credentials = config.auth_store()?;

        let mut failures = 0;
        for identity in config.identities() {
            let outcome = match registry.get(&identity.service, &identity.log_type) {
                Ok(variant) => {
                    let auth = credentials.get(&identity).await?;
                    validate(&auth, variant.required_auth_info())
                }
                Err(e) => Err(e),
            };

            let message = match outcome {
                Ok(()) => json!({"type": "VALIDATION", "identity": identity.key(), "valid": true}),
                Err(Error::AuthValidation {
                    missing_fields,
                    invalid_fields,
                }) => {
                    failures += 1;
                    json!({
                        "type": "VALIDATION",
                        "identity": identity.key(),
                        "valid": false,
                        "missing_fields": missing_fields,
                        "invalid_fields": invalid_fields,
                    })
                }
                Err(e) => {
                    failures += 1;
                    json!({
                        "type": "VALIDATION",
                        "identity": identity.key(),
                        "valid": false,
                        "error": e.to_string(),
                    })
                }
            };
            self.output_message(&message);
        }

        if failures > 0 {
            bail!("{failures} of {} instances failed validation", config.instances.len());
        }
        Ok(())
    }

    /// Run one cycle per selected instance
    async fn run_cycles(&self, instance: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let identities = match instance {
            Some(name) => {
                let selected: Vec<_> = config
                    .instances_named(name)
                    .into_iter()
                    .map(|i| i.identity())
                    .collect();
                if selected.is_empty() {
                    bail!("No configured instance named '{name}'");
                }
                selected
            }
            None => config.identities(),
        };
        if identities.is_empty() {
            bail!("No instances configured");
        }

        let transport = HttpTransport::with_config(config.transport_config())
            .context("Building HTTP transport")?;
        let engine = PollEngine::new(
            self.registry(Some(&config))?,
            Arc::new(transport),
            config.state_store().context("Opening poll state store")?,
            Arc::new(config.auth_store()?),
            config.sink().context("Building sink")?,
        )
        .with_config(config.engine_config());

        let results = engine.run_many(&identities).await;
        let mut failures = 0;
        for (identity, result) in &results {
            let message = match result {
                Ok(report) => report_message(report),
                Err(e) => {
                    failures += 1;
                    json!({
                        "type": "CYCLE",
                        "identity": identity.key(),
                        "status": "failed",
                        "kind": e.kind().to_string(),
                        "retryable": e.is_retryable(),
                        "error": e.to_string(),
                    })
                }
            };
            self.output_message(&message);
        }

        if failures > 0 {
            bail!("{failures} of {} cycles failed", results.len());
        }
        Ok(())
    }

    /// Output a message in the selected format
    fn output_message(&self, msg: &Value) {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg),
            OutputFormat::Pretty => serde_json::to_string_pretty(msg),
        };
        println!("{}", rendered.unwrap_or_default());
    }
}

fn report_message(report: &CycleReport) -> Value {
    json!({
        "type": "CYCLE",
        "identity": report.identity.key(),
        "status": "committed",
        "window": report.window.to_string(),
        "pages": report.pages_fetched,
        "events": report.events_emitted,
        "previous_cursor": report.previous_cursor.as_ref().map(ToString::to_string),
        "cursor": report.committed_cursor.as_ref().map(ToString::to_string),
        "warnings": report.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "duration_ms": report.duration_ms,
    })
}

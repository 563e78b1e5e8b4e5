//! Poll engine module
//!
//! Drives one poll cycle per connector instance:
//! lease → validate → window → fetch ⇄ paginate → emit → commit.
//!
//! # Overview
//!
//! The engine module provides:
//! - `PollEngine` - Runs cycles against a registry, transport, stores and sink
//! - `EngineConfig` - Lookback, page bound, timeouts, lease TTL, concurrency
//! - `CycleReport` / `CyclePhase` / `CycleWarning` - What a cycle did
//!
//! Poll state is written only after the sink acknowledged the whole batch,
//! and only if it still equals the state the cycle started from. Every
//! failure leaves it untouched, so the next cycle re-fetches the same window.

mod types;

pub use types::{CyclePhase, CycleReport, CycleWarning, EngineConfig};

use crate::auth::{apply_auth, validate};
use crate::connector::{
    ConnectorContract, ConnectorIdentity, ConnectorRegistry, CursorStrategy, FetchWindow, LogBatch,
};
use crate::error::{Error, Result};
use crate::http::{classify_status, Transport};
use crate::pagination::PaginationMarker;
use crate::sink::Sink;
use crate::state::{AuthConfigStore, Cursor, PollState, PollStateStore, PutOutcome};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Poll engine for running connector cycles
pub struct PollEngine {
    registry: ConnectorRegistry,
    transport: Arc<dyn Transport>,
    state: Arc<dyn PollStateStore>,
    credentials: Arc<dyn AuthConfigStore>,
    sink: Arc<dyn Sink>,
    config: EngineConfig,
}

/// Phases entered so far, and the window once known
#[derive(Debug, Default)]
struct CycleProgress {
    phases: Vec<CyclePhase>,
    window: Option<FetchWindow>,
}

impl CycleProgress {
    fn new() -> Self {
        Self {
            phases: vec![CyclePhase::Idle],
            window: None,
        }
    }

    fn enter(&mut self, phase: CyclePhase) {
        debug!(%phase, "Entering phase");
        self.phases.push(phase);
    }

    fn current(&self) -> CyclePhase {
        self.phases.last().copied().unwrap_or(CyclePhase::Idle)
    }
}

/// Everything a cycle produced up to the sink acknowledgement
struct Emitted {
    window: FetchWindow,
    previous: Option<PollState>,
    pages_fetched: u32,
    batch: LogBatch,
    resume_token: Option<String>,
    warnings: Vec<CycleWarning>,
}

impl PollEngine {
    /// Create a new engine with default configuration
    pub fn new(
        registry: ConnectorRegistry,
        transport: Arc<dyn Transport>,
        state: Arc<dyn PollStateStore>,
        credentials: Arc<dyn AuthConfigStore>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            registry,
            transport,
            state,
            credentials,
            sink,
            config: EngineConfig::default(),
        }
    }

    /// Set engine configuration
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the variant registry
    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    /// Run one poll cycle for `identity`.
    ///
    /// Holds the identity's lease for the whole cycle and releases it on
    /// every exit path. Returns the report of a committed cycle; any error
    /// means poll state was not changed.
    pub async fn run(&self, identity: &ConnectorIdentity) -> Result<CycleReport> {
        let span = info_span!(
            "poll_cycle",
            service = %identity.service,
            log_type = %identity.log_type,
            instance_id = %identity.instance_id,
        );
        self.run_leased(identity).instrument(span).await
    }

    /// Run one cycle for each distinct identity, at most
    /// `max_concurrent_cycles` at a time.
    ///
    /// Results come back in input order; a failure only affects its own entry.
    pub async fn run_many(
        &self,
        identities: &[ConnectorIdentity],
    ) -> Vec<(ConnectorIdentity, Result<CycleReport>)> {
        let mut seen = BTreeSet::new();
        let distinct: Vec<_> = identities
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();

        stream::iter(distinct)
            .map(|identity| async move {
                let result = self.run(&identity).await;
                (identity, result)
            })
            .buffered(self.config.max_concurrent_cycles.max(1))
            .collect()
            .await
    }

    async fn run_leased(&self, identity: &ConnectorIdentity) -> Result<CycleReport> {
        let started = Instant::now();
        let variant = self
            .registry
            .get(&identity.service, &identity.log_type)
            .inspect_err(|e| error!(error = %e, kind = %e.kind(), "No variant for identity"))?;

        let lease = match self.state.acquire_lease(identity, self.config.lease_ttl).await {
            Ok(lease) => lease,
            Err(e) => {
                warn!(error = %e, kind = %e.kind(), "Skipping cycle");
                return Err(e);
            }
        };

        let mut progress = CycleProgress::new();
        let result = self
            .cycle(identity, variant.as_ref(), &mut progress, started)
            .await;

        if let Err(e) = self.state.release_lease(&lease).await {
            // The lease still lapses after its TTL.
            warn!(error = %e, "Failed to release lease");
        }

        match &result {
            Ok(report) => {
                info!(
                    window = %report.window,
                    pages = report.pages_fetched,
                    events = report.events_emitted,
                    cursor = ?report.committed_cursor,
                    duration_ms = report.duration_ms,
                    "Poll cycle committed"
                );
            }
            Err(e) => {
                let failed_in = progress.current();
                progress.enter(CyclePhase::Failed);
                let window = progress
                    .window
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string);
                if e.is_retryable() {
                    warn!(phase = %failed_in, %window, kind = %e.kind(), error = %e, "Poll cycle failed");
                } else {
                    error!(phase = %failed_in, %window, kind = %e.kind(), error = %e, "Poll cycle failed");
                }
            }
        }
        result
    }

    async fn cycle(
        &self,
        identity: &ConnectorIdentity,
        variant: &dyn ConnectorContract,
        progress: &mut CycleProgress,
        started: Instant,
    ) -> Result<CycleReport> {
        let timeout = self.config.cycle_timeout;
        let emitted = tokio::time::timeout(timeout, self.fetch_and_emit(identity, variant, progress))
            .await
            .map_err(|_| Error::CycleTimeout {
                timeout_ms: duration_ms(timeout),
            })??;

        // Past the acknowledgement: the commit itself is not cut short.
        let committed_cursor = self.commit(identity, variant, &emitted).await?;

        Ok(CycleReport {
            identity: identity.clone(),
            window: emitted.window,
            phases: progress.phases.clone(),
            pages_fetched: emitted.pages_fetched,
            events_emitted: emitted.batch.len(),
            previous_cursor: emitted.previous.map(|s| s.cursor),
            committed_cursor,
            warnings: emitted.warnings,
            duration_ms: duration_ms(started.elapsed()),
        })
    }

    async fn fetch_and_emit(
        &self,
        identity: &ConnectorIdentity,
        variant: &dyn ConnectorContract,
        progress: &mut CycleProgress,
    ) -> Result<Emitted> {
        let previous = self.state.get(identity).await?;

        progress.enter(CyclePhase::ValidatingAuth);
        let auth = self.credentials.get(identity).await?;
        validate(&auth, variant.required_auth_info())?;
        let scheme = variant.auth_scheme();

        let now = Utc::now();
        let window = FetchWindow::new(self.window_start(previous.as_ref(), now), now);
        progress.window = Some(window.clone());
        debug!(%window, "Window computed");

        let mut batch = LogBatch::new(identity.clone(), window.clone());
        let mut marker = PaginationMarker::first();
        let mut pages_fetched = 0u32;
        let mut resume_token = None;
        let mut warnings = Vec::new();

        loop {
            progress.enter(CyclePhase::Fetching);
            let mut request = variant.build_request(&window, &marker)?;
            apply_auth(&mut request, &scheme, &auth)?;

            let response = tokio::time::timeout(
                self.config.request_timeout,
                self.transport.send(&request),
            )
            .await
            .map_err(|_| Error::Timeout {
                operation: "vendor request".to_string(),
                timeout_ms: duration_ms(self.config.request_timeout),
            })??;
            classify_status(&response)?;
            let page = variant.parse_response(&response)?;

            pages_fetched += 1;
            debug!(
                page = pages_fetched,
                events = page.events.len(),
                has_more = page.next.has_more,
                "Page fetched"
            );
            batch
                .events
                .extend(page.events.into_iter().map(|event| variant.normalize(event)));
            if page.resume_token.is_some() {
                resume_token = page.resume_token;
            }

            if !page.next.has_more {
                break;
            }
            progress.enter(CyclePhase::Paginating);
            if pages_fetched >= self.config.max_pages {
                let warning = CycleWarning::PaginationLimitExceeded {
                    max_pages: self.config.max_pages,
                };
                warn!(%window, pages = pages_fetched, "{warning}; committing fetched pages");
                warnings.push(warning);
                break;
            }
            marker = page.next;
        }

        progress.enter(CyclePhase::Committing);
        batch.fetched_at = Utc::now();
        tokio::time::timeout(self.config.sink_timeout, self.sink.emit(&batch))
            .await
            .map_err(|_| {
                Error::sink_ack(format!(
                    "{} sink did not acknowledge within {} ms",
                    self.sink.name(),
                    duration_ms(self.config.sink_timeout)
                ))
            })??;
        debug!(sink = self.sink.name(), events = batch.len(), "Batch acknowledged");

        Ok(Emitted {
            window,
            previous,
            pages_fetched,
            batch,
            resume_token,
            warnings,
        })
    }

    async fn commit(
        &self,
        identity: &ConnectorIdentity,
        variant: &dyn ConnectorContract,
        emitted: &Emitted,
    ) -> Result<Option<Cursor>> {
        let prior = emitted.previous.as_ref().map(|s| &s.cursor);
        let Some(cursor) = next_cursor(
            variant.cursor_strategy(),
            prior,
            &emitted.batch,
            emitted.resume_token.as_deref(),
            Utc::now(),
        ) else {
            debug!("No cursor to commit");
            return Ok(None);
        };

        let state = PollState::new(cursor.clone());
        match self
            .state
            .put(identity, state, emitted.previous.as_ref())
            .await?
        {
            PutOutcome::Committed => Ok(Some(cursor)),
            PutOutcome::Conflict => Err(Error::StateConflict {
                identity: identity.key(),
            }),
        }
    }

    fn window_start(&self, previous: Option<&PollState>, now: DateTime<Utc>) -> Cursor {
        match previous {
            Some(state) => state.cursor.clone(),
            None => {
                let lookback = chrono::Duration::from_std(self.config.default_lookback)
                    .unwrap_or(chrono::Duration::zero());
                Cursor::at(now - lookback)
            }
        }
    }
}

impl std::fmt::Debug for PollEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollEngine")
            .field("registry", &self.registry)
            .field("sink", &self.sink.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Cursor to commit after an acknowledged batch.
///
/// Timestamp variants move to the newest observed event, or to `now` when
/// no event carries a timestamp, never below the prior cursor. Token
/// variants keep the last resume token seen, else the prior cursor.
pub fn next_cursor(
    strategy: CursorStrategy,
    prior: Option<&Cursor>,
    batch: &LogBatch,
    resume_token: Option<&str>,
    now: DateTime<Utc>,
) -> Option<Cursor> {
    match strategy {
        CursorStrategy::Timestamp => {
            let observed = batch
                .max_observed_at()
                .map_or_else(|| now.timestamp(), |t| t.timestamp());
            let floor = prior.and_then(Cursor::as_timestamp).unwrap_or(i64::MIN);
            Some(Cursor::Timestamp(observed.max(floor)))
        }
        CursorStrategy::Token => resume_token
            .map(|t| Cursor::Token(t.to_string()))
            .or_else(|| prior.cloned()),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

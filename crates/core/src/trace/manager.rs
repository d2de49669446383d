//! Trace manager - the mutable owner of one run's event log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::event::{into_payload, EventDetails, Payload, TraceEvent, TraceEventKind};
use super::record::TraceRecord;

/// Run-level trace status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Running,
    Succeeded,
    Failed,
}

impl TraceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Ordered event log for a single run.
///
/// Creation emits the `start` event. The first call to [`succeed`] or
/// [`fail`] finalizes the trace and emits the `end` event; later calls are
/// ignored, so a trace holds exactly one of each.
///
/// [`succeed`]: TraceManager::succeed
/// [`fail`]: TraceManager::fail
#[derive(Debug, Clone)]
pub struct TraceManager {
    run_id: String,
    agent_name: String,
    events: Vec<TraceEvent>,
    status: TraceStatus,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl TraceManager {
    /// Create a trace for a run and record its `start` event
    pub fn new(run_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        let started_at = Utc::now();
        let mut trace = Self {
            run_id: run_id.into(),
            agent_name: agent_name.into(),
            events: Vec::new(),
            status: TraceStatus::Running,
            started_at,
            ended_at: None,
        };

        trace.push(
            TraceEventKind::Start,
            EventDetails::new()
                .at(started_at)
                .metadata(json!({ "status": TraceStatus::Running.as_str() })),
        );
        trace
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn status(&self) -> TraceStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn is_finalized(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Append an event.
    ///
    /// Returns `false` when the event was rejected: `start`/`end` are emitted
    /// only by the lifecycle, and nothing is appended after finalization.
    pub fn add_event(&mut self, kind: TraceEventKind, details: EventDetails) -> bool {
        if kind.is_lifecycle() {
            warn!(run_id = %self.run_id, kind = kind.as_str(), "Rejected lifecycle event");
            return false;
        }
        if self.is_finalized() {
            warn!(run_id = %self.run_id, kind = kind.as_str(), "Trace already finalized, dropping event");
            return false;
        }

        self.push(kind, details);
        true
    }

    /// Record an `error` event, then finalize as failed
    pub fn fail(&mut self, error: impl Into<String>, details: EventDetails) {
        if self.is_finalized() {
            debug!(run_id = %self.run_id, "Ignoring fail() on finalized trace");
            return;
        }

        let message = error.into();
        let metadata = details.metadata.clone();
        let details = EventDetails {
            error: Some(into_payload(json!({ "message": message }))),
            ..details
        };

        self.status = TraceStatus::Failed;
        self.push(TraceEventKind::Error, details);
        self.finalize(metadata);
    }

    /// Finalize as succeeded
    pub fn succeed(&mut self, metadata: Option<Payload>) {
        if self.is_finalized() {
            debug!(run_id = %self.run_id, "Ignoring succeed() on finalized trace");
            return;
        }

        self.status = TraceStatus::Succeeded;
        self.finalize(metadata);
    }

    /// Snapshot of the trace in persistable form
    pub fn build_record(&self) -> TraceRecord {
        TraceRecord {
            run_id: self.run_id.clone(),
            agent_name: self.agent_name.clone(),
            events: self.events.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            status: self.status,
        }
    }

    fn finalize(&mut self, extra: Option<Payload>) {
        let ended_at = Utc::now();
        self.ended_at = Some(ended_at);

        let duration_ms = ended_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0);

        let mut metadata = extra.unwrap_or_default();
        metadata.insert("status".to_string(), Value::from(self.status.as_str()));
        metadata.insert("durationMs".to_string(), Value::from(duration_ms));

        self.push(
            TraceEventKind::End,
            EventDetails::new().at(ended_at).metadata(metadata),
        );
        debug!(run_id = %self.run_id, status = self.status.as_str(), "Trace finalized");
    }

    fn push(&mut self, kind: TraceEventKind, details: EventDetails) {
        self.events.push(TraceEvent {
            run_id: self.run_id.clone(),
            timestamp: details.timestamp.unwrap_or_else(Utc::now),
            kind,
            agent_name: details
                .agent_name
                .unwrap_or_else(|| self.agent_name.clone()),
            tool_name: details.tool_name,
            input: details.input,
            output: details.output,
            error: details.error,
            metadata: details.metadata,
        });
    }
}

//! Persistable trace records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::TraceEvent;
use super::manager::TraceStatus;

/// Serialized form of a finalized (or in-flight) trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    pub run_id: String,
    pub agent_name: String,
    pub events: Vec<TraceEvent>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: TraceStatus,
}

/// Stored wrapper around a trace record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEnvelope {
    pub id: Uuid,
    pub record: TraceRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

impl TraceEnvelope {
    pub fn new(record: TraceRecord) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            record,
            created_at: now,
            updated_at: now,
            active: true,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.record.run_id
    }
}

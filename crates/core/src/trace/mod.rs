//! Run tracing
//!
//! Every agent run owns one [`TraceManager`]: an append-only, ordered event
//! log with a lifecycle status. Once finalized it is turned into a
//! [`TraceRecord`] and persisted inside a [`TraceEnvelope`].

mod event;
mod manager;
mod record;

pub use event::{into_payload, EventDetails, Payload, TraceEvent, TraceEventKind};
pub use manager::{TraceManager, TraceStatus};
pub use record::{TraceEnvelope, TraceRecord};

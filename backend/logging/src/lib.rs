//! Structured logging for DoorCam.
//!
//! Console and rolling NDJSON output, credential redaction, and the pipeline event log.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, PipelineEvent};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;

//! Hand-off of finished session records to the ingestion side.

pub mod sink;
pub mod validation;

pub use sink::{spawn_delivery, ChannelSink, JsonFileSink, ScoringSink, SessionSink};
pub use validation::{validate_record, IngestValidator, ValidatedSession};

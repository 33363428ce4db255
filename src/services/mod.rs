//! Application services wiring the store, pipeline, and indexes together.
//!
//! Separated from CLI concerns: services emit events for progress tracking
//! and leave rendering to the caller.

mod indexing;

pub use indexing::{IndexEvent, IndexingService, IngestOutcome, ProcessSummary};

//! Gradeloop Ledger: append-only grading event persistence
//!
//! This crate is the system of record for every decision the gradeloop core
//! makes. It is written by the caller after a `decide()` call and read back
//! for audit and to supply the replay verifier with a previous result.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: at-most-once writes keyed by idempotency key, ordering by
//! `attempt_no` within a trace, and simple audit filters.
//!
//! ## Key Components
//!
//! - `GradingEventStore`: backend-agnostic async store contract
//! - `GradingEvent`: the persisted audit record
//! - `MemoryGradingEventStore`: in-memory reference implementation

mod error;
pub mod memory;
pub mod storage_traits;

pub use error::StorageError;
pub use memory::MemoryGradingEventStore;
pub use storage_traits::{
    DecisionOutcome, EventQuery, GradingEvent, GradingEventStore, StorageResult,
};

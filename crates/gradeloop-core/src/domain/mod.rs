//! Domain models for gradeloop.
//!
//! Canonical definitions for the values flowing through one decision:
//! - `DecisionInput`: the specialist result under review plus its task and metadata
//! - `ErrorCategory`: the fixed failure taxonomy
//! - `RetryAction`: remediation actions the retry policy can choose
//! - `DecisionError`: the (few) caller-correctable failures of the core

pub mod error;
pub mod input;
pub mod taxonomy;

pub use error::{DecisionError, Result};
pub use input::{Affordance, ContextResult, DecisionInput, Metadata, Task};
pub use taxonomy::{ErrorCategory, RetryAction};

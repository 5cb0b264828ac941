//! Tick pipeline.
//!
//! - `Orchestrator`: runs hourly, daily, weekly and trend task sets
//! - `TimeWindow`: decides which task sets a tick runs
//! - `RetryExecutor`: bounded retry around each source crawl

pub mod orchestrator;
pub mod retry;
pub mod window;

pub use orchestrator::{Collaborators, Orchestrator};
pub use retry::{Attempt, RetryExecutor, RetryPolicy};
pub use window::{TickPlan, TimeWindow};

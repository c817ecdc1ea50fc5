//! The resumable chunked classification pipeline.
//!
//! One step = plan a window over the cached transactions, classify it with
//! bounded concurrency, persist results, record cost, advance the durable
//! checkpoint. Both job drivers - the HTTP pull endpoint / CLI loop, and
//! the detached push runner - call the same [`step::run_step`], so planning
//! and persistence can never diverge between entry points.

pub mod cost;
pub mod lease;
pub mod planner;
pub mod progress;
pub mod runner;
pub mod step;

pub use cost::estimate_chunk_cost;
pub use lease::{LeaseGuard, TenantLeases};
pub use planner::{clamp_batch_size, plan, ChunkWindow, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
pub use progress::{ProgressTracker, ProgressUpdate};
pub use runner::{start_job, StartError, StartOutcome};
pub use step::{run_step, CompletionHook, StepContext, StepError, StepOutcome};

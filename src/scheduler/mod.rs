//! Capacity scheduling core.
//!
//! - [`registry`]: per-worker declared and idle capacity
//! - [`store`]: every submitted job and its grants
//! - [`queue`]: jobs waiting for capacity
//! - [`allocator`]: greedy largest-idle-first planning
//! - [`engine`]: the [`Scheduler`] tying them together (dispatch and the
//!   release cycle)

pub mod allocator;
pub mod engine;
pub mod job;
pub mod queue;
pub mod registry;
pub mod store;

pub use engine::{Scheduler, SharedScheduler, WorkerRegistration};
pub use job::{Job, JobSpec, JobStatus};
pub use queue::PendingQueue;
pub use registry::{Worker, WorkerRegistry};
pub use store::{JobStore, ProgressReport};

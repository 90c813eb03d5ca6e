//! Job registry and queue coordination for jobline.
//!
//! Keeps track of the job actors of a cluster, builds ordered queue views
//! from resource manager snapshots and applies queue control batches.
//! Includes an in-memory resource manager and job owner for running a
//! cluster in a single process.

pub mod control;
pub mod job;
pub mod pool;
pub mod registry;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use control::apply_updates;
pub use job::LocalJob;
pub use pool::LocalResourceManager;
pub use registry::{JobRegistry, JobsHandle, JobsMessage};
pub use snapshot::{OrderBy, get_queue, get_queue_stats};

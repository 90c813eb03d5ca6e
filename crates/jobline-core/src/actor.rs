//! Job actor trait.
//!
//! A job actor represents the owner of a submitted job (an experiment, a
//! command, ...). The registry only keeps a handle to it; the actor's
//! lifecycle is managed elsewhere.

use async_trait::async_trait;
use std::sync::Arc;

use crate::job::JobDescriptor;
use crate::{JobId, Position, Result};

/// Shared, non-owning reference to a job actor.
pub type JobHandle = Arc<dyn JobActor>;

#[async_trait]
pub trait JobActor: Send + Sync {
    /// Current descriptor of the job.
    ///
    /// `Ok(None)` means the job has nothing to report (for example it is
    /// shutting down) and should be left out of queue listings.
    async fn get_descriptor(&self) -> Result<Option<JobDescriptor>>;

    /// Set the job's priority under the priority scheduler.
    async fn set_priority(&self, priority: i32) -> Result<()>;

    /// Set the job's weight under the fair share scheduler.
    async fn set_weight(&self, weight: f64) -> Result<()>;

    /// Switch the resource pool the job belongs to.
    async fn set_resource_pool(&self, resource_pool: String) -> Result<()>;

    /// Notification from the resource manager that the job's queue position changed.
    async fn register_job_position(&self, job_id: JobId, position: Position) -> Result<()>;
}

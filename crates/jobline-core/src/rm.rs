//! Resource manager trait and the messages it accepts.
//!
//! The resource manager owns placement: it decides positions, slot
//! allocations and scheduling state. jobline only reads its snapshots and
//! forwards reorder requests to it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::job::{QueueSnapshot, QueueStats};
use crate::{Anchor, JobId, Position, Result};

/// Request to move a job relative to an anchor within its pool.
///
/// With `ahead` set the job is placed immediately before the anchor,
/// otherwise immediately after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveJob {
    pub id: JobId,
    pub anchor: Anchor,
    pub ahead: bool,
}

/// Sent by a recovering job owner so the resource manager can restore the
/// position the job had before the restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverJobPosition {
    pub job_id: JobId,
    pub position: Position,
    pub resource_pool: String,
}

#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Fresh, consistent view of a pool's queue.
    async fn get_queue_snapshot(&self, resource_pool: &str) -> Result<QueueSnapshot>;

    /// Aggregate counts for a pool's queue.
    async fn get_queue_stats(&self, resource_pool: &str) -> Result<QueueStats>;

    /// Reorder a job within its pool.
    async fn move_job(&self, request: MoveJob) -> Result<()>;

    /// Re-seed a job's position after its owner restarted.
    async fn recover_job_position(&self, request: RecoverJobPosition) -> Result<()>;
}

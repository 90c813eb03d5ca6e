//! Job descriptors and resource manager scheduling info.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::JobId;

/// Scheduling state of a job as seen by the resource manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulingState {
    #[default]
    Unspecified,
    Queued,
    Scheduled,
    ScheduledBackfilled,
}

impl SchedulingState {
    pub fn is_scheduled(&self) -> bool {
        matches!(
            self,
            SchedulingState::Scheduled | SchedulingState::ScheduledBackfilled
        )
    }
}

impl std::fmt::Display for SchedulingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchedulingState::Unspecified => "UNSPECIFIED",
            SchedulingState::Queued => "QUEUED",
            SchedulingState::Scheduled => "SCHEDULED",
            SchedulingState::ScheduledBackfilled => "SCHEDULED_BACKFILLED",
        };
        f.write_str(s)
    }
}

/// Frequently changing per-job information known only to the resource manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingInfo {
    /// Number of jobs ordered ahead of this one in its pool.
    pub jobs_ahead: u32,
    pub state: SchedulingState,
    pub requested_slots: u32,
    pub allocated_slots: u32,
}

/// A resource pool's queue as the resource manager saw it at one instant.
pub type QueueSnapshot = HashMap<JobId, SchedulingInfo>;

/// Aggregate counts for a resource pool's queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued_count: u32,
    pub scheduled_count: u32,
}

/// Kind of workload a job runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    #[default]
    Unspecified,
    Experiment,
    Command,
    Notebook,
    Shell,
    Tensorboard,
}

impl std::str::FromStr for JobType {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "experiment" => Ok(JobType::Experiment),
            "command" => Ok(JobType::Command),
            "notebook" => Ok(JobType::Notebook),
            "shell" => Ok(JobType::Shell),
            "tensorboard" => Ok(JobType::Tensorboard),
            "unspecified" | "" => Ok(JobType::Unspecified),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown job type: {}",
                other
            ))),
        }
    }
}

/// Scheduling summary attached to a descriptor from the resource manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub state: SchedulingState,
    pub jobs_ahead: u32,
}

/// Externally visible representation of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: JobId,
    pub job_type: JobType,
    pub name: String,
    pub username: String,
    pub resource_pool: String,
    pub submission_time: DateTime<Utc>,
    pub is_preemptible: bool,
    /// Priority under the priority scheduler, if the pool uses one.
    pub priority: Option<i32>,
    /// Weight under the fair share scheduler.
    pub weight: f64,
    pub requested_slots: u32,
    pub allocated_slots: u32,
    pub summary: Option<JobSummary>,
}

impl JobDescriptor {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            job_type: JobType::default(),
            name: String::new(),
            username: String::new(),
            resource_pool: String::new(),
            submission_time: Utc::now(),
            is_preemptible: true,
            priority: None,
            weight: 1.0,
            requested_slots: 0,
            allocated_slots: 0,
            summary: None,
        }
    }
}

/// Overwrite a descriptor's scheduling fields with the resource manager's view.
///
/// No info means the resource manager does not know the job, so it is
/// reported as unscheduled.
pub fn update_job_q_info(job: &mut JobDescriptor, info: Option<&SchedulingInfo>) {
    let Some(info) = info else {
        job.summary = None;
        job.requested_slots = 0;
        job.allocated_slots = 0;
        return;
    };

    job.requested_slots = info.requested_slots;
    job.allocated_slots = info.allocated_slots;
    let summary = job.summary.get_or_insert_with(JobSummary::default);
    summary.state = info.state;
    summary.jobs_ahead = info.jobs_ahead;
}

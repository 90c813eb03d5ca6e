//! Queue control actions.

use serde::{Deserialize, Serialize};

use crate::{Anchor, Error, JobId};

/// A change requested for a single job's place in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlAction {
    SetPriority(i32),
    SetWeight(f64),
    SetResourcePool(String),
    MoveAheadOf(Anchor),
    MoveBehindOf(Anchor),
}

impl std::fmt::Display for ControlAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlAction::SetPriority(p) => write!(f, "priority={}", p),
            ControlAction::SetWeight(w) => write!(f, "weight={}", w),
            ControlAction::SetResourcePool(pool) => write!(f, "pool={}", pool),
            ControlAction::MoveAheadOf(anchor) => write!(f, "ahead-of={}", anchor),
            ControlAction::MoveBehindOf(anchor) => write!(f, "behind-of={}", anchor),
        }
    }
}

impl std::str::FromStr for ControlAction {
    type Err = Error;

    /// Parse `key=value`, e.g. `priority=10` or `ahead-of=@head`.
    ///
    /// Only the syntax is checked here; value ranges are validated when the
    /// action is applied.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| Error::InvalidInput(format!("expected key=value, got {:?}", s)))?;
        let bad_number = || Error::InvalidInput(format!("invalid number for {}: {:?}", key, value));

        match key {
            "priority" => Ok(ControlAction::SetPriority(
                value.parse().map_err(|_| bad_number())?,
            )),
            "weight" => Ok(ControlAction::SetWeight(
                value.parse().map_err(|_| bad_number())?,
            )),
            "pool" => Ok(ControlAction::SetResourcePool(value.to_string())),
            "ahead-of" => Ok(ControlAction::MoveAheadOf(value.parse()?)),
            "behind-of" => Ok(ControlAction::MoveBehindOf(value.parse()?)),
            other => Err(Error::UnexpectedAction(other.to_string())),
        }
    }
}

/// One entry of a queue control batch.
///
/// `action` is `None` when the caller sent an update whose action kind was
/// not recognized; applying such an entry aborts the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueControl {
    pub job_id: JobId,
    pub action: Option<ControlAction>,
}

impl QueueControl {
    pub fn new(job_id: impl Into<JobId>, action: ControlAction) -> Self {
        Self {
            job_id: job_id.into(),
            action: Some(action),
        }
    }
}

impl std::str::FromStr for QueueControl {
    type Err = Error;

    /// Parse `JOB:key=value`, e.g. `exp-7:behind-of=exp-3`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (job, action) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("expected JOB:key=value, got {:?}", s)))?;
        Ok(Self {
            job_id: job.parse()?,
            action: Some(action.parse()?),
        })
    }
}

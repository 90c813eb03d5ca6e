//! Queue control batches.
//!
//! Updates are applied one after another in the order given. A job that
//! cannot be found or an update without a recognizable action stops the
//! batch on the spot; earlier updates stay applied. Every other failure is
//! collected and reported once the whole batch has been attempted.

use jobline_core::control::{ControlAction, QueueControl};
use jobline_core::rm::{MoveJob, ResourceManager};
use jobline_core::{BatchErrors, Error, JobHandle, JobId, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 99;

/// Apply a batch of queue control updates.
pub async fn apply_updates(
    rm: &dyn ResourceManager,
    handles: &HashMap<JobId, JobHandle>,
    updates: Vec<QueueControl>,
) -> Result<()> {
    let mut errors = BatchErrors::new();

    for update in updates {
        let Some(handle) = handles.get(&update.job_id) else {
            warn!(job_id = %update.job_id, "Queue control for unknown job, aborting batch");
            return Err(Error::JobNotFound(update.job_id));
        };
        let Some(action) = update.action else {
            warn!(job_id = %update.job_id, "Queue control without action, aborting batch");
            return Err(Error::UnexpectedAction(format!(
                "no action given for job {}",
                update.job_id
            )));
        };

        debug!(job_id = %update.job_id, %action, "Applying queue control");
        if let Err(e) = apply_action(rm, handle, &update.job_id, action).await {
            warn!(job_id = %update.job_id, error = %e, "Queue control update failed");
            errors.push(e);
        }
    }

    errors.into_result()
}

async fn apply_action(
    rm: &dyn ResourceManager,
    handle: &JobHandle,
    job_id: &JobId,
    action: ControlAction,
) -> Result<()> {
    match action {
        ControlAction::SetPriority(priority) => {
            if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
                return Err(Error::InvalidInput(format!(
                    "priority must be between {} and {}",
                    MIN_PRIORITY, MAX_PRIORITY
                )));
            }
            handle.set_priority(priority).await
        }
        ControlAction::SetWeight(weight) => {
            if weight.is_nan() || weight <= 0.0 {
                return Err(Error::InvalidInput(
                    "weight must be greater than 0".to_string(),
                ));
            }
            handle.set_weight(weight).await
        }
        ControlAction::SetResourcePool(resource_pool) => {
            if resource_pool.is_empty() {
                return Err(Error::InvalidInput("resource pool must be set".to_string()));
            }
            handle.set_resource_pool(resource_pool).await
        }
        // Reordering is owned by the resource manager, not the job
        ControlAction::MoveAheadOf(anchor) => {
            rm.move_job(MoveJob {
                id: job_id.clone(),
                anchor,
                ahead: true,
            })
            .await
        }
        ControlAction::MoveBehindOf(anchor) => {
            rm.move_job(MoveJob {
                id: job_id.clone(),
                anchor,
                ahead: false,
            })
            .await
        }
    }
}

//! Ordered queue views built from the resource manager and the job actors.
//!
//! The resource manager knows where each job stands in the queue; the job
//! actors know what each job is. A listing fetches a fresh snapshot from the
//! former, asks the latter for descriptors, and merges the two.

use futures::future::join_all;
use jobline_core::job::{JobDescriptor, QueueStats, update_job_q_info};
use jobline_core::rm::ResourceManager;
use jobline_core::{JobHandle, JobId, Result};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, error};

/// Direction of a queue listing by number of jobs ahead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderBy {
    #[default]
    Asc,
    Desc,
}

/// List the jobs of a resource pool in queue order.
///
/// Only jobs known to both the resource manager and the registry are
/// returned. Descriptor requests go out concurrently and all of them are
/// awaited before merging; a single failed request fails the listing.
pub async fn get_queue(
    rm: &dyn ResourceManager,
    handles: &HashMap<JobId, JobHandle>,
    resource_pool: &str,
    order: OrderBy,
) -> Result<Vec<JobDescriptor>> {
    let snapshot = rm
        .get_queue_snapshot(resource_pool)
        .await
        .inspect_err(|e| {
            error!(resource_pool = %resource_pool, error = %e, "Getting job queue info from RM")
        })?;

    // Ask every job the RM knows about and we have a handle for
    let targets: Vec<&JobHandle> = snapshot.keys().filter_map(|id| handles.get(id)).collect();
    debug!(
        resource_pool = %resource_pool,
        snapshot_len = snapshot.len(),
        requests = targets.len(),
        "Requesting job descriptors"
    );
    let responses = join_all(targets.into_iter().map(|handle| handle.get_descriptor())).await;

    let mut descriptors: HashMap<JobId, JobDescriptor> = HashMap::with_capacity(responses.len());
    for response in responses {
        let descriptor = response.inspect_err(|e| {
            error!(resource_pool = %resource_pool, error = %e, "Parsing responses from job actors")
        })?;
        if let Some(descriptor) = descriptor {
            descriptors.insert(descriptor.job_id.clone(), descriptor);
        }
    }

    // Merge, driven by the snapshot
    let mut jobs: Vec<JobDescriptor> = snapshot
        .iter()
        .filter_map(|(id, info)| {
            let mut job = descriptors.remove(id)?;
            update_job_q_info(&mut job, Some(info));
            Some(job)
        })
        .collect();

    sort_jobs(&mut jobs, order);
    Ok(jobs)
}

/// Aggregate counts for a resource pool, straight from the resource manager.
pub async fn get_queue_stats(rm: &dyn ResourceManager, resource_pool: &str) -> Result<QueueStats> {
    rm.get_queue_stats(resource_pool).await.inspect_err(|e| {
        error!(resource_pool = %resource_pool, error = %e, "Getting job queue stats from RM")
    })
}

/// Order by jobs ahead in the requested direction, then by job id ascending
/// whatever the direction.
fn sort_jobs(jobs: &mut [JobDescriptor], order: OrderBy) {
    jobs.sort_by(|a, b| {
        let (Some(sa), Some(sb)) = (&a.summary, &b.summary) else {
            return Ordering::Equal;
        };
        let ahead = match order {
            OrderBy::Asc => sa.jobs_ahead.cmp(&sb.jobs_ahead),
            OrderBy::Desc => sb.jobs_ahead.cmp(&sa.jobs_ahead),
        };
        ahead.then_with(|| a.job_id.cmp(&b.job_id))
    });
}

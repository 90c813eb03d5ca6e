//! Queue listing commands.

use anyhow::{Context, Result};
use jobline_core::job::JobDescriptor;
use jobline_scheduler::OrderBy;

use super::cluster::LocalCluster;

/// List the jobs of a resource pool.
pub async fn list(config_path: &str, pool: &str, desc: bool, json: bool) -> Result<()> {
    let cluster = LocalCluster::load(config_path).await?;
    let order = if desc { OrderBy::Desc } else { OrderBy::Asc };

    let queue = cluster
        .jobs
        .get_queue(pool, order)
        .await
        .with_context(|| format!("Failed to list resource pool {}", pool))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&queue)?);
    } else {
        print_queue(pool, &queue);
    }

    cluster.shutdown().await
}

/// Show queued and scheduled counts of a resource pool.
pub async fn stats(config_path: &str, pool: &str) -> Result<()> {
    let cluster = LocalCluster::load(config_path).await?;

    let stats = cluster
        .jobs
        .get_queue_stats(pool)
        .await
        .with_context(|| format!("Failed to get stats of resource pool {}", pool))?;

    println!("Resource pool: {}", pool);
    println!("  queued:    {}", stats.queued_count);
    println!("  scheduled: {}", stats.scheduled_count);

    cluster.shutdown().await
}

pub(crate) fn print_queue(pool: &str, queue: &[JobDescriptor]) {
    println!("Resource pool: {} ({} jobs)", pool, queue.len());
    if queue.is_empty() {
        return;
    }

    println!(
        "{:<38} {:<16} {:<10} {:>8} {:<10} {:>5} {:>9}",
        "JOB", "NAME", "USER", "PRIORITY", "STATE", "AHEAD", "SLOTS"
    );
    for job in queue {
        let (state, ahead) = match &job.summary {
            Some(summary) => (summary.state.to_string(), summary.jobs_ahead.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        let priority = job
            .priority
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<38} {:<16} {:<10} {:>8} {:<10} {:>5} {:>9}",
            job.job_id,
            job.name,
            job.username,
            priority,
            state,
            ahead,
            format!("{}/{}", job.allocated_slots, job.requested_slots)
        );
    }
}

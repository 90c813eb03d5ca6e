//! Queue control command.

use anyhow::{Context, Result};
use jobline_core::control::QueueControl;
use jobline_scheduler::OrderBy;

use super::cluster::LocalCluster;
use super::queue::print_queue;

/// Parse and apply a batch of updates, then show the resulting queue.
pub async fn apply(config_path: &str, updates: &[String], pool: &str) -> Result<()> {
    let updates = updates
        .iter()
        .map(|u| {
            u.parse::<QueueControl>()
                .with_context(|| format!("Invalid update: {}", u))
        })
        .collect::<Result<Vec<_>>>()?;

    let cluster = LocalCluster::load(config_path).await?;

    let count = updates.len();
    cluster
        .jobs
        .apply_queue_control(updates)
        .await
        .context("Failed to apply queue control")?;
    println!("Applied {} update(s)", count);

    let queue = cluster.jobs.get_queue(pool, OrderBy::Asc).await?;
    print_queue(pool, &queue);

    cluster.shutdown().await
}

//! Single-process cluster built from a configuration file.

use anyhow::{Context, Result};
use jobline_config::ClusterConfig;
use jobline_config::cluster::load_cluster_config;
use jobline_scheduler::{JobRegistry, JobsHandle, LocalJob, LocalResourceManager};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// A running registry with the configured jobs submitted and registered.
pub struct LocalCluster {
    pub jobs: JobsHandle,
    task: JoinHandle<()>,
}

impl LocalCluster {
    pub async fn load(config_path: &str) -> Result<Self> {
        let config = load_cluster_config(config_path)
            .with_context(|| format!("Failed to load cluster config: {}", config_path))?;
        Self::start(&config).await
    }

    pub async fn start(config: &ClusterConfig) -> Result<Self> {
        let rm = Arc::new(LocalResourceManager::from_config(config));
        let (jobs, task) = JobRegistry::spawn(&config.registry, rm.clone());

        for pool in &config.pools {
            for job in &pool.jobs {
                let job = LocalJob::from_config(rm.clone(), &pool.name, job)
                    .await
                    .with_context(|| format!("Failed to submit job {}", job.id))?;
                jobs.register(job.id().clone(), job).await;
            }
        }

        info!(pools = config.pools.len(), "Local cluster started");
        Ok(Self { jobs, task })
    }

    /// Stop the registry and wait for it to drain its mailbox.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.jobs);
        self.task.await.context("Job registry task failed")?;
        Ok(())
    }
}

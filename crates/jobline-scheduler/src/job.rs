//! In-memory job owner backed by the local resource manager.

use async_trait::async_trait;
use chrono::Utc;
use jobline_config::JobConfig;
use jobline_config::cluster::DEFAULT_PRIORITY;
use jobline_core::job::JobDescriptor;
use jobline_core::rm::{RecoverJobPosition, ResourceManager};
use jobline_core::{JobActor, JobHandle, JobId, Position, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::pool::LocalResourceManager;

#[derive(Debug)]
struct JobState {
    descriptor: JobDescriptor,
    /// Last position the resource manager reported.
    position: Option<Position>,
    stopped: bool,
}

/// A job that keeps its own descriptor and forwards scheduling changes to a
/// [`LocalResourceManager`].
pub struct LocalJob {
    id: JobId,
    rm: Arc<LocalResourceManager>,
    state: RwLock<JobState>,
}

impl LocalJob {
    /// Submit a job to its resource pool. It joins at the back of the pool.
    pub async fn submit(
        rm: Arc<LocalResourceManager>,
        mut descriptor: JobDescriptor,
    ) -> Result<Arc<LocalJob>> {
        let priority = *descriptor.priority.get_or_insert(DEFAULT_PRIORITY);
        let (pool, weight, slots) = (
            descriptor.resource_pool.clone(),
            descriptor.weight,
            descriptor.requested_slots,
        );

        let job = Arc::new(LocalJob {
            id: descriptor.job_id.clone(),
            rm: rm.clone(),
            state: RwLock::new(JobState {
                descriptor,
                position: None,
                stopped: false,
            }),
        });

        let handle: JobHandle = job.clone();
        let position = rm
            .add_job(&pool, job.id.clone(), &handle, priority, weight, slots)
            .await?;
        job.state.write().await.position = Some(position);

        info!(job_id = %job.id, resource_pool = %pool, priority, %position, "Submitted job");
        Ok(job)
    }

    /// Submit a job described by cluster configuration.
    pub async fn from_config(
        rm: Arc<LocalResourceManager>,
        resource_pool: &str,
        config: &JobConfig,
    ) -> Result<Arc<LocalJob>> {
        let mut descriptor = JobDescriptor::new(config.id.clone());
        descriptor.job_type = config.job_type;
        descriptor.name = config.name.clone();
        descriptor.username = config.user.clone();
        descriptor.resource_pool = resource_pool.to_string();
        descriptor.submission_time = Utc::now();
        descriptor.priority = Some(config.priority);
        descriptor.weight = config.weight;
        descriptor.requested_slots = config.slots;
        Self::submit(rm, descriptor).await
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Last position reported by the resource manager.
    pub async fn position(&self) -> Option<Position> {
        self.state.read().await.position
    }

    /// Take the job out of its pool. It reports no descriptor from then on.
    pub async fn stop(&self) {
        self.state.write().await.stopped = true;
        if self.rm.remove_job(&self.id).await {
            info!(job_id = %self.id, "Stopped job");
        }
    }

    /// Push the last known position back into the resource manager, as after
    /// a restart of the resource manager.
    pub async fn recover(&self) -> Result<()> {
        let (position, resource_pool) = {
            let state = self.state.read().await;
            (state.position, state.descriptor.resource_pool.clone())
        };
        let Some(position) = position else {
            debug!(job_id = %self.id, "No position to recover");
            return Ok(());
        };

        self.rm
            .recover_job_position(RecoverJobPosition {
                job_id: self.id.clone(),
                position,
                resource_pool,
            })
            .await
    }
}

#[async_trait]
impl JobActor for LocalJob {
    async fn get_descriptor(&self) -> Result<Option<JobDescriptor>> {
        let state = self.state.read().await;
        if state.stopped {
            return Ok(None);
        }
        Ok(Some(state.descriptor.clone()))
    }

    async fn set_priority(&self, priority: i32) -> Result<()> {
        self.rm.set_priority(&self.id, priority).await?;
        self.state.write().await.descriptor.priority = Some(priority);
        info!(job_id = %self.id, priority, "Changed job priority");
        Ok(())
    }

    async fn set_weight(&self, weight: f64) -> Result<()> {
        self.rm.set_weight(&self.id, weight).await?;
        self.state.write().await.descriptor.weight = weight;
        info!(job_id = %self.id, weight, "Changed job weight");
        Ok(())
    }

    async fn set_resource_pool(&self, resource_pool: String) -> Result<()> {
        let position = self.rm.move_to_pool(&self.id, &resource_pool).await?;
        let mut state = self.state.write().await;
        state.descriptor.resource_pool = resource_pool;
        state.position = Some(position);
        Ok(())
    }

    async fn register_job_position(&self, job_id: JobId, position: Position) -> Result<()> {
        if job_id != self.id {
            warn!(job_id = %self.id, reported = %job_id, "Ignoring position for another job");
            return Ok(());
        }
        debug!(job_id = %self.id, %position, "Job position changed");
        self.state.write().await.position = Some(position);
        Ok(())
    }
}

//! The job registry.
//!
//! One task owns the map from job id to job handle and serves every request
//! from its mailbox in arrival order. Callers talk to it through a cloneable
//! [`JobsHandle`]; requests that expect an answer carry a oneshot sender.

use jobline_config::RegistryConfig;
use jobline_core::control::QueueControl;
use jobline_core::job::{JobDescriptor, QueueStats};
use jobline_core::rm::ResourceManager;
use jobline_core::{Error, JobHandle, JobId, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::control::apply_updates;
use crate::snapshot::{self, OrderBy};

/// Messages accepted by the registry task.
pub enum JobsMessage {
    Register {
        job_id: JobId,
        handle: JobHandle,
    },
    Unregister {
        job_id: JobId,
    },
    Lookup {
        job_id: JobId,
        response_tx: oneshot::Sender<Result<JobHandle>>,
    },
    GetJobs {
        resource_pool: String,
        order: OrderBy,
        response_tx: oneshot::Sender<Result<Vec<JobDescriptor>>>,
    },
    GetJobQueueStats {
        resource_pool: String,
        response_tx: oneshot::Sender<Result<QueueStats>>,
    },
    UpdateJobQueue {
        updates: Vec<QueueControl>,
        response_tx: oneshot::Sender<Result<()>>,
    },
}

/// State owned by the registry task.
pub struct JobRegistry {
    rm: Arc<dyn ResourceManager>,
    actor_by_id: HashMap<JobId, JobHandle>,
}

impl JobRegistry {
    pub fn new(rm: Arc<dyn ResourceManager>) -> Self {
        Self {
            rm,
            actor_by_id: HashMap::new(),
        }
    }

    /// Start the registry task. It stops once every [`JobsHandle`] is dropped.
    pub fn spawn(
        config: &RegistryConfig,
        rm: Arc<dyn ResourceManager>,
    ) -> (JobsHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.mailbox);
        let registry = Self::new(rm);
        let task = tokio::spawn(registry.run(rx));
        (JobsHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<JobsMessage>) {
        info!("Job registry started");
        while let Some(msg) = rx.recv().await {
            self.handle(msg).await;
        }
        info!(jobs = self.actor_by_id.len(), "Job registry stopped");
    }

    async fn handle(&mut self, msg: JobsMessage) {
        // A caller that went away no longer wants its answer, so failed
        // replies are dropped.
        match msg {
            JobsMessage::Register { job_id, handle } => {
                debug!(job_id = %job_id, "Registering job");
                self.actor_by_id.insert(job_id, handle);
            }
            JobsMessage::Unregister { job_id } => {
                if self.actor_by_id.remove(&job_id).is_some() {
                    debug!(job_id = %job_id, "Unregistered job");
                }
            }
            JobsMessage::Lookup {
                job_id,
                response_tx,
            } => {
                let result = self
                    .actor_by_id
                    .get(&job_id)
                    .cloned()
                    .ok_or(Error::JobNotFound(job_id));
                let _ = response_tx.send(result);
            }
            JobsMessage::GetJobs {
                resource_pool,
                order,
                response_tx,
            } => {
                let result =
                    snapshot::get_queue(self.rm.as_ref(), &self.actor_by_id, &resource_pool, order)
                        .await;
                let _ = response_tx.send(result);
            }
            JobsMessage::GetJobQueueStats {
                resource_pool,
                response_tx,
            } => {
                let result = snapshot::get_queue_stats(self.rm.as_ref(), &resource_pool).await;
                let _ = response_tx.send(result);
            }
            JobsMessage::UpdateJobQueue {
                updates,
                response_tx,
            } => {
                let result = apply_updates(self.rm.as_ref(), &self.actor_by_id, updates).await;
                let _ = response_tx.send(result);
            }
        }
    }
}

/// Cloneable client for the registry task.
#[derive(Clone)]
pub struct JobsHandle {
    tx: mpsc::Sender<JobsMessage>,
}

impl JobsHandle {
    /// Register a job, replacing any handle already registered under its id.
    pub async fn register(&self, job_id: JobId, handle: JobHandle) {
        let msg = JobsMessage::Register {
            job_id: job_id.clone(),
            handle,
        };
        if self.tx.send(msg).await.is_err() {
            warn!(job_id = %job_id, "Job registry is not running, dropping registration");
        }
    }

    /// Forget a job. Unknown ids are ignored.
    pub async fn unregister(&self, job_id: JobId) {
        let msg = JobsMessage::Unregister {
            job_id: job_id.clone(),
        };
        if self.tx.send(msg).await.is_err() {
            warn!(job_id = %job_id, "Job registry is not running, dropping unregistration");
        }
    }

    pub async fn lookup(&self, job_id: JobId) -> Result<JobHandle> {
        self.ask(|response_tx| JobsMessage::Lookup {
            job_id,
            response_tx,
        })
        .await
    }

    /// Jobs of a resource pool in queue order.
    pub async fn get_queue(
        &self,
        resource_pool: impl Into<String>,
        order: OrderBy,
    ) -> Result<Vec<JobDescriptor>> {
        let resource_pool = resource_pool.into();
        self.ask(|response_tx| JobsMessage::GetJobs {
            resource_pool,
            order,
            response_tx,
        })
        .await
    }

    pub async fn get_queue_stats(&self, resource_pool: impl Into<String>) -> Result<QueueStats> {
        let resource_pool = resource_pool.into();
        self.ask(|response_tx| JobsMessage::GetJobQueueStats {
            resource_pool,
            response_tx,
        })
        .await
    }

    /// Apply a batch of queue control updates in order.
    pub async fn apply_queue_control(&self, updates: Vec<QueueControl>) -> Result<()> {
        self.ask(|response_tx| JobsMessage::UpdateJobQueue {
            updates,
            response_tx,
        })
        .await
    }

    async fn ask<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> JobsMessage,
    ) -> Result<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(build(response_tx))
            .await
            .map_err(|_| Error::Unavailable)?;
        response_rx.await.map_err(|_| Error::Unavailable)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::LocalJob;
    use crate::pool::LocalResourceManager;
    use crate::testing::{MockJob, MockRm, info, snapshot};
    use jobline_core::Anchor;
    use jobline_core::control::ControlAction;
    use jobline_core::job::SchedulingState;

    fn spawn(rm: impl ResourceManager + 'static) -> (JobsHandle, JoinHandle<()>) {
        JobRegistry::spawn(&RegistryConfig::default(), Arc::new(rm))
    }

    fn default_pool_rm() -> MockRm {
        MockRm::with_snapshot(
            "default",
            snapshot(vec![
                ("A", info(0, SchedulingState::Scheduled)),
                ("B", info(1, SchedulingState::Queued)),
            ]),
        )
    }

    async fn register(jobs: &JobsHandle, job: &Arc<MockJob>) {
        jobs.register(job.id.clone(), job.clone()).await;
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let (jobs, _task) = spawn(default_pool_rm());
        register(&jobs, &MockJob::new("A")).await;

        let handle = jobs.lookup(JobId::from("A")).await.unwrap();
        let descriptor = handle.get_descriptor().await.unwrap().unwrap();
        assert_eq!(descriptor.job_id, JobId::from("A"));

        let err = jobs.lookup(JobId::from("missing")).await.err().unwrap();
        assert!(matches!(err, Error::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_register_replaces_existing_handle() {
        let (jobs, _task) = spawn(default_pool_rm());

        let mut first = JobDescriptor::new(JobId::from("A"));
        first.name = "first".to_string();
        let mut second = first.clone();
        second.name = "second".to_string();

        register(&jobs, &MockJob::with_descriptor(first)).await;
        register(&jobs, &MockJob::with_descriptor(second)).await;

        let handle = jobs.lookup(JobId::from("A")).await.unwrap();
        let descriptor = handle.get_descriptor().await.unwrap().unwrap();
        assert_eq!(descriptor.name, "second");
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let (jobs, _task) = spawn(default_pool_rm());
        register(&jobs, &MockJob::new("A")).await;

        jobs.unregister(JobId::from("A")).await;
        jobs.unregister(JobId::from("A")).await;
        jobs.unregister(JobId::from("never-registered")).await;

        assert!(jobs.lookup(JobId::from("A")).await.is_err());
        // Still serving
        register(&jobs, &MockJob::new("B")).await;
        assert!(jobs.lookup(JobId::from("B")).await.is_ok());
    }

    #[tokio::test]
    async fn test_default_pool_listing() {
        let (jobs, _task) = spawn(default_pool_rm());
        register(&jobs, &MockJob::new("B")).await;
        register(&jobs, &MockJob::new("A")).await;

        let queue = jobs.get_queue("default", OrderBy::Asc).await.unwrap();

        let ids: Vec<_> = queue.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(queue[0].summary.as_ref().unwrap().jobs_ahead, 0);
        assert_eq!(
            queue[0].summary.as_ref().unwrap().state,
            SchedulingState::Scheduled
        );
        assert_eq!(queue[1].summary.as_ref().unwrap().jobs_ahead, 1);
        assert_eq!(
            queue[1].summary.as_ref().unwrap().state,
            SchedulingState::Queued
        );
    }

    #[tokio::test]
    async fn test_failed_listing_leaves_registry_running() {
        let (jobs, _task) = spawn(default_pool_rm());
        register(&jobs, &MockJob::new("A")).await;
        register(&jobs, &MockJob::failing("B")).await;

        let err = jobs.get_queue("default", OrderBy::Asc).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        jobs.unregister(JobId::from("B")).await;
        let queue = jobs.get_queue("default", OrderBy::Asc).await.unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_rm() {
        let (jobs, _task) = spawn(MockRm::unreachable());
        register(&jobs, &MockJob::new("A")).await;

        assert!(matches!(
            jobs.get_queue("default", OrderBy::Asc).await,
            Err(Error::Transport(_))
        ));
        assert!(matches!(
            jobs.get_queue_stats("default").await,
            Err(Error::Transport(_))
        ));
        assert!(jobs.lookup(JobId::from("A")).await.is_ok());
    }

    #[tokio::test]
    async fn test_queue_stats() {
        let (jobs, _task) = spawn(default_pool_rm());
        assert_eq!(jobs.get_queue_stats("default").await.unwrap(), MockRm::STATS);
    }

    #[tokio::test]
    async fn test_control_batch_with_unknown_job() {
        let (jobs, _task) = spawn(default_pool_rm());
        let a = MockJob::new("A");
        register(&jobs, &a).await;

        let err = jobs
            .apply_queue_control(vec![
                QueueControl::new("missing", ControlAction::SetPriority(10)),
                QueueControl::new("A", ControlAction::SetPriority(10)),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::JobNotFound(_)));
        assert!(a.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stopped_registry_is_unavailable() {
        let (jobs, task) = spawn(default_pool_rm());
        task.abort();
        let _ = task.await;

        let err = jobs.lookup(JobId::from("A")).await.err().unwrap();
        assert!(matches!(err, Error::Unavailable));
        // Fire-and-forget requests only log
        jobs.register(JobId::from("A"), MockJob::new("A")).await;
    }

    #[tokio::test]
    async fn test_reorder_through_local_rm() {
        let rm = Arc::new(LocalResourceManager::new());
        rm.add_pool("default", 1).await;
        let (jobs, _task) = JobRegistry::spawn(&RegistryConfig::default(), rm.clone());

        for id in ["A", "B", "C"] {
            let mut descriptor = JobDescriptor::new(JobId::from(id));
            descriptor.resource_pool = "default".to_string();
            descriptor.requested_slots = 1;
            let job = LocalJob::submit(rm.clone(), descriptor).await.unwrap();
            jobs.register(job.id().clone(), job).await;
        }

        jobs.apply_queue_control(vec![
            QueueControl::new("C", ControlAction::MoveAheadOf(Anchor::Head)),
            QueueControl::new("A", ControlAction::MoveBehindOf(Anchor::Job(JobId::from("B")))),
        ])
        .await
        .unwrap();

        let queue = jobs.get_queue("default", OrderBy::Asc).await.unwrap();
        let ids: Vec<_> = queue.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "B", "A"]);
        assert_eq!(
            queue[0].summary.as_ref().unwrap().state,
            SchedulingState::Scheduled
        );
        assert_eq!(queue[1].summary.as_ref().unwrap().state, SchedulingState::Queued);

        let stats = jobs.get_queue_stats("default").await.unwrap();
        assert_eq!(stats.scheduled_count, 1);
        assert_eq!(stats.queued_count, 2);
    }
}

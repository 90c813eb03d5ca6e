//! Mock resource manager and job actors shared by the unit tests.

use async_trait::async_trait;
use jobline_core::job::{JobDescriptor, QueueSnapshot, QueueStats, SchedulingInfo, SchedulingState};
use jobline_core::rm::{MoveJob, RecoverJobPosition, ResourceManager};
use jobline_core::{Error, JobActor, JobHandle, JobId, Position, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn info(jobs_ahead: u32, state: SchedulingState) -> SchedulingInfo {
    SchedulingInfo {
        jobs_ahead,
        state,
        requested_slots: 1,
        allocated_slots: if state.is_scheduled() { 1 } else { 0 },
    }
}

pub fn snapshot(entries: Vec<(&str, SchedulingInfo)>) -> QueueSnapshot {
    entries
        .into_iter()
        .map(|(id, info)| (JobId::from(id), info))
        .collect()
}

pub fn handles(jobs: Vec<Arc<MockJob>>) -> HashMap<JobId, JobHandle> {
    jobs.into_iter()
        .map(|job| {
            let handle: JobHandle = job.clone();
            (job.id.clone(), handle)
        })
        .collect()
}

pub struct MockRm {
    snapshots: HashMap<String, QueueSnapshot>,
    reachable: bool,
    reject_moves: bool,
    pub moves: Mutex<Vec<MoveJob>>,
    pub recoveries: Mutex<Vec<RecoverJobPosition>>,
}

impl MockRm {
    pub const STATS: QueueStats = QueueStats {
        queued_count: 3,
        scheduled_count: 2,
    };

    pub fn with_snapshot(pool: &str, snapshot: QueueSnapshot) -> Self {
        Self {
            snapshots: HashMap::from([(pool.to_string(), snapshot)]),
            reachable: true,
            reject_moves: false,
            moves: Mutex::new(Vec::new()),
            recoveries: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::with_snapshot("default", QueueSnapshot::new())
        }
    }

    pub fn rejecting_moves() -> Self {
        Self {
            reject_moves: true,
            ..Self::with_snapshot("default", QueueSnapshot::new())
        }
    }

    pub fn moves(&self) -> Vec<MoveJob> {
        self.moves.lock().unwrap().clone()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(Error::Transport("resource manager unreachable".to_string()))
        }
    }
}

#[async_trait]
impl ResourceManager for MockRm {
    async fn get_queue_snapshot(&self, resource_pool: &str) -> Result<QueueSnapshot> {
        self.check_reachable()?;
        Ok(self.snapshots.get(resource_pool).cloned().unwrap_or_default())
    }

    async fn get_queue_stats(&self, _resource_pool: &str) -> Result<QueueStats> {
        self.check_reachable()?;
        Ok(Self::STATS)
    }

    async fn move_job(&self, request: MoveJob) -> Result<()> {
        self.check_reachable()?;
        self.moves.lock().unwrap().push(request.clone());
        if self.reject_moves {
            return Err(Error::InvalidInput(format!("cannot move job {}", request.id)));
        }
        Ok(())
    }

    async fn recover_job_position(&self, request: RecoverJobPosition) -> Result<()> {
        self.check_reachable()?;
        self.recoveries.lock().unwrap().push(request);
        Ok(())
    }
}

/// Job actor that records every call it receives.
pub struct MockJob {
    pub id: JobId,
    descriptor: Option<JobDescriptor>,
    fail: bool,
    descriptor_requests: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl MockJob {
    fn build(id: JobId, descriptor: Option<JobDescriptor>, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            descriptor,
            fail,
            descriptor_requests: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn new(id: &str) -> Arc<Self> {
        let id = JobId::from(id);
        Self::build(id.clone(), Some(JobDescriptor::new(id)), false)
    }

    pub fn with_descriptor(descriptor: JobDescriptor) -> Arc<Self> {
        Self::build(descriptor.job_id.clone(), Some(descriptor), false)
    }

    /// Answers descriptor requests with nothing.
    pub fn without_descriptor(id: &str) -> Arc<Self> {
        Self::build(JobId::from(id), None, false)
    }

    /// Fails every request.
    pub fn failing(id: &str) -> Arc<Self> {
        let id = JobId::from(id);
        Self::build(id.clone(), Some(JobDescriptor::new(id)), true)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn descriptor_requests(&self) -> usize {
        self.descriptor_requests.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            return Err(Error::Transport(format!("job {} stopped", self.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl JobActor for MockJob {
    async fn get_descriptor(&self) -> Result<Option<JobDescriptor>> {
        self.descriptor_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Transport(format!("job {} stopped", self.id)));
        }
        Ok(self.descriptor.clone())
    }

    async fn set_priority(&self, priority: i32) -> Result<()> {
        self.record(format!("priority={}", priority))
    }

    async fn set_weight(&self, weight: f64) -> Result<()> {
        self.record(format!("weight={}", weight))
    }

    async fn set_resource_pool(&self, resource_pool: String) -> Result<()> {
        self.record(format!("pool={}", resource_pool))
    }

    async fn register_job_position(&self, job_id: JobId, position: Position) -> Result<()> {
        self.record(format!("position {}={}", job_id, position))
    }
}

//! In-memory priority resource manager.
//!
//! Orders each pool by priority (1 is the most urgent), then by position,
//! then by job id, and hands out slots strictly in that order. It is the
//! reference collaborator used by the CLI and the tests; production
//! placement lives behind the same [`ResourceManager`] trait elsewhere.

use async_trait::async_trait;
use jobline_config::ClusterConfig;
use jobline_core::job::{QueueSnapshot, QueueStats, SchedulingInfo, SchedulingState};
use jobline_core::rm::{MoveJob, RecoverJobPosition, ResourceManager};
use jobline_core::{Anchor, Error, JobActor, JobHandle, JobId, Position, Result};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct PoolEntry {
    actor: Weak<dyn JobActor>,
    priority: i32,
    weight: f64,
    position: Position,
    requested_slots: u32,
}

struct PoolState {
    slots: u32,
    jobs: HashMap<JobId, PoolEntry>,
}

impl PoolState {
    fn new(slots: u32) -> Self {
        Self {
            slots,
            jobs: HashMap::new(),
        }
    }

    /// Jobs in scheduling order.
    fn ordered(&self) -> Vec<(&JobId, &PoolEntry)> {
        let mut jobs: Vec<_> = self.jobs.iter().collect();
        jobs.sort_by(|(a_id, a), (b_id, b)| {
            a.priority
                .cmp(&b.priority)
                .then(a.position.cmp(&b.position))
                .then_with(|| a_id.cmp(b_id))
        });
        jobs
    }

    fn tail_position(&self) -> Position {
        self.jobs
            .values()
            .map(|e| e.position)
            .max()
            .map(Position::next_whole)
            .unwrap_or(Position::ONE)
    }

    /// Walk the queue in order, allocating slots until the first job that
    /// does not fit. Everything from there on waits.
    fn schedule(&self) -> QueueSnapshot {
        let mut free = self.slots;
        let mut blocked = false;
        let mut snapshot = QueueSnapshot::with_capacity(self.jobs.len());

        for (jobs_ahead, (id, entry)) in self.ordered().into_iter().enumerate() {
            let fits = !blocked && entry.requested_slots <= free;
            let (state, allocated_slots) = if fits {
                free -= entry.requested_slots;
                (SchedulingState::Scheduled, entry.requested_slots)
            } else {
                blocked = true;
                (SchedulingState::Queued, 0)
            };
            snapshot.insert(
                id.clone(),
                SchedulingInfo {
                    jobs_ahead: jobs_ahead as u32,
                    state,
                    requested_slots: entry.requested_slots,
                    allocated_slots,
                },
            );
        }
        snapshot
    }

    /// Renumber every job onto consecutive whole positions, keeping the
    /// current order. Returns the jobs whose position changed.
    fn rebalance(&mut self) -> Vec<JobId> {
        let order: Vec<JobId> = self.ordered().into_iter().map(|(id, _)| id.clone()).collect();
        let mut changed = Vec::new();
        for (i, id) in order.into_iter().enumerate() {
            let position = Position::whole(i as i64 + 1);
            if let Some(entry) = self.jobs.get_mut(&id) {
                if entry.position != position {
                    entry.position = position;
                    changed.push(id);
                }
            }
        }
        changed
    }

    /// Where the subject of a move should go, given the other jobs of its
    /// priority band.
    fn placement(&self, request: &MoveJob, priority: i32, current: Position) -> Result<Position> {
        let mut band: Vec<(Position, &JobId)> = self
            .jobs
            .iter()
            .filter(|(id, e)| **id != request.id && e.priority == priority)
            .map(|(id, e)| (e.position, id))
            .collect();
        band.sort();

        let anchor_id = match &request.anchor {
            Anchor::Head => {
                return Ok(band.first().map(|(p, _)| p.prev_whole()).unwrap_or(current));
            }
            Anchor::Tail => {
                return Ok(band.last().map(|(p, _)| p.next_whole()).unwrap_or(current));
            }
            Anchor::Job(id) => id,
        };

        let idx = band
            .iter()
            .position(|(_, id)| *id == anchor_id)
            .ok_or_else(|| Error::JobNotFound(anchor_id.clone()))?;
        let anchor = band[idx].0;

        if request.ahead {
            match idx.checked_sub(1).map(|i| band[i].0) {
                Some(prev) => Position::between(prev, anchor),
                None => Ok(anchor.prev_whole()),
            }
        } else {
            match band.get(idx + 1).map(|(p, _)| *p) {
                Some(next) => Position::between(anchor, next),
                None => Ok(anchor.next_whole()),
            }
        }
    }
}

/// In-memory resource manager for one process.
pub struct LocalResourceManager {
    pools: Mutex<HashMap<String, PoolState>>,
}

impl Default for LocalResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalResourceManager {
    pub fn new() -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Create a resource manager with the pools of a cluster configuration.
    /// Jobs are added separately once their actors exist.
    pub fn from_config(config: &ClusterConfig) -> Self {
        let pools = config
            .pools
            .iter()
            .map(|p| (p.name.clone(), PoolState::new(p.slots)))
            .collect();
        Self {
            pools: Mutex::new(pools),
        }
    }

    pub async fn add_pool(&self, name: impl Into<String>, slots: u32) {
        let name = name.into();
        info!(resource_pool = %name, slots, "Adding resource pool");
        self.pools.lock().await.insert(name, PoolState::new(slots));
    }

    /// Add a job at the back of a pool and return its position.
    pub async fn add_job(
        &self,
        resource_pool: &str,
        job_id: JobId,
        actor: &JobHandle,
        priority: i32,
        weight: f64,
        requested_slots: u32,
    ) -> Result<Position> {
        let mut pools = self.pools.lock().await;
        let pool = pools
            .get_mut(resource_pool)
            .ok_or_else(|| unknown_pool(resource_pool))?;

        let position = pool.tail_position();
        debug!(job_id = %job_id, resource_pool = %resource_pool, %position, "Adding job");
        pool.jobs.insert(
            job_id,
            PoolEntry {
                actor: Arc::downgrade(actor),
                priority,
                weight,
                position,
                requested_slots,
            },
        );
        Ok(position)
    }

    /// Remove a job from whichever pool holds it.
    pub async fn remove_job(&self, job_id: &JobId) -> bool {
        let mut pools = self.pools.lock().await;
        pools
            .values_mut()
            .any(|pool| pool.jobs.remove(job_id).is_some())
    }

    pub async fn set_priority(&self, job_id: &JobId, priority: i32) -> Result<()> {
        let mut pools = self.pools.lock().await;
        let (_, entry) = find_job(&mut pools, job_id)?;
        entry.priority = priority;
        Ok(())
    }

    pub async fn set_weight(&self, job_id: &JobId, weight: f64) -> Result<()> {
        let mut pools = self.pools.lock().await;
        let (_, entry) = find_job(&mut pools, job_id)?;
        entry.weight = weight;
        Ok(())
    }

    /// Weight of a job, for inspection.
    pub async fn weight(&self, job_id: &JobId) -> Result<f64> {
        let mut pools = self.pools.lock().await;
        let (_, entry) = find_job(&mut pools, job_id)?;
        Ok(entry.weight)
    }

    /// Move a job to the back of another pool and return its new position.
    pub async fn move_to_pool(&self, job_id: &JobId, resource_pool: &str) -> Result<Position> {
        let mut pools = self.pools.lock().await;
        if !pools.contains_key(resource_pool) {
            return Err(unknown_pool(resource_pool));
        }

        let (current_pool, entry) = find_job(&mut pools, job_id)?;
        if current_pool == resource_pool {
            return Ok(entry.position);
        }
        let current_pool = current_pool.to_string();

        let mut entry = pools
            .get_mut(&current_pool)
            .and_then(|pool| pool.jobs.remove(job_id))
            .ok_or_else(|| Error::JobNotFound(job_id.clone()))?;
        let target = pools
            .get_mut(resource_pool)
            .ok_or_else(|| unknown_pool(resource_pool))?;
        entry.position = target.tail_position();
        let position = entry.position;
        target.jobs.insert(job_id.clone(), entry);

        info!(job_id = %job_id, from = %current_pool, to = %resource_pool, "Moved job to resource pool");
        Ok(position)
    }
}

#[async_trait]
impl ResourceManager for LocalResourceManager {
    async fn get_queue_snapshot(&self, resource_pool: &str) -> Result<QueueSnapshot> {
        let pools = self.pools.lock().await;
        let pool = pools
            .get(resource_pool)
            .ok_or_else(|| unknown_pool(resource_pool))?;
        Ok(pool.schedule())
    }

    async fn get_queue_stats(&self, resource_pool: &str) -> Result<QueueStats> {
        let pools = self.pools.lock().await;
        let pool = pools
            .get(resource_pool)
            .ok_or_else(|| unknown_pool(resource_pool))?;

        let mut stats = QueueStats::default();
        for info in pool.schedule().values() {
            if info.state.is_scheduled() {
                stats.scheduled_count += 1;
            } else {
                stats.queued_count += 1;
            }
        }
        Ok(stats)
    }

    async fn move_job(&self, request: MoveJob) -> Result<()> {
        if request.anchor.job_id() == Some(&request.id) {
            return Err(Error::InvalidInput(format!(
                "cannot move job {} relative to itself",
                request.id
            )));
        }

        let notifications = {
            let mut pools = self.pools.lock().await;
            let (pool_name, entry) = find_job(&mut pools, &request.id)?;
            let (priority, current) = (entry.priority, entry.position);
            let pool_name = pool_name.to_string();
            let pool = pools
                .get_mut(&pool_name)
                .ok_or_else(|| Error::Internal(format!("resource pool {} vanished", pool_name)))?;

            if let Anchor::Job(anchor_id) = &request.anchor {
                let anchor = pool.jobs.get(anchor_id).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "job {} is not in resource pool {}",
                        anchor_id, pool_name
                    ))
                })?;
                if anchor.priority != priority {
                    return Err(Error::InvalidInput(format!(
                        "job {} has priority {} but job {} has priority {}; \
                         only jobs with the same priority can be reordered",
                        request.id, priority, anchor_id, anchor.priority
                    )));
                }
            }

            let mut changed = Vec::new();
            let position = match pool.placement(&request, priority, current) {
                Err(Error::PositionExhausted { lower, upper }) => {
                    info!(resource_pool = %pool_name, %lower, %upper, "Rebalancing job positions");
                    changed = pool.rebalance();
                    let current = pool.jobs.get(&request.id).map(|e| e.position).unwrap_or(current);
                    pool.placement(&request, priority, current)?
                }
                other => other?,
            };

            if let Some(entry) = pool.jobs.get_mut(&request.id) {
                entry.position = position;
            }
            if !changed.contains(&request.id) {
                changed.push(request.id.clone());
            }

            changed
                .into_iter()
                .filter_map(|id| {
                    let entry = pool.jobs.get(&id)?;
                    Some((id, entry.position, entry.actor.clone()))
                })
                .collect::<Vec<_>>()
        };

        // Owners are told after the lock is released
        for (job_id, position, actor) in notifications {
            let Some(actor) = actor.upgrade() else {
                continue;
            };
            if let Err(e) = actor.register_job_position(job_id.clone(), position).await {
                warn!(job_id = %job_id, error = %e, "Failed to notify job of its new position");
            }
        }
        Ok(())
    }

    async fn recover_job_position(&self, request: RecoverJobPosition) -> Result<()> {
        let mut pools = self.pools.lock().await;
        let pool = pools
            .get_mut(&request.resource_pool)
            .ok_or_else(|| unknown_pool(&request.resource_pool))?;
        let entry = pool
            .jobs
            .get_mut(&request.job_id)
            .ok_or_else(|| Error::JobNotFound(request.job_id.clone()))?;

        debug!(job_id = %request.job_id, position = %request.position, "Recovered job position");
        entry.position = request.position;
        Ok(())
    }
}

fn find_job<'a>(
    pools: &'a mut HashMap<String, PoolState>,
    job_id: &JobId,
) -> Result<(&'a str, &'a mut PoolEntry)> {
    pools
        .iter_mut()
        .find_map(|(name, pool)| pool.jobs.get_mut(job_id).map(|e| (name.as_str(), e)))
        .ok_or_else(|| Error::JobNotFound(job_id.clone()))
}

fn unknown_pool(name: &str) -> Error {
    Error::InvalidInput(format!("resource pool {} does not exist", name))
}

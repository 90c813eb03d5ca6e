//! Cluster configuration parsing.
//!
//! ```kdl
//! registry mailbox=64
//!
//! pool "default" slots=4 {
//!     job "A" name="train" user="alice" priority=42 weight=1.0 slots=2
//!     job "B" type="command"
//! }
//! ```

use crate::{ConfigError, ConfigResult};
use jobline_core::JobId;
use jobline_core::job::JobType;
use kdl::{KdlDocument, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Priority given to jobs that do not set one.
pub const DEFAULT_PRIORITY: i32 = 42;

/// Mailbox capacity of the job registry when not configured.
pub const DEFAULT_MAILBOX: usize = 64;

/// Largest accepted registry mailbox.
pub const MAX_MAILBOX: usize = 1 << 20;

/// Full cluster configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub registry: RegistryConfig,
    pub pools: Vec<PoolConfig>,
}

impl ClusterConfig {
    pub fn pool(&self, name: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| p.name == name)
    }
}

/// Job registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Number of requests that may wait in the registry's mailbox.
    pub mailbox: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            mailbox: DEFAULT_MAILBOX,
        }
    }
}

/// A resource pool and the jobs seeded into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub name: String,
    /// Slot capacity of the pool.
    pub slots: u32,
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub id: JobId,
    pub name: String,
    pub user: String,
    pub job_type: JobType,
    pub priority: i32,
    pub weight: f64,
    pub slots: u32,
}

/// Read and parse a cluster configuration file.
pub fn load_cluster_config(path: impl AsRef<Path>) -> ConfigResult<ClusterConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_cluster_config(&content)
}

/// Parse a cluster configuration from KDL text.
pub fn parse_cluster_config(kdl: &str) -> ConfigResult<ClusterConfig> {
    let doc: KdlDocument = kdl.parse()?;

    let mut registry = RegistryConfig::default();
    let mut pools: Vec<PoolConfig> = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "registry" => {
                registry = parse_registry(node)?;
            }
            "pool" => {
                let pool = parse_pool(node)?;
                if pools.iter().any(|p| p.name == pool.name) {
                    return Err(ConfigError::DuplicatePool(pool.name));
                }
                pools.push(pool);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    // Job ids must be unique across the whole cluster, not just per pool
    let mut seen: HashMap<&JobId, &str> = HashMap::new();
    for pool in &pools {
        for job in &pool.jobs {
            if let Some(first_pool) = seen.insert(&job.id, &pool.name) {
                return Err(ConfigError::DuplicateJob {
                    job_id: job.id.to_string(),
                    pool: pool.name.clone(),
                    first_pool: first_pool.to_string(),
                });
            }
        }
    }

    Ok(ClusterConfig { registry, pools })
}

fn parse_registry(node: &KdlNode) -> ConfigResult<RegistryConfig> {
    let mailbox = match get_integer_prop(node, "mailbox")? {
        None => DEFAULT_MAILBOX,
        Some(n) => usize::try_from(n)
            .ok()
            .filter(|m| (1..=MAX_MAILBOX).contains(m))
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "registry mailbox".to_string(),
                message: format!("must be between 1 and {}, got {}", MAX_MAILBOX, n),
            })?,
    };
    Ok(RegistryConfig { mailbox })
}

fn parse_pool(node: &KdlNode) -> ConfigResult<PoolConfig> {
    let name = get_first_string_arg(node)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ConfigError::MissingField("pool name".to_string()))?;

    let slots = get_slots(node, &format!("slots of pool '{}'", name))?.unwrap_or(0);

    let mut jobs = Vec::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "job" {
                jobs.push(parse_job(child)?);
            }
        }
    }

    Ok(PoolConfig { name, slots, jobs })
}

fn parse_job(node: &KdlNode) -> ConfigResult<JobConfig> {
    let id = match get_first_string_arg(node) {
        Some(id) if !id.is_empty() => JobId::new(id),
        Some(_) => return Err(ConfigError::MissingField("job id".to_string())),
        None => JobId::generate(),
    };

    let priority = match get_integer_prop(node, "priority")? {
        Some(p) if (1..=99).contains(&p) => p as i32,
        Some(p) => {
            return Err(ConfigError::InvalidValue {
                field: format!("priority of job '{}'", id),
                message: format!("must be between 1 and 99, got {}", p),
            });
        }
        None => DEFAULT_PRIORITY,
    };

    let weight = match get_number_prop(node, "weight")? {
        Some(w) if w > 0.0 => w,
        Some(w) => {
            return Err(ConfigError::InvalidValue {
                field: format!("weight of job '{}'", id),
                message: format!("must be greater than 0, got {}", w),
            });
        }
        None => 1.0,
    };

    let job_type = match get_string_prop(node, "type") {
        Some(t) => t.parse().map_err(|e: jobline_core::Error| ConfigError::InvalidValue {
            field: format!("type of job '{}'", id),
            message: e.to_string(),
        })?,
        None => JobType::default(),
    };

    let slots = get_slots(node, &format!("slots of job '{}'", id))?.unwrap_or(1);

    Ok(JobConfig {
        name: get_string_prop(node, "name").unwrap_or_else(|| id.to_string()),
        user: get_string_prop(node, "user").unwrap_or_default(),
        id,
        job_type,
        priority,
        weight,
        slots,
    })
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_integer_prop(node: &KdlNode, name: &str) -> ConfigResult<Option<i128>> {
    match node.get(name) {
        None => Ok(None),
        Some(v) => v
            .as_integer()
            .map(Some)
            .ok_or_else(|| not_a_number(node, name, v)),
    }
}

fn get_number_prop(node: &KdlNode, name: &str) -> ConfigResult<Option<f64>> {
    match node.get(name) {
        None => Ok(None),
        Some(v) => v
            .as_float()
            .or_else(|| v.as_integer().map(|i| i as f64))
            .map(Some)
            .ok_or_else(|| not_a_number(node, name, v)),
    }
}

fn get_slots(node: &KdlNode, field: &str) -> ConfigResult<Option<u32>> {
    match get_integer_prop(node, "slots")? {
        None => Ok(None),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: field.to_string(),
                message: format!("must be a non-negative slot count, got {}", n),
            }),
    }
}

fn not_a_number(node: &KdlNode, name: &str, value: &KdlValue) -> ConfigError {
    ConfigError::InvalidValue {
        field: format!("{} of {}", name, node.name().value()),
        message: format!("expected a number, got {}", value),
    }
}

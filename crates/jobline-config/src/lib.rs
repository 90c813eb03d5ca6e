//! KDL configuration parsing for jobline.
//!
//! This crate handles parsing of:
//! - Registry settings
//! - Resource pools and the jobs seeded into them

pub mod cluster;
pub mod error;

pub use cluster::{ClusterConfig, JobConfig, PoolConfig, RegistryConfig};
pub use error::{ConfigError, ConfigResult};

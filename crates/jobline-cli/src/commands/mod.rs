//! CLI command implementations.

pub mod cluster;
pub mod control;
pub mod queue;

use anyhow::Result;
use jobline_core::failure::{ContainerStopped, ExitCode, is_restartable_system_error};

pub fn validate(path: &str) -> Result<()> {
    match jobline_config::cluster::load_cluster_config(path) {
        Ok(config) => {
            let jobs: usize = config.pools.iter().map(|p| p.jobs.len()).sum();
            println!(
                "Configuration is valid ({} pools, {} jobs)",
                config.pools.len(),
                jobs
            );
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn exit_status(code: i32) {
    let stopped = ContainerStopped::exited(ExitCode(code));
    println!("{}", stopped);
    if let Some(failure) = &stopped.failure {
        println!("restartable: {}", is_restartable_system_error(failure));
    }
}

//! Configuration parsing errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("KDL parse error: {0}")]
    Parse(#[from] kdl::KdlError),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("resource pool '{0}' is defined more than once")]
    DuplicatePool(String),

    #[error("job '{job_id}' in pool '{pool}' is already defined in pool '{first_pool}'")]
    DuplicateJob {
        job_id: String,
        pool: String,
        first_pool: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

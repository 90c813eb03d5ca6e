//! Container failure taxonomy.
//!
//! Decides whether a container or task exit was caused by the system (and
//! so should not count against a job's restart budget) or by the workload.

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;

/// Why a container stopped without completing successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureType {
    /// The container ran but exited with a non-zero code.
    ContainerFailed,
    /// The task was cancelled before it started.
    TaskAborted,
    /// The task failed without an associated exit code.
    TaskError,
    /// The agent failed while the container was running.
    AgentFailed,
    /// The agent failed to launch the container.
    AgentError,
}

impl FailureType {
    /// Whether a failure of this type is the system's fault rather than the workload's.
    pub fn is_restartable(&self) -> bool {
        match self {
            FailureType::ContainerFailed | FailureType::TaskError => false,
            // Arguably failures, but not counted against the workload.
            FailureType::AgentFailed | FailureType::AgentError => true,
            FailureType::TaskAborted => true,
        }
    }
}

impl std::fmt::Display for FailureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureType::ContainerFailed => "container failed with non-zero exit code",
            FailureType::TaskAborted => "task was aborted before the task was started",
            FailureType::TaskError => "task failed without an associated exit code",
            FailureType::AgentFailed => "agent failed while the container was running",
            FailureType::AgentError => "agent failed to launch the container",
        };
        f.write_str(s)
    }
}

/// Process exit code of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The reason a container did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerFailure {
    pub failure_type: FailureType,
    pub message: String,
    pub exit_code: Option<ExitCode>,
    /// Where the failure was recorded, when no underlying error was given.
    #[serde(skip)]
    pub backtrace: Option<String>,
}

impl std::fmt::Display for ContainerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.exit_code {
            None => write!(f, "{}: {}", self.failure_type, self.message),
            Some(code) => write!(
                f,
                "{}: {} (exit code {})",
                self.failure_type, self.message, code
            ),
        }
    }
}

impl std::error::Error for ContainerFailure {}

/// Outcome of a stopped container. No failure means it exited cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStopped {
    pub failure: Option<ContainerFailure>,
}

impl ContainerStopped {
    /// A stop caused by `err`. Without an error a placeholder message is
    /// recorded and the call site's backtrace is kept next to it.
    pub fn from_error(
        failure_type: FailureType,
        err: Option<&(dyn std::error::Error + 'static)>,
    ) -> Self {
        let (message, backtrace) = match err {
            Some(err) => (err.to_string(), None),
            None => (
                "unknown error occurred".to_string(),
                Some(Backtrace::force_capture().to_string()),
            ),
        };
        Self {
            failure: Some(ContainerFailure {
                failure_type,
                message,
                exit_code: None,
                backtrace,
            }),
        }
    }

    /// A stop with the given exit code. Code zero is not a failure.
    pub fn exited(code: ExitCode) -> Self {
        if code == ExitCode::SUCCESS {
            return Self::default();
        }
        Self {
            failure: Some(ContainerFailure {
                failure_type: FailureType::ContainerFailed,
                message: format!("{}: {}", FailureType::ContainerFailed, code),
                exit_code: Some(code),
                backtrace: None,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

impl std::fmt::Display for ContainerStopped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.failure {
            Some(failure) => write!(f, "{}", failure),
            None => f.write_str("container exited successfully"),
        }
    }
}

/// Whether `err` is a system failure that should not count against a job's
/// restart budget. Errors that are not a [`ContainerFailure`] never are.
pub fn is_restartable_system_error(err: &(dyn std::error::Error + 'static)) -> bool {
    err.downcast_ref::<ContainerFailure>()
        .is_some_and(|failure| failure.failure_type.is_restartable())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(failure_type: FailureType) -> ContainerFailure {
        ContainerFailure {
            failure_type,
            message: "boom".to_string(),
            exit_code: None,
            backtrace: None,
        }
    }

    #[test]
    fn test_classification() {
        assert!(!is_restartable_system_error(&failure(FailureType::ContainerFailed)));
        assert!(!is_restartable_system_error(&failure(FailureType::TaskError)));
        assert!(is_restartable_system_error(&failure(FailureType::AgentFailed)));
        assert!(is_restartable_system_error(&failure(FailureType::AgentError)));
        assert!(is_restartable_system_error(&failure(FailureType::TaskAborted)));
    }

    #[test]
    fn test_unclassified_errors_are_not_system_errors() {
        let err = std::io::Error::other("disk full");
        assert!(!is_restartable_system_error(&err));

        let err = crate::Error::Internal("agent lost".to_string());
        assert!(!is_restartable_system_error(&err));
    }

    #[test]
    fn test_classification_through_boxed_error() {
        let boxed: Box<dyn std::error::Error + Send + Sync> =
            Box::new(failure(FailureType::AgentFailed));
        assert!(is_restartable_system_error(boxed.as_ref()));
    }

    #[test]
    fn test_exit_code_zero_is_success() {
        let stopped = ContainerStopped::exited(ExitCode::SUCCESS);
        assert!(stopped.is_success());
        assert_eq!(stopped, ContainerStopped::default());
    }

    #[test]
    fn test_nonzero_exit_code_is_container_failure() {
        let stopped = ContainerStopped::exited(ExitCode(137));
        let failure = stopped.failure.expect("expected a failure");

        assert_eq!(failure.failure_type, FailureType::ContainerFailed);
        assert_eq!(failure.exit_code, Some(ExitCode(137)));
        let rendered = failure.to_string();
        assert!(rendered.contains("137"));
        assert!(rendered.ends_with("(exit code 137)"));
        assert!(!is_restartable_system_error(&failure));
    }

    #[test]
    fn test_rendering_without_exit_code() {
        let failure = failure(FailureType::AgentError);
        assert_eq!(
            failure.to_string(),
            "agent failed to launch the container: boom"
        );
    }

    #[test]
    fn test_from_error_uses_error_message() {
        let err = std::io::Error::other("image pull failed");
        let stopped = ContainerStopped::from_error(FailureType::AgentError, Some(&err));
        let failure = stopped.failure.unwrap();

        assert_eq!(failure.message, "image pull failed");
        assert_eq!(failure.exit_code, None);
        assert!(failure.backtrace.is_none());
        assert!(is_restartable_system_error(&failure));
    }

    #[test]
    fn test_from_error_without_error_synthesizes_message() {
        let stopped = ContainerStopped::from_error(FailureType::TaskError, None);
        let failure = stopped.failure.unwrap();

        assert_eq!(failure.message, "unknown error occurred");
        assert!(failure.backtrace.is_some());
        assert_eq!(failure.failure_type, FailureType::TaskError);
        assert_eq!(
            failure.to_string(),
            "task failed without an associated exit code: unknown error occurred"
        );
    }

    #[test]
    fn test_backtrace_stays_out_of_serialized_failure() {
        let stopped = ContainerStopped::from_error(FailureType::AgentFailed, None);
        let json = serde_json::to_value(&stopped).unwrap();

        assert_eq!(json["failure"]["message"], "unknown error occurred");
        assert!(json["failure"].get("backtrace").is_none());
    }
}

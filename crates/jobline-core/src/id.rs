//! Job identifiers and reorder anchors.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Opaque identity of a job.
///
/// Ordering is plain string ordering, which is what queue listings use to
/// break ties between jobs with the same number of jobs ahead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a JobId from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, time-ordered JobId using UUIDv7.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::InvalidInput("job id must not be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

/// Reference point for relative reordering within a pool.
///
/// `Head` and `Tail` are the synthetic ends of a pool's ordering. They are
/// separate variants so that no real job can ever be mistaken for one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    Job(JobId),
    Head,
    Tail,
}

impl Anchor {
    const HEAD: &'static str = "@head";
    const TAIL: &'static str = "@tail";

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Anchor::Job(id) => Some(id),
            Anchor::Head | Anchor::Tail => None,
        }
    }
}

impl From<JobId> for Anchor {
    fn from(id: JobId) -> Self {
        Anchor::Job(id)
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anchor::Job(id) => write!(f, "{}", id),
            Anchor::Head => f.write_str(Self::HEAD),
            Anchor::Tail => f.write_str(Self::TAIL),
        }
    }
}

impl std::str::FromStr for Anchor {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            Self::HEAD => Ok(Anchor::Head),
            Self::TAIL => Ok(Anchor::Tail),
            _ => Ok(Anchor::Job(s.parse()?)),
        }
    }
}

//! Core domain types and traits for the jobline job queue.
//!
//! This crate contains:
//! - Job identifiers and reorder anchors
//! - Job descriptors, scheduling info and queue snapshots
//! - Queue control actions
//! - Fixed-point queue positions
//! - Resource manager and job actor traits
//! - The container failure taxonomy

pub mod actor;
pub mod control;
pub mod error;
pub mod failure;
pub mod id;
pub mod job;
pub mod position;
pub mod rm;

pub use actor::{JobActor, JobHandle};
pub use error::{BatchErrors, Error, Result};
pub use id::{Anchor, JobId};
pub use position::Position;

//! Cron scheduling for rotation jobs.
//!
//! One job per channel, evaluated in a single configured time zone. The
//! scheduler never runs the same channel twice at once; run records are kept
//! in memory only.

pub mod error;
pub mod schedule;
pub mod service;
pub mod types;

pub use {
    error::{Error, Result},
    schedule::{compute_next_run, next_after, parse_cron},
    service::{FireFn, RotationScheduler},
    types::{JobSnapshot, JobState, RotationJob, RunRecord, RunStatus, SchedulerStatus},
};

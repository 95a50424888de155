//! Job, state and run-record types.

/// A rotation job to schedule: one channel and its cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationJob {
    pub channel: String,
    pub expr: String,
}

impl RotationJob {
    pub fn new(channel: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            expr: expr.into(),
        }
    }
}

/// Outcome of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    Error,
}

/// Mutable runtime state of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobState {
    pub next_run_at_ms: Option<u64>,
    pub running_at_ms: Option<u64>,
    pub last_run_at_ms: Option<u64>,
    pub last_status: Option<RunStatus>,
    pub last_error: Option<String>,
    pub last_duration_ms: Option<u64>,
}

/// Record of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub channel: String,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub status: RunStatus,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A job as seen from outside the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub channel: String,
    pub expr: String,
    pub state: JobState,
}

/// Summary status of the scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    pub running: bool,
    pub job_count: usize,
    pub next_run_at_ms: Option<u64>,
    pub jobs: Vec<JobSnapshot>,
}

//! Rotation scheduler: timer loop, job execution, run history.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    pin::Pin,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    chrono_tz::Tz,
    cron::Schedule,
    tokio::{
        sync::{Mutex, Notify, RwLock},
        task::JoinHandle,
    },
    tracing::{debug, error, info, warn},
};

use crate::{
    Error, Result,
    schedule::{next_after, parse_cron},
    types::{JobSnapshot, JobState, RotationJob, RunRecord, RunStatus, SchedulerStatus},
};

/// Callback invoked with the channel name each time its job fires.
pub type FireFn =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync>;

/// Run records kept per channel; older ones are dropped.
pub const MAX_RUNS_PER_CHANNEL: usize = 100;

/// Poll interval when no job has a future run.
const IDLE_POLL_MS: u64 = 60_000;

/// Default limit on one run; the callback is cancelled past it (2 hours).
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

struct Job {
    channel: String,
    expr: String,
    schedule: Schedule,
    state: JobState,
}

/// Fires each channel's rotation on its cron schedule.
///
/// A job is marked running before its callback is spawned and is not fired
/// again until that run finishes; firings missed meanwhile are skipped. A run
/// that exceeds the run timeout is cancelled before the mark is cleared.
pub struct RotationScheduler {
    jobs: RwLock<Vec<Job>>,
    runs: RwLock<HashMap<String, VecDeque<RunRecord>>>,
    tz: Tz,
    on_fire: FireFn,
    run_timeout: Duration,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
    wake_notify: Arc<Notify>,
    running: RwLock<bool>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl RotationScheduler {
    /// Parse every job's expression and compute its first run.
    pub fn new(jobs: Vec<RotationJob>, tz: Tz, on_fire: FireFn) -> Result<Arc<Self>> {
        Self::with_run_timeout(jobs, tz, on_fire, DEFAULT_RUN_TIMEOUT)
    }

    /// Like [`RotationScheduler::new`] with a custom limit on each run.
    pub fn with_run_timeout(
        jobs: Vec<RotationJob>,
        tz: Tz,
        on_fire: FireFn,
        run_timeout: Duration,
    ) -> Result<Arc<Self>> {
        let now = now_ms();
        let mut parsed = Vec::with_capacity(jobs.len());
        for job in jobs {
            if parsed.iter().any(|j: &Job| j.channel == job.channel) {
                return Err(Error::message(format!(
                    "duplicate rotation job for channel {}",
                    job.channel
                )));
            }
            let schedule = parse_cron(&job.expr)?;
            let state = JobState {
                next_run_at_ms: next_after(&schedule, tz, now),
                ..Default::default()
            };
            parsed.push(Job {
                channel: job.channel,
                expr: job.expr,
                schedule,
                state,
            });
        }

        Ok(Arc::new(Self {
            jobs: RwLock::new(parsed),
            runs: RwLock::new(HashMap::new()),
            tz,
            on_fire,
            run_timeout,
            timer_handle: Mutex::new(None),
            wake_notify: Arc::new(Notify::new()),
            running: RwLock::new(false),
        }))
    }

    /// Recompute next runs and start the timer loop.
    pub async fn start(self: &Arc<Self>) {
        {
            let now = now_ms();
            let mut jobs = self.jobs.write().await;
            for job in jobs.iter_mut() {
                job.state.next_run_at_ms = next_after(&job.schedule, self.tz, now);
            }
            info!(count = jobs.len(), tz = %self.tz, "rotation scheduler started");
        }

        *self.running.write().await = true;

        let svc = Arc::clone(self);
        let handle = tokio::spawn(async move {
            svc.timer_loop().await;
        });

        *self.timer_handle.lock().await = Some(handle);
    }

    /// Stop the timer loop. Runs already in flight finish on their own.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        self.wake_notify.notify_one();

        let mut handle = self.timer_handle.lock().await;
        if let Some(h) = handle.take() {
            h.abort();
        }
        info!("rotation scheduler stopped");
    }

    /// Run a channel's rotation now, outside its schedule.
    pub async fn run_now(self: &Arc<Self>, channel: &str) -> Result<RunRecord> {
        {
            let mut jobs = self.jobs.write().await;
            let job = jobs
                .iter_mut()
                .find(|j| j.channel == channel)
                .ok_or_else(|| Error::job_not_found(channel))?;
            if job.state.running_at_ms.is_some() {
                return Err(Error::already_running(channel));
            }
            job.state.running_at_ms = Some(now_ms());
        }

        Ok(self.execute(channel.to_string()).await)
    }

    /// Most recent runs for `channel`, newest first.
    pub async fn runs(&self, channel: &str, limit: usize) -> Vec<RunRecord> {
        let runs = self.runs.read().await;
        runs.get(channel)
            .map(|r| r.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub async fn status(&self) -> SchedulerStatus {
        let jobs = self.jobs.read().await;
        let running = *self.running.read().await;
        SchedulerStatus {
            running,
            job_count: jobs.len(),
            next_run_at_ms: jobs.iter().filter_map(|j| j.state.next_run_at_ms).min(),
            jobs: jobs
                .iter()
                .map(|j| JobSnapshot {
                    channel: j.channel.clone(),
                    expr: j.expr.clone(),
                    state: j.state.clone(),
                })
                .collect(),
        }
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn timer_loop(self: &Arc<Self>) {
        loop {
            if !*self.running.read().await {
                break;
            }

            let sleep_ms = self.ms_until_next_wake().await;

            if sleep_ms > 0 {
                let notify = Arc::clone(&self.wake_notify);
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {},
                    () = notify.notified() => {
                        debug!("timer loop woken by notify");
                        continue;
                    },
                }
            }

            if !*self.running.read().await {
                break;
            }

            self.process_due_jobs().await;
        }
    }

    async fn ms_until_next_wake(&self) -> u64 {
        let jobs = self.jobs.read().await;
        let now = now_ms();
        jobs.iter()
            .filter(|j| j.state.running_at_ms.is_none())
            .filter_map(|j| j.state.next_run_at_ms)
            .map(|t| t.saturating_sub(now))
            .min()
            .unwrap_or(IDLE_POLL_MS)
    }

    async fn process_due_jobs(self: &Arc<Self>) {
        let now = now_ms();
        let due: Vec<String> = {
            let mut jobs = self.jobs.write().await;
            let mut due = Vec::new();
            for job in jobs.iter_mut() {
                if job.state.next_run_at_ms.is_some_and(|t| t <= now)
                    && job.state.running_at_ms.is_none()
                {
                    // Marked under the write lock so the next tick skips it.
                    job.state.running_at_ms = Some(now);
                    due.push(job.channel.clone());
                }
            }
            due
        };

        for channel in due {
            let svc = Arc::clone(self);
            tokio::spawn(async move {
                svc.execute(channel).await;
            });
        }
    }

    async fn execute(&self, channel: String) -> RunRecord {
        let started = now_ms();
        info!(channel = %channel, "rotation job firing");

        // Dropping the callback future on timeout cancels the run, so the
        // channel is never rotated twice at once.
        let result =
            match tokio::time::timeout(self.run_timeout, (self.on_fire)(channel.clone())).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(channel = %channel, "rotation job timed out, cancelling");
                    Err(anyhow::anyhow!(
                        "timed out after {}s",
                        self.run_timeout.as_secs()
                    ))
                },
            };

        let finished = now_ms();
        let duration_ms = finished.saturating_sub(started);
        let (status, error_msg) = match result {
            Ok(()) => (RunStatus::Ok, None),
            Err(e) => {
                let message = format!("{e:#}");
                error!(channel = %channel, error = %message, "rotation job failed");
                (RunStatus::Error, Some(message))
            },
        };

        let record = RunRecord {
            channel: channel.clone(),
            started_at_ms: started,
            finished_at_ms: finished,
            status,
            error: error_msg.clone(),
            duration_ms,
        };
        {
            let mut runs = self.runs.write().await;
            let history = runs.entry(channel.clone()).or_default();
            history.push_back(record.clone());
            while history.len() > MAX_RUNS_PER_CHANNEL {
                history.pop_front();
            }
        }

        {
            let now = now_ms();
            let mut jobs = self.jobs.write().await;
            if let Some(job) = jobs.iter_mut().find(|j| j.channel == channel) {
                job.state.running_at_ms = None;
                job.state.last_run_at_ms = Some(finished);
                job.state.last_status = Some(status);
                job.state.last_error = error_msg;
                job.state.last_duration_ms = Some(duration_ms);
                job.state.next_run_at_ms = next_after(&job.schedule, self.tz, now);
            }
        }
        self.wake_notify.notify_one();

        info!(channel = %channel, status = ?status, duration_ms, "rotation job finished");
        record
    }
}

//! Execution follower
//!
//! Polls a submitted job until it reaches a terminal status, tailing its
//! progress log and enforcing two independent budgets:
//! - readiness: how long the job may stay queued before it starts
//! - staleness: how long a started job may go without output or a status change
//!
//! Exactly one phase is active at a time, so only one of the two budgets can
//! fire.

use std::future::Future;
use std::time::Duration;

use tether_core::domain::job::{JobHandle, JobStatus};
use tether_core::domain::outcome::FollowOutcome;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::JobApi;
use crate::config::{
    DEFAULT_JOB_READY_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_PRINT_TIMEOUT,
    DEFAULT_REQUEST_TIMEOUT,
};
use crate::error::{ClientError, Result};
use crate::sink::OutputSink;

/// Timing settings for a single follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowSettings {
    /// Maximum time between the first poll and the job starting
    pub readiness_timeout: Duration,
    /// Maximum time a started job may go without output or status change
    pub staleness_timeout: Duration,
    /// Constant interval between polls
    pub poll_interval: Duration,
    /// Deadline for each status or log call
    pub request_timeout: Duration,
}

impl Default for FollowSettings {
    fn default() -> Self {
        Self {
            readiness_timeout: DEFAULT_JOB_READY_TIMEOUT,
            staleness_timeout: DEFAULT_PRINT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Submitted, waiting for `Running` or a terminal status
    AwaitingStart { since: Instant },
    /// Started; `last_activity` is the last output or status change
    Tracking { last_activity: Instant },
}

impl Phase {
    /// Start of the current budget window and its length
    fn window(&self, settings: &FollowSettings) -> (Instant, Duration) {
        match *self {
            Phase::AwaitingStart { since } => (since, settings.readiness_timeout),
            Phase::Tracking { last_activity } => (last_activity, settings.staleness_timeout),
        }
    }
}

/// Remembers how much of the remote log was already emitted
#[derive(Debug, Default)]
struct LogCursor {
    emitted: usize,
}

impl LogCursor {
    /// Returns the part of `log` not emitted yet
    ///
    /// A log that no longer extends what was already emitted (shorter, or
    /// split inside a character at the old length) was rewritten remotely
    /// and is emitted again from the start.
    fn advance<'a>(&mut self, log: &'a str) -> Option<&'a str> {
        if !log.is_char_boundary(self.emitted) {
            self.emitted = 0;
        }
        let fresh = &log[self.emitted..];
        self.emitted = log.len();

        if fresh.is_empty() { None } else { Some(fresh) }
    }
}

/// Follows submitted jobs through a [`JobApi`]
pub struct ExecutionFollower<A> {
    api: A,
}

impl<A: JobApi> ExecutionFollower<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    #[cfg(test)]
    fn api(&self) -> &A {
        &self.api
    }

    /// Follows `handle` until it is terminal, a budget runs out, or `cancel`
    /// fires
    ///
    /// Single failed polls are logged and retried on the next interval.
    /// Once a terminal status is seen the status is not polled again; the log
    /// is read one last time so its tail reaches `sink`.
    pub async fn follow(
        &self,
        handle: &JobHandle,
        settings: &FollowSettings,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> FollowOutcome {
        let mut phase = Phase::AwaitingStart {
            since: Instant::now(),
        };
        let mut last_status: Option<JobStatus> = None;
        let mut cursor = LogCursor::default();
        // When the current run of failed polls started
        let mut failing_since: Option<Instant> = None;

        info!(
            "Following job {} (ready timeout {:?}, print timeout {:?}, poll interval {:?})",
            handle, settings.readiness_timeout, settings.staleness_timeout, settings.poll_interval
        );

        loop {
            if cancel.is_cancelled() {
                return FollowOutcome::Cancelled { last_status };
            }

            let issued = Instant::now();
            let polled = tokio::select! {
                _ = cancel.cancelled() => return FollowOutcome::Cancelled { last_status },
                polled = bounded(settings.request_timeout, self.api.job_info(handle)) => polled,
            };
            let now = Instant::now();

            match polled {
                Ok(job) => {
                    failing_since = None;
                    let status = job.status;
                    let changed = last_status != Some(status);

                    if changed {
                        match last_status {
                            Some(previous) => {
                                info!("Job {} status changed: {} -> {}", handle, previous, status)
                            }
                            None => info!("Job {} status: {}", handle, status),
                        }
                    } else {
                        debug!("Job {} status: {}", handle, status);
                    }
                    last_status = Some(status);

                    if let Phase::AwaitingStart { since } = phase {
                        if status.has_started() {
                            info!(
                                "Job {} started after {:?}",
                                handle,
                                now.duration_since(since)
                            );
                            phase = Phase::Tracking { last_activity: now };
                        } else if now.duration_since(since) >= settings.readiness_timeout {
                            warn!(
                                "Job {} did not start within {:?}",
                                handle, settings.readiness_timeout
                            );
                            return FollowOutcome::ReadinessTimeout {
                                waited: now.duration_since(since),
                                last_status,
                            };
                        }
                    }

                    if let Phase::Tracking { last_activity } = &mut phase {
                        if changed {
                            *last_activity = now;
                        }

                        let emitted = tokio::select! {
                            _ = cancel.cancelled() => return FollowOutcome::Cancelled { last_status },
                            emitted = self.tail_log(handle, settings, sink, &mut cursor) => emitted,
                        };
                        if emitted {
                            *last_activity = Instant::now();
                        }

                        if status.is_terminal() {
                            info!("Job {} finished with status {}", handle, status);
                            return FollowOutcome::Completed {
                                final_status: status,
                                message: job.message,
                            };
                        }

                        let idle = Instant::now().duration_since(*last_activity);
                        if idle >= settings.staleness_timeout {
                            warn!(
                                "Job {} produced no output or status change for {:?}",
                                handle, idle
                            );
                            return FollowOutcome::StalenessTimeout { idle, last_status: status };
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to poll status of job {}: {}", handle, e);

                    let failing_since = *failing_since.get_or_insert(issued);
                    let (window_start, window) = phase.window(settings);

                    // Budget ran out with the status unreadable
                    if now.duration_since(window_start) >= window {
                        warn!(
                            "Job {} status unreadable for {:?}, giving up",
                            handle,
                            now.duration_since(failing_since)
                        );
                        return FollowOutcome::PollingError {
                            message: e.to_string(),
                            last_status,
                        };
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return FollowOutcome::Cancelled { last_status },
                _ = tokio::time::sleep(settings.poll_interval) => {}
            }
        }
    }

    /// Fetches the log and emits anything new; returns whether output was
    /// emitted
    async fn tail_log(
        &self,
        handle: &JobHandle,
        settings: &FollowSettings,
        sink: &dyn OutputSink,
        cursor: &mut LogCursor,
    ) -> bool {
        match bounded(settings.request_timeout, self.api.job_log(handle)).await {
            Ok(log) => match cursor.advance(&log) {
                Some(fresh) => {
                    sink.emit(handle, fresh);
                    true
                }
                None => false,
            },
            Err(e) => {
                warn!("Failed to fetch log of job {}: {}", handle, e);
                false
            }
        }
    }
}

/// Applies a deadline to a single API call
async fn bounded<T>(limit: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tether_core::domain::job::JobInfo;

    #[derive(Debug, Clone)]
    enum Step {
        Status(JobStatus),
        Fail,
        Hang,
    }

    #[derive(Debug, Clone)]
    enum LogStep {
        Text(String),
        Fail,
    }

    /// Scripted job API; the last step of each script repeats forever
    struct ScriptedApi {
        statuses: Mutex<VecDeque<Step>>,
        logs: Mutex<VecDeque<LogStep>>,
        info_calls: AtomicU32,
        log_calls: AtomicU32,
    }

    impl ScriptedApi {
        fn new(statuses: Vec<Step>, logs: Vec<&str>) -> Self {
            let logs = logs.into_iter().map(|l| LogStep::Text(l.to_string()));
            Self::with_log_steps(statuses, logs.collect())
        }

        fn with_log_steps(statuses: Vec<Step>, logs: Vec<LogStep>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                logs: Mutex::new(logs.into()),
                info_calls: AtomicU32::new(0),
                log_calls: AtomicU32::new(0),
            }
        }

        fn statuses(statuses: &[JobStatus]) -> Self {
            Self::new(statuses.iter().copied().map(Step::Status).collect(), vec![""])
        }

        fn info_calls(&self) -> u32 {
            self.info_calls.load(Ordering::SeqCst)
        }

        fn log_calls(&self) -> u32 {
            self.log_calls.load(Ordering::SeqCst)
        }
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> T {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }

    #[async_trait]
    impl JobApi for ScriptedApi {
        async fn job_info(&self, handle: &JobHandle) -> Result<JobInfo> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            match next(&self.statuses) {
                Step::Status(status) => Ok(JobInfo::with_status(&handle.submission_id, status)),
                Step::Fail => Err(ClientError::api_error(503, "control plane unavailable")),
                Step::Hang => std::future::pending().await,
            }
        }

        async fn job_log(&self, _handle: &JobHandle) -> Result<String> {
            self.log_calls.fetch_add(1, Ordering::SeqCst);
            match next(&self.logs) {
                LogStep::Text(log) => Ok(log),
                LogStep::Fail => Err(ClientError::api_error(502, "log service unavailable")),
            }
        }
    }

    fn handle() -> JobHandle {
        JobHandle::new("docq", "kubeflow", "sub-42")
    }

    fn settings(readiness: u64, staleness: u64) -> FollowSettings {
        FollowSettings {
            readiness_timeout: Duration::from_secs(readiness),
            staleness_timeout: Duration::from_secs(staleness),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_running_succeeded_completes() {
        use JobStatus::*;
        let api = ScriptedApi::new(
            vec![
                Step::Status(Pending),
                Step::Status(Pending),
                Step::Status(Running),
                Step::Status(Succeeded),
            ],
            vec!["reading input\n", "reading input\nwrote 3 files\n"],
        );
        let follower = ExecutionFollower::new(api);
        let sink = MemorySink::new();

        let outcome = follower
            .follow(&handle(), &settings(10, 10), &sink, &CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            FollowOutcome::Completed {
                final_status: Succeeded,
                message: None
            }
        );
        assert_eq!(follower.api().info_calls(), 4);
        assert_eq!(sink.contents(), "reading input\nwrote 3 files\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_pending_hits_readiness_timeout() {
        let follower = ExecutionFollower::new(ScriptedApi::statuses(&[JobStatus::Pending]));
        let started = Instant::now();

        let outcome = follower
            .follow(
                &handle(),
                &settings(5, 120),
                &MemorySink::new(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            outcome,
            FollowOutcome::ReadinessTimeout {
                waited: Duration::from_secs(5),
                last_status: Some(JobStatus::Pending)
            }
        );
        assert!(started.elapsed() <= Duration::from_secs(6));
        assert_eq!(follower.api().info_calls(), 6);
        assert_eq!(follower.api().log_calls(), 0);

        // Nothing keeps polling after the outcome was returned
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(follower.api().info_calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_counts_as_not_started() {
        let follower = ExecutionFollower::new(ScriptedApi::statuses(&[JobStatus::Unknown]));

        let outcome = follower
            .follow(
                &handle(),
                &settings(3, 120),
                &MemorySink::new(),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(outcome, FollowOutcome::ReadinessTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_on_first_poll_stops_polling() {
        let api = ScriptedApi::new(vec![Step::Status(JobStatus::Failed)], vec!["Traceback\n"]);
        let follower = ExecutionFollower::new(api);
        let sink = MemorySink::new();

        let outcome = follower
            .follow(&handle(), &settings(10, 10), &sink, &CancellationToken::new())
            .await;

        assert_eq!(outcome.last_status(), Some(JobStatus::Failed));
        assert!(outcome.is_failure());
        assert_eq!(follower.api().info_calls(), 1);
        assert_eq!(follower.api().log_calls(), 1);
        assert_eq!(sink.contents(), "Traceback\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_running_hits_staleness_timeout() {
        let api = ScriptedApi::new(vec![Step::Status(JobStatus::Running)], vec!["started\n"]);
        let follower = ExecutionFollower::new(api);
        let started = Instant::now();

        let outcome = follower
            .follow(
                &handle(),
                &settings(60, 3),
                &MemorySink::new(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            outcome,
            FollowOutcome::StalenessTimeout {
                idle: Duration::from_secs(3),
                last_status: JobStatus::Running
            }
        );
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_output_keeps_job_alive() {
        let mut statuses = vec![Step::Status(JobStatus::Running); 6];
        statuses.push(Step::Status(JobStatus::Succeeded));
        let api = ScriptedApi::new(
            statuses,
            vec!["1\n", "1\n2\n", "1\n2\n3\n", "1\n2\n3\n4\n", "1\n2\n3\n4\n5\n", "1\n2\n3\n4\n5\n6\n"],
        );
        let follower = ExecutionFollower::new(api);
        let sink = MemorySink::new();

        let outcome = follower
            .follow(&handle(), &settings(60, 2), &sink, &CancellationToken::new())
            .await;

        assert!(!outcome.is_failure());
        assert_eq!(sink.contents(), "1\n2\n3\n4\n5\n6\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_poll_errors_are_tolerated() {
        use JobStatus::*;
        let api = ScriptedApi::new(
            vec![
                Step::Status(Pending),
                Step::Fail,
                Step::Fail,
                Step::Status(Running),
                Step::Status(Succeeded),
            ],
            vec![""],
        );
        let follower = ExecutionFollower::new(api);

        let outcome = follower
            .follow(
                &handle(),
                &settings(10, 10),
                &MemorySink::new(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outcome.last_status(), Some(Succeeded));
        assert_eq!(follower.api().info_calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_poll_errors_escalate() {
        let follower = ExecutionFollower::new(ScriptedApi::new(vec![Step::Fail], vec![""]));

        let outcome = follower
            .follow(
                &handle(),
                &settings(4, 120),
                &MemorySink::new(),
                &CancellationToken::new(),
            )
            .await;

        match outcome {
            FollowOutcome::PollingError {
                message,
                last_status,
            } => {
                assert!(message.contains("control plane unavailable"));
                assert_eq!(last_status, None);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_while_tracking_are_not_staleness() {
        use JobStatus::*;
        let api = ScriptedApi::new(vec![Step::Status(Running), Step::Fail], vec!["started\n"]);
        let follower = ExecutionFollower::new(api);
        let started = Instant::now();

        let outcome = follower
            .follow(
                &handle(),
                &settings(60, 5),
                &MemorySink::new(),
                &CancellationToken::new(),
            )
            .await;

        match outcome {
            FollowOutcome::PollingError {
                message,
                last_status,
            } => {
                assert!(message.contains("control plane unavailable"));
                assert_eq!(last_status, Some(Running));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_while_awaiting_start_are_not_readiness() {
        use JobStatus::*;
        let api = ScriptedApi::new(vec![Step::Status(Pending), Step::Fail], vec![""]);
        let follower = ExecutionFollower::new(api);

        let outcome = follower
            .follow(
                &handle(),
                &settings(5, 120),
                &MemorySink::new(),
                &CancellationToken::new(),
            )
            .await;

        match outcome {
            FollowOutcome::PollingError { last_status, .. } => {
                assert_eq!(last_status, Some(Pending))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_log_fetch_does_not_count_as_activity() {
        let api = ScriptedApi::with_log_steps(
            vec![Step::Status(JobStatus::Running)],
            vec![LogStep::Text("started\n".to_string()), LogStep::Fail],
        );
        let follower = ExecutionFollower::new(api);
        let sink = MemorySink::new();

        let outcome = follower
            .follow(&handle(), &settings(60, 3), &sink, &CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            FollowOutcome::StalenessTimeout {
                idle: Duration::from_secs(3),
                last_status: JobStatus::Running
            }
        );
        assert_eq!(sink.contents(), "started\n");
        assert_eq!(follower.api().log_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_calls_hit_the_call_deadline() {
        let follower = ExecutionFollower::new(ScriptedApi::new(vec![Step::Hang], vec![""]));
        let started = Instant::now();

        let outcome = follower
            .follow(
                &handle(),
                &settings(3, 120),
                &MemorySink::new(),
                &CancellationToken::new(),
            )
            .await;

        match outcome {
            FollowOutcome::PollingError { message, .. } => assert!(message.contains("timed out")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(started.elapsed() <= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_at_poll_boundary() {
        let follower = ExecutionFollower::new(ScriptedApi::statuses(&[JobStatus::Pending]));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let outcome = follower
            .follow(&handle(), &settings(600, 120), &MemorySink::new(), &cancel)
            .await;

        assert_eq!(
            outcome,
            FollowOutcome::Cancelled {
                last_status: Some(JobStatus::Pending)
            }
        );
        assert_eq!(started.elapsed(), Duration::from_millis(2500));
        assert_eq!(follower.api().info_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_status_call() {
        use JobStatus::*;
        let api = ScriptedApi::new(vec![Step::Status(Pending), Step::Hang], vec![""]);
        let follower = ExecutionFollower::new(api);
        let cancel = CancellationToken::new();
        let slow_calls = FollowSettings {
            request_timeout: Duration::from_secs(30),
            ..settings(600, 120)
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let outcome = follower
            .follow(&handle(), &slow_calls, &MemorySink::new(), &cancel)
            .await;

        assert_eq!(
            outcome,
            FollowOutcome::Cancelled {
                last_status: Some(Pending)
            }
        );
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
        assert_eq!(follower.api().info_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_does_not_poll() {
        let follower = ExecutionFollower::new(ScriptedApi::statuses(&[JobStatus::Running]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = follower
            .follow(&handle(), &settings(10, 10), &MemorySink::new(), &cancel)
            .await;

        assert_eq!(outcome, FollowOutcome::Cancelled { last_status: None });
        assert_eq!(follower.api().info_calls(), 0);
    }

    #[test]
    fn test_log_cursor_emits_only_new_text() {
        let mut cursor = LogCursor::default();
        assert_eq!(cursor.advance(""), None);
        assert_eq!(cursor.advance("a\n"), Some("a\n"));
        assert_eq!(cursor.advance("a\n"), None);
        assert_eq!(cursor.advance("a\nb\n"), Some("b\n"));
    }

    #[test]
    fn test_log_cursor_restarts_on_shorter_log() {
        let mut cursor = LogCursor::default();
        cursor.advance("attempt 1: lots of output\n");
        assert_eq!(cursor.advance("attempt 2\n"), Some("attempt 2\n"));
    }

    #[test]
    fn test_log_cursor_restarts_when_old_length_splits_a_character() {
        let mut cursor = LogCursor::default();
        assert_eq!(cursor.advance("ab"), Some("ab"));
        // Byte 2 falls inside 'é'
        assert_eq!(cursor.advance("héllo\n"), Some("héllo\n"));
        assert_eq!(cursor.advance("héllo\nworld\n"), Some("world\n"));
    }
}

//! Polling monitor for long-running Azure operations.
//!
//! Deployments are started with `--no-wait`, then a probe is polled at a
//! fixed interval until it reports a terminal state or the timeout expires.
//! A monitor can run in the foreground (with a spinner) or on a detached
//! thread registered in [`BackgroundJobs`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::core::error::AppError;
use crate::core::logging::Logger;

/// Provisioning state as reported by `az`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningState {
    Succeeded,
    Failed,
    Canceled,
    Deleting,
    /// Any other non-terminal state (Accepted, Running, Updating...).
    InProgress(String),
    /// The resource does not exist (yet, or anymore).
    NotFound,
}

impl ProvisioningState {
    /// Parses the raw `provisioningState` string.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().trim_matches('"');
        match raw.to_ascii_lowercase().as_str() {
            "" => Self::NotFound,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            "deleting" => Self::Deleting,
            _ => Self::InProgress(raw.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    pub fn exists(&self) -> bool {
        *self != Self::NotFound
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::Canceled => write!(f, "Canceled"),
            Self::Deleting => write!(f, "Deleting"),
            Self::InProgress(raw) => write!(f, "{}", raw),
            Self::NotFound => write!(f, "Not deployed"),
        }
    }
}

/// Something that can be polled for a provisioning state.
pub trait ProvisioningProbe: Send {
    /// Human-readable description of what is being watched.
    fn label(&self) -> String;

    /// Reads the current state once.
    fn poll(&mut self) -> Result<ProvisioningState, AppError>;
}

/// Waits out an operation sent with `--no-wait` on a resource that is
/// already `Succeeded`.
///
/// `Succeeded` only counts once another state has been seen, or after
/// `settle_polls` consecutive `Succeeded` reads when Azure had nothing to do.
/// Until then the state is reported as `InProgress("Pending")`.
pub struct AwaitTransition<P> {
    inner: P,
    settle_polls: u32,
    unchanged_polls: u32,
    transitioned: bool,
}

impl<P: ProvisioningProbe> AwaitTransition<P> {
    pub fn new(inner: P, settle_polls: u32) -> Self {
        Self {
            inner,
            settle_polls: settle_polls.max(1),
            unchanged_polls: 0,
            transitioned: false,
        }
    }
}

impl<P: ProvisioningProbe> ProvisioningProbe for AwaitTransition<P> {
    fn label(&self) -> String {
        self.inner.label()
    }

    fn poll(&mut self) -> Result<ProvisioningState, AppError> {
        let state = self.inner.poll()?;
        if state != ProvisioningState::Succeeded {
            self.transitioned = true;
            return Ok(state);
        }
        if self.transitioned {
            return Ok(state);
        }
        self.unchanged_polls += 1;
        if self.unchanged_polls >= self.settle_polls {
            Ok(state)
        } else {
            Ok(ProvisioningState::InProgress("Pending".into()))
        }
    }
}

/// Poll interval and overall timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl MonitorSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn network() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(10 * 60))
    }

    pub fn nat_gateway() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(15 * 60))
    }

    /// VPN gateways routinely take 30-45 minutes to provision.
    pub fn vpn_gateway() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(60 * 60))
    }

    pub fn resource_group_deletion() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(30 * 60))
    }

    pub fn gateway_toggle() -> Self {
        Self::new(Duration::from_secs(15), Duration::from_secs(5 * 60))
    }
}

/// How a monitoring run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    Succeeded { elapsed: Duration },
    Failed { state: ProvisioningState, elapsed: Duration },
    TimedOut { last_state: Option<ProvisioningState>, elapsed: Duration },
    Cancelled,
}

impl MonitorOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Converts non-success outcomes into errors.
    pub fn into_result(self, what: &str) -> Result<Duration, AppError> {
        match self {
            Self::Succeeded { elapsed } => Ok(elapsed),
            Self::Failed { state, .. } => Err(AppError::Deploy(format!(
                "{} finished with state {}",
                what, state
            ))),
            Self::TimedOut { elapsed, .. } => Err(AppError::MonitorTimeout {
                what: what.to_string(),
                minutes: elapsed.as_secs() / 60,
            }),
            Self::Cancelled => Err(AppError::Cancelled),
        }
    }
}

/// Fixed-interval polling loop.
#[derive(Debug, Clone)]
pub struct DeploymentMonitor {
    settings: MonitorSettings,
    cancel: Arc<AtomicBool>,
    logger: Logger,
}

impl DeploymentMonitor {
    pub fn new(settings: MonitorSettings, logger: Logger) -> Self {
        Self {
            settings,
            cancel: Arc::new(AtomicBool::new(false)),
            logger,
        }
    }

    /// Shares an existing cancel flag (e.g. the one set by Ctrl-C).
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Polls until a terminal state, timeout, or cancellation.
    /// `on_tick` is called after every poll with the state and elapsed time.
    pub fn run<F>(&self, probe: &mut dyn ProvisioningProbe, mut on_tick: F) -> MonitorOutcome
    where
        F: FnMut(&ProvisioningState, Duration),
    {
        let start = Instant::now();
        let label = probe.label();
        let mut last_state: Option<ProvisioningState> = None;

        self.logger.debug(&format!(
            "Monitoring {} (interval {}s, timeout {}m)",
            label,
            self.settings.interval.as_secs(),
            self.settings.timeout.as_secs() / 60
        ));

        loop {
            if self.cancel.load(Ordering::SeqCst) {
                self.logger.warning(&format!("Stopped monitoring {}", label));
                return MonitorOutcome::Cancelled;
            }

            match probe.poll() {
                Ok(state) => {
                    on_tick(&state, start.elapsed());

                    if last_state.as_ref() != Some(&state) {
                        self.logger.debug(&format!("{}: {}", label, state));
                    }

                    if state.is_terminal() {
                        let elapsed = start.elapsed();
                        return if state == ProvisioningState::Succeeded {
                            MonitorOutcome::Succeeded { elapsed }
                        } else {
                            MonitorOutcome::Failed { state, elapsed }
                        };
                    }
                    last_state = Some(state);
                }
                Err(e) => {
                    self.logger
                        .warning(&format!("Could not read state of {}: {}", label, e));
                }
            }

            if start.elapsed() + self.settings.interval > self.settings.timeout {
                return MonitorOutcome::TimedOut {
                    last_state,
                    elapsed: start.elapsed(),
                };
            }

            self.sleep_interval();
        }
    }

    /// Runs the loop on a detached thread.
    pub fn spawn(self, mut probe: Box<dyn ProvisioningProbe>) -> MonitorHandle {
        let label = probe.label();
        let cancel = self.cancel_flag();
        let handle = thread::spawn(move || self.run(probe.as_mut(), |_, _| {}));

        MonitorHandle {
            label,
            cancel,
            handle: Some(handle),
            outcome: None,
        }
    }

    /// Sleeps one interval in short slices so cancellation is noticed quickly.
    fn sleep_interval(&self) {
        let slice = Duration::from_millis(200);
        let deadline = Instant::now() + self.settings.interval;
        while Instant::now() < deadline {
            if self.cancel.load(Ordering::SeqCst) {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            thread::sleep(remaining.min(slice));
        }
    }
}

/// Handle to a background monitor.
pub struct MonitorHandle {
    label: String,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<MonitorOutcome>>,
    outcome: Option<MonitorOutcome>,
}

impl MonitorHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
            || self
                .handle
                .as_ref()
                .map(JoinHandle::is_finished)
                .unwrap_or(true)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Waits for the thread and returns its outcome. A panicked monitor counts as cancelled.
    pub fn join(&mut self) -> MonitorOutcome {
        if let Some(handle) = self.handle.take() {
            let outcome = handle.join().unwrap_or(MonitorOutcome::Cancelled);
            self.outcome = Some(outcome);
        }
        self.outcome.clone().unwrap_or(MonitorOutcome::Cancelled)
    }
}

/// Background monitors started during this session.
#[derive(Default)]
pub struct BackgroundJobs {
    jobs: Vec<MonitorHandle>,
}

impl BackgroundJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: MonitorHandle) {
        self.jobs.push(handle);
    }

    pub fn running(&self) -> usize {
        self.jobs.iter().filter(|j| !j.is_finished()).count()
    }

    /// Removes finished jobs and returns their label and outcome.
    pub fn collect_finished(&mut self) -> Vec<(String, MonitorOutcome)> {
        let mut finished = Vec::new();
        let mut still_running = Vec::new();

        for mut job in self.jobs.drain(..) {
            if job.is_finished() {
                let outcome = job.join();
                finished.push((job.label.clone(), outcome));
            } else {
                still_running.push(job);
            }
        }

        self.jobs = still_running;
        finished
    }

    /// Labels of jobs still running.
    pub fn running_labels(&self) -> Vec<String> {
        self.jobs
            .iter()
            .filter(|j| !j.is_finished())
            .map(|j| j.label.clone())
            .collect()
    }

    /// Signals every running job to stop.
    pub fn cancel_all(&self) {
        for job in &self.jobs {
            job.cancel();
        }
    }
}

/// Formats a duration for display.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Probe that replays a fixed sequence, repeating the last entry.
    struct ScriptedProbe {
        states: VecDeque<Result<ProvisioningState, AppError>>,
        polls: usize,
    }

    impl ScriptedProbe {
        fn new(states: Vec<Result<ProvisioningState, AppError>>) -> Self {
            Self {
                states: states.into(),
                polls: 0,
            }
        }
    }

    impl ProvisioningProbe for ScriptedProbe {
        fn label(&self) -> String {
            "test deployment".to_string()
        }

        fn poll(&mut self) -> Result<ProvisioningState, AppError> {
            self.polls += 1;
            if self.states.len() > 1 {
                self.states.pop_front().unwrap()
            } else {
                match self.states.front().unwrap() {
                    Ok(state) => Ok(state.clone()),
                    Err(_) => Err(AppError::AzureCli("still failing".into())),
                }
            }
        }
    }

    fn fast(timeout_ms: u64) -> MonitorSettings {
        MonitorSettings::new(Duration::from_millis(1), Duration::from_millis(timeout_ms))
    }

    fn quiet_logger() -> Logger {
        Logger::default().quiet()
    }

    #[test]
    fn test_parse_state() {
        assert_eq!(ProvisioningState::parse("Succeeded"), ProvisioningState::Succeeded);
        assert_eq!(ProvisioningState::parse("\"Failed\"\n"), ProvisioningState::Failed);
        assert_eq!(ProvisioningState::parse(""), ProvisioningState::NotFound);
        assert_eq!(
            ProvisioningState::parse("Accepted"),
            ProvisioningState::InProgress("Accepted".into())
        );
        assert!(!ProvisioningState::Deleting.is_terminal());
    }

    #[test]
    fn test_await_transition_waits_for_operation() {
        let scripted = ScriptedProbe::new(vec![
            Ok(ProvisioningState::Succeeded),
            Ok(ProvisioningState::InProgress("Updating".into())),
            Ok(ProvisioningState::Succeeded),
        ]);
        let mut gateway = AwaitTransition::new(scripted, 5);

        assert_eq!(
            gateway.poll().unwrap(),
            ProvisioningState::InProgress("Pending".into())
        );
        assert_eq!(
            gateway.poll().unwrap(),
            ProvisioningState::InProgress("Updating".into())
        );
        assert_eq!(gateway.poll().unwrap(), ProvisioningState::Succeeded);
        assert_eq!(gateway.inner.polls, 3);
    }

    #[test]
    fn test_await_transition_settles_without_change() {
        let scripted = ScriptedProbe::new(vec![Ok(ProvisioningState::Succeeded)]);
        let mut gateway = AwaitTransition::new(scripted, 3);
        let monitor = DeploymentMonitor::new(fast(5_000), quiet_logger());

        let outcome = monitor.run(&mut gateway, |_, _| {});
        assert!(outcome.is_success());
        assert_eq!(gateway.inner.polls, 3);
    }

    #[test]
    fn test_await_transition_reports_failure() {
        let scripted = ScriptedProbe::new(vec![
            Ok(ProvisioningState::Succeeded),
            Ok(ProvisioningState::Failed),
        ]);
        let mut gateway = AwaitTransition::new(scripted, 5);
        let monitor = DeploymentMonitor::new(fast(5_000), quiet_logger());

        assert!(matches!(
            monitor.run(&mut gateway, |_, _| {}),
            MonitorOutcome::Failed { state: ProvisioningState::Failed, .. }
        ));
    }

    #[test]
    fn test_run_until_success() {
        let mut probe = ScriptedProbe::new(vec![
            Ok(ProvisioningState::InProgress("Accepted".into())),
            Ok(ProvisioningState::InProgress("Running".into())),
            Ok(ProvisioningState::Succeeded),
        ]);
        let monitor = DeploymentMonitor::new(fast(5_000), quiet_logger());

        let mut ticks = 0;
        let outcome = monitor.run(&mut probe, |_, _| ticks += 1);

        assert!(outcome.is_success());
        assert_eq!(ticks, 3);
        assert_eq!(probe.polls, 3);
    }

    #[test]
    fn test_run_reports_failure() {
        let mut probe = ScriptedProbe::new(vec![
            Ok(ProvisioningState::InProgress("Running".into())),
            Ok(ProvisioningState::Failed),
        ]);
        let monitor = DeploymentMonitor::new(fast(5_000), quiet_logger());

        let outcome = monitor.run(&mut probe, |_, _| {});
        assert!(matches!(
            outcome,
            MonitorOutcome::Failed {
                state: ProvisioningState::Failed,
                ..
            }
        ));
        assert!(outcome.into_result("network").is_err());
    }

    #[test]
    fn test_run_times_out_and_keeps_last_state() {
        let mut probe = ScriptedProbe::new(vec![Ok(ProvisioningState::InProgress(
            "Updating".into(),
        ))]);
        let monitor = DeploymentMonitor::new(fast(30), quiet_logger());

        let outcome = monitor.run(&mut probe, |_, _| {});
        match outcome {
            MonitorOutcome::TimedOut { last_state, .. } => {
                assert_eq!(last_state, Some(ProvisioningState::InProgress("Updating".into())));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_probe_errors_do_not_stop_polling() {
        let mut probe = ScriptedProbe::new(vec![
            Err(AppError::AzureCli("transient".into())),
            Ok(ProvisioningState::Succeeded),
        ]);
        let monitor = DeploymentMonitor::new(fast(5_000), quiet_logger());

        assert!(monitor.run(&mut probe, |_, _| {}).is_success());
        assert_eq!(probe.polls, 2);
    }

    #[test]
    fn test_cancel_flag_stops_run() {
        let mut probe = ScriptedProbe::new(vec![Ok(ProvisioningState::InProgress(
            "Running".into(),
        ))]);
        let monitor = DeploymentMonitor::new(fast(60_000), quiet_logger());
        monitor.cancel_flag().store(true, Ordering::SeqCst);

        assert_eq!(monitor.run(&mut probe, |_, _| {}), MonitorOutcome::Cancelled);
        assert_eq!(probe.polls, 0);
    }

    #[test]
    fn test_spawned_monitor_is_collected() {
        let probe = ScriptedProbe::new(vec![
            Ok(ProvisioningState::InProgress("Running".into())),
            Ok(ProvisioningState::Succeeded),
        ]);
        let monitor = DeploymentMonitor::new(fast(5_000), quiet_logger());

        let mut jobs = BackgroundJobs::new();
        let mut handle = monitor.spawn(Box::new(probe));
        assert!(handle.join().is_success());
        jobs.push(handle);

        let finished = jobs.collect_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].0, "test deployment");
        assert_eq!(jobs.running(), 0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3720)), "1h 2m");
    }
}

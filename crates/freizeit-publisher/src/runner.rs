//! Periodic runner for the engine.
//!
//! Runs the pipelines on a fixed interval with:
//! - Jitter to avoid synchronized fetches across instances
//! - Exponential backoff on errors
//! - A command channel for on-demand runs and shutdown

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base interval between runs.
    pub interval: Duration,
    /// Maximum jitter to add to the interval (as fraction 0.0-1.0).
    pub jitter_fraction: f64,
    /// Initial backoff duration on error.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub backoff_multiplier: f64,
    /// Maximum consecutive failures before the runner stops trying.
    pub max_consecutive_failures: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1800), // 30 minutes
            jitter_fraction: 0.1,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(1800),
            backoff_multiplier: 2.0,
            max_consecutive_failures: 10,
        }
    }
}

impl RunnerConfig {
    /// Creates a runner config with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Builder: set jitter fraction.
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Builder: set backoff parameters.
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the next run delay with jitter.
    pub fn next_run_delay(&self) -> Duration {
        let base = self.interval.as_secs_f64();
        let jitter = rand_jitter(base * self.jitter_fraction);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// Calculates backoff delay based on consecutive failures.
    pub fn backoff_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_backoff.as_secs_f64();
        let multiplier = self
            .backoff_multiplier
            .powi(consecutive_failures as i32 - 1);
        let max = self.max_backoff.as_secs_f64();
        Duration::from_secs_f64((base * multiplier).min(max))
    }
}

/// Simple pseudo-random jitter generator.
/// Uses the current time to generate a value in [-range, range].
fn rand_jitter(range: f64) -> f64 {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    let fraction = (nanos as f64) / (1_000_000_000.0);
    (fraction * 2.0 - 1.0) * range
}

/// Commands that can be sent to the runner.
#[derive(Debug, Clone)]
pub enum RunnerCommand {
    /// Trigger an immediate run.
    RunNow,
    /// Stop the runner.
    Stop,
}

/// Runner state.
#[derive(Debug, Clone, Default)]
pub struct RunnerState {
    /// Number of consecutive run failures.
    pub consecutive_failures: u32,
    /// Last successful run time.
    pub last_success: Option<DateTime<Utc>>,
    /// Last run attempt time.
    pub last_attempt: Option<DateTime<Utc>>,
    /// Last error message.
    pub last_error: Option<String>,
}

impl RunnerState {
    /// Records a successful run.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_success = Some(Utc::now());
        self.last_attempt = self.last_success;
        self.last_error = None;
    }

    /// Records a failed run.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.consecutive_failures += 1;
        self.last_attempt = Some(Utc::now());
        self.last_error = Some(error.into());
    }
}

/// Shared runner state.
pub type SharedRunnerState = Arc<RwLock<RunnerState>>;

/// The periodic runner drives the pipelines on an interval.
pub struct PeriodicRunner {
    config: RunnerConfig,
    state: SharedRunnerState,
    command_tx: mpsc::Sender<RunnerCommand>,
    command_rx: Option<mpsc::Receiver<RunnerCommand>>,
}

impl PeriodicRunner {
    /// Creates a new runner with the given configuration.
    pub fn new(config: RunnerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            state: Arc::new(RwLock::new(RunnerState::default())),
            command_tx,
            command_rx: Some(command_rx),
        }
    }

    /// Returns a handle for sending commands to the runner.
    pub fn handle(&self) -> RunnerHandle {
        RunnerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    /// Runs the loop with the given run function.
    ///
    /// The run function is called once immediately and then on every
    /// interval tick; it returns Ok(()) on success or an error message.
    pub async fn run<F, Fut>(mut self, run_fn: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), String>> + Send,
    {
        let mut command_rx = self.command_rx.take().expect("run called twice");

        info!(
            interval_secs = self.config.interval.as_secs(),
            "runner started"
        );

        self.do_run(&run_fn).await;

        loop {
            let delay = self.next_delay().await;
            debug!(delay_secs = delay.as_secs(), "scheduling next run");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    self.do_run(&run_fn).await;
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(RunnerCommand::RunNow) => {
                            debug!("received RunNow command");
                            self.do_run(&run_fn).await;
                        }
                        Some(RunnerCommand::Stop) | None => {
                            info!("runner stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn next_delay(&self) -> Duration {
        let state = self.state.read().await;
        if state.consecutive_failures > 0 {
            let backoff = self.config.backoff_delay(state.consecutive_failures);
            debug!(
                failures = state.consecutive_failures,
                backoff_secs = backoff.as_secs(),
                "using backoff delay"
            );
            return backoff;
        }
        self.config.next_run_delay()
    }

    async fn do_run<F, Fut>(&self, run_fn: &F)
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<(), String>>,
    {
        let state = self.state.read().await;
        if state.consecutive_failures >= self.config.max_consecutive_failures {
            error!(
                failures = state.consecutive_failures,
                max = self.config.max_consecutive_failures,
                "max consecutive failures reached, skipping run"
            );
            return;
        }
        drop(state);

        debug!("starting run");
        match run_fn().await {
            Ok(()) => {
                info!("run completed");
                self.state.write().await.record_success();
            }
            Err(e) => {
                warn!(error = %e, "run failed");
                self.state.write().await.record_failure(e);
            }
        }
    }
}

/// Handle for sending commands to a running runner.
#[derive(Clone, Debug)]
pub struct RunnerHandle {
    command_tx: mpsc::Sender<RunnerCommand>,
    state: SharedRunnerState,
}

impl RunnerHandle {
    /// Triggers an immediate run.
    pub async fn run_now(&self) -> Result<(), mpsc::error::SendError<RunnerCommand>> {
        self.command_tx.send(RunnerCommand::RunNow).await
    }

    /// Stops the runner.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<RunnerCommand>> {
        self.command_tx.send(RunnerCommand::Stop).await
    }

    /// Returns the current runner state.
    pub async fn state(&self) -> RunnerState {
        self.state.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn config_default() {
        let config = RunnerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1800));
        assert!(config.jitter_fraction > 0.0);
    }

    #[test]
    fn config_next_run_delay_stays_within_jitter() {
        let config = RunnerConfig::new(Duration::from_secs(60)).with_jitter(0.1);
        let delay = config.next_run_delay();
        assert!(delay.as_secs_f64() >= 54.0);
        assert!(delay.as_secs_f64() <= 66.0);
    }

    #[test]
    fn config_backoff_delay() {
        let config = RunnerConfig::default().with_backoff(
            Duration::from_secs(5),
            Duration::from_secs(300),
            2.0,
        );

        assert_eq!(config.backoff_delay(0), Duration::ZERO);
        assert_eq!(config.backoff_delay(1), Duration::from_secs(5));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(10));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(20));
        assert_eq!(config.backoff_delay(10), Duration::from_secs(300));
    }

    #[test]
    fn state_records_success_and_failure() {
        let mut state = RunnerState::default();
        state.record_failure("boom");
        assert_eq!(state.consecutive_failures, 1);
        assert_eq!(state.last_error, Some("boom".to_string()));

        state.record_success();
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.last_success.is_some());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn runner_runs_and_stops_on_command() {
        let runner = PeriodicRunner::new(RunnerConfig::new(Duration::from_secs(60)));
        let handle = runner.handle();

        let run_count = Arc::new(AtomicU32::new(0));
        let run_count_clone = run_count.clone();

        let task = tokio::spawn(async move {
            runner
                .run(move || {
                    let count = run_count_clone.clone();
                    async move {
                        count.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
                .await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(run_count.load(Ordering::SeqCst) >= 1);

        handle.run_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(run_count.load(Ordering::SeqCst) >= 2);

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn runner_backs_off_and_recovers() {
        let config = RunnerConfig::new(Duration::from_secs(1)).with_backoff(
            Duration::from_millis(10),
            Duration::from_millis(100),
            2.0,
        );
        let runner = PeriodicRunner::new(config);
        let handle = runner.handle();

        let fail_count = Arc::new(AtomicU32::new(0));
        let fail_count_clone = fail_count.clone();

        let task = tokio::spawn(async move {
            runner
                .run(move || {
                    let count = fail_count_clone.clone();
                    async move {
                        let n = count.fetch_add(1, Ordering::SeqCst);
                        if n < 3 { Err(format!("failure {n}")) } else { Ok(()) }
                    }
                })
                .await;
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(fail_count.load(Ordering::SeqCst) >= 3);

        let state = handle.state().await;
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.last_success.is_some());

        handle.stop().await.unwrap();
        task.await.unwrap();
    }
}

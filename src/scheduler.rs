//! Background refresh loop that keeps the stored credential ahead of its expiry.
//!
//! The scheduler ticks on a fixed interval and delegates each tick to
//! [`CredentialManager::check_and_refresh`], so it shares the refresh guard with every API call.
//! Failures never stop the loop; the next tick is the retry.

// std
use std::sync::atomic::{AtomicU32, Ordering};
// crates.io
use tokio::{
	sync::watch,
	task::JoinHandle,
	time::{self, Instant, MissedTickBehavior},
};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::{CredentialManager, RefreshOutcome},
};

/// Interval between two scheduler ticks.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::minutes(30);
/// Consecutive failures after which every further failure is logged at error level.
pub const DEFAULT_ALERT_THRESHOLD: u32 = 3;

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
	/// No credential is stored yet.
	Skipped,
	/// Credential is outside the expiry margin.
	Fresh,
	/// Credential was rotated and persisted.
	Refreshed,
	/// Refresh or persistence failed; the stored credential is unchanged.
	Failed,
}

/// Recurring proactive refresh of the singleton credential.
#[derive(Debug)]
pub struct RefreshScheduler {
	manager: CredentialManager,
	interval: Duration,
	alert_threshold: u32,
	consecutive_failures: AtomicU32,
}
impl RefreshScheduler {
	/// Creates a scheduler with [`DEFAULT_REFRESH_INTERVAL`] and [`DEFAULT_ALERT_THRESHOLD`].
	pub fn new(manager: CredentialManager) -> Self {
		Self {
			manager,
			interval: DEFAULT_REFRESH_INTERVAL,
			alert_threshold: DEFAULT_ALERT_THRESHOLD,
			consecutive_failures: AtomicU32::new(0),
		}
	}

	/// Overrides the tick interval.
	pub fn with_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
		if !interval.is_positive() {
			return Err(ConfigError::NonPositiveDuration { setting: "refresh_interval" });
		}

		self.interval = interval;

		Ok(self)
	}

	/// Overrides the alert threshold; zero is treated as one.
	pub fn with_alert_threshold(mut self, threshold: u32) -> Self {
		self.alert_threshold = threshold.max(1);

		self
	}

	/// Tick interval.
	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Number of failed ticks since the last successful one.
	pub fn consecutive_failures(&self) -> u32 {
		self.consecutive_failures.load(Ordering::Relaxed)
	}

	/// Runs one read-check-refresh-persist cycle as of `now`.
	pub async fn tick(&self, now: OffsetDateTime) -> TickOutcome {
		match self.manager.check_and_refresh(now).await {
			Ok(RefreshOutcome::Absent) => {
				tracing::info!("no credential stored yet; skipping refresh tick");

				TickOutcome::Skipped
			},
			Ok(RefreshOutcome::Fresh(credential)) => {
				self.consecutive_failures.store(0, Ordering::Relaxed);

				tracing::debug!(expires_at = %credential.access_token_expiry, "credential is fresh");

				TickOutcome::Fresh
			},
			Ok(RefreshOutcome::Refreshed(_)) => {
				self.consecutive_failures.store(0, Ordering::Relaxed);

				TickOutcome::Refreshed
			},
			Err(e) => {
				let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;

				if e.is_storage() || failures >= self.alert_threshold {
					tracing::error!(
						error = %e,
						kind = e.kind(),
						consecutive_failures = failures,
						"scheduled credential refresh failed"
					);
				} else {
					tracing::warn!(
						error = %e,
						kind = e.kind(),
						consecutive_failures = failures,
						"scheduled credential refresh failed; retrying next tick"
					);
				}

				TickOutcome::Failed
			},
		}
	}

	/// Starts the loop on the current Tokio runtime. The first tick fires one interval from now.
	pub fn spawn(self) -> RefreshSchedulerHandle {
		let scheduler = Arc::new(self);
		let (stop_tx, stop_rx) = watch::channel(false);
		let join = tokio::spawn(scheduler.clone().run(stop_rx));

		RefreshSchedulerHandle { scheduler, stop_tx, join }
	}

	async fn run(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
		let period = self.interval.unsigned_abs();
		let mut ticker = time::interval_at(Instant::now() + period, period);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		tracing::info!(interval = %self.interval, "refresh scheduler started");

		loop {
			if *stop.borrow() {
				break;
			}

			// An in-flight tick runs to completion; only the wait is raced against the signal.
			tokio::select! {
				changed = stop.changed() => {
					if changed.is_err() {
						break;
					}

					continue;
				}
				_ = ticker.tick() => {},
			}

			self.tick(OffsetDateTime::now_utc()).await;
		}

		tracing::info!("refresh scheduler stopped");
	}
}

/// Handle to a running [`RefreshScheduler`]. Dropping it stops the loop after the current tick.
#[derive(Debug)]
pub struct RefreshSchedulerHandle {
	scheduler: Arc<RefreshScheduler>,
	stop_tx: watch::Sender<bool>,
	join: JoinHandle<()>,
}
impl RefreshSchedulerHandle {
	/// The scheduler driven by this handle.
	pub fn scheduler(&self) -> &RefreshScheduler {
		&self.scheduler
	}

	/// Signals the loop to stop without waiting for it.
	pub fn request_shutdown(&self) {
		// Receiver is gone once the loop has exited.
		let _ = self.stop_tx.send(true);
	}

	/// Stops scheduling new ticks and waits for the loop, including any in-flight tick, to exit.
	pub async fn shutdown(self) {
		self.request_shutdown();

		if let Err(e) = self.join.await {
			tracing::error!(error = %e, "refresh scheduler task terminated abnormally");
		}
	}
}

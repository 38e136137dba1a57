//! Background timer driving sync runs.
//!
//! One initial run fires shortly after [`Scheduler::start`], independent of
//! the interval timer, which then ticks every `sync_interval` until
//! [`Scheduler::stop`]. No backoff, no jitter.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use crate::sync::{SyncEngine, SyncReport, Trigger};

/// Interval units, largest first.
const UNITS: [(&str, u64); 4] = [("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)];

/// Parse a single-unit interval such as `90s`, `30m`, `6h` or `1d`. A bare
/// number is seconds.
pub fn parse_interval(input: &str) -> Result<Duration, String> {
    let s = input.trim().to_lowercase();
    let (digits, unit) = s.split_at(s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len()));

    let count: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid interval '{}': expected e.g. 30m, 1h or 1d", input))?;
    let unit_secs = match unit {
        "" => 1,
        unit => UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, secs)| *secs)
            .ok_or_else(|| format!("Unknown unit '{}' in interval '{}'", unit, input))?,
    };

    match count.checked_mul(unit_secs) {
        Some(0) => Err("Interval must be greater than zero".to_string()),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Err(format!("Interval '{}' is too large", input)),
    }
}

/// Render with the largest unit that divides evenly.
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs == 0 {
        return format!("{}ms", interval.as_millis());
    }

    UNITS
        .iter()
        .find(|(_, unit_secs)| secs % unit_secs == 0)
        .map(|(name, unit_secs)| format!("{}{}", secs / unit_secs, name))
        .unwrap_or_else(|| format!("{}s", secs))
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Start/stop lifecycle around the periodic sync loop. Owned by the host.
pub struct Scheduler {
    engine: Arc<SyncEngine>,
    initial_delay: Duration,
    interval: Duration,
    running: Mutex<Option<Running>>,
}

impl Scheduler {
    pub fn new(engine: Arc<SyncEngine>, initial_delay: Duration, interval: Duration) -> Self {
        Self {
            engine,
            initial_delay,
            interval,
            running: Mutex::new(None),
        }
    }

    /// Schedule from the engine's own config.
    pub fn from_engine(engine: Arc<SyncEngine>) -> Self {
        let initial_delay = engine.config().initial_delay();
        let interval = engine.config().sync_interval();
        Self::new(engine, initial_delay, interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the timer task. Returns `false` if it was already started.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return false;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.engine.clone(),
            self.initial_delay,
            self.interval,
            shutdown_rx,
        ));

        tracing::info!(
            "Scheduler started (initial run in {}, then every {})",
            format_interval(self.initial_delay),
            format_interval(self.interval)
        );

        *running = Some(Running { shutdown, handle });
        true
    }

    /// Signal the timer task and wait for it, including any in-flight run.
    pub async fn stop(&self) {
        let Some(Running { shutdown, handle }) = self.running.lock().await.take() else {
            return;
        };

        let _ = shutdown.send(true);
        if let Err(e) = handle.await {
            tracing::error!("Scheduler task join error: {}", e);
        }
        tracing::info!("Scheduler stopped");
    }

    pub async fn is_started(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

async fn run_loop(
    engine: Arc<SyncEngine>,
    initial_delay: Duration,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let initial = sleep(initial_delay);
    tokio::pin!(initial);
    let mut initial_done = false;

    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut initial, if !initial_done => {
                initial_done = true;
                run_once(&engine, Trigger::Initial).await;
            }
            _ = timer.tick() => {
                run_once(&engine, Trigger::Scheduled).await;
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn run_once(engine: &SyncEngine, trigger: Trigger) {
    match engine.run(trigger).await {
        SyncReport::Completed(summary) if !summary.success() => {
            tracing::warn!("{} sync completed with failures; waiting for next tick", trigger);
        }
        SyncReport::Completed(_) | SyncReport::AlreadyRunning => {}
    }
}

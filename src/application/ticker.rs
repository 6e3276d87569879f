use crate::domain::models::{PomodoroRecord, Task};
use crate::domain::timer::{PomodoroTimer, TickOutcome, TimerPhase};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

const EVENT_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    Tick { remaining_seconds: u32 },
    Completed { finished_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub remaining_seconds: u32,
    pub label: Option<String>,
    pub duration_minutes: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Owns the spawned tick loop; dropping it stops the loop.
struct TickerHandle {
    task: JoinHandle<()>,
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Runs a [`PomodoroTimer`] against a one-second tokio interval. The tick loop
/// exists only while the timer is running.
pub struct TimerDriver {
    timer: Arc<Mutex<PomodoroTimer>>,
    ticker: Mutex<Option<TickerHandle>>,
    events: broadcast::Sender<TimerEvent>,
    now_provider: NowProvider,
    period: Duration,
}

impl Default for TimerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerDriver {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            timer: Arc::new(Mutex::new(PomodoroTimer::default())),
            ticker: Mutex::new(None),
            events,
            now_provider: Arc::new(Utc::now),
            period: Duration::from_secs(1),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Result<TimerSnapshot, InfraError> {
        let timer = self.lock_timer()?;
        let session = timer.session();
        Ok(TimerSnapshot {
            phase: timer.phase(),
            remaining_seconds: timer.remaining_seconds(),
            label: session
                .map(|session| session.label.clone())
                .filter(|label| !label.is_empty()),
            duration_minutes: session.map(|session| session.duration_minutes),
            started_at: session.map(|session| session.started_at),
            finished_at: session.and_then(|session| session.finished_at),
        })
    }

    pub fn prefill_label(&self, tasks: &[Task]) -> Result<Option<String>, InfraError> {
        Ok(self.lock_timer()?.prefill_label(tasks))
    }

    pub fn start(&self, label: Option<&str>, duration_minutes: u32) -> Result<(), InfraError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|error| InfraError::InvalidState(format!("timer requires a tokio runtime: {error}")))?;
        self.lock_timer()?
            .start(label, duration_minutes, (self.now_provider)())
            .map_err(InfraError::InvalidState)?;
        self.replace_ticker(Some(self.spawn_ticker(&runtime)))
    }

    pub fn pause(&self) -> Result<(), InfraError> {
        self.lock_timer()?.pause().map_err(InfraError::InvalidState)?;
        self.replace_ticker(None)
    }

    pub fn resume(&self) -> Result<(), InfraError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|error| InfraError::InvalidState(format!("timer requires a tokio runtime: {error}")))?;
        self.lock_timer()?.resume().map_err(InfraError::InvalidState)?;
        self.replace_ticker(Some(self.spawn_ticker(&runtime)))
    }

    pub fn stop(&self) -> Result<(), InfraError> {
        self.lock_timer()?.stop().map_err(InfraError::InvalidState)?;
        self.replace_ticker(None)
    }

    pub fn discard(&self) -> Result<(), InfraError> {
        self.lock_timer()?.discard().map_err(InfraError::InvalidState)?;
        self.replace_ticker(None)
    }

    pub fn confirm(&self, label: &str, record_id: String) -> Result<PomodoroRecord, InfraError> {
        self.confirm_with(label, record_id, Ok)
    }

    /// Hands the finished session's record to `persist` and returns to idle
    /// only if it succeeds. On error the session stays awaiting a label.
    pub fn confirm_with<T>(
        &self,
        label: &str,
        record_id: String,
        persist: impl FnOnce(PomodoroRecord) -> Result<T, InfraError>,
    ) -> Result<T, InfraError> {
        let outcome = {
            let mut timer = self.lock_timer()?;
            let record = timer
                .preview_record(label, record_id)
                .map_err(InfraError::InvalidState)?;
            let outcome = persist(record)?;
            timer.discard().map_err(InfraError::InvalidState)?;
            outcome
        };
        self.replace_ticker(None)?;
        Ok(outcome)
    }

    fn spawn_ticker(&self, runtime: &tokio::runtime::Handle) -> TickerHandle {
        let timer = Arc::clone(&self.timer);
        let events = self.events.clone();
        let now_provider = Arc::clone(&self.now_provider);
        let period = self.period;

        let task = runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let outcome = match timer.lock() {
                    Ok(mut timer) => timer.tick(now_provider()),
                    Err(_) => {
                        tracing::error!("timer lock poisoned; tick loop stopped");
                        break;
                    }
                };
                match outcome {
                    TickOutcome::Counting { remaining_seconds } => {
                        let _ = events.send(TimerEvent::Tick { remaining_seconds });
                    }
                    TickOutcome::Finished { finished_at } => {
                        tracing::info!(%finished_at, "pomodoro finished");
                        let _ = events.send(TimerEvent::Completed { finished_at });
                        break;
                    }
                    TickOutcome::Ignored => break,
                }
            }
        });
        TickerHandle { task }
    }

    fn replace_ticker(&self, next: Option<TickerHandle>) -> Result<(), InfraError> {
        let mut slot = self
            .ticker
            .lock()
            .map_err(|error| InfraError::InvalidState(format!("ticker lock poisoned: {error}")))?;
        *slot = next;
        Ok(())
    }

    fn lock_timer(&self) -> Result<MutexGuard<'_, PomodoroTimer>, InfraError> {
        self.timer
            .lock()
            .map_err(|error| InfraError::InvalidState(format!("timer lock poisoned: {error}")))
    }

    #[cfg(test)]
    fn has_ticker(&self) -> bool {
        self.ticker.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

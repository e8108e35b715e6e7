use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use shared::{
    domain::{CounterAction, CounterLimits, CounterState},
    error::DomainError,
};
use thiserror::Error;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, trace, warn};

use crate::audit::{AuditRecord, AuditSink, NoopAuditSink};

pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(3);
pub const INCREMENT_AUDIT_MESSAGE: &str = "count incremented by one";
pub const RESET_CANCELLED_MESSAGE: &str = "reset cancelled";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidLimits(#[from] DomainError),
    #[error("counter engine must be created inside a tokio runtime")]
    NoRuntime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterConfig {
    pub limits: CounterLimits,
    pub reset_delay: Duration,
    pub initial_count: i64,
}

impl CounterConfig {
    pub fn from_parts(
        min: i64,
        max: i64,
        reset_delay: Duration,
        initial_count: i64,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            limits: CounterLimits::new(min, max)?,
            reset_delay,
            initial_count,
        })
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            limits: CounterLimits::default(),
            reset_delay: DEFAULT_RESET_DELAY,
            initial_count: 0,
        }
    }
}

pub fn reset_scheduled_message(delay: Duration) -> String {
    if delay.subsec_nanos() != 0 {
        return format!("reset scheduled in {} ms", delay.as_millis());
    }
    match delay.as_secs() {
        1 => "reset scheduled in 1 second".to_string(),
        secs => format!("reset scheduled in {secs} seconds"),
    }
}

/// Owns the counter state and the single deferred reset.
///
/// Every mutation happens under one lock and is published to the watch
/// channel before the lock is released, so subscribers observe snapshots in
/// submission order. Dropping the engine aborts a pending reset.
pub struct CounterEngine {
    shared: Arc<EngineShared>,
    audit_sink: Arc<dyn AuditSink>,
    runtime: Handle,
}

struct EngineShared {
    limits: CounterLimits,
    reset_delay: Duration,
    inner: Mutex<EngineInner>,
    state_tx: watch::Sender<CounterState>,
}

struct EngineInner {
    state: CounterState,
    pending_reset: Option<PendingReset>,
    next_generation: u64,
}

struct PendingReset {
    generation: u64,
    task: JoinHandle<()>,
}

impl CounterEngine {
    pub fn new(config: CounterConfig) -> Result<Self, EngineError> {
        Self::with_audit_sink(config, Arc::new(NoopAuditSink))
    }

    pub fn with_audit_sink(
        config: CounterConfig,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Result<Self, EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let state = CounterState::settled(config.initial_count, &config.limits);
        let (state_tx, _) = watch::channel(state.clone());

        Ok(Self {
            shared: Arc::new(EngineShared {
                limits: config.limits,
                reset_delay: config.reset_delay,
                inner: Mutex::new(EngineInner {
                    state,
                    pending_reset: None,
                    next_generation: 0,
                }),
                state_tx,
            }),
            audit_sink,
            runtime,
        })
    }

    pub fn limits(&self) -> CounterLimits {
        self.shared.limits
    }

    pub fn reset_delay(&self) -> Duration {
        self.shared.reset_delay
    }

    pub fn state(&self) -> CounterState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CounterState> {
        self.shared.state_tx.subscribe()
    }

    /// Yields the current snapshot first, then every later one a reader keeps up with.
    pub fn state_stream(&self) -> WatchStream<CounterState> {
        WatchStream::new(self.subscribe())
    }

    pub fn has_pending_reset(&self) -> bool {
        self.shared.lock().pending_reset.is_some()
    }

    pub fn submit(&self, action: CounterAction) {
        debug!(?action, "counter action submitted");
        let mut inner = self.shared.lock();

        match action {
            CounterAction::Increment => {
                self.shared.cancel_pending_reset(&mut inner);
                let next = CounterState::settled(
                    inner.state.count.saturating_add(1),
                    &self.shared.limits,
                );
                self.shared.publish(&mut inner, next);
                drop(inner);
                self.record_audit(AuditRecord::new(INCREMENT_AUDIT_MESSAGE));
            }
            CounterAction::Decrement => {
                self.shared.cancel_pending_reset(&mut inner);
                let next = CounterState::settled(
                    inner.state.count.saturating_sub(1),
                    &self.shared.limits,
                );
                self.shared.publish(&mut inner, next);
            }
            CounterAction::Clear => {
                self.shared.cancel_pending_reset(&mut inner);

                let generation = inner.next_generation;
                inner.next_generation += 1;

                let next = inner
                    .state
                    .clone()
                    .clear_pending(reset_scheduled_message(self.shared.reset_delay));
                self.shared.publish(&mut inner, next);

                let task = self.runtime.spawn(run_pending_reset(
                    Arc::downgrade(&self.shared),
                    generation,
                    self.shared.reset_delay,
                ));
                inner.pending_reset = Some(PendingReset { generation, task });
                debug!(
                    generation,
                    delay_ms = self.shared.reset_delay.as_millis() as u64,
                    "reset scheduled"
                );
            }
            CounterAction::CancelClear => {
                let message = self
                    .shared
                    .cancel_pending_reset(&mut inner)
                    .then(|| RESET_CANCELLED_MESSAGE.to_string());
                let next = inner.state.clone().clear_cancelled(message);
                self.shared.publish(&mut inner, next);
            }
        }
    }

    /// Acknowledges the one-shot message of the current snapshot.
    pub fn message_consumed(&self) {
        let mut inner = self.shared.lock();
        let next = inner.state.clone().message_consumed();
        self.shared.publish(&mut inner, next);
    }

    /// Like [`Self::message_consumed`], but a no-op when the current message is
    /// no longer `shown` because a newer action replaced it.
    pub fn consume_message_if(&self, shown: &str) -> bool {
        let mut inner = self.shared.lock();
        if inner.state.transient_message.as_deref() != Some(shown) {
            return false;
        }
        let next = inner.state.clone().message_consumed();
        self.shared.publish(&mut inner, next);
        true
    }

    /// Aborts a pending reset without publishing anything.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        self.shared.cancel_pending_reset(&mut inner);
    }

    fn record_audit(&self, record: AuditRecord) {
        let sink = Arc::clone(&self.audit_sink);
        self.runtime.spawn(async move {
            if let Err(error) = sink.record(record).await {
                warn!(%error, "audit write failed; counter state unaffected");
            }
        });
    }
}

impl Drop for CounterEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl EngineShared {
    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &mut EngineInner, next: CounterState) {
        inner.state = next.clone();
        self.state_tx.send_replace(next);
    }

    fn cancel_pending_reset(&self, inner: &mut EngineInner) -> bool {
        let Some(pending) = inner.pending_reset.take() else {
            return false;
        };
        pending.task.abort();
        debug!(generation = pending.generation, "pending reset cancelled");
        true
    }

    fn fire_pending_reset(&self, generation: u64) {
        let mut inner = self.lock();
        let is_current = inner
            .pending_reset
            .as_ref()
            .is_some_and(|pending| pending.generation == generation);
        if !is_current {
            trace!(generation, "stale reset fire suppressed");
            return;
        }

        inner.pending_reset = None;
        let next = CounterState::settled(0, &self.limits);
        self.publish(&mut inner, next);
        info!(generation, "counter reset after pending clear");
    }
}

async fn run_pending_reset(shared: Weak<EngineShared>, generation: u64, delay: Duration) {
    tokio::time::sleep(delay).await;
    let Some(shared) = shared.upgrade() else {
        return;
    };
    shared.fire_pending_reset(generation);
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;

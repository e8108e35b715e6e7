//! Counter view-model: clamped counting, a delayed cancellable clear, and an
//! append-only audit side effect.

pub mod audit;
mod engine;

pub use audit::{AuditRecord, AuditSink, NoopAuditSink, StorageAuditSink};
pub use engine::{
    reset_scheduled_message, CounterConfig, CounterEngine, EngineError, DEFAULT_RESET_DELAY,
    INCREMENT_AUDIT_MESSAGE, RESET_CANCELLED_MESSAGE,
};

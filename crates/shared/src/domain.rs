use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(CountLogId);

pub const MIN_LIMIT: i64 = 0;
pub const MAX_LIMIT: i64 = 10;

/// Closed range the counter saturates into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterLimits {
    min: i64,
    max: i64,
}

impl CounterLimits {
    pub fn new(min: i64, max: i64) -> Result<Self, DomainError> {
        if min > max {
            return Err(DomainError::InvertedLimits { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }

    pub fn can_increment(&self, count: i64) -> bool {
        count < self.max
    }

    pub fn can_decrement(&self, count: i64) -> bool {
        count > self.min
    }
}

impl Default for CounterLimits {
    fn default() -> Self {
        Self {
            min: MIN_LIMIT,
            max: MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterAction {
    Increment,
    Decrement,
    Clear,
    CancelClear,
}

/// Snapshot published by the counter engine after every mutation.
///
/// The enablement flags are derived from `count` when the snapshot is built and
/// never recomputed afterwards, so a snapshot is always self-consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub count: i64,
    pub is_increment_enabled: bool,
    pub is_decrement_enabled: bool,
    pub is_clear_pending: bool,
    pub transient_message: Option<String>,
}

impl CounterState {
    /// A state with no clear pending and no message, `count` clamped into `limits`.
    pub fn settled(count: i64, limits: &CounterLimits) -> Self {
        let count = limits.clamp(count);
        Self {
            count,
            is_increment_enabled: limits.can_increment(count),
            is_decrement_enabled: limits.can_decrement(count),
            is_clear_pending: false,
            transient_message: None,
        }
    }

    pub fn clear_pending(self, message: impl Into<String>) -> Self {
        Self {
            is_clear_pending: true,
            transient_message: Some(message.into()),
            ..self
        }
    }

    pub fn clear_cancelled(self, message: Option<String>) -> Self {
        Self {
            is_clear_pending: false,
            transient_message: message,
            ..self
        }
    }

    pub fn message_consumed(self) -> Self {
        Self {
            transient_message: None,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_span_zero_to_ten() {
        let limits = CounterLimits::default();
        assert_eq!(limits.min(), 0);
        assert_eq!(limits.max(), 10);
    }

    #[test]
    fn rejects_inverted_limits() {
        assert_eq!(
            CounterLimits::new(5, 1),
            Err(DomainError::InvertedLimits { min: 5, max: 1 })
        );
        assert!(CounterLimits::new(3, 3).is_ok());
    }

    #[test]
    fn settled_state_clamps_and_derives_flags() {
        let limits = CounterLimits::default();

        let top = CounterState::settled(42, &limits);
        assert_eq!(top.count, 10);
        assert!(!top.is_increment_enabled);
        assert!(top.is_decrement_enabled);

        let bottom = CounterState::settled(-3, &limits);
        assert_eq!(bottom.count, 0);
        assert!(bottom.is_increment_enabled);
        assert!(!bottom.is_decrement_enabled);

        let middle = CounterState::settled(4, &limits);
        assert!(middle.is_increment_enabled && middle.is_decrement_enabled);
        assert!(!middle.is_clear_pending);
        assert_eq!(middle.transient_message, None);
    }

    #[test]
    fn pending_and_cancel_keep_count_and_flags() {
        let limits = CounterLimits::default();
        let base = CounterState::settled(7, &limits);

        let pending = base.clone().clear_pending("soon");
        assert!(pending.is_clear_pending);
        assert_eq!(pending.count, 7);
        assert_eq!(pending.transient_message.as_deref(), Some("soon"));

        let cancelled = pending.clear_cancelled(Some("cancelled".into()));
        assert!(!cancelled.is_clear_pending);
        assert_eq!(cancelled.count, base.count);
        assert_eq!(cancelled.is_increment_enabled, base.is_increment_enabled);

        assert_eq!(cancelled.message_consumed(), base);
    }

    #[test]
    fn actions_serialize_as_snake_case() {
        let encoded = serde_json::to_string(&CounterAction::CancelClear).expect("encode");
        assert_eq!(encoded, "\"cancel_clear\"");
    }
}

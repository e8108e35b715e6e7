use serde::{Deserialize, Serialize};

use crate::domain::{CounterAction, CounterState};

/// Line-oriented events a presenter emits when it renders in machine-readable mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PresenterEvent {
    State(CounterState),
    Notice { text: String },
    Submitted { action: CounterAction },
    Rejected { input: String, reason: String },
}

//! Terminal presenter: renders the engine's state stream and feeds typed
//! commands back into the engine.

use std::sync::Weak;

use anyhow::Result;
use counter_core::CounterEngine;
use shared::{domain::CounterState, protocol::PresenterEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tracing::debug;

use crate::commands::{parse_command, PresenterCommand, USAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn render_state(state: &CounterState) -> String {
    let clear = if state.is_clear_pending {
        "pending (type 'cancel' to abort)"
    } else {
        "ready"
    };
    format!(
        "Counter Value: {} | increment: {} | decrement: {} | clear: {clear}",
        state.count,
        on_off(state.is_increment_enabled),
        on_off(state.is_decrement_enabled),
    )
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

pub fn render_event(event: &PresenterEvent, mode: OutputMode) -> Result<String> {
    if mode == OutputMode::Json {
        return Ok(serde_json::to_string(event)?);
    }
    Ok(match event {
        PresenterEvent::State(state) => render_state(state),
        PresenterEvent::Notice { text } => format!(">> {text}"),
        PresenterEvent::Submitted { action } => format!("-> {action:?}"),
        PresenterEvent::Rejected { input, reason } => format!("!! {input}: {reason}"),
    })
}

async fn write_event<W>(out: &mut W, event: &PresenterEvent, mode: OutputMode) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = render_event(event, mode)?;
    line.push('\n');
    out.write_all(line.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

/// Renders snapshots until the engine is dropped, acknowledging each one-shot
/// message after it has been shown. Returns the writer once the stream ends.
pub async fn run_renderer<W>(
    mut states: WatchStream<CounterState>,
    engine: Weak<CounterEngine>,
    mode: OutputMode,
    mut out: W,
) -> Result<W>
where
    W: AsyncWrite + Unpin,
{
    let mut last_rendered: Option<CounterState> = None;

    while let Some(state) = states.next().await {
        // Acknowledging a message republishes the same snapshot without it.
        let is_acknowledgement = last_rendered
            .as_ref()
            .is_some_and(|last| last.clone().message_consumed() == state);
        if !is_acknowledgement {
            write_event(&mut out, &PresenterEvent::State(state.clone()), mode).await?;
        }

        if let Some(message) = state.transient_message.clone() {
            write_event(
                &mut out,
                &PresenterEvent::Notice {
                    text: message.clone(),
                },
                mode,
            )
            .await?;
            if let Some(engine) = engine.upgrade() {
                engine.consume_message_if(&message);
            }
        }
        last_rendered = Some(state);
    }

    out.flush().await?;
    Ok(out)
}

/// Reads commands line by line until `quit` or end of input; feedback goes to
/// `feedback`. Returns how many actions reached the engine.
pub async fn run_command_loop<R, W>(
    engine: &CounterEngine,
    input: R,
    mode: OutputMode,
    mut feedback: W,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut submitted = 0;

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(PresenterCommand::Quit)) => break,
            Ok(Some(PresenterCommand::Help)) => {
                write_event(
                    &mut feedback,
                    &PresenterEvent::Notice {
                        text: USAGE.to_string(),
                    },
                    mode,
                )
                .await?;
            }
            Ok(Some(PresenterCommand::Show)) => {
                write_event(&mut feedback, &PresenterEvent::State(engine.state()), mode).await?;
            }
            Ok(Some(PresenterCommand::Action(action))) => {
                engine.submit(action);
                submitted += 1;
                if mode == OutputMode::Json {
                    write_event(&mut feedback, &PresenterEvent::Submitted { action }, mode)
                        .await?;
                }
            }
            Err(error) => {
                debug!(%error, "rejected terminal input");
                write_event(
                    &mut feedback,
                    &PresenterEvent::Rejected {
                        input: line.trim().to_string(),
                        reason: format!("{error}; {USAGE}"),
                    },
                    mode,
                )
                .await?;
            }
        }
    }

    Ok(submitted)
}

#[cfg(test)]
#[path = "tests/presenter_tests.rs"]
mod tests;

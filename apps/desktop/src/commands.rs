//! Terminal input parsed into presenter commands.

use shared::domain::CounterAction;
use thiserror::Error;

pub const USAGE: &str =
    "commands: + | inc | increment, - | dec | decrement, clear, cancel, state, help, quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterCommand {
    Action(CounterAction),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),
}

/// Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<PresenterCommand>, CommandError> {
    let word = line.trim();
    if word.is_empty() {
        return Ok(None);
    }

    let command = match word.to_ascii_lowercase().as_str() {
        "+" | "inc" | "increment" => PresenterCommand::Action(CounterAction::Increment),
        "-" | "dec" | "decrement" => PresenterCommand::Action(CounterAction::Decrement),
        "clear" | "reset" => PresenterCommand::Action(CounterAction::Clear),
        "cancel" | "cancel_clear" => PresenterCommand::Action(CounterAction::CancelClear),
        "state" | "show" => PresenterCommand::Show,
        "help" | "?" => PresenterCommand::Help,
        "quit" | "exit" | "q" => PresenterCommand::Quit,
        _ => return Err(CommandError::Unknown(word.to_string())),
    };
    Ok(Some(command))
}

//! Structural checks on the commands extracted for one turn.
//!
//! A failure here means the command extraction upstream is broken. The user
//! cannot trigger one, so the turn is aborted rather than repaired.

use crate::commands::{Command, CommandKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Only one cancel flow command is allowed per turn, got {0}")]
    MultipleCancelFlow(usize),
    #[error("Free-form answers must come before any other command")]
    FreeFormAnswerNotLeading,
    #[error("Only one correct slot command is allowed per turn, got {0}")]
    MultipleCorrectSlots(usize),
}

/// Check that the commands form a valid combination.
///
/// # Errors
///
/// Returns the first rule the commands break.
pub fn validate_state_of_commands(commands: &[Command]) -> Result<(), ValidationError> {
    let count = |kind: CommandKind| commands.iter().filter(|c| c.kind() == kind).count();

    let cancels = count(CommandKind::CancelFlow);
    if cancels > 1 {
        return Err(ValidationError::MultipleCancelFlow(cancels));
    }

    // A free-form answer after a start flow means upstream read the utterance
    // both as a new task and as unrelated chatter.
    let leading = commands
        .iter()
        .take_while(|c| c.is_free_form_answer())
        .count();
    if commands[leading..].iter().any(Command::is_free_form_answer) {
        return Err(ValidationError::FreeFormAnswerNotLeading);
    }

    let corrections = count(CommandKind::CorrectSlots);
    if corrections > 1 {
        return Err(ValidationError::MultipleCorrectSlots(corrections));
    }

    Ok(())
}

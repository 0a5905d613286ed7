//! Commands extracted from a user turn
//!
//! Each command is a pure transition from the tracker's current dialogue
//! stack to the events that persist its effect. Commands never see each
//! other; the processor threads the tracker through them in order.

mod cancel_flow;
mod clarify;
mod correct_slots;
mod free_form_answer;
mod set_slot;
mod start_flow;

pub use cancel_flow::select_canceled_frames;
pub use correct_slots::CorrectedSlot;
pub use free_form_answer::FreeFormAnswer;

use crate::flows::FlowsList;
use crate::stack::{DialogueStack, InternalErrorPatternFrame, StackError, StackFrame};
use crate::tracker::{Event, Tracker};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Contract violations raised while running a command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Cannot cancel flow '{flow_id}': the dialogue stack is empty")]
    EmptyStack { flow_id: String },
    #[error("Cannot cancel flow '{flow_id}': it is not on the dialogue stack")]
    FlowNotOnStack { flow_id: String },
    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Why a raw command payload could not be turned into a [`Command`]
#[derive(Debug, Error)]
pub enum ParseCommandError {
    #[error("Command payload has no 'command' discriminator: {0}")]
    MissingDiscriminator(Value),
    #[error("Unknown command '{0}'")]
    Unknown(String),
    #[error("Malformed '{command}' command: {source}")]
    Malformed {
        command: String,
        source: serde_json::Error,
    },
}

/// Kinds of commands, used for membership checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    StartFlow,
    SetSlot,
    CancelFlow,
    CorrectSlots,
    FreeFormAnswer,
    Clarify,
    Error,
    HumanHandoff,
}

/// A user intent extracted for the current turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PersistedCommand", into = "PersistedCommand")]
pub enum Command {
    StartFlow { flow: String },
    SetSlot { name: String, value: Value },
    CancelFlow,
    CorrectSlots { corrected_slots: Vec<CorrectedSlot> },
    FreeFormAnswer(FreeFormAnswer),
    Clarify { options: Vec<String> },
    Error,
    HumanHandoff,
}

/// Wire form of a command. The discriminator strings are stored in
/// conversation histories and must never change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command")]
enum PersistedCommand {
    #[serde(rename = "start flow")]
    StartFlow { flow: String },
    #[serde(rename = "set slot")]
    SetSlot {
        name: String,
        #[serde(default)]
        value: Value,
    },
    #[serde(rename = "cancel flow")]
    CancelFlow,
    #[serde(rename = "correct slot")]
    CorrectSlots {
        #[serde(default)]
        corrected_slots: Vec<CorrectedSlot>,
    },
    #[serde(rename = "chitchat")]
    ChitChat,
    #[serde(rename = "knowledge")]
    Knowledge,
    #[serde(rename = "clarify")]
    Clarify {
        #[serde(default)]
        options: Vec<String>,
    },
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "human handoff")]
    HumanHandoff,
}

impl From<PersistedCommand> for Command {
    fn from(command: PersistedCommand) -> Self {
        match command {
            PersistedCommand::StartFlow { flow } => Command::StartFlow { flow },
            PersistedCommand::SetSlot { name, value } => Command::SetSlot { name, value },
            PersistedCommand::CancelFlow => Command::CancelFlow,
            PersistedCommand::CorrectSlots { corrected_slots } => {
                Command::CorrectSlots { corrected_slots }
            }
            PersistedCommand::ChitChat => Command::FreeFormAnswer(FreeFormAnswer::ChitChat),
            PersistedCommand::Knowledge => Command::FreeFormAnswer(FreeFormAnswer::Knowledge),
            PersistedCommand::Clarify { options } => Command::Clarify { options },
            PersistedCommand::Error => Command::Error,
            PersistedCommand::HumanHandoff => Command::HumanHandoff,
        }
    }
}

impl From<Command> for PersistedCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::StartFlow { flow } => PersistedCommand::StartFlow { flow },
            Command::SetSlot { name, value } => PersistedCommand::SetSlot { name, value },
            Command::CancelFlow => PersistedCommand::CancelFlow,
            Command::CorrectSlots { corrected_slots } => {
                PersistedCommand::CorrectSlots { corrected_slots }
            }
            Command::FreeFormAnswer(FreeFormAnswer::ChitChat) => PersistedCommand::ChitChat,
            Command::FreeFormAnswer(FreeFormAnswer::Knowledge) => PersistedCommand::Knowledge,
            Command::Clarify { options } => PersistedCommand::Clarify { options },
            Command::Error => PersistedCommand::Error,
            Command::HumanHandoff => PersistedCommand::HumanHandoff,
        }
    }
}

const KNOWN_COMMANDS: &[&str] = &[
    "start flow",
    "set slot",
    "cancel flow",
    "correct slot",
    "chitchat",
    "knowledge",
    "clarify",
    "error",
    "human handoff",
];

impl Command {
    /// Parse one raw command payload.
    ///
    /// # Errors
    ///
    /// Fails when the payload lacks a discriminator, names an unknown
    /// command, or carries fields of the wrong shape.
    pub fn from_json(raw: &Value) -> Result<Self, ParseCommandError> {
        let Some(name) = raw.get("command").and_then(Value::as_str) else {
            return Err(ParseCommandError::MissingDiscriminator(raw.clone()));
        };
        if !KNOWN_COMMANDS.contains(&name) {
            return Err(ParseCommandError::Unknown(name.to_string()));
        }
        serde_json::from_value(raw.clone()).map_err(|source| ParseCommandError::Malformed {
            command: name.to_string(),
            source,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Persisted discriminator of this command
    pub fn command(&self) -> &'static str {
        match self {
            Command::StartFlow { .. } => "start flow",
            Command::SetSlot { .. } => "set slot",
            Command::CancelFlow => "cancel flow",
            Command::CorrectSlots { .. } => "correct slot",
            Command::FreeFormAnswer(answer) => answer.command(),
            Command::Clarify { .. } => "clarify",
            Command::Error => "error",
            Command::HumanHandoff => "human handoff",
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::StartFlow { .. } => CommandKind::StartFlow,
            Command::SetSlot { .. } => CommandKind::SetSlot,
            Command::CancelFlow => CommandKind::CancelFlow,
            Command::CorrectSlots { .. } => CommandKind::CorrectSlots,
            Command::FreeFormAnswer(_) => CommandKind::FreeFormAnswer,
            Command::Clarify { .. } => CommandKind::Clarify,
            Command::Error => CommandKind::Error,
            Command::HumanHandoff => CommandKind::HumanHandoff,
        }
    }

    pub fn is_free_form_answer(&self) -> bool {
        matches!(self, Command::FreeFormAnswer(_))
    }

    /// Compute the events that apply this command.
    ///
    /// `tracker` reflects the commands already applied this turn;
    /// `original_tracker` is the state before the turn started.
    ///
    /// # Errors
    ///
    /// Fails on contract violations, e.g. a corrupt persisted stack or a
    /// cancellation whose flow is missing from the stack.
    pub fn run_command_on_tracker(
        &self,
        tracker: &Tracker,
        all_flows: &FlowsList,
        original_tracker: &Tracker,
    ) -> Result<Vec<Event>, CommandError> {
        match self {
            Command::StartFlow { flow } => start_flow::run(flow, tracker, all_flows),
            Command::SetSlot { name, value } => Ok(set_slot::run(name, value, tracker)),
            Command::CancelFlow => cancel_flow::run(tracker, all_flows, original_tracker),
            Command::CorrectSlots { corrected_slots } => {
                correct_slots::run(corrected_slots, tracker, all_flows, original_tracker)
            }
            Command::FreeFormAnswer(answer) => free_form_answer::run(*answer, tracker),
            Command::Clarify { options } => clarify::run(options, tracker, all_flows),
            Command::Error => {
                let stack = DialogueStack::from_tracker(tracker)?;
                Ok(push_frame(stack, InternalErrorPatternFrame::new().into()))
            }
            Command::HumanHandoff => {
                tracing::debug!(command = self.command(), "Human handoff is handled downstream");
                Ok(vec![])
            }
        }
    }
}

/// Push `frame` and persist the stack, unless an equivalent frame is already
/// on top. Re-running a turn must not stack the same pattern twice.
fn push_frame(mut stack: DialogueStack, frame: StackFrame) -> Vec<Event> {
    if stack.top_is_equivalent(&frame) {
        tracing::debug!(frame_type = frame.type_name(), "Frame already on top of the stack");
        return vec![];
    }
    let frame_id = stack.push_new(frame);
    tracing::debug!(frame_id = %frame_id, "Pushed frame");
    vec![stack.to_event()]
}

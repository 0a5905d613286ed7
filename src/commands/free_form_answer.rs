//! Free-form answers
//!
//! Utterances that do not advance any flow. They are answered outside the
//! flows by a dedicated frame on top of the stack.

use super::{push_frame, CommandError};
use crate::stack::{ChitChatFrame, DialogueStack, SearchFrame, StackFrame};
use crate::tracker::{Event, Tracker};

/// How a free-form utterance gets answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreeFormAnswer {
    /// Small talk
    ChitChat,
    /// Question answered from the knowledge base
    Knowledge,
}

impl FreeFormAnswer {
    pub fn command(self) -> &'static str {
        match self {
            FreeFormAnswer::ChitChat => "chitchat",
            FreeFormAnswer::Knowledge => "knowledge",
        }
    }

    fn frame(self) -> StackFrame {
        match self {
            FreeFormAnswer::ChitChat => StackFrame::ChitChat(ChitChatFrame::default()),
            FreeFormAnswer::Knowledge => StackFrame::Search(SearchFrame::default()),
        }
    }
}

pub(super) fn run(answer: FreeFormAnswer, tracker: &Tracker) -> Result<Vec<Event>, CommandError> {
    let stack = DialogueStack::from_tracker(tracker)?;
    Ok(push_frame(stack, answer.frame()))
}

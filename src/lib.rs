//! flowstack - dialogue stack command engine
//!
//! Turns the commands extracted from a user message into changes of a
//! conversation's dialogue stack. The stack is rebuilt from the tracker's
//! event history on every turn, the commands are validated and applied in
//! order, and the new snapshot comes back as a single slot event.

pub mod commands;
pub mod config;
pub mod flows;
pub mod processor;
pub mod stack;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use commands::{Command, CommandError, CommandKind};
pub use flows::{Flow, FlowsList};
pub use processor::{execute_commands, find_updated_flows, flows_updated_by, ProcessorError};
pub use stack::{DialogueStack, StackError, StackFrame};
pub use tracker::{Event, Tracker, DIALOGUE_STACK_SLOT};

//! Configuration for the replay binary

use std::path::PathBuf;
use thiserror::Error;

pub const FLOWS_PATH_VAR: &str = "FLOWSTACK_FLOWS_PATH";
pub const TRACKER_PATH_VAR: &str = "FLOWSTACK_TRACKER_PATH";
pub const SENDER_ID_VAR: &str = "FLOWSTACK_SENDER_ID";

const DEFAULT_SENDER_ID: &str = "default";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing {0}: pass it as an argument or set the environment variable")]
    Missing(&'static str),
}

/// Where to find the flow catalog and the conversation to replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    pub flows_path: PathBuf,
    pub tracker_path: PathBuf,
    pub sender_id: String,
}

impl ReplayConfig {
    /// Read the configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a required path is not given.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_sources(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Positional `args` (flows path, then tracker path) win over variables
    /// looked up through `var`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a required path is not given.
    pub fn from_sources<F>(
        args: impl IntoIterator<Item = String>,
        var: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut args = args.into_iter();

        let flows_path = args
            .next()
            .or_else(|| var(FLOWS_PATH_VAR))
            .ok_or(ConfigError::Missing(FLOWS_PATH_VAR))?;
        let tracker_path = args
            .next()
            .or_else(|| var(TRACKER_PATH_VAR))
            .ok_or(ConfigError::Missing(TRACKER_PATH_VAR))?;
        let sender_id = var(SENDER_ID_VAR).unwrap_or_else(|| DEFAULT_SENDER_ID.to_string());

        Ok(Self {
            flows_path: PathBuf::from(flows_path),
            tracker_path: PathBuf::from(tracker_path),
            sender_id,
        })
    }
}

mod run;

use crate::config::Config;
use std::path::Path;

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    /// Interactive prompt, or the `execute` lines when there are any
    Shell {
        config: Config,
        execute: Vec<String>,
    },
}

impl Action {
    /// Runtime log file the action writes to
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        match self {
            Self::Shell { config, .. } => config.log_file.as_deref(),
        }
    }

    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails to execute
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

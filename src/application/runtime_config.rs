use std::path::PathBuf;

use crate::cli::{Cli, Command};

/// What the user asked for, detached from how it was parsed.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub rules: PathBuf,
    pub root: PathBuf,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Watch { state: PathBuf, dry_run: bool },
    SyncList,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        let action = match cli.command {
            Command::Watch { state, dry_run } => Action::Watch { state, dry_run },
            Command::SyncList => Action::SyncList,
        };
        Self {
            rules: cli.rules,
            root: cli.root,
            action,
        }
    }
}

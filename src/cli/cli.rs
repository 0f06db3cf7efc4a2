use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;

/// Watches a filesystem tree according to per-path rules.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// YAML document declaring the rules
    #[clap(long, short, global = true, default_value = "rules.yaml")]
    pub rules: PathBuf,

    /// Directory the rule paths are resolved against
    #[clap(long, global = true, default_value = "/")]
    pub root: PathBuf,

    #[clap(long, short, global = true, default_value = "warn", value_enum)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scans the watched paths and prints what changed since the last run
    Watch {
        /// Where the previous snapshot is read from and the new one saved
        #[clap(long, short, default_value = ".rulewatch/snapshot.yaml")]
        state: PathBuf,

        /// Report changes without saving the new snapshot
        #[clap(long)]
        dry_run: bool,
    },
    /// Prints the paths a sync of the include rules would transfer
    SyncList,
}

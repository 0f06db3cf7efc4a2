use std::io::{self, Write};

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::report;
use crate::application::{Action, RuntimeConfig};
use crate::config::{RulesFile, RulesFileError};
use crate::rules::{Rule, RuleTreeError};
use crate::snapshot::{ScanError, SnapshotStoreError, Watcher};
use crate::sync::{SyncError, SyncLister};

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let output = Self::execute(&app_config).await?;

        let printed = match app_config.action {
            Action::Watch { .. } => report::print_changes(&output),
            Action::SyncList => print_lines(&output),
        };
        printed.context(OutputSnafu)
    }

    /// Runs the requested action and returns the lines it produced.
    pub async fn execute(app_config: &RuntimeConfig) -> Result<Vec<String>, ApplicationError> {
        let rules_file = RulesFile::read(&app_config.rules)
            .await
            .context(RulesFileSnafu)?;
        let rules =
            Rule::parse(&app_config.root, rules_file.declarations()).context(RuleTreeSnafu)?;
        debug!("Loaded rules: {:?}", rules);

        match &app_config.action {
            Action::Watch { state, dry_run } => {
                let mut watcher = Watcher::new(rules);
                watcher.load_snapshot(state).await.context(SnapshotSnafu)?;
                let changes = watcher.run().context(ScanSnafu)?;

                if *dry_run {
                    info!("Dry run, not saving the snapshot");
                } else {
                    watcher.save_snapshot(state).context(SnapshotSnafu)?;
                }
                Ok(changes)
            }
            Action::SyncList => {
                let files = SyncLister::new(&rules).file_list().context(SyncSnafu)?;
                Ok(files
                    .iter()
                    .map(|file| file.display().to_string())
                    .collect())
            }
        }
    }
}

fn print_lines(lines: &[String]) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while loading the rules"))]
    RulesFileError { source: RulesFileError },
    #[snafu(display("Critical failure encountered while building the rule tree"))]
    RuleTreeError { source: RuleTreeError },
    #[snafu(display("Critical failure encountered while scanning the filesystem"))]
    ScanError { source: ScanError },
    #[snafu(display("Critical failure encountered while loading or saving the snapshot"))]
    SnapshotError { source: SnapshotStoreError },
    #[snafu(display("Critical failure encountered while listing files to sync"))]
    SyncError { source: SyncError },
    #[snafu(display("Failed to write output"))]
    OutputError { source: io::Error },
}

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snafu::prelude::*;
use tracing::{debug, trace};

use crate::ext::PathExt;
use crate::rules::{Mode, Rule};

/// Computes the paths that a sync of the `include` rules would transfer.
///
/// Each listed path stands for itself and, for directories, everything below
/// it; nothing in the list is expanded further.
#[derive(Debug)]
pub struct SyncLister<'a> {
    rules: &'a Rule,
}

impl<'a> SyncLister<'a> {
    pub fn new(rules: &'a Rule) -> Self {
        Self { rules }
    }

    pub fn file_list(&self) -> Result<Vec<PathBuf>, SyncError> {
        let files = Self::traverse(self.rules)?;
        debug!("Sync list holds {} paths", files.len());
        Ok(files)
    }

    /// Collects the files of every shallowest `include` rule below `rule`.
    fn traverse(rule: &Rule) -> Result<Vec<PathBuf>, SyncError> {
        let mut files = Vec::new();
        for include in rule.shallow_find(&|candidate| candidate.is_mode(&Mode::Include)) {
            files.extend(Self::files_for(include)?);
        }
        Ok(files)
    }

    /// Expands the rule's path as a filesystem glob. Paths that do not exist
    /// simply produce no matches.
    fn files_for(rule: &Rule) -> Result<Vec<PathBuf>, SyncError> {
        let pattern = rule.path().to_string_lossy();
        let mut files = Vec::new();
        for matched in glob::glob(&pattern).context(PatternSnafu {
            pattern: pattern.as_ref(),
        })? {
            let matched = matched.context(GlobSnafu)?;
            files.extend(Self::files_for_path(rule, &matched)?);
        }
        Ok(files)
    }

    fn files_for_path(rule: &Rule, path: &Path) -> Result<Vec<PathBuf>, SyncError> {
        let is_dir = fs::symlink_metadata(path).is_ok_and(|metadata| metadata.is_dir());
        if !is_dir {
            return Ok(vec![path.to_path_buf()]);
        }

        let mut files = Vec::new();
        for (child_path, child_is_dir) in Self::sorted_children(path)? {
            let name = child_path.file_name_lossy();
            match rule.child(&name) {
                None => files.push(child_path),
                Some(subrule) if subrule.is_other_mode(&Mode::Include) => {
                    if subrule.children().is_empty() {
                        trace!("Excluding {} from sync", child_path.display());
                    } else {
                        files.extend(Self::traverse(subrule)?);
                    }
                }
                Some(subrule) if child_is_dir => {
                    files.extend(Self::files_for_path(subrule, &child_path)?);
                }
                Some(_) => files.push(child_path),
            }
        }
        Ok(files)
    }

    /// Directories, regular files and symlinks directly below `path`, sorted
    /// by name, each with whether it is a real directory.
    fn sorted_children(path: &Path) -> Result<Vec<(PathBuf, bool)>, SyncError> {
        let read_dir = match fs::read_dir(path) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).context(ReadDirSnafu {
                    path: path.to_path_buf(),
                });
            }
        };

        let mut children = Vec::new();
        for entry in read_dir {
            let entry = entry.context(ReadDirSnafu {
                path: path.to_path_buf(),
            })?;
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() || file_type.is_file() || file_type.is_symlink() {
                children.push((entry.path(), file_type.is_dir()));
            }
        }
        children.sort();
        Ok(children)
    }
}

#[derive(Debug, Snafu)]
pub enum SyncError {
    #[snafu(display("Include rule '{}' is not a valid glob", pattern))]
    PatternError {
        pattern: String,
        source: glob::PatternError,
    },
    #[snafu(display("Failed to expand an include rule"))]
    GlobError { source: glob::GlobError },
    #[snafu(display("Failed to list directory {}", path.best_effort_path_display()))]
    ReadDirError {
        path: PathBuf,
        source: std::io::Error,
    },
}

use std::fs::{self, DirEntry};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snafu::ResultExt;
use tracing::{debug, trace};

use crate::ext::PathExt;
use crate::rules::{Mode, Rule, is_wildcard};
use crate::snapshot::node::{ReadDirSnafu, StatSnafu};
use crate::snapshot::{ScanError, SnapshotNode};

impl SnapshotNode {
    /// Follows the rule tree below `rule`, recording only the paths it names.
    ///
    /// Blocked rules are skipped. A child in `watch` mode is scanned in full,
    /// any other child keeps following its own rules. Files have nothing to
    /// travel into.
    pub fn travel(&mut self, path: &Path, rule: &Rule) -> Result<(), ScanError> {
        if !matches!(self, SnapshotNode::Directory { .. }) {
            return Ok(());
        }

        for (pattern, child_rule) in rule.children().iter() {
            if child_rule.blocks_mode(&Mode::Watch) {
                trace!("Skipping blocked rule {}", child_rule.path().display());
                continue;
            }

            for name in Self::names_for(path, rule, pattern, child_rule)? {
                let child_path = path.join(&name);
                let mut child = SnapshotNode::classify(&child_path)?;
                if child_rule.is_mode(&Mode::Watch) {
                    child.watch(&child_path, Some(child_rule))?;
                } else {
                    child.travel(&child_path, child_rule)?;
                }
                self.insert_child(name, child);
            }
        }
        Ok(())
    }

    /// Scans every directory and regular file below `path`, consulting `rule`
    /// only to find exclusions and nested rules.
    pub fn watch(&mut self, path: &Path, rule: Option<&Rule>) -> Result<(), ScanError> {
        if !matches!(self, SnapshotNode::Directory { .. }) {
            return Ok(());
        }

        for entry in sorted_entries(path)? {
            let child_path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => {
                    return Err(err).context(StatSnafu { path: child_path });
                }
            };
            if !(file_type.is_dir() || file_type.is_file()) {
                trace!("Skipping special entry {}", child_path.display());
                continue;
            }

            let name = child_path.file_name_lossy();
            let child_rule = rule.and_then(|rule| rule.child(&name));
            let mut child = SnapshotNode::classify(&child_path)?;

            match child_rule {
                Some(child_rule) if child_rule.is_other_mode(&Mode::Watch) => {
                    if child_rule.children().is_empty() {
                        trace!("Excluding {}", child_path.display());
                        continue;
                    }
                    child.travel(&child_path, child_rule)?;
                }
                _ => child.watch(&child_path, child_rule)?,
            }
            self.insert_child(name, child);
        }
        Ok(())
    }

    /// Entry names a child rule stands for below `path`.
    ///
    /// A literal rule names exactly one entry. A wildcard rule names every
    /// existing entry that resolves to it, so exact rules and earlier patterns
    /// keep their priority.
    fn names_for(
        path: &Path,
        rule: &Rule,
        pattern: &str,
        child_rule: &Rule,
    ) -> Result<Vec<String>, ScanError> {
        if !is_wildcard(pattern) {
            return Ok(vec![pattern.to_owned()]);
        }

        Ok(sorted_entries(path)?
            .iter()
            .map(|entry| entry.path().file_name_lossy())
            .filter(|name| {
                rule.child(name)
                    .is_some_and(|resolved| std::ptr::eq(resolved, child_rule))
            })
            .collect())
    }
}

/// Directory entries sorted by name. A directory that vanished mid-scan has
/// no entries.
fn sorted_entries(path: &Path) -> Result<Vec<DirEntry>, ScanError> {
    let read_dir = match fs::read_dir(path) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("{} disappeared before it could be listed", path.display());
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(err).context(ReadDirSnafu {
                path: path.to_path_buf(),
            });
        }
    };

    let mut entries = read_dir
        .collect::<Result<Vec<_>, _>>()
        .context(ReadDirSnafu {
            path: path.to_path_buf(),
        })?;
    entries.sort_by_key(DirEntry::file_name);
    Ok(entries)
}

/// Scans the filesystem below `rule`'s path into a fresh root snapshot.
///
/// A root rule in `watch` mode scans everything below it, otherwise only the
/// declared rules are followed.
pub fn scan(rule: &Rule) -> Result<SnapshotNode, ScanError> {
    let root_path: PathBuf = rule.path().to_path_buf();
    let mut root = SnapshotNode::root();
    if rule.is_mode(&Mode::Watch) {
        root.watch(&root_path, Some(rule))?;
    } else {
        root.travel(&root_path, rule)?;
    }
    debug!(
        "Scanned {} with {} entries",
        root_path.display(),
        root.count_recursive() - 1
    );
    Ok(root)
}

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::ext::{PathExt, SystemTimeExt};

/// Recorded state of one filesystem entry.
///
/// Nodes do not remember their own path; walks and reports pass the path of
/// the node they are looking at alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotNode {
    File {
        size: u64,
        /// Modification time in whole seconds since the unix epoch.
        mtime: i64,
    },
    Directory {
        children: LinkedHashMap<String, SnapshotNode>,
    },
    /// A path that vanished before it could be classified.
    Absent,
}

impl SnapshotNode {
    pub fn root() -> Self {
        SnapshotNode::Directory {
            children: LinkedHashMap::new(),
        }
    }

    pub fn file(size: u64, mtime: i64) -> Self {
        SnapshotNode::File { size, mtime }
    }

    #[cfg(test)]
    pub fn directory<K: Into<String>>(
        children: impl IntoIterator<Item = (K, SnapshotNode)>,
    ) -> Self {
        SnapshotNode::Directory {
            children: children
                .into_iter()
                .map(|(name, child)| (name.into(), child))
                .collect(),
        }
    }

    /// Stats `path`: a directory yields an empty `Directory`, anything else a
    /// `File` carrying its size and mtime. Not-found yields `Absent`; every
    /// other failure is fatal.
    pub fn classify(path: &Path) -> Result<Self, ScanError> {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => Ok(Self::root()),
            Ok(metadata) => {
                let mtime = metadata
                    .modified()
                    .context(StatSnafu {
                        path: path.to_path_buf(),
                    })?
                    .to_unix_seconds();
                Ok(Self::file(metadata.len(), mtime))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("{} disappeared before it could be classified", path.display());
                Ok(SnapshotNode::Absent)
            }
            Err(err) => Err(err).context(StatSnafu {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            SnapshotNode::File { .. } => NodeKind::File,
            SnapshotNode::Directory { .. } => NodeKind::Directory,
            SnapshotNode::Absent => NodeKind::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, SnapshotNode::Absent)
    }

    pub fn children(&self) -> Option<&LinkedHashMap<String, SnapshotNode>> {
        match self {
            SnapshotNode::Directory { children } => Some(children),
            _ => None,
        }
    }

    /// Child `name`, treating an `Absent` child like a missing one.
    pub fn child(&self, name: &str) -> Option<&SnapshotNode> {
        self.children()?.get(name).filter(|child| !child.is_absent())
    }

    /// Adds `child` under `name`. `Absent` children and children of
    /// non-directories are dropped.
    pub fn insert_child(&mut self, name: String, child: SnapshotNode) {
        match self {
            SnapshotNode::Directory { children } if !child.is_absent() => {
                children.insert(name, child);
            }
            _ => {}
        }
    }

    /// This node plus everything beneath it.
    pub fn count_recursive(&self) -> usize {
        match self {
            SnapshotNode::File { .. } => 1,
            SnapshotNode::Directory { children } => {
                1 + children.values().map(Self::count_recursive).sum::<usize>()
            }
            SnapshotNode::Absent => 0,
        }
    }

    /// `"file /a/b"`, `"directory /a with 3 children"`; the path is left out
    /// when `path` is `None`.
    pub fn description(&self, path: Option<&Path>) -> String {
        let at = path
            .map(|path| format!(" {}", path.display()))
            .unwrap_or_default();
        match self {
            SnapshotNode::Directory { .. } => {
                format!("directory{at} with {} children", self.count_recursive())
            }
            _ => format!("{}{at}", self.kind()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum NodeKind {
    #[display("file")]
    File,
    #[display("directory")]
    Directory,
    #[display("absent")]
    Absent,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ScanError {
    #[snafu(display("Failed to stat {}", path.best_effort_path_display()))]
    StatError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to list directory {}", path.best_effort_path_display()))]
    ReadDirError {
        path: PathBuf,
        source: std::io::Error,
    },
}

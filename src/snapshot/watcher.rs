use std::path::Path;

use tracing::{debug, info};

use crate::rules::Rule;
use crate::snapshot::{ScanError, SnapshotNode, SnapshotStoreError, report, scan, store};

/// Holds the rule tree and the last known snapshot, and turns successive
/// scans into change reports.
#[derive(Debug)]
pub struct Watcher {
    rules: Rule,
    snapshot: SnapshotNode,
}

impl Watcher {
    /// Starts from an empty root snapshot, so the first run reports every
    /// watched path as added.
    pub fn new(rules: Rule) -> Self {
        Self {
            rules,
            snapshot: SnapshotNode::root(),
        }
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> &SnapshotNode {
        &self.snapshot
    }

    /// Replaces the baseline with the snapshot persisted at `path`. A missing
    /// file keeps the current baseline and returns `false`.
    pub async fn load_snapshot(&mut self, path: &Path) -> Result<bool, SnapshotStoreError> {
        match store::read(path).await? {
            Some(snapshot) => {
                self.snapshot = snapshot;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotStoreError> {
        store::write(path, &self.snapshot)
    }

    /// Scans the filesystem, reports what changed since the baseline, and makes
    /// the new scan the baseline.
    pub fn run(&mut self) -> Result<Vec<String>, ScanError> {
        let fresh = scan(&self.rules)?;
        let changes = report(&self.snapshot, &fresh, self.rules.path());
        info!("Detected {} changes", changes.len());
        debug!("Changes: {:?}", changes);
        self.snapshot = fresh;
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::declarations;
    use std::fs;
    use tempfile::TempDir;

    fn watcher(root: &Path, entries: &[(&str, &str)]) -> Watcher {
        Watcher::new(Rule::parse(root, &declarations(entries.iter().copied())).unwrap())
    }

    #[test]
    fn first_run_reports_everything_as_added() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/a"), "1").unwrap();

        let mut watcher = watcher(dir.path(), &[("data", "watch")]);
        let changes = watcher.run().unwrap();
        assert_eq!(
            changes,
            vec![format!(
                "Added: directory {} with 2 children",
                dir.path().join("data").display()
            )]
        );
    }

    #[test]
    fn second_run_reports_only_differences() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("keep"), "same").unwrap();
        fs::write(data.join("grow"), "1").unwrap();
        fs::write(data.join("drop"), "bye").unwrap();
        fs::write(data.join("noise.log"), "x").unwrap();

        let mut watcher = watcher(dir.path(), &[("data", "watch"), ("data/*.log", "ignore")]);
        watcher.run().unwrap();

        fs::write(data.join("grow"), "12345").unwrap();
        fs::remove_file(data.join("drop")).unwrap();
        fs::write(data.join("new"), "hi").unwrap();
        fs::write(data.join("noise.log"), "changed a lot").unwrap();

        let changes = watcher.run().unwrap();
        assert_eq!(
            changes,
            vec![
                format!("Removed: file {}", data.join("drop").display()),
                format!(
                    "Changed: file {} size changed: 1 -> 5",
                    data.join("grow").display()
                ),
                format!("Added: file {}", data.join("new").display()),
            ]
        );
        assert!(watcher.run().unwrap().is_empty());
    }

    #[compio::test]
    async fn persisted_snapshot_is_the_next_baseline() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("file"), "content").unwrap();
        let state = dir.path().join("state.yaml");

        let mut first = watcher(dir.path(), &[("data", "watch")]);
        first.run().unwrap();
        first.save_snapshot(&state).unwrap();

        let mut second = watcher(dir.path(), &[("data", "watch")]);
        assert!(second.load_snapshot(&state).await.unwrap());
        assert_eq!(second.snapshot(), first.snapshot());
        assert!(second.run().unwrap().is_empty());
    }

    #[compio::test]
    async fn missing_snapshot_keeps_empty_baseline() {
        let dir = TempDir::new().unwrap();
        let mut watcher = watcher(dir.path(), &[]);
        assert!(!watcher.load_snapshot(&dir.path().join("none.yaml")).await.unwrap());
        assert_eq!(watcher.snapshot(), &SnapshotNode::root());
    }
}

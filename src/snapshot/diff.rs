use std::path::Path;

use crate::snapshot::SnapshotNode;

impl SnapshotNode {
    /// Local differences between `self` (old) and `other` (new), without any
    /// path prefix. Directories never report local changes; their contents do.
    pub fn changes(&self, other: &SnapshotNode) -> Vec<String> {
        if self.kind() != other.kind() {
            return vec![format!("became a {}", other.description(None))];
        }

        match (self, other) {
            (
                SnapshotNode::File { size, mtime },
                SnapshotNode::File {
                    size: new_size,
                    mtime: new_mtime,
                },
            ) => {
                if size != new_size {
                    vec![format!("size changed: {size} -> {new_size}")]
                } else if mtime != new_mtime {
                    vec!["modified".to_owned()]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }
}

/// Compares the children of two directories located at `path`.
///
/// Keys are visited in the old directory's order followed by keys only the new
/// directory has. Matching directory pairs are compared recursively, right
/// after their own lines.
pub fn report(old: &SnapshotNode, new: &SnapshotNode, path: &Path) -> Vec<String> {
    let old_keys = old.children().into_iter().flat_map(|children| children.keys());
    let new_only = new
        .children()
        .into_iter()
        .flat_map(|children| children.keys())
        .filter(|key| {
            old.children()
                .is_none_or(|children| !children.contains_key(*key))
        });

    let mut output = Vec::new();
    for key in old_keys.chain(new_only) {
        let child_path = path.join(key);
        match (old.child(key), new.child(key)) {
            (None, Some(added)) => {
                output.push(format!("Added: {}", added.description(Some(&child_path))));
            }
            (Some(removed), None) => {
                output.push(format!(
                    "Removed: {}",
                    removed.description(Some(&child_path))
                ));
            }
            (Some(before), Some(after)) => {
                let described = before.description(Some(&child_path));
                output.extend(
                    before
                        .changes(after)
                        .into_iter()
                        .map(|change| format!("Changed: {described} {change}")),
                );
                if before.children().is_some() && after.children().is_some() {
                    output.extend(report(before, after, &child_path));
                }
            }
            (None, None) => {}
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashlink::LinkedHashMap;

    fn dir<const N: usize>(children: [(&str, SnapshotNode); N]) -> SnapshotNode {
        SnapshotNode::directory(children)
    }

    fn file(size: u64, mtime: i64) -> SnapshotNode {
        SnapshotNode::file(size, mtime)
    }

    fn diff(old: &SnapshotNode, new: &SnapshotNode) -> Vec<String> {
        report(old, new, Path::new("/"))
    }

    #[test]
    fn identical_trees_have_no_changes() {
        let tree = dir([("a", file(1, 1)), ("b", dir([("c", file(2, 2))]))]);
        assert!(diff(&tree, &tree.clone()).is_empty());
    }

    #[test]
    fn mtime_only_change_is_modified() {
        let old = dir([("x", file(10, 100))]);
        let new = dir([("x", file(10, 200))]);
        assert_eq!(diff(&old, &new), vec!["Changed: file /x modified"]);
    }

    #[test]
    fn size_change_hides_mtime_change() {
        let old = dir([("x", file(10, 100))]);
        let new = dir([("x", file(12, 200))]);
        assert_eq!(diff(&old, &new), vec!["Changed: file /x size changed: 10 -> 12"]);
    }

    #[test]
    fn file_becoming_directory_is_a_type_change() {
        let old = dir([("y", file(5, 1))]);
        let new = dir([("y", dir([("inner", file(1, 1))]))]);
        assert_eq!(
            diff(&old, &new),
            vec!["Changed: file /y became a directory with 2 children"]
        );
    }

    #[test]
    fn directory_becoming_file_does_not_recurse() {
        let old = dir([("y", dir([("inner", file(1, 1))]))]);
        let new = dir([("y", file(5, 1))]);
        assert_eq!(
            diff(&old, &new),
            vec!["Changed: directory /y with 2 children became a file"]
        );
    }

    #[test]
    fn added_and_removed_directories_report_recursive_count() {
        let z = dir([("a", file(1, 1)), ("b", file(1, 1))]);
        let with_z = dir([("z", z)]);
        let empty = SnapshotNode::root();

        assert_eq!(
            diff(&empty, &with_z),
            vec!["Added: directory /z with 3 children"]
        );
        assert_eq!(
            diff(&with_z, &empty),
            vec!["Removed: directory /z with 3 children"]
        );
    }

    #[test]
    fn nested_changes_follow_their_parent_lines() {
        let old = dir([
            ("a", dir([("one", file(1, 1)), ("two", file(2, 2))])),
            ("b", file(3, 3)),
        ]);
        let new = dir([
            ("c", file(9, 9)),
            ("a", dir([("two", file(2, 5)), ("three", file(3, 3))])),
            ("b", file(3, 3)),
        ]);

        assert_eq!(
            diff(&old, &new),
            vec![
                "Removed: file /a/one",
                "Changed: file /a/two modified",
                "Added: file /a/three",
                "Added: file /c",
            ]
        );
    }

    #[test]
    fn absent_entries_count_as_missing() {
        let mut children = LinkedHashMap::new();
        children.insert("gone".to_owned(), SnapshotNode::Absent);
        let old = SnapshotNode::Directory { children };
        let new = dir([("gone", file(1, 1))]);

        assert_eq!(diff(&old, &new), vec!["Added: file /gone"]);
        assert_eq!(diff(&new, &old), vec!["Removed: file /gone"]);
    }

    #[test]
    fn absent_entries_are_reported_once_among_siblings() {
        let mut children = LinkedHashMap::new();
        children.insert("gone".to_owned(), SnapshotNode::Absent);
        children.insert("kept".to_owned(), file(1, 1));
        let old = SnapshotNode::Directory { children };
        let new = dir([("kept", file(1, 1)), ("gone", file(2, 2)), ("fresh", file(3, 3))]);

        assert_eq!(
            diff(&old, &new),
            vec!["Added: file /gone", "Added: file /fresh"]
        );
    }

    #[test]
    fn changes_between_directories_are_empty() {
        let old = dir([("a", file(1, 1))]);
        let new = dir([("b", file(1, 1))]);
        assert!(old.changes(&new).is_empty());
    }

    #[test]
    fn reports_use_the_given_base_path() {
        let old = dir([("x", file(1, 1))]);
        let new = dir([("x", file(1, 2))]);
        assert_eq!(
            report(&old, &new, Path::new("/srv/data")),
            vec!["Changed: file /srv/data/x modified"]
        );
    }
}

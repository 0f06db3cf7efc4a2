use std::path::{Component, Path, PathBuf};

pub trait PathExt {
    /// Absolute, lexically normalised rendering of the path for messages.
    ///
    /// Unlike `canonicalize` this works for paths that no longer exist, which
    /// is the common case when reporting scan failures.
    fn best_effort_path_display(&self) -> String;

    /// Last component as an owned string, lossily converted.
    fn file_name_lossy(&self) -> String;
}

impl PathExt for Path {
    fn best_effort_path_display(&self) -> String {
        let absolute = if self.is_absolute() {
            self.to_path_buf()
        } else {
            match std::env::current_dir() {
                Ok(current_dir) => current_dir.join(self),
                Err(_) => self.to_path_buf(),
            }
        };
        normalize_path(&absolute).display().to_string()
    }

    fn file_name_lossy(&self) -> String {
        self.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl PathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        self.as_path().best_effort_path_display()
    }

    fn file_name_lossy(&self) -> String {
        self.as_path().file_name_lossy()
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !components.is_empty() && !matches!(components.last(), Some(Component::RootDir))
                {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/a/./b", "/a/b")]
    #[case("/a/b/../c", "/a/c")]
    #[case("/../a", "/a")]
    fn display_normalises_absolute_paths(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(Path::new(input).best_effort_path_display(), expected);
    }

    #[test]
    fn display_makes_relative_paths_absolute() {
        let shown = Path::new("does/not/exist").best_effort_path_display();
        assert!(Path::new(&shown).is_absolute());
        assert!(shown.ends_with("does/not/exist"));
    }

    #[test]
    fn file_name_lossy_takes_last_component() {
        assert_eq!(Path::new("/tmp/some dir/file.txt").file_name_lossy(), "file.txt");
        assert_eq!(Path::new("/").file_name_lossy(), "");
    }
}

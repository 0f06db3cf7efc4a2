use std::path::{Path, PathBuf};

use derive_more::Display;
use hashlink::LinkedHashMap;
use snafu::{ResultExt, Snafu};
use tracing::trace;

use crate::rules::GlobMap;

/// Key that addresses the node a mapping is attached to instead of a child.
pub const SELF_KEY: &str = ".";

/// Action attached to a rule node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Mode {
    #[display("watch")]
    Watch,
    #[display("include")]
    Include,
    /// Any other token, e.g. `ignore`. Such modes neither watch nor include.
    #[display("{_0}")]
    Other(String),
}

impl From<&str> for Mode {
    fn from(token: &str) -> Self {
        match token {
            "watch" => Mode::Watch,
            "include" => Mode::Include,
            other => Mode::Other(other.to_owned()),
        }
    }
}

/// One declared value: either a mode for the path, or deeper declarations
/// relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValue {
    Mode(Mode),
    Nested(Declarations),
}

impl From<&str> for RuleValue {
    fn from(token: &str) -> Self {
        RuleValue::Mode(token.into())
    }
}

/// Path declarations in document order.
pub type Declarations = LinkedHashMap<String, RuleValue>;

/// Builds [`Declarations`] from `(path, mode token)` pairs.
#[cfg(test)]
pub fn declarations<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Declarations {
    entries
        .into_iter()
        .map(|(path, token)| (path.to_owned(), RuleValue::from(token)))
        .collect()
}

/// A node of the rule tree. Children are keyed by a single path segment,
/// which may be a `*`/`?` pattern.
#[derive(Debug, Clone)]
pub struct Rule {
    path: PathBuf,
    mode: Option<Mode>,
    children: GlobMap<Rule>,
}

impl Rule {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: None,
            children: GlobMap::new(),
        }
    }

    /// Builds and prunes the tree for `declarations`, rooted at `root`.
    pub fn parse(
        root: impl Into<PathBuf>,
        declarations: &Declarations,
    ) -> Result<Self, RuleTreeError> {
        let mut rule = Rule::new(root);
        rule.apply(declarations)?;
        rule.prune(None);
        Ok(rule)
    }

    fn apply(&mut self, declarations: &Declarations) -> Result<(), RuleTreeError> {
        for (raw_path, value) in declarations {
            let mut node = &mut *self;
            if raw_path != SELF_KEY {
                for segment in segments(raw_path) {
                    let child_path = node.path.join(segment);
                    node = node
                        .children
                        .get_or_insert_with(segment, || Rule::new(child_path))
                        .context(InvalidPatternSnafu { pattern: segment })?;
                }
            }

            match value {
                RuleValue::Mode(mode) => node.mode = Some(mode.clone()),
                RuleValue::Nested(nested) => node.apply(nested)?,
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub fn mode(&self) -> Option<&Mode> {
        self.mode.as_ref()
    }

    pub fn children(&self) -> &GlobMap<Rule> {
        &self.children
    }

    /// Child rule governing the entry called `name`.
    pub fn child(&self, name: &str) -> Option<&Rule> {
        self.children.get(name)
    }

    pub fn is_mode(&self, mode: &Mode) -> bool {
        self.mode.as_ref() == Some(mode)
    }

    /// True when this node carries a mode and it is not `mode`. A node without
    /// a mode is transparent and never counts as "other".
    pub fn is_other_mode(&self, mode: &Mode) -> bool {
        self.mode.as_ref().is_some_and(|own| own != mode)
    }

    /// A terminal negative rule: another mode and nothing declared beneath.
    pub fn blocks_mode(&self, mode: &Mode) -> bool {
        self.is_other_mode(mode) && self.children.is_empty()
    }

    /// Depth-first search that stops descending a branch at its first match.
    pub fn shallow_find(&self, predicate: &dyn Fn(&Rule) -> bool) -> Vec<&Rule> {
        if predicate(self) {
            return vec![self];
        }
        self.children
            .values()
            .flat_map(|child| child.shallow_find(predicate))
            .collect()
    }

    /// Drops child rules, with everything beneath them, whose mode is
    /// already inherited from the nearest mode-bearing ancestor.
    pub fn prune(&mut self, parent_mode: Option<&Mode>) {
        let inherited = self.mode.clone().or_else(|| parent_mode.cloned());

        self.children.retain(|pattern, child| {
            if inherited.is_some() && child.mode == inherited {
                trace!(
                    "Pruning redundant '{}' rule at {}",
                    pattern,
                    child.path.display()
                );
                return false;
            }
            child.prune(inherited.as_ref());
            true
        });
    }
}

fn segments(raw_path: &str) -> impl Iterator<Item = &str> {
    raw_path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != SELF_KEY)
}

#[derive(Debug, Snafu)]
pub enum RuleTreeError {
    #[snafu(display("Cannot compile path pattern '{}'", pattern))]
    InvalidPatternError {
        pattern: String,
        source: regex::Error,
    },
}

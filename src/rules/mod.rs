//! Rule tree describing which parts of the filesystem are watched, included
//! or ignored.
//!
//! Rules are keyed by path segment. A segment may be a `*`/`?` pattern, in
//! which case it applies to every matching entry of its parent directory.

mod glob_map;
mod rule;

pub use glob_map::{GlobMap, is_wildcard};
pub use rule::{Declarations, Mode, Rule, RuleTreeError, RuleValue};
#[cfg(test)]
pub use rule::declarations;

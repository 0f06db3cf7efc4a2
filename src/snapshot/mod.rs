//! Snapshots of the watched filesystem and the differences between them.
//!
//! A scan produces a tree of [`SnapshotNode`]s guided by the rule tree,
//! [`report`] compares two such trees and [`store`] persists them between
//! runs.

mod diff;
mod node;
pub mod store;
mod walk;
mod watcher;

pub use diff::report;
pub use node::{NodeKind, ScanError, SnapshotNode};
pub use store::SnapshotStoreError;
pub use walk::scan;
pub use watcher::Watcher;

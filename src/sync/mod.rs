//! Listing of the paths an external sync of the `include` rules transfers.

mod file_list;

pub use file_list::{SyncError, SyncLister};

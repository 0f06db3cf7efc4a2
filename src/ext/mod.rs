mod path_ext;
mod system_time_ext;

pub use path_ext::PathExt;
pub use system_time_ext::SystemTimeExt;

use std::time::SystemTime;

pub trait SystemTimeExt {
    /// Whole seconds relative to the unix epoch, negative for earlier times.
    fn to_unix_seconds(&self) -> i64;
}

impl SystemTimeExt for SystemTime {
    fn to_unix_seconds(&self) -> i64 {
        match self.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
            Err(err) => i64::try_from(err.duration().as_secs())
                .map(|secs| -secs)
                .unwrap_or(i64::MIN),
        }
    }
}

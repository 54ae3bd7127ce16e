use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of wall-clock time in unix milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

/// Hands out `site-<unix-millis>.zip` names.
///
/// Two calls within the same millisecond would collide, so a stamp at or
/// below the last one issued is bumped to last + 1. Names stay unique for the
/// lifetime of the namer even when the clock stalls or steps back.
pub struct ArchiveNamer {
    clock: Clock,
    last: AtomicI64,
}

impl ArchiveNamer {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            last: AtomicI64::new(i64::MIN),
        }
    }

    pub fn next_name(&self) -> String {
        let now = (self.clock)();
        let mut prev = self.last.load(Ordering::Relaxed);
        let stamp = loop {
            let candidate = if now > prev { now } else { prev + 1 };
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => break candidate,
                Err(actual) => prev = actual,
            }
        };
        archive_file_name(stamp)
    }
}

pub fn archive_file_name(unix_millis: i64) -> String {
    format!("site-{unix_millis}.zip")
}

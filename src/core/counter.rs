use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// An aggregation sink owned by the surrounding pipeline.
///
/// Writers only ever add to a counter; reading it back is the owner's job.
pub trait Counter {
    fn increment(&self, value: u64);
}

/// A named counter that can be shared between writers running on different threads.
///
/// # Example
///
/// ```
/// use record_sink_rs::core::counter::{Counter, LongCounter};
///
/// let counter = LongCounter::new("records");
/// counter.increment(2);
/// counter.increment(3);
///
/// assert_eq!(counter.value(), 5);
/// assert_eq!(counter.to_string(), "records=5");
/// ```
#[derive(Debug, Default)]
pub struct LongCounter {
    name: String,
    value: AtomicU64,
}

impl LongCounter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Counter for LongCounter {
    fn increment(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }
}

impl fmt::Display for LongCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value())
    }
}

use std::thread;
use std::time::Duration;

/// How an excess partitioned helper waits before checking again.
///
/// Implementations must return on their own; the helper bounds the number of
/// pauses, not their length.
///
pub trait Pause: Send + Sync {
    fn pause(&self, interval: Duration);
}

/// Put the thread to sleep for the interval.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&self, interval: Duration) {
        thread::sleep(interval);
    }
}

/// Give up the time slice, ignoring the interval.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadYield;

impl Pause for ThreadYield {
    fn pause(&self, _interval: Duration) {
        thread::yield_now();
    }
}

//! Fixed spacing between remote requests.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Enforces a minimum gap between consecutive remote requests.
///
/// The gap applies before every request regardless of outcome, and is
/// independent of retry backoff: the remote service meters sustained request
/// rate, not bursts.
#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Blocks until at least the configured interval has passed since the
    /// previous call, then records the new request time.
    pub fn pace(&self) {
        let mut last = self.last_request.lock().expect("pacer lock poisoned");
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

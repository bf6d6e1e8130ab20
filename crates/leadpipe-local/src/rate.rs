use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_CAPACITY: u32 = 10;

#[derive(Debug)]
struct ClientWindow {
    count: u32,
    window_start: Instant,
}

/// Per-client sliding-window request counter.
///
/// One window per distinct client key. Every call mutates the window, even
/// when the answer is "rejected", so a client hammering past its quota keeps
/// pushing its own count up rather than sneaking through on the boundary.
/// Entries for idle clients are reclaimed by [`purge_expired`], not on access.
///
/// [`purge_expired`]: SlidingWindowLimiter::purge_expired
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    windows: Mutex<HashMap<String, ClientWindow>>,
    window: Duration,
    capacity: u32,
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_CAPACITY)
    }
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, capacity: u32) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
            capacity,
        }
    }

    /// Count one request from `client_key` and report whether it is within
    /// quota. The read-modify-write is atomic per key (single lock over the
    /// map), so concurrent requests from the same client cannot lose updates.
    pub fn allow(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let entry = windows
            .entry(client_key.to_string())
            .or_insert(ClientWindow {
                count: 0,
                window_start: now,
            });
        if now.duration_since(entry.window_start) > self.window {
            entry.count = 1;
            entry.window_start = now;
        } else {
            entry.count += 1;
        }
        entry.count <= self.capacity
    }

    /// Drop windows whose last reset is older than one window length.
    ///
    /// Without this the map grows one entry per distinct client for the life
    /// of the process. Callers run it on a background interval; returns the
    /// number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.window_start) <= self.window);
        before - windows.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_calls_pass_then_reject() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 10);
        for i in 0..10 {
            assert!(limiter.allow("1.2.3.4"), "call {} should pass", i + 1);
        }
        assert!(!limiter.allow("1.2.3.4"), "call 11 should be rejected");
        assert!(!limiter.allow("1.2.3.4"), "call 12 should be rejected");
    }

    #[test]
    fn clients_do_not_interfere() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[test]
    fn window_elapse_resets_the_count() {
        let limiter = SlidingWindowLimiter::new(Duration::from_millis(20), 2);
        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow("a"), "fresh window should admit again");
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
    }

    #[test]
    fn purge_removes_only_stale_windows() {
        let limiter = SlidingWindowLimiter::new(Duration::from_millis(20), 10);
        assert!(limiter.allow("stale"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow("fresh"));
        assert_eq!(limiter.tracked_clients(), 2);
        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.tracked_clients(), 1);
        // The stale client starts a fresh window on its next request.
        assert!(limiter.allow("stale"));
    }
}

//! Per-connection send cap.
//!
//! A fixed-window counter: the window restarts at the first admission check that
//! lands more than one second after the window opened. Because the reset point
//! follows traffic rather than a wall-clock grid, a client can receive up to twice
//! the cap across a window boundary. Denied sends are dropped by the caller, never
//! queued.

/// Length of one rate window in milliseconds.
pub const WINDOW_MS: i64 = 1000;

/// Fixed-window admission counter for one connection.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_per_window: u32,
    window_start: i64,
    count: u32,
}

impl RateLimiter {
    /// Fresh window starting at `now_ms`.
    pub fn new(max_per_window: u32, now_ms: i64) -> Self {
        Self {
            max_per_window,
            window_start: now_ms,
            count: 0,
        }
    }

    /// Admit or deny a send at `now_ms`. Admission consumes one slot.
    pub fn try_acquire(&mut self, now_ms: i64) -> bool {
        if now_ms - self.window_start > WINDOW_MS {
            self.window_start = now_ms;
            self.count = 0;
        }
        if self.count >= self.max_per_window {
            return false;
        }
        self.count += 1;
        true
    }

    /// Sends admitted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_exactly_the_cap_within_a_window() {
        let mut limiter = RateLimiter::new(50, 0);
        let admitted = (0..80).filter(|i| limiter.try_acquire(i * 10)).count();
        assert_eq!(admitted, 50);
        assert_eq!(limiter.count(), 50);
        assert!(!limiter.try_acquire(1000));
    }

    #[test]
    fn test_resets_after_window_elapses() {
        let mut limiter = RateLimiter::new(2, 0);
        assert!(limiter.try_acquire(0));
        assert!(limiter.try_acquire(500));
        assert!(!limiter.try_acquire(999));
        assert!(limiter.try_acquire(1001));
        assert_eq!(limiter.count(), 1);
    }

    #[test]
    fn test_window_restarts_from_reset_point() {
        let mut limiter = RateLimiter::new(1, 0);
        assert!(limiter.try_acquire(0));
        assert!(limiter.try_acquire(1500));
        assert!(!limiter.try_acquire(2400));
        assert!(limiter.try_acquire(2501));
    }

    #[test]
    fn test_burst_across_boundary() {
        let mut limiter = RateLimiter::new(3, 0);
        let early = (0..3).filter(|_| limiter.try_acquire(990)).count();
        let late = (0..3).filter(|_| limiter.try_acquire(1001)).count();
        assert_eq!(early + late, 6);
    }

    #[test]
    fn test_zero_cap_denies_everything() {
        let mut limiter = RateLimiter::new(0, 0);
        assert!(!limiter.try_acquire(0));
        assert!(!limiter.try_acquire(5000));
    }
}

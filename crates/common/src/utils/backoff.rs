use std::time::Duration;

/// Exponential backoff schedule: `base, 2*base, 4*base, ...` for a bounded
/// number of delays. Used between retries of idempotent reads (session
/// restore, profile fetch); sign-in and sign-up are never auto-retried.
#[derive(Clone, Copy, Debug)]
pub struct Backoff {
    base: Duration,
    remaining: u32,
    next: Duration,
}

impl Backoff {
    pub fn new(base: Duration, delays: u32) -> Self {
        Self {
            base,
            remaining: delays,
            next: base,
        }
    }

    pub fn base(&self) -> Duration {
        self.base
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let delay = self.next;
        self.next = self.next.saturating_mul(2);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_step() {
        let delays: Vec<_> = Backoff::new(Duration::from_millis(500), 3).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(2000),
            ]
        );
    }

    #[test]
    fn zero_delays_yields_nothing() {
        assert_eq!(Backoff::new(Duration::from_millis(500), 0).count(), 0);
    }
}

use std::time::{Duration, Instant};

/// Interval at which every allocated blink group flips visibility.
pub const BLINK_INTERVAL: Duration = Duration::from_millis(500);

/// Shortest interval a [`BlinkTimer`] accepts.
pub const MIN_BLINK_INTERVAL: Duration = Duration::from_millis(1);

/// Session-wide blink phase shared by all blink groups.
///
/// Presentation layers call [`BlinkTimer::tick`] from their event loop and
/// redraw blinking spans whenever it reports a flip.
#[derive(Debug, Clone)]
pub struct BlinkTimer {
    visible: bool,
    next_flip: Instant,
    interval: Duration,
}

impl BlinkTimer {
    pub fn new(now: Instant) -> Self {
        Self::with_interval(now, BLINK_INTERVAL)
    }

    /// Intervals shorter than [`MIN_BLINK_INTERVAL`] are raised to it.
    pub fn with_interval(now: Instant, interval: Duration) -> Self {
        let interval = interval.max(MIN_BLINK_INTERVAL);
        Self {
            visible: true,
            next_flip: now + interval,
            interval,
        }
    }

    #[inline]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Advance the timer. Returns the new phase when it flipped.
    pub fn tick(&mut self, now: Instant) -> Option<bool> {
        if now < self.next_flip {
            return None;
        }

        self.visible = !self.visible;
        // Skip missed intervals rather than flipping repeatedly to catch up.
        while self.next_flip <= now {
            self.next_flip += self.interval;
        }
        Some(self.visible)
    }
}

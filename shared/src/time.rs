use std::time::{Duration, Instant};

/// Monotonic millisecond clock, started when the owning endpoint comes up.
/// Packet header timestamps are read from this clock.
#[derive(Debug, Clone)]
pub struct GameClock {
    start: Instant,
}

impl GameClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the clock was created, truncated to u32.
    /// Wraps after ~49 days, which outlives any game session.
    pub fn elapsed_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// A timer that "rings" once its duration has elapsed since the last reset.
pub struct Timer {
    duration: Duration,
    last: Instant,
}

impl Timer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            last: Instant::now(),
        }
    }

    /// Restart the countdown from now.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Returns whether the timer's duration has fully elapsed.
    pub fn ringing(&self) -> bool {
        self.last.elapsed() >= self.duration
    }

    pub fn elapsed(&self) -> Duration {
        self.last.elapsed()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn fresh_timer_is_not_ringing() {
        let timer = Timer::new(Duration::from_secs(10));
        assert!(!timer.ringing());
    }

    #[test]
    fn timer_rings_after_duration() {
        let mut timer = Timer::new(Duration::from_millis(5));
        sleep(Duration::from_millis(10));
        assert!(timer.ringing());
        timer.reset();
        assert!(!timer.ringing());
    }

    #[test]
    fn clock_is_monotonic() {
        let clock = GameClock::new();
        let first = clock.elapsed_ms();
        sleep(Duration::from_millis(2));
        assert!(clock.elapsed_ms() >= first);
    }
}

use std::time::{Duration, Instant};

/// Upper bound on catch-up ticks executed in a single loop iteration.
/// Under sustained overload the excess debt is dropped instead of spiralling.
pub const MAX_TICKS_PER_ITERATION: u32 = 5;

/// Fixed-timestep configuration.
#[derive(Debug, Clone, Copy)]
pub struct TickConfig {
    pub budget: Duration,
}

impl TickConfig {
    pub fn from_hz(hz: u32) -> Self {
        let hz = hz.max(1);
        Self {
            budget: Duration::from_nanos(1_000_000_000 / u64::from(hz)),
        }
    }

    pub fn budget_ms(&self) -> u64 {
        self.budget.as_millis() as u64
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self::from_hz(60)
    }
}

/// Accumulates elapsed wall time into tick debt and pays it out in whole
/// ticks, at most [`MAX_TICKS_PER_ITERATION`] per call.
pub struct TickAccumulator {
    config: TickConfig,
    debt: Duration,
    last_wake: Instant,
}

impl TickAccumulator {
    pub fn new(config: TickConfig) -> Self {
        Self {
            config,
            debt: Duration::ZERO,
            last_wake: Instant::now(),
        }
    }

    /// Folds the time elapsed since the previous call into the debt and
    /// returns how many ticks to execute now.
    pub fn advance(&mut self) -> u32 {
        let now = Instant::now();
        self.debt += now.duration_since(self.last_wake);
        self.last_wake = now;

        let mut ticks = 0;
        while self.debt >= self.config.budget && ticks < MAX_TICKS_PER_ITERATION {
            self.debt -= self.config.budget;
            ticks += 1;
        }
        if ticks == MAX_TICKS_PER_ITERATION && self.debt >= self.config.budget {
            // Overloaded: forget the remainder rather than death-spiral.
            self.debt = Duration::ZERO;
        }
        ticks
    }

    /// How long the loop may sleep before the next tick is due.
    pub fn until_next_tick(&self) -> Duration {
        self.config.budget.saturating_sub(self.debt)
    }

    pub fn config(&self) -> TickConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn from_hz_matches_budget() {
        let config = TickConfig::from_hz(60);
        assert_eq!(config.budget_ms(), 16);
        let config = TickConfig::from_hz(1);
        assert_eq!(config.budget_ms(), 1000);
    }

    #[test]
    fn no_ticks_before_budget_elapses() {
        let mut acc = TickAccumulator::new(TickConfig::from_hz(1));
        assert_eq!(acc.advance(), 0);
    }

    #[test]
    fn catch_up_is_bounded() {
        let mut acc = TickAccumulator::new(TickConfig::from_hz(1000));
        sleep(Duration::from_millis(30));
        let ticks = acc.advance();
        assert!(ticks <= MAX_TICKS_PER_ITERATION);
        assert!(ticks >= 1);
    }
}

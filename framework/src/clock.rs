/// Monotonic millisecond clock and interval gating
///
/// All timestamps are `u32` milliseconds since boot. The counter wraps after
/// ~49.7 days; every elapsed-time check uses wrapping subtraction so pacing
/// keeps working across the wrap.
use std::time::Instant;

/// Source of monotonic time for the control loop
pub trait Clock {
    /// Milliseconds since boot (wrapping)
    fn now_ms(&self) -> u32;
}

/// Clock anchored at process start
pub struct BootClock {
    start: Instant,
}

impl BootClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for BootClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for BootClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap
        self.start.elapsed().as_millis() as u32
    }
}

/// Elapsed milliseconds from `since` to `now`, tolerant of counter wrap
#[inline]
pub fn elapsed_ms(now_ms: u32, since_ms: u32) -> u32 {
    now_ms.wrapping_sub(since_ms)
}

/// Fixed-interval gate: "has `interval_ms` passed since the last mark?"
///
/// Starts with `last_ms = 0`, the same as a boot-time counter that has never
/// fired. An interval of 0 opens the gate on every check.
#[derive(Debug, Clone, Copy)]
pub struct RateGate {
    interval_ms: u32,
    last_ms: u32,
}

impl RateGate {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: 0,
        }
    }

    /// True when at least `interval_ms` has elapsed since the last mark
    #[inline]
    pub fn is_due(&self, now_ms: u32) -> bool {
        elapsed_ms(now_ms, self.last_ms) >= self.interval_ms
    }

    /// Record `now_ms` as the last time the gate fired
    #[inline]
    pub fn mark(&mut self, now_ms: u32) {
        self.last_ms = now_ms;
    }

    /// Check and mark in one step; returns whether the gate fired
    pub fn try_fire(&mut self, now_ms: u32) -> bool {
        if self.is_due(now_ms) {
            self.mark(now_ms);
            true
        } else {
            false
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn last_ms(&self) -> u32 {
        self.last_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_interval() {
        let mut gate = RateGate::new(10);
        assert!(gate.try_fire(100));
        assert!(!gate.try_fire(105), "5 ms after a send must not fire");
        assert!(gate.try_fire(111));
        assert_eq!(gate.last_ms(), 111);
    }

    #[test]
    fn test_gate_exact_boundary() {
        let mut gate = RateGate::new(250);
        gate.mark(1000);
        assert!(!gate.is_due(1249));
        assert!(gate.is_due(1250));
    }

    #[test]
    fn test_gate_zero_interval_always_due() {
        let mut gate = RateGate::new(0);
        for now in [0u32, 0, 1, 1, 2] {
            assert!(gate.try_fire(now));
        }
    }

    #[test]
    fn test_gate_before_first_interval() {
        // Boot-time counter starts at 0, first fire needs a full interval
        let gate = RateGate::new(100);
        assert!(!gate.is_due(50));
        assert!(gate.is_due(100));
    }

    #[test]
    fn test_gate_survives_wrap() {
        let mut gate = RateGate::new(10);
        gate.mark(u32::MAX - 4);
        assert!(!gate.is_due(2), "7 ms across the wrap");
        assert!(gate.is_due(5), "10 ms across the wrap");
    }

    #[test]
    fn test_boot_clock_monotonic() {
        let clock = BootClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}

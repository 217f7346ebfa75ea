use std::time::Duration;

/// Fixed-period tick source fed by elapsed wall time.
///
/// Elapsed time accumulates while armed and is paid out one period at a
/// time. Disarming drops whatever was pending.
#[derive(Clone, Debug)]
pub(crate) struct Clock {
    period: Duration,
    accum: Duration,
    armed: bool,
}

impl Clock {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            accum: Duration::ZERO,
            armed: false,
        }
    }

    pub(crate) fn arm(&mut self) {
        if !self.armed {
            self.armed = true;
            self.accum = Duration::ZERO;
        }
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = false;
        self.accum = Duration::ZERO;
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed
    }

    pub(crate) fn feed(&mut self, dt: Duration) {
        if self.armed {
            self.accum = self.accum.saturating_add(dt);
        }
    }

    /// Take one due tick, if any.
    pub(crate) fn pop_tick(&mut self) -> bool {
        if self.armed && self.accum >= self.period {
            self.accum -= self.period;
            true
        } else {
            false
        }
    }

    /// Time until the next tick comes due; `Duration::MAX` when disarmed.
    pub(crate) fn until_next(&self) -> Duration {
        if self.armed {
            self.period.saturating_sub(self.accum)
        } else {
            Duration::MAX
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(c: &mut Clock) -> u32 {
        let mut n = 0;
        while c.pop_tick() {
            n += 1;
        }
        n
    }

    #[test]
    fn idle_clock_never_fires() {
        let mut c = Clock::new(Duration::from_secs(1));
        c.feed(Duration::from_secs(10));
        assert_eq!(drain(&mut c), 0);
    }

    #[test]
    fn pays_out_whole_periods_and_keeps_remainder() {
        let mut c = Clock::new(Duration::from_secs(3));
        c.arm();
        c.feed(Duration::from_millis(7_500));
        assert_eq!(drain(&mut c), 2);
        assert_eq!(c.until_next(), Duration::from_millis(1_500));
        c.feed(Duration::from_millis(1_499));
        assert_eq!(drain(&mut c), 0);
        c.feed(Duration::from_millis(1));
        assert_eq!(drain(&mut c), 1);
    }

    #[test]
    fn disarm_releases_pending_time() {
        let mut c = Clock::new(Duration::from_secs(1));
        c.arm();
        c.feed(Duration::from_millis(2_900));
        c.disarm();
        assert!(!c.is_armed());
        assert_eq!(c.until_next(), Duration::MAX);
        assert_eq!(drain(&mut c), 0);
        c.arm();
        c.feed(Duration::from_millis(500));
        assert_eq!(drain(&mut c), 0);
    }

    #[test]
    fn rearming_an_armed_clock_keeps_phase() {
        let mut c = Clock::new(Duration::from_secs(1));
        c.arm();
        c.feed(Duration::from_millis(800));
        c.arm();
        c.feed(Duration::from_millis(200));
        assert_eq!(drain(&mut c), 1);
    }
}

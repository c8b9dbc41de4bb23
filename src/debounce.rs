use std::time::{Duration, Instant};

/// Cancel-and-reschedule timer with at most one pending execution.
///
/// Each `schedule` replaces any earlier pending deadline, so a burst of
/// calls yields a single fire once the quiet period has elapsed. Time is
/// passed in by the caller to keep the primitive testable.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    /// Arm (or re-arm) the deadline. An unfired earlier schedule is
    /// replaced, not queued.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True at most once per armed deadline, once `now` has passed it.
    pub fn fire_ready(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Rebuilding the delay is the only mutation a live config change needs.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn does_not_fire_before_the_quiet_period() {
        let mut debouncer = Debouncer::from_millis(300);
        let t0 = Instant::now();
        debouncer.schedule(t0);
        assert!(!debouncer.fire_ready(t0 + Duration::from_millis(299)));
        assert!(debouncer.is_pending());
    }

    #[test]
    fn fires_exactly_once_per_schedule() {
        let mut debouncer = Debouncer::from_millis(300);
        let t0 = Instant::now();
        debouncer.schedule(t0);
        let later = t0 + Duration::from_millis(300);
        assert!(debouncer.fire_ready(later));
        assert!(!debouncer.fire_ready(later + Duration::from_millis(1)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn rapid_reschedules_coalesce_into_one_fire() {
        let mut debouncer = Debouncer::from_millis(300);
        let t0 = Instant::now();
        for i in 0..5 {
            debouncer.schedule(t0 + Duration::from_millis(i * 50));
        }
        // The burst pushed the deadline to the last schedule + delay.
        assert!(!debouncer.fire_ready(t0 + Duration::from_millis(400)));
        assert!(debouncer.fire_ready(t0 + Duration::from_millis(500)));
        assert!(!debouncer.fire_ready(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn cancel_discards_the_pending_deadline() {
        let mut debouncer = Debouncer::from_millis(100);
        let t0 = Instant::now();
        debouncer.schedule(t0);
        debouncer.cancel();
        assert!(!debouncer.fire_ready(t0 + Duration::from_millis(500)));
    }
}

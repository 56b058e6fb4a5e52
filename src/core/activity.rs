//! Active-time accounting.
//!
//! Any gap between consecutive events longer than the idle threshold is
//! counted as idle in full, even if the user resumed partway through it.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ActivityClock {
    idle_threshold: Duration,
    session_start: Option<Instant>,
    last_event: Option<Instant>,
    idle_accumulated: Duration,
}

impl ActivityClock {
    pub fn new(idle_threshold: Duration) -> Self {
        Self {
            idle_threshold,
            session_start: None,
            last_event: None,
            idle_accumulated: Duration::ZERO,
        }
    }

    /// Record an event and return the gap since the previous one, if any.
    pub fn record_event(&mut self, now: Instant) -> Option<Duration> {
        let gap = self.last_event.map(|last| now.saturating_duration_since(last));

        match gap {
            None => self.session_start = Some(now),
            Some(gap) if gap > self.idle_threshold => self.idle_accumulated += gap,
            Some(_) => {}
        }

        self.last_event = Some(now);
        gap
    }

    /// Session time minus idle gaps; zero before the first event.
    pub fn active_time(&self, now: Instant) -> Duration {
        match self.session_start {
            Some(start) => now
                .saturating_duration_since(start)
                .saturating_sub(self.idle_accumulated),
            None => Duration::ZERO,
        }
    }

    /// Time since the most recent event, or `None` before the first.
    pub fn since_last_event(&self, now: Instant) -> Option<Duration> {
        self.last_event
            .map(|last| now.saturating_duration_since(last))
    }

    pub fn session_start(&self) -> Option<Instant> {
        self.session_start
    }

    pub fn idle_accumulated(&self) -> Duration {
        self.idle_accumulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_no_session_before_first_event() {
        let clock = ActivityClock::new(secs(10));
        assert_eq!(clock.active_time(Instant::now()), Duration::ZERO);
        assert!(clock.session_start().is_none());
    }

    #[test]
    fn test_short_gaps_count_as_active() {
        let t0 = Instant::now();
        let mut clock = ActivityClock::new(secs(10));

        assert_eq!(clock.record_event(t0), None);
        assert_eq!(clock.record_event(t0 + secs(4)), Some(secs(4)));
        assert_eq!(clock.record_event(t0 + secs(14)), Some(secs(10)));

        assert_eq!(clock.idle_accumulated(), Duration::ZERO);
        assert_eq!(clock.active_time(t0 + secs(14)), secs(14));
    }

    #[test]
    fn test_long_gap_excluded_in_full() {
        let t0 = Instant::now();
        let mut clock = ActivityClock::new(secs(10));

        clock.record_event(t0);
        clock.record_event(t0 + secs(2));
        clock.record_event(t0 + secs(32));

        assert_eq!(clock.idle_accumulated(), secs(30));
        assert_eq!(clock.active_time(t0 + secs(33)), secs(3));
    }

    #[test]
    fn test_session_start_set_once() {
        let t0 = Instant::now();
        let mut clock = ActivityClock::new(secs(10));

        clock.record_event(t0);
        clock.record_event(t0 + secs(50));
        assert_eq!(clock.session_start(), Some(t0));
    }

    #[test]
    fn test_since_last_event() {
        let t0 = Instant::now();
        let mut clock = ActivityClock::new(secs(10));
        assert_eq!(clock.since_last_event(t0), None);

        clock.record_event(t0);
        assert_eq!(clock.since_last_event(t0 + secs(3)), Some(secs(3)));
    }
}

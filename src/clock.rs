//! The four clocks (Bot1, Partner, Bot2, Human) and the diagonal-time
//! up-on-time rule used by the stall machine (spec.md §6), generalized
//! from a single board's
//! white/black clock pair in `engine/types.rs`) to the two-board,
//! four-seat layout this spec requires.

use crate::stall::{BotId, ClockSnapshot};
use std::time::{Duration, Instant};

/// One side's running clock: remaining time plus the increment applied
/// after each of its moves.
#[derive(Debug, Clone, Copy)]
pub struct SideClock {
    remaining: Duration,
    increment: Duration,
    running_since: Option<Instant>,
}

impl SideClock {
    pub fn new(initial: Duration, increment: Duration) -> Self {
        SideClock { remaining: initial, increment, running_since: None }
    }

    pub fn start(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    /// Stop the clock at `now`, subtracting elapsed time and crediting
    /// the increment. Idempotent if the clock wasn't running.
    pub fn stop(&mut self, now: Instant) {
        if let Some(start) = self.running_since.take() {
            let elapsed = now.saturating_duration_since(start);
            self.remaining = self.remaining.saturating_sub(elapsed);
            self.remaining += self.increment;
        }
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        match self.running_since {
            Some(start) => self.remaining.saturating_sub(now.saturating_duration_since(start)),
            None => self.remaining,
        }
    }

    pub fn flagged_at(&self, now: Instant) -> bool {
        self.remaining_at(now).is_zero()
    }
}

/// The four seats' clocks, keyed the way spec.md's diagonal rule keys
/// them: Bot1 and Human share board A, Partner and Bot2 share board B.
/// The diagonal up-on-time comparison ([`crate::stall::up_on_time`])
/// crosses boards: Bot1 vs. Partner, Partner vs. Bot1, Bot2 vs. Human.
pub struct GameClocks {
    pub bot1: SideClock,
    pub partner: SideClock,
    pub bot2: SideClock,
    pub human: SideClock,
}

impl GameClocks {
    pub fn new(initial: Duration, increment: Duration) -> Self {
        GameClocks {
            bot1: SideClock::new(initial, increment),
            partner: SideClock::new(initial, increment),
            bot2: SideClock::new(initial, increment),
            human: SideClock::new(initial, increment),
        }
    }

    pub fn snapshot_at(&self, now: Instant) -> ClockSnapshot {
        ClockSnapshot {
            bot1_remaining: self.bot1.remaining_at(now),
            partner_remaining: self.partner.remaining_at(now),
            bot2_remaining: self.bot2.remaining_at(now),
            human_remaining: self.human.remaining_at(now),
        }
    }

    pub fn clock_for(&mut self, bot: BotId) -> &mut SideClock {
        match bot {
            BotId::Bot1 => &mut self.bot1,
            BotId::Partner => &mut self.partner,
            BotId::Bot2 => &mut self.bot2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopping_applies_increment() {
        let mut clock = SideClock::new(Duration::from_secs(10), Duration::from_secs(2));
        let t0 = Instant::now();
        clock.start(t0);
        let t1 = t0 + Duration::from_secs(3);
        clock.stop(t1);
        assert_eq!(clock.remaining_at(t1), Duration::from_secs(9));
    }

    #[test]
    fn flags_at_zero() {
        let mut clock = SideClock::new(Duration::from_millis(500), Duration::ZERO);
        let t0 = Instant::now();
        clock.start(t0);
        assert!(clock.flagged_at(t0 + Duration::from_secs(1)));
        assert!(!clock.flagged_at(t0));
    }
}

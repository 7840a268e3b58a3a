//! Key repetition.
//!
//! A repeat goes through the following phases:
//!
//! ```text
//!   Idle --arm--> Delay --timer--> Sync --done--> Interval --timer--> Sync ...
//!     ^                                                                  |
//!     +------------------------------ disarm ----------------------------+
//! ```
//!
//! Instead of firing repeats from a free running local clock, every elapsed
//! timer first requests a synchronization round-trip, and the repeat is only
//! delivered once the compositor answered it. This keeps repetition in phase
//! with the compositor's own event processing.

use std::time::Duration;

use tracing::{trace, warn};

use crate::attributes::RepeatKind;
use crate::keyboard::{Keysym, ModifiersState};
use crate::platform::{DeviceId, RepeatTask, Scheduler};

const MICROS_IN_SECOND: u32 = 1_000_000;

/// Repeat rate and delay of a device.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepeatInfo {
    /// Repetitions per second, `0` disables repetition.
    pub rate: u32,
    /// Delay between a key press and the start of repetition.
    pub delay: Duration,
}

impl RepeatInfo {
    /// Build repeat info from the raw values sent by the compositor.
    ///
    /// Negative values are treated as `0`.
    pub fn from_protocol(rate: i32, delay: i32) -> Self {
        let rate = u32::try_from(rate).unwrap_or(0);
        let delay = Duration::from_millis(u64::try_from(delay).unwrap_or(0));
        Self { rate, delay }
    }

    /// Gap between two repetitions, `None` when repetition is disabled.
    pub fn gap(&self) -> Option<Duration> {
        match self.rate {
            0 => None,
            rate if rate > MICROS_IN_SECOND => Some(Duration::from_micros(1)),
            rate => Some(Duration::from_micros(u64::from(MICROS_IN_SECOND / rate))),
        }
    }
}

/// The key a repeat was armed for, as decoded at press time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatKey {
    pub code: u32,
    pub keysym: Keysym,
    pub modifiers: ModifiersState,
}

/// Observable phase of a [`RepeatEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPhase {
    /// Nothing armed.
    Idle,
    /// Waiting for the initial delay.
    Delay,
    /// Waiting for the compositor to answer a synchronization request.
    Sync,
    /// Waiting for the gap between two repetitions.
    Interval,
}

enum Pending<T, S> {
    None,
    Delay(T),
    Sync(S),
    Interval(T),
}

struct Armed {
    key: RepeatKey,
    /// Snapshot of the gap at arm time.
    gap: Duration,
}

/// Auto-repeat state machine of one keyboard device.
pub struct RepeatEngine<T, S> {
    device: DeviceId,
    info: RepeatInfo,
    /// Set when the info comes from the configuration and must not be overridden.
    locked: bool,
    armed: Option<Armed>,
    pending: Pending<T, S>,
    generation: u64,
}

impl<T, S> RepeatEngine<T, S> {
    pub fn new(device: DeviceId, kind: RepeatKind) -> Self {
        let (info, locked) = match kind {
            RepeatKind::System => (RepeatInfo::default(), false),
            RepeatKind::Fixed { rate, delay } => (RepeatInfo { rate, delay }, true),
        };
        Self { device, info, locked, armed: None, pending: Pending::None, generation: 0 }
    }

    /// Update the rate and delay used by future arms.
    ///
    /// A repeat that is already armed keeps its cadence.
    pub fn set_info(&mut self, info: RepeatInfo) {
        if self.locked {
            trace!(device = ?self.device, "ignoring repeat info, repetition is fixed");
            return;
        }
        self.info = info;
    }

    pub fn info(&self) -> RepeatInfo {
        self.info
    }

    pub fn armed(&self) -> Option<RepeatKey> {
        self.armed.as_ref().map(|armed| armed.key)
    }

    pub fn phase(&self) -> RepeatPhase {
        match self.pending {
            Pending::None => RepeatPhase::Idle,
            Pending::Delay(_) => RepeatPhase::Delay,
            Pending::Sync(_) => RepeatPhase::Sync,
            Pending::Interval(_) => RepeatPhase::Interval,
        }
    }

    fn task(&self) -> RepeatTask {
        RepeatTask { device: self.device, generation: self.generation }
    }

    /// Start repeating `key`, replacing whatever was armed before.
    ///
    /// Does nothing but disarm when repetition is disabled.
    pub fn arm<P>(&mut self, key: RepeatKey, scheduler: &mut P)
    where
        P: Scheduler<Timer = T, Sync = S>,
    {
        self.disarm(scheduler);

        let gap = match self.info.gap() {
            Some(gap) => gap,
            None => return,
        };

        match scheduler.schedule_timer(self.task(), self.info.delay) {
            Some(timer) => {
                trace!(device = ?self.device, keysym = ?key.keysym, "armed key repeat");
                self.armed = Some(Armed { key, gap });
                self.pending = Pending::Delay(timer);
            },
            None => warn!(device = ?self.device, "failed to schedule key repeat"),
        }
    }

    /// Stop repeating, cancelling any pending timer or synchronization.
    pub fn disarm<P>(&mut self, scheduler: &mut P)
    where
        P: Scheduler<Timer = T, Sync = S>,
    {
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::None => (),
            Pending::Delay(timer) | Pending::Interval(timer) => scheduler.cancel_timer(timer),
            Pending::Sync(sync) => scheduler.cancel_sync(sync),
        }

        if self.armed.take().is_some() {
            trace!(device = ?self.device, "disarmed key repeat");
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// A timer scheduled with `generation` elapsed.
    pub fn timer_elapsed<P>(&mut self, generation: u64, scheduler: &mut P)
    where
        P: Scheduler<Timer = T, Sync = S>,
    {
        if generation != self.generation
            || !matches!(self.pending, Pending::Delay(_) | Pending::Interval(_))
        {
            return;
        }

        // The timer is one-shot, its handle is dead now.
        self.pending = Pending::None;
        match scheduler.request_sync(self.task()) {
            Some(sync) => self.pending = Pending::Sync(sync),
            None => {
                warn!(device = ?self.device, "failed to synchronize key repeat");
                self.disarm(scheduler);
            },
        }
    }

    /// A synchronization requested with `generation` completed.
    ///
    /// Returns the key to deliver a repeated press for.
    pub fn sync_done<P>(&mut self, generation: u64, scheduler: &mut P) -> Option<RepeatKey>
    where
        P: Scheduler<Timer = T, Sync = S>,
    {
        if generation != self.generation || !matches!(self.pending, Pending::Sync(_)) {
            return None;
        }

        self.pending = Pending::None;
        let (key, gap) = match self.armed.as_ref() {
            Some(armed) => (armed.key, armed.gap),
            None => return None,
        };

        match scheduler.schedule_timer(self.task(), gap) {
            Some(timer) => self.pending = Pending::Interval(timer),
            None => {
                warn!(device = ?self.device, "failed to schedule key repeat");
                self.disarm(scheduler);
            },
        }

        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPlatform;

    const KEY_A: RepeatKey = RepeatKey {
        code: 30,
        keysym: Keysym::from_raw(0x61),
        modifiers: ModifiersState::empty(),
    };

    fn engine(rate: u32, delay_ms: u64) -> RepeatEngine<u64, u64> {
        let mut engine = RepeatEngine::new(DeviceId::from_raw(1), RepeatKind::System);
        engine.set_info(RepeatInfo { rate, delay: Duration::from_millis(delay_ms) });
        engine
    }

    #[test]
    fn gap_from_rate() {
        assert_eq!(RepeatInfo::from_protocol(25, 400).gap(), Some(Duration::from_millis(40)));
        assert_eq!(RepeatInfo::from_protocol(0, 400).gap(), None);
        assert_eq!(RepeatInfo::from_protocol(-3, -1), RepeatInfo::default());
        assert_eq!(RepeatInfo::from_protocol(i32::MAX, 0).gap(), Some(Duration::from_micros(1)));
    }

    #[test]
    fn arm_then_cycle_through_sync() {
        let mut platform = MockPlatform::new();
        let mut engine = engine(25, 400);

        engine.arm(KEY_A, &mut platform);
        assert_eq!(engine.phase(), RepeatPhase::Delay);
        let (timer, deadline, task) = platform.timers[0];
        assert_eq!(deadline, Duration::from_millis(400));

        platform.timers.retain(|(handle, ..)| *handle != timer);
        engine.timer_elapsed(task.generation, &mut platform);
        assert_eq!(engine.phase(), RepeatPhase::Sync);
        assert_eq!(platform.syncs.len(), 1);

        let (_, task) = platform.syncs.remove(0);
        assert_eq!(engine.sync_done(task.generation, &mut platform), Some(KEY_A));
        assert_eq!(engine.phase(), RepeatPhase::Interval);
        assert_eq!(platform.timers.last().map(|t| t.1), Some(Duration::from_millis(40)));
    }

    #[test]
    fn disabled_rate_never_arms() {
        let mut platform = MockPlatform::new();
        let mut engine = engine(0, 400);

        engine.arm(KEY_A, &mut platform);
        assert_eq!(engine.phase(), RepeatPhase::Idle);
        assert_eq!(engine.armed(), None);
        assert!(platform.timers.is_empty());
    }

    #[test]
    fn disarm_cancels_pending_work() {
        let mut platform = MockPlatform::new();
        let mut engine = engine(25, 400);

        engine.arm(KEY_A, &mut platform);
        engine.disarm(&mut platform);
        assert!(platform.timers.is_empty());
        assert_eq!(platform.cancelled_timers, 1);

        engine.arm(KEY_A, &mut platform);
        let (_, _, task) = platform.timers.remove(0);
        engine.timer_elapsed(task.generation, &mut platform);
        engine.disarm(&mut platform);
        assert!(platform.syncs.is_empty());
        assert_eq!(platform.cancelled_syncs, 1);
        assert_eq!(engine.phase(), RepeatPhase::Idle);
    }

    #[test]
    fn stale_generations_are_ignored() {
        let mut platform = MockPlatform::new();
        let mut engine = engine(25, 400);

        engine.arm(KEY_A, &mut platform);
        let (_, _, stale) = platform.timers[0];
        engine.arm(RepeatKey { code: 48, keysym: Keysym::from_raw(0x62), ..KEY_A }, &mut platform);

        engine.timer_elapsed(stale.generation, &mut platform);
        assert_eq!(engine.phase(), RepeatPhase::Delay);
        assert!(platform.syncs.is_empty());
        assert_eq!(engine.sync_done(stale.generation, &mut platform), None);
    }

    #[test]
    fn info_does_not_change_armed_cadence() {
        let mut platform = MockPlatform::new();
        let mut engine = engine(25, 400);

        engine.arm(KEY_A, &mut platform);
        engine.set_info(RepeatInfo { rate: 10, delay: Duration::from_millis(100) });

        let (_, _, task) = platform.timers.remove(0);
        engine.timer_elapsed(task.generation, &mut platform);
        let (_, task) = platform.syncs.remove(0);
        engine.sync_done(task.generation, &mut platform);
        assert_eq!(platform.timers[0].1, Duration::from_millis(40));
    }

    #[test]
    fn fixed_repeat_ignores_compositor_info() {
        let kind = RepeatKind::Fixed { rate: 30, delay: Duration::from_millis(250) };
        let mut engine = RepeatEngine::<u64, u64>::new(DeviceId::from_raw(1), kind);
        engine.set_info(RepeatInfo::from_protocol(0, 0));
        assert_eq!(engine.info(), RepeatInfo { rate: 30, delay: Duration::from_millis(250) });
    }

    #[test]
    fn scheduler_refusal_stays_idle() {
        let mut platform = MockPlatform::new();
        platform.refuse_timers = true;
        let mut engine = engine(25, 400);

        engine.arm(KEY_A, &mut platform);
        assert_eq!(engine.phase(), RepeatPhase::Idle);
        assert_eq!(engine.armed(), None);
    }
}

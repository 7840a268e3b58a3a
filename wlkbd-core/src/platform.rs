//! Seams between the core state machines and the backend.
//!
//! The core never talks to a compositor or an event loop directly. A backend
//! provides a [`Platform`], which creates and releases the protocol objects and
//! schedules the timed work needed by key repetition.

use std::time::Duration;

use crate::decoder::Decoder;

/// Identifier of a keyboard device.
///
/// Ids are never reused within one subsystem instance, so work scheduled for a
/// removed device can't be mistaken for work of a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(u64);

impl DeviceId {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

/// Work scheduled on behalf of a device's repeat engine.
///
/// The generation changes on every arm and disarm; a task that comes back with
/// a stale generation was superseded and is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepeatTask {
    pub device: DeviceId,
    pub generation: u64,
}

/// Timers and synchronization barriers.
pub trait Scheduler {
    /// Handle of a pending one-shot timer.
    type Timer;
    /// Handle of a pending synchronization callback.
    type Sync;

    /// Fire `task` once, `after` from now.
    ///
    /// Returns `None` when the timer could not be created.
    fn schedule_timer(&mut self, task: RepeatTask, after: Duration) -> Option<Self::Timer>;

    fn cancel_timer(&mut self, timer: Self::Timer);

    /// Fire `task` once the compositor processed every request sent so far.
    fn request_sync(&mut self, task: RepeatTask) -> Option<Self::Sync>;

    fn cancel_sync(&mut self, sync: Self::Sync);
}

/// Protocol objects of a backend.
pub trait Platform: Scheduler {
    /// A bound seat.
    type Seat;
    /// A keyboard device obtained from a seat.
    type Keyboard;
    /// The payload of a keymap event.
    type Keymap;
    type Decoder: Decoder;

    fn bind_seat(&mut self, name: u32, version: u32) -> Self::Seat;

    /// Obtain the keyboard of `seat`, routing its events to `device`.
    fn get_keyboard(&mut self, seat: &Self::Seat, device: DeviceId) -> Self::Keyboard;

    /// Ask the compositor to stop sending events for `keyboard`.
    fn release_keyboard(&mut self, keyboard: &Self::Keyboard);

    fn release_seat(&mut self, seat: Self::Seat);

    /// Compile a text keymap, `None` when it can't be used.
    fn compile_keymap(&mut self, keymap: Self::Keymap) -> Option<Self::Decoder>;
}

//! Test doubles for the backend seams.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::decoder::Decoder;
use crate::handler::KeyboardHandler;
use crate::keyboard::{Keysym, ModifiersState, SurfaceId};
use crate::platform::{DeviceId, Platform, RepeatTask, Scheduler};

pub const TARGET: SurfaceId = SurfaceId::from_raw(0x1000);

/// Evdev codes and keysyms understood by [`MockDecoder`].
pub mod keys {
    use crate::keyboard::Keysym;

    pub const A: u32 = 30;
    pub const B: u32 = 48;
    pub const LEFT_SHIFT: u32 = 42;

    pub const SYM_A: Keysym = Keysym::from_raw(0x61);
    pub const SYM_B: Keysym = Keysym::from_raw(0x62);
    pub const SYM_SHIFT_L: Keysym = Keysym::from_raw(0xffe1);
}

/// A virtual clock shared between the platform and the recorder.
#[derive(Debug, Default, Clone)]
pub struct Clock(Rc<Cell<Duration>>);

impl Clock {
    pub fn now(&self) -> Duration {
        self.0.get()
    }

    pub fn set(&self, now: Duration) {
        self.0.set(now);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Press(Keysym, ModifiersState),
    Release(Keysym, ModifiersState),
    FocusEnter,
    FocusLeave,
}

/// A handler recording every call along with the virtual time it happened at.
#[derive(Debug, Clone)]
pub struct Recorder {
    clock: Clock,
    records: Rc<RefCell<Vec<(Duration, Record)>>>,
}

impl Recorder {
    pub fn new(clock: Clock) -> Self {
        Self { clock, records: Default::default() }
    }

    /// Drain what was recorded so far.
    pub fn take(&self) -> Vec<(Duration, Record)> {
        std::mem::take(&mut *self.records.borrow_mut())
    }

    fn push(&self, record: Record) {
        self.records.borrow_mut().push((self.clock.now(), record));
    }
}

impl KeyboardHandler for Recorder {
    fn key_pressed(&mut self, keysym: Keysym, modifiers: ModifiersState) {
        self.push(Record::Press(keysym, modifiers));
    }

    fn key_released(&mut self, keysym: Keysym, modifiers: ModifiersState) {
        self.push(Record::Release(keysym, modifiers));
    }

    fn focus_entered(&mut self) {
        self.push(Record::FocusEnter);
    }

    fn focus_left(&mut self) {
        self.push(Record::FocusLeave);
    }
}

/// A tiny US layout, modifiers are taken verbatim from the serialized state.
#[derive(Debug, Default)]
pub struct MockDecoder {
    modifiers: ModifiersState,
}

impl MockDecoder {
    pub fn us() -> Self {
        Self::default()
    }
}

impl Decoder for MockDecoder {
    fn key_get_one_sym(&mut self, code: u32) -> Keysym {
        match code {
            keys::A => keys::SYM_A,
            keys::B => keys::SYM_B,
            keys::LEFT_SHIFT => keys::SYM_SHIFT_L,
            _ => Keysym::NO_SYMBOL,
        }
    }

    fn modifiers(&self) -> ModifiersState {
        self.modifiers
    }

    fn key_repeats(&mut self, code: u32) -> bool {
        code != keys::LEFT_SHIFT
    }

    fn update_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, _group: u32) {
        self.modifiers = ModifiersState::from_bits_truncate(depressed | latched | locked);
    }
}

/// A platform recording every request, with timers on a virtual clock.
#[derive(Debug, Default)]
pub struct MockPlatform {
    clock: Clock,
    next_handle: u64,
    /// Pending timers: handle, deadline and task.
    pub timers: Vec<(u64, Duration, RepeatTask)>,
    /// Pending synchronization requests: handle and task.
    pub syncs: Vec<(u64, RepeatTask)>,
    pub cancelled_timers: usize,
    pub cancelled_syncs: usize,
    pub refuse_timers: bool,
    /// Bound seats: global name and version.
    pub bound_seats: Vec<(u32, u32)>,
    pub released_keyboards: Vec<DeviceId>,
    pub released_seats: Vec<u32>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self { clock, ..Self::default() }
    }

    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Remove and return the earliest timer due at or before `until`.
    pub fn take_due_timer(&mut self, until: Duration) -> Option<(Duration, RepeatTask)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, (_, deadline, _))| *deadline <= until)
            .min_by_key(|(_, (handle, deadline, _))| (*deadline, *handle))
            .map(|(index, _)| index)?;
        let (_, deadline, task) = self.timers.remove(index);
        Some((deadline, task))
    }

    /// Remove and return the oldest synchronization request.
    pub fn take_sync(&mut self) -> Option<(u64, RepeatTask)> {
        if self.syncs.is_empty() {
            None
        } else {
            Some(self.syncs.remove(0))
        }
    }
}

impl Scheduler for MockPlatform {
    type Sync = u64;
    type Timer = u64;

    fn schedule_timer(&mut self, task: RepeatTask, after: Duration) -> Option<u64> {
        if self.refuse_timers {
            return None;
        }
        let handle = self.handle();
        self.timers.push((handle, self.clock.now() + after, task));
        Some(handle)
    }

    fn cancel_timer(&mut self, timer: u64) {
        self.timers.retain(|(handle, ..)| *handle != timer);
        self.cancelled_timers += 1;
    }

    fn request_sync(&mut self, task: RepeatTask) -> Option<u64> {
        let handle = self.handle();
        self.syncs.push((handle, task));
        Some(handle)
    }

    fn cancel_sync(&mut self, sync: u64) {
        self.syncs.retain(|(handle, _)| *handle != sync);
        self.cancelled_syncs += 1;
    }
}

impl Platform for MockPlatform {
    type Decoder = MockDecoder;
    type Keyboard = DeviceId;
    /// `None` stands for a keymap that fails to compile.
    type Keymap = Option<MockDecoder>;
    type Seat = u32;

    fn bind_seat(&mut self, name: u32, version: u32) -> u32 {
        self.bound_seats.push((name, version));
        name
    }

    fn get_keyboard(&mut self, _seat: &u32, device: DeviceId) -> DeviceId {
        device
    }

    fn release_keyboard(&mut self, keyboard: &DeviceId) {
        self.released_keyboards.push(*keyboard);
    }

    fn release_seat(&mut self, seat: u32) {
        self.released_seats.push(seat);
    }

    fn compile_keymap(&mut self, keymap: Option<MockDecoder>) -> Option<MockDecoder> {
        keymap
    }
}

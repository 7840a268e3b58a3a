//! A keyboard device of a seat.

use tracing::{debug, warn};

use crate::attributes::RepeatKind;
use crate::decoder::Decoder;
use crate::handler::KeyboardHandler;
use crate::keyboard::{KeyState, KeymapFormat, SurfaceId};
use crate::platform::{DeviceId, Platform};
use crate::repeat::{RepeatEngine, RepeatInfo, RepeatKey, RepeatPhase};

/// Events delivered for one keyboard device, in protocol order.
#[derive(Debug)]
pub enum KeyboardEvent<K> {
    Keymap { format: KeymapFormat, keymap: K },
    Enter { surface: SurfaceId },
    Leave { surface: SurfaceId },
    Key { code: u32, state: KeyState },
    Modifiers { depressed: u32, latched: u32, locked: u32, group: u32 },
    RepeatInfo { rate: i32, delay: i32 },
}

enum KeymapState<D> {
    /// No keymap received yet.
    Pending,
    Ready(D),
    /// The keymap could not be used, the device never decodes.
    Unsupported,
}

/// What a device borrows from its owner while handling an event.
pub(crate) struct DeviceContext<'a, P: Platform> {
    pub platform: &'a mut P,
    pub handler: &'a mut dyn KeyboardHandler,
    pub target: SurfaceId,
}

/// State of one keyboard.
pub struct KeyboardDevice<P: Platform> {
    id: DeviceId,
    /// Name of the seat global this keyboard belongs to.
    seat: u32,
    keyboard: P::Keyboard,
    keymap: KeymapState<P::Decoder>,
    has_focus: bool,
    released: bool,
    repeat: RepeatEngine<P::Timer, P::Sync>,
}

impl<P: Platform> KeyboardDevice<P> {
    pub(crate) fn new(id: DeviceId, seat: u32, keyboard: P::Keyboard, repeat: RepeatKind) -> Self {
        Self {
            id,
            seat,
            keyboard,
            keymap: KeymapState::Pending,
            has_focus: false,
            released: false,
            repeat: RepeatEngine::new(id, repeat),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn seat(&self) -> u32 {
        self.seat
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// Whether a keymap was accepted and key codes are decoded.
    pub fn is_decoding(&self) -> bool {
        matches!(self.keymap, KeymapState::Ready(_))
    }

    pub fn repeat_phase(&self) -> RepeatPhase {
        self.repeat.phase()
    }

    pub fn armed_repeat(&self) -> Option<RepeatKey> {
        self.repeat.armed()
    }

    pub fn repeat_info(&self) -> RepeatInfo {
        self.repeat.info()
    }

    pub fn keyboard(&self) -> &P::Keyboard {
        &self.keyboard
    }

    /// Process one event, returns `true` when the focus flag changed.
    pub(crate) fn handle_event(
        &mut self,
        event: KeyboardEvent<P::Keymap>,
        ctx: DeviceContext<'_, P>,
    ) -> bool {
        if self.released {
            return false;
        }

        match event {
            KeyboardEvent::Keymap { format, keymap } => {
                self.load_keymap(format, keymap, ctx.platform);
                false
            },
            KeyboardEvent::Enter { surface } => {
                if surface != ctx.target {
                    return false;
                }
                let changed = !self.has_focus;
                self.has_focus = true;
                changed
            },
            KeyboardEvent::Leave { surface } => {
                if surface != ctx.target {
                    return false;
                }
                let changed = self.has_focus;
                self.has_focus = false;
                self.repeat.disarm(ctx.platform);
                changed
            },
            KeyboardEvent::Key { code, state } => {
                self.key(code, state, ctx);
                false
            },
            KeyboardEvent::Modifiers { depressed, latched, locked, group } => {
                if let KeymapState::Ready(decoder) = &mut self.keymap {
                    decoder.update_modifiers(depressed, latched, locked, group);
                }
                false
            },
            KeyboardEvent::RepeatInfo { rate, delay } => {
                self.repeat.set_info(RepeatInfo::from_protocol(rate, delay));
                false
            },
        }
    }

    fn load_keymap(&mut self, format: KeymapFormat, keymap: P::Keymap, platform: &mut P) {
        if matches!(self.keymap, KeymapState::Unsupported) {
            return;
        }

        if format != KeymapFormat::XkbV1 {
            warn!(device = ?self.id, ?format, "unsupported keymap format, keys won't be decoded");
            self.repeat.disarm(platform);
            self.keymap = KeymapState::Unsupported;
            return;
        }

        // Compositors resend the keymap on layout changes.
        self.repeat.disarm(platform);
        self.keymap = match platform.compile_keymap(keymap) {
            Some(decoder) => {
                debug!(device = ?self.id, "keymap loaded");
                KeymapState::Ready(decoder)
            },
            None => {
                warn!(device = ?self.id, "failed to load keymap, keys won't be decoded");
                KeymapState::Unsupported
            },
        };
    }

    fn key(&mut self, code: u32, state: KeyState, ctx: DeviceContext<'_, P>) {
        let decoder = match &mut self.keymap {
            KeymapState::Ready(decoder) if self.has_focus => decoder,
            _ => return,
        };

        let keysym = decoder.key_get_one_sym(code);
        let modifiers = decoder.modifiers();

        match state {
            KeyState::Pressed => {
                let armed = self.repeat.armed();
                if armed.is_some_and(|armed| armed.keysym != keysym) {
                    self.repeat.disarm(ctx.platform);
                }

                ctx.handler.key_pressed(keysym, modifiers);

                let already_armed = self.repeat.armed().is_some_and(|armed| armed.keysym == keysym);
                if self.repeat.info().rate > 0 && !already_armed && decoder.key_repeats(code) {
                    self.repeat.arm(RepeatKey { code, keysym, modifiers }, ctx.platform);
                }
            },
            KeyState::Released => {
                // NOTE: a release carrying modifiers while a repeat is armed is taken as the
                // release of a modifier key, which stops the repeat as well.
                let stop = self
                    .repeat
                    .armed()
                    .is_some_and(|armed| armed.code == code || !modifiers.is_empty());
                if stop {
                    self.repeat.disarm(ctx.platform);
                }

                ctx.handler.key_released(keysym, modifiers);
            },
        }
    }

    pub(crate) fn repeat_timer_elapsed(&mut self, generation: u64, platform: &mut P) {
        if !self.released {
            self.repeat.timer_elapsed(generation, platform);
        }
    }

    pub(crate) fn repeat_sync_done(
        &mut self,
        generation: u64,
        platform: &mut P,
        handler: &mut dyn KeyboardHandler,
    ) {
        if self.released {
            return;
        }
        if let Some(key) = self.repeat.sync_done(generation, platform) {
            handler.key_pressed(key.keysym, key.modifiers);
        }
    }

    /// Stop repetition and ask the compositor to stop sending events.
    ///
    /// The device ignores everything afterwards. Returns whether it had focus.
    pub(crate) fn release(&mut self, platform: &mut P) -> bool {
        if self.released {
            return false;
        }
        self.repeat.disarm(platform);
        platform.release_keyboard(&self.keyboard);
        self.released = true;
        std::mem::replace(&mut self.has_focus, false)
    }
}

//! The keymap decoder seam.

use crate::keyboard::{Keysym, ModifiersState};

/// Turns raw key codes into keysyms under a compiled keymap.
///
/// Codes are the raw codes delivered by the compositor (evdev scancodes); the
/// implementation is responsible for any offset its keymap format requires.
pub trait Decoder {
    /// The keysym `code` currently produces.
    fn key_get_one_sym(&mut self, code: u32) -> Keysym;

    /// The effective modifiers.
    fn modifiers(&self) -> ModifiersState;

    /// Whether the keymap marks `code` as repeating.
    fn key_repeats(&mut self, code: u32) -> bool;

    /// Feed a serialized modifier state from the compositor.
    fn update_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32);
}

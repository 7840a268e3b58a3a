//! End user handling of decoded keyboard events.

use std::fmt;

use crate::keyboard::{Keysym, ModifiersState};

/// The handler of decoded keyboard events.
///
/// Every method has an empty default implementation, so a handler only needs
/// to implement what it cares about.
pub trait KeyboardHandler {
    /// Emitted when a key is pressed, and for every auto-repeated press.
    fn key_pressed(&mut self, keysym: Keysym, modifiers: ModifiersState) {
        let _ = (keysym, modifiers);
    }

    /// Emitted when a key is released.
    fn key_released(&mut self, keysym: Keysym, modifiers: ModifiersState) {
        let _ = (keysym, modifiers);
    }

    /// Emitted when the first keyboard enters the target surface.
    ///
    /// Additional keyboards entering while one already has focus don't emit
    /// this again.
    fn focus_entered(&mut self) {}

    /// Emitted when the last keyboard leaves the target surface.
    fn focus_left(&mut self) {}
}

impl<H: KeyboardHandler + ?Sized> KeyboardHandler for Box<H> {
    fn key_pressed(&mut self, keysym: Keysym, modifiers: ModifiersState) {
        (**self).key_pressed(keysym, modifiers)
    }

    fn key_released(&mut self, keysym: Keysym, modifiers: ModifiersState) {
        (**self).key_released(keysym, modifiers)
    }

    fn focus_entered(&mut self) {
        (**self).focus_entered()
    }

    fn focus_left(&mut self) {
        (**self).focus_left()
    }
}

/// A handler that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl KeyboardHandler for NoopHandler {}

type KeyCallback = Box<dyn FnMut(Keysym, ModifiersState)>;
type FocusCallback = Box<dyn FnMut()>;

/// A [`KeyboardHandler`] made of closures.
///
/// Callbacks that are not set do nothing.
///
/// ```
/// use wlkbd_core::handler::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .on_press(|keysym, modifiers| println!("pressed {keysym:?} with {modifiers:?}"))
///     .on_focus_leave(|| println!("focus lost"));
/// # drop(callbacks);
/// ```
#[derive(Default)]
pub struct Callbacks {
    press: Option<KeyCallback>,
    release: Option<KeyCallback>,
    focus_enter: Option<FocusCallback>,
    focus_leave: Option<FocusCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_press(mut self, callback: impl FnMut(Keysym, ModifiersState) + 'static) -> Self {
        self.press = Some(Box::new(callback));
        self
    }

    pub fn on_release(mut self, callback: impl FnMut(Keysym, ModifiersState) + 'static) -> Self {
        self.release = Some(Box::new(callback));
        self
    }

    pub fn on_focus_enter(mut self, callback: impl FnMut() + 'static) -> Self {
        self.focus_enter = Some(Box::new(callback));
        self
    }

    pub fn on_focus_leave(mut self, callback: impl FnMut() + 'static) -> Self {
        self.focus_leave = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("press", &self.press.is_some())
            .field("release", &self.release.is_some())
            .field("focus_enter", &self.focus_enter.is_some())
            .field("focus_leave", &self.focus_leave.is_some())
            .finish()
    }
}

impl KeyboardHandler for Callbacks {
    fn key_pressed(&mut self, keysym: Keysym, modifiers: ModifiersState) {
        if let Some(press) = self.press.as_mut() {
            press(keysym, modifiers);
        }
    }

    fn key_released(&mut self, keysym: Keysym, modifiers: ModifiersState) {
        if let Some(release) = self.release.as_mut() {
            release(keysym, modifiers);
        }
    }

    fn focus_entered(&mut self) {
        if let Some(focus_enter) = self.focus_enter.as_mut() {
            focus_enter();
        }
    }

    fn focus_left(&mut self) {
        if let Some(focus_leave) = self.focus_leave.as_mut() {
            focus_leave();
        }
    }
}

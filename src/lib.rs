//! wlkbd is keyboard input for Wayland clients.
//!
//! It discovers the seats of the compositor, attaches to their keyboards,
//! decodes key codes with the keymaps the compositor shares, tracks whether
//! any keyboard has focus on one target surface and repeats held keys in step
//! with the compositor.
//!
//! # Building a keyboard
//!
//! A [`Keyboard`] is created for the surface of a window owned by some other
//! toolkit, and reports to a [`KeyboardHandler`]:
//!
//! ```no_run
//! use wlkbd::raw_window_handle::{HasDisplayHandle, HasWindowHandle};
//! use wlkbd::{Callbacks, Keyboard, KeyboardAttributes};
//!
//! fn run(window: impl HasDisplayHandle + HasWindowHandle + 'static) {
//!     let handler = Callbacks::new()
//!         .on_press(|keysym, modifiers| println!("pressed {keysym:?} with {modifiers:?}"))
//!         .on_focus_leave(|| println!("focus lost"));
//!     let mut keyboard = Keyboard::initialize(window, KeyboardAttributes::default(), handler);
//!
//!     while keyboard.dispatch(None).is_ok() {}
//!     keyboard.teardown();
//! }
//! ```
//!
//! Keys are repeated at the rate announced by the compositor unless
//! [`KeyboardAttributes::with_repeat`] says otherwise.
//!
//! # Features
//!
//! - `dlopen` (default): load `libwayland-client` at runtime.
//! - `serde`: implement `Serialize` and `Deserialize` for the key types.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod error;
mod keyboard;
mod platform;
mod state;

pub use rwh_06 as raw_window_handle;
pub use wlkbd_core::attributes::{KeyboardAttributes, RepeatKind, MAX_SEAT_VERSION};
pub use wlkbd_core::handler::{Callbacks, KeyboardHandler, NoopHandler};
pub use wlkbd_core::keyboard::{KeyState, Keysym, ModifiersState};

pub use crate::error::Error;
pub use crate::keyboard::Keyboard;

//! # Core types for wlkbd
//!
//! Backend independent state machines of the keyboard subsystem: seat and
//! device bookkeeping, keymap decoding dispatch, key repetition and focus
//! aggregation. A backend plugs into them through the traits of [`platform`].

pub mod attributes;
pub mod decoder;
pub mod device;
pub mod focus;
pub mod handler;
pub mod keyboard;
pub mod platform;
pub mod repeat;
pub mod seat;
pub mod state;
#[cfg(test)]
mod testing;

pub use crate::attributes::{KeyboardAttributes, RepeatKind};
pub use crate::handler::{Callbacks, KeyboardHandler};
pub use crate::keyboard::{KeyState, KeymapFormat, Keysym, ModifiersState, SurfaceId};
pub use crate::state::KeyboardState;

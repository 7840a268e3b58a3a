//! Helpers shared by the wlkbd backends.

pub mod xkb;

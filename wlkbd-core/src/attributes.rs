//! Configuration of the keyboard subsystem.

use std::time::Duration;

/// Highest `wl_seat` version the subsystem knows how to drive.
pub const MAX_SEAT_VERSION: u32 = 7;

/// Possible kinds of key repetition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RepeatKind {
    /// Keys are repeated at the rate and delay announced by the compositor.
    ///
    /// Repetition stays disabled until the compositor sends its repeat info.
    #[default]
    System,
    /// Keys are repeated at a set rate and delay, compositor announcements are ignored.
    Fixed {
        /// The number of repetitions per second, `0` disables repetition.
        rate: u32,
        /// Delay between a key press and the start of repetition.
        delay: Duration,
    },
}

/// Attributes used when initializing the keyboard subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardAttributes {
    pub(crate) repeat: RepeatKind,
    pub(crate) max_seat_version: u32,
}

impl Default for KeyboardAttributes {
    fn default() -> Self {
        Self { repeat: RepeatKind::System, max_seat_version: MAX_SEAT_VERSION }
    }
}

impl KeyboardAttributes {
    /// Sets how keys are repeated.
    ///
    /// The default is [`RepeatKind::System`].
    #[inline]
    pub fn with_repeat(mut self, repeat: RepeatKind) -> Self {
        self.repeat = repeat;
        self
    }

    /// Caps the version `wl_seat` globals are bound with.
    ///
    /// Values above [`MAX_SEAT_VERSION`] are clamped to it, `0` is treated as `1`.
    #[inline]
    pub fn with_max_seat_version(mut self, version: u32) -> Self {
        self.max_seat_version = version.clamp(1, MAX_SEAT_VERSION);
        self
    }

    #[inline]
    pub fn repeat(&self) -> RepeatKind {
        self.repeat
    }

    #[inline]
    pub fn max_seat_version(&self) -> u32 {
        self.max_seat_version
    }
}

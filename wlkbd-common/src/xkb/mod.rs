//! Keymap decoding backed by libxkbcommon.

use std::ffi::CString;
use std::fmt;
use std::ops::Deref;
use std::os::unix::io::OwnedFd;
use std::ptr::NonNull;
use std::sync::LazyLock;

use tracing::warn;
use wlkbd_core::decoder::Decoder;
use wlkbd_core::keyboard::{Keysym, ModifiersState};
use xkbcommon_dl::{self as xkb, xkb_context, xkb_context_flags, xkbcommon_handle, XkbCommon};

mod keymap;
mod state;

pub use keymap::XkbKeymap;
pub use state::XkbState;

static XKBH: LazyLock<&'static XkbCommon> = LazyLock::new(xkbcommon_handle);

/// Offset between evdev scancodes and XKB keycodes.
const EVDEV_OFFSET: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// libxkbcommon is not available
    XKBNotFound,
    /// The keymap could not be mapped or compiled.
    BadKeymap,
    /// Rule names contain an interior nul byte or don't resolve to a keymap.
    BadNames,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::XKBNotFound => f.write_str("libxkbcommon is not available"),
            Error::BadKeymap => f.write_str("the keymap could not be compiled"),
            Error::BadNames => f.write_str("the rule names don't resolve to a keymap"),
        }
    }
}

impl std::error::Error for Error {}

/// Whether libxkbcommon could be loaded.
pub fn is_available() -> bool {
    xkb::xkbcommon_option().is_some()
}

#[derive(Debug)]
pub struct XkbContext {
    context: NonNull<xkb_context>,
}

impl XkbContext {
    pub fn new() -> Result<Self, Error> {
        if !is_available() {
            return Err(Error::XKBNotFound);
        }

        let context = unsafe { (XKBH.xkb_context_new)(xkb_context_flags::XKB_CONTEXT_NO_FLAGS) };

        let context = match NonNull::new(context) {
            Some(context) => context,
            None => return Err(Error::XKBNotFound),
        };

        Ok(Self { context })
    }
}

impl Drop for XkbContext {
    fn drop(&mut self) {
        unsafe {
            (XKBH.xkb_context_unref)(self.context.as_ptr());
        }
    }
}

impl Deref for XkbContext {
    type Target = NonNull<xkb_context>;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// RMLVO names used to build a keymap without a compositor.
///
/// Unset fields fall back to the system defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleNames {
    pub rules: Option<String>,
    pub model: Option<String>,
    pub layout: Option<String>,
    pub variant: Option<String>,
    pub options: Option<String>,
}

/// A compiled keymap with its state, as used by one keyboard.
#[derive(Debug)]
pub struct XkbDecoder {
    // NOTE: field order matters.
    state: XkbState,
    keymap: XkbKeymap,
    _context: XkbContext,
}

impl XkbDecoder {
    /// Compile the text keymap a compositor shared through `fd`.
    pub fn from_fd(fd: OwnedFd, size: usize) -> Result<Self, Error> {
        let context = XkbContext::new()?;
        let keymap = XkbKeymap::from_fd(&context, fd, size).ok_or(Error::BadKeymap)?;
        Self::with_keymap(context, keymap)
    }

    /// Compile a keymap from RMLVO names.
    pub fn from_names(names: &RuleNames) -> Result<Self, Error> {
        let context = XkbContext::new()?;
        let field = |value: &Option<String>| -> Result<Option<CString>, Error> {
            value.as_deref().map(CString::new).transpose().map_err(|_| Error::BadNames)
        };
        let names = [
            field(&names.rules)?,
            field(&names.model)?,
            field(&names.layout)?,
            field(&names.variant)?,
            field(&names.options)?,
        ];
        let keymap = XkbKeymap::from_names(&context, &names).ok_or(Error::BadNames)?;
        Self::with_keymap(context, keymap)
    }

    fn with_keymap(context: XkbContext, keymap: XkbKeymap) -> Result<Self, Error> {
        match XkbState::new(&keymap) {
            Some(state) => Ok(Self { state, keymap, _context: context }),
            None => {
                warn!("failed to create xkb state");
                Err(Error::BadKeymap)
            },
        }
    }

    pub fn state(&self) -> &XkbState {
        &self.state
    }

    pub fn keymap(&self) -> &XkbKeymap {
        &self.keymap
    }
}

impl Decoder for XkbDecoder {
    fn key_get_one_sym(&mut self, code: u32) -> Keysym {
        match code.checked_add(EVDEV_OFFSET) {
            Some(keycode) => Keysym::from_raw(self.state.get_one_sym_raw(keycode)),
            None => Keysym::NO_SYMBOL,
        }
    }

    fn modifiers(&self) -> ModifiersState {
        self.state.modifiers()
    }

    fn key_repeats(&mut self, code: u32) -> bool {
        code.checked_add(EVDEV_OFFSET).is_some_and(|keycode| self.keymap.key_repeats(keycode))
    }

    fn update_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32) {
        self.state.update_modifiers(depressed, latched, locked, 0, 0, group);
    }
}

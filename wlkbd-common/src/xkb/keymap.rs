//! XKB keymap.

use std::ffi::CString;
use std::os::raw::c_char;
use std::os::unix::io::OwnedFd;
use std::ptr::{self, NonNull};

use memmap2::MmapOptions;
use tracing::warn;
use xkbcommon_dl::{
    xkb_keycode_t, xkb_keymap, xkb_keymap_compile_flags, xkb_keymap_format,
    xkb_mod_mask_t, xkb_rule_names,
};

use super::{XkbContext, XKBH};

#[derive(Debug)]
pub struct XkbKeymap {
    keymap: NonNull<xkb_keymap>,
}

impl XkbKeymap {
    /// Compile the text keymap stored in the first `size` bytes of `fd`.
    pub fn from_fd(context: &XkbContext, fd: OwnedFd, size: usize) -> Option<Self> {
        if size == 0 {
            warn!("the shared keymap is empty");
            return None;
        }

        let map = match unsafe { MmapOptions::new().len(size).map_copy_read_only(&fd) } {
            Ok(map) => map,
            Err(err) => {
                warn!("failed to map the keymap: {err}");
                return None;
            },
        };

        // The shared string is nul terminated, which xkb relies on.
        let keymap = unsafe {
            (XKBH.xkb_keymap_new_from_string)(
                context.as_ptr(),
                map.as_ptr() as *const _,
                xkb_keymap_format::XKB_KEYMAP_FORMAT_TEXT_V1,
                xkb_keymap_compile_flags::XKB_KEYMAP_COMPILE_NO_FLAGS,
            )
        };
        let keymap = NonNull::new(keymap)?;
        Some(Self { keymap })
    }

    /// Compile a keymap from RMLVO names: rules, model, layout, variant and
    /// options, in that order.
    pub(super) fn from_names(context: &XkbContext, names: &[Option<CString>; 5]) -> Option<Self> {
        let name = |value: &Option<CString>| -> *const c_char {
            value.as_ref().map_or(ptr::null(), |value| value.as_ptr())
        };
        let names = xkb_rule_names {
            rules: name(&names[0]),
            model: name(&names[1]),
            layout: name(&names[2]),
            variant: name(&names[3]),
            options: name(&names[4]),
        };

        let keymap = unsafe {
            (XKBH.xkb_keymap_new_from_names)(
                context.as_ptr(),
                &names,
                xkb_keymap_compile_flags::XKB_KEYMAP_COMPILE_NO_FLAGS,
            )
        };
        let keymap = NonNull::new(keymap)?;
        Some(Self { keymap })
    }

    pub fn key_repeats(&mut self, keycode: xkb_keycode_t) -> bool {
        unsafe { (XKBH.xkb_keymap_key_repeats)(self.keymap.as_ptr(), keycode) == 1 }
    }

    /// The mask of the modifier called `name`, `0` if the keymap lacks it.
    ///
    /// `name` must be nul terminated, like the `XKB_MOD_NAME_*` constants.
    pub fn mod_mask(&self, name: &[u8]) -> xkb_mod_mask_t {
        debug_assert_eq!(name.last(), Some(&0));
        let index = unsafe {
            (XKBH.xkb_keymap_mod_get_index)(self.keymap.as_ptr(), name.as_ptr() as *const c_char)
        };
        // Invalid indices are `u32::MAX`.
        match index {
            index if index < xkb_mod_mask_t::BITS => 1 << index,
            _ => 0,
        }
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut xkb_keymap {
        self.keymap.as_ptr()
    }
}

impl Drop for XkbKeymap {
    fn drop(&mut self) {
        unsafe {
            (XKBH.xkb_keymap_unref)(self.keymap.as_ptr());
        };
    }
}

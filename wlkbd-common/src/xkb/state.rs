//! XKB state.

use std::os::raw::c_char;
use std::ptr::NonNull;

use wlkbd_core::keyboard::ModifiersState;
use xkbcommon_dl::{self as xkb, xkb_keycode_t, xkb_keysym_t, xkb_state, xkb_state_component};

use super::keymap::XkbKeymap;
use super::XKBH;

#[derive(Debug)]
pub struct XkbState {
    state: NonNull<xkb_state>,
    modifiers: ModifiersState,
}

impl XkbState {
    pub fn new(keymap: &XkbKeymap) -> Option<Self> {
        let state = NonNull::new(unsafe { (XKBH.xkb_state_new)(keymap.as_ptr()) })?;
        let mut this = Self { state, modifiers: ModifiersState::empty() };
        this.reload_modifiers();
        Some(this)
    }

    pub fn get_one_sym_raw(&mut self, keycode: xkb_keycode_t) -> xkb_keysym_t {
        unsafe { (XKBH.xkb_state_key_get_one_sym)(self.state.as_ptr(), keycode) }
    }

    pub fn modifiers(&self) -> ModifiersState {
        self.modifiers
    }

    pub fn update_modifiers(
        &mut self,
        mods_depressed: u32,
        mods_latched: u32,
        mods_locked: u32,
        depressed_group: u32,
        latched_group: u32,
        locked_group: u32,
    ) {
        let mask = unsafe {
            (XKBH.xkb_state_update_mask)(
                self.state.as_ptr(),
                mods_depressed,
                mods_latched,
                mods_locked,
                depressed_group,
                latched_group,
                locked_group,
            )
        };

        if mask.contains(xkb_state_component::XKB_STATE_MODS_EFFECTIVE) {
            self.reload_modifiers();
        }
    }

    fn reload_modifiers(&mut self) {
        let mut modifiers = ModifiersState::empty();
        modifiers.set(ModifiersState::SHIFT, self.mod_name_is_active(xkb::XKB_MOD_NAME_SHIFT));
        modifiers.set(ModifiersState::CAPS_LOCK, self.mod_name_is_active(xkb::XKB_MOD_NAME_CAPS));
        modifiers.set(ModifiersState::CONTROL, self.mod_name_is_active(xkb::XKB_MOD_NAME_CTRL));
        modifiers.set(ModifiersState::ALT, self.mod_name_is_active(xkb::XKB_MOD_NAME_ALT));
        modifiers.set(ModifiersState::SUPER, self.mod_name_is_active(xkb::XKB_MOD_NAME_LOGO));
        self.modifiers = modifiers;
    }

    /// Check if the modifier is active within xkb.
    fn mod_name_is_active(&mut self, name: &[u8]) -> bool {
        unsafe {
            (XKBH.xkb_state_mod_name_is_active)(
                self.state.as_ptr(),
                name.as_ptr() as *const c_char,
                xkb_state_component::XKB_STATE_MODS_EFFECTIVE,
            ) > 0
        }
    }
}

impl Drop for XkbState {
    fn drop(&mut self) {
        unsafe {
            (XKBH.xkb_state_unref)(self.state.as_ptr());
        }
    }
}

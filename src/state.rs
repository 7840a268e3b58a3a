//! Routing of Wayland events into the keyboard state.

use wayland_client::protocol::wl_callback::{self, WlCallback};
use wayland_client::protocol::wl_keyboard::{self, WlKeyboard};
use wayland_client::protocol::wl_registry::{self, WlRegistry};
use wayland_client::protocol::wl_seat::{self, WlSeat};
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum};
use wlkbd_core::device::KeyboardEvent;
use wlkbd_core::keyboard::{KeyState, KeymapFormat, SurfaceId};
use wlkbd_core::platform::{DeviceId, RepeatTask};
use wlkbd_core::KeyboardState;

use crate::platform::{KeymapFile, WaylandPlatform};

/// The state dispatched by the private event queue.
pub struct WaylandState {
    pub keyboards: KeyboardState<WaylandPlatform>,
}

/// Data attached to every bound seat.
#[derive(Debug, Clone, Copy)]
pub struct SeatData {
    /// Name of the global the seat was bound from.
    pub name: u32,
}

/// Data attached to every keyboard.
#[derive(Debug, Clone, Copy)]
pub struct KeyboardData {
    pub device: DeviceId,
}

/// Get the surface id from the wl_surface.
#[inline]
pub fn make_surface_id(surface: &WlSurface) -> SurfaceId {
    SurfaceId::from_raw(surface.id().as_ptr() as usize)
}

fn keymap_format(format: WEnum<wl_keyboard::KeymapFormat>) -> KeymapFormat {
    match format {
        WEnum::Value(wl_keyboard::KeymapFormat::XkbV1) => KeymapFormat::XkbV1,
        WEnum::Value(wl_keyboard::KeymapFormat::NoKeymap) => KeymapFormat::NoKeymap,
        WEnum::Value(format) => KeymapFormat::Unknown(format.into()),
        WEnum::Unknown(raw) => KeymapFormat::Unknown(raw),
    }
}

fn key_state(state: WEnum<wl_keyboard::KeyState>) -> Option<KeyState> {
    match state {
        WEnum::Value(wl_keyboard::KeyState::Pressed) => Some(KeyState::Pressed),
        WEnum::Value(wl_keyboard::KeyState::Released) => Some(KeyState::Released),
        _ => None,
    }
}

fn has_keyboard(capabilities: WEnum<wl_seat::Capability>) -> bool {
    let capabilities = match capabilities {
        WEnum::Value(capabilities) => capabilities,
        WEnum::Unknown(raw) => wl_seat::Capability::from_bits_truncate(raw),
    };
    capabilities.contains(wl_seat::Capability::Keyboard)
}

impl Dispatch<WlRegistry, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global { name, interface, version } => {
                state.keyboards.global_added(name, &interface, version)
            },
            wl_registry::Event::GlobalRemove { name } => state.keyboards.global_removed(name),
            _ => (),
        }
    }
}

impl Dispatch<WlSeat, SeatData> for WaylandState {
    fn event(
        state: &mut Self,
        _: &WlSeat,
        event: wl_seat::Event,
        data: &SeatData,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_seat::Event::Capabilities { capabilities } => {
                state.keyboards.seat_capabilities(data.name, has_keyboard(capabilities))
            },
            wl_seat::Event::Name { name } => state.keyboards.seat_name(data.name, name),
            _ => (),
        }
    }
}

impl Dispatch<WlKeyboard, KeyboardData> for WaylandState {
    fn event(
        state: &mut Self,
        _: &WlKeyboard,
        event: wl_keyboard::Event,
        data: &KeyboardData,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let event = match event {
            wl_keyboard::Event::Keymap { format, fd, size } => KeyboardEvent::Keymap {
                format: keymap_format(format),
                keymap: KeymapFile { fd, size },
            },
            wl_keyboard::Event::Enter { surface, .. } => {
                KeyboardEvent::Enter { surface: make_surface_id(&surface) }
            },
            wl_keyboard::Event::Leave { surface, .. } => {
                KeyboardEvent::Leave { surface: make_surface_id(&surface) }
            },
            wl_keyboard::Event::Key { key, state: raw_state, .. } => {
                match key_state(raw_state) {
                    Some(key_state) => KeyboardEvent::Key { code: key, state: key_state },
                    None => return,
                }
            },
            wl_keyboard::Event::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
                ..
            } => KeyboardEvent::Modifiers {
                depressed: mods_depressed,
                latched: mods_latched,
                locked: mods_locked,
                group,
            },
            wl_keyboard::Event::RepeatInfo { rate, delay } => {
                KeyboardEvent::RepeatInfo { rate, delay }
            },
            _ => return,
        };

        state.keyboards.keyboard_event(data.device, event);
    }
}

impl Dispatch<WlCallback, RepeatTask> for WaylandState {
    fn event(
        state: &mut Self,
        _: &WlCallback,
        event: wl_callback::Event,
        task: &RepeatTask,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { .. } = event {
            state.keyboards.repeat_sync_done(*task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keymap_formats() {
        assert_eq!(
            keymap_format(WEnum::Value(wl_keyboard::KeymapFormat::XkbV1)),
            KeymapFormat::XkbV1
        );
        assert_eq!(
            keymap_format(WEnum::Value(wl_keyboard::KeymapFormat::NoKeymap)),
            KeymapFormat::NoKeymap
        );
        assert_eq!(keymap_format(WEnum::Unknown(7)), KeymapFormat::Unknown(7));
    }

    #[test]
    fn key_states() {
        assert_eq!(
            key_state(WEnum::Value(wl_keyboard::KeyState::Pressed)),
            Some(KeyState::Pressed)
        );
        assert_eq!(
            key_state(WEnum::Value(wl_keyboard::KeyState::Released)),
            Some(KeyState::Released)
        );
        assert_eq!(key_state(WEnum::Unknown(42)), None);
    }

    #[test]
    fn keyboard_capability() {
        let keyboard = wl_seat::Capability::Keyboard | wl_seat::Capability::Pointer;
        assert!(has_keyboard(WEnum::Value(keyboard)));
        assert!(!has_keyboard(WEnum::Value(wl_seat::Capability::Touch)));
        assert!(has_keyboard(WEnum::Unknown(keyboard.bits() | 0x100)));
        assert!(!has_keyboard(WEnum::Unknown(0)));
    }
}

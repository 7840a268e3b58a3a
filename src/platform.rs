//! The Wayland side of the core seams.

use std::os::unix::io::OwnedFd;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use tracing::warn;
use wayland_client::protocol::wl_callback::WlCallback;
use wayland_client::protocol::wl_display::WlDisplay;
use wayland_client::protocol::wl_keyboard::WlKeyboard;
use wayland_client::protocol::wl_registry::WlRegistry;
use wayland_client::protocol::wl_seat::WlSeat;
use wayland_client::{Proxy, QueueHandle};
use wlkbd_common::xkb::XkbDecoder;
use wlkbd_core::platform::{DeviceId, Platform, RepeatTask, Scheduler};

use crate::state::{KeyboardData, SeatData, WaylandState};

/// The keymap file shared by the compositor.
#[derive(Debug)]
pub struct KeymapFile {
    pub fd: OwnedFd,
    pub size: u32,
}

/// Protocol objects and timers of one keyboard subsystem.
pub struct WaylandPlatform {
    display: WlDisplay,
    registry: WlRegistry,
    queue_handle: QueueHandle<WaylandState>,
    loop_handle: LoopHandle<'static, WaylandState>,
}

impl WaylandPlatform {
    pub fn new(
        display: WlDisplay,
        queue_handle: QueueHandle<WaylandState>,
        loop_handle: LoopHandle<'static, WaylandState>,
    ) -> Self {
        let registry = display.get_registry(&queue_handle, ());
        Self { display, registry, queue_handle, loop_handle }
    }
}

impl Scheduler for WaylandPlatform {
    type Sync = WlCallback;
    type Timer = RegistrationToken;

    fn schedule_timer(&mut self, task: RepeatTask, after: Duration) -> Option<RegistrationToken> {
        let timer = Timer::from_duration(after);
        let result = self.loop_handle.insert_source(timer, move |_, _, state| {
            state.keyboards.repeat_timer_elapsed(task);
            TimeoutAction::Drop
        });

        match result {
            Ok(token) => Some(token),
            Err(err) => {
                warn!("failed to insert repeat timer: {}", err.error);
                None
            },
        }
    }

    fn cancel_timer(&mut self, timer: RegistrationToken) {
        self.loop_handle.remove(timer);
    }

    fn request_sync(&mut self, task: RepeatTask) -> Option<WlCallback> {
        Some(self.display.sync(&self.queue_handle, task))
    }

    fn cancel_sync(&mut self, _sync: WlCallback) {
        // Callbacks can't be destroyed by the client, the stale `done` is
        // dropped by its generation instead.
    }
}

impl Platform for WaylandPlatform {
    type Decoder = XkbDecoder;
    type Keyboard = WlKeyboard;
    type Keymap = KeymapFile;
    type Seat = WlSeat;

    fn bind_seat(&mut self, name: u32, version: u32) -> WlSeat {
        self.registry.bind(name, version, &self.queue_handle, SeatData { name })
    }

    fn get_keyboard(&mut self, seat: &WlSeat, device: DeviceId) -> WlKeyboard {
        seat.get_keyboard(&self.queue_handle, KeyboardData { device })
    }

    fn release_keyboard(&mut self, keyboard: &WlKeyboard) {
        if keyboard.version() >= 3 {
            keyboard.release();
        }
    }

    fn release_seat(&mut self, seat: WlSeat) {
        if seat.version() >= 5 {
            seat.release();
        }
    }

    fn compile_keymap(&mut self, keymap: KeymapFile) -> Option<XkbDecoder> {
        let size = usize::try_from(keymap.size).ok()?;
        match XkbDecoder::from_fd(keymap.fd, size) {
            Ok(decoder) => Some(decoder),
            Err(err) => {
                warn!("failed to compile keymap: {err}");
                None
            },
        }
    }
}

//! The keyboard subsystem state shared by every event handler.

use std::fmt;

use tracing::{debug, trace, warn};

use crate::attributes::KeyboardAttributes;
use crate::device::{DeviceContext, KeyboardDevice, KeyboardEvent};
use crate::focus::{FocusAggregator, FocusTransition};
use crate::handler::{KeyboardHandler, NoopHandler};
use crate::keyboard::SurfaceId;
use crate::platform::{DeviceId, Platform, RepeatTask};
use crate::seat::{SeatRegistry, SEAT_INTERFACE};

/// State of the keyboard subsystem.
///
/// Owns the seat registry, every keyboard device and the application handler.
/// A backend feeds it compositor events and fired timers; everything runs on
/// one thread, so no method is ever re-entered.
pub struct KeyboardState<P: Platform> {
    platform: P,
    registry: SeatRegistry<P>,
    focus: FocusAggregator,
    handler: Box<dyn KeyboardHandler>,
    /// The surface focus is tracked for.
    target: SurfaceId,
    attributes: KeyboardAttributes,
    /// Set once teardown started, every event is dropped from then on.
    tearing_down: bool,
}

impl<P: Platform> fmt::Debug for KeyboardState<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardState")
            .field("target", &self.target)
            .field("seats", &self.registry.seats().count())
            .field("devices", &self.registry.devices().count())
            .field("focused", &self.focus.is_focused())
            .field("tearing_down", &self.tearing_down)
            .finish_non_exhaustive()
    }
}

impl<P: Platform> KeyboardState<P> {
    pub fn new<H>(
        platform: P,
        target: SurfaceId,
        attributes: KeyboardAttributes,
        handler: H,
    ) -> Self
    where
        H: KeyboardHandler + 'static,
    {
        Self {
            platform,
            registry: SeatRegistry::new(),
            focus: FocusAggregator::new(),
            handler: Box::new(handler),
            target,
            attributes,
            tearing_down: false,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn registry(&self) -> &SeatRegistry<P> {
        &self.registry
    }

    pub fn target(&self) -> SurfaceId {
        self.target
    }

    /// Whether any keyboard has focus on the target surface.
    pub fn has_focus(&self) -> bool {
        self.focus.is_focused()
    }

    /// A global was announced by the compositor.
    pub fn global_added(&mut self, name: u32, interface: &str, version: u32) {
        if self.tearing_down || interface != SEAT_INTERFACE {
            return;
        }

        if self.registry.seat(name).is_some() {
            warn!(name, "seat global announced twice");
            return;
        }

        let version = version.min(self.attributes.max_seat_version());
        let seat = self.platform.bind_seat(name, version);
        self.registry.insert_seat(name, version, seat);
        debug!(name, version, "bound seat");
    }

    /// A global was removed by the compositor.
    pub fn global_removed(&mut self, name: u32) {
        if self.tearing_down || self.registry.seat(name).is_none() {
            return;
        }

        self.remove_seat_devices(name);
        if let Some(seat) = self.registry.remove_seat(name) {
            debug!(name, label = seat.label(), "removed seat");
            self.platform.release_seat(seat.into_handle());
        }
    }

    /// The capabilities of seat `name` changed.
    pub fn seat_capabilities(&mut self, name: u32, has_keyboard: bool) {
        if self.tearing_down {
            return;
        }

        if !has_keyboard {
            self.remove_seat_devices(name);
            return;
        }

        if !self.registry.seat_devices(name).is_empty() {
            return;
        }

        let id = self.registry.next_device_id();
        let keyboard = match self.registry.seat(name) {
            Some(seat) => self.platform.get_keyboard(seat.handle(), id),
            None => {
                warn!(name, "capabilities for an unknown seat");
                return;
            },
        };

        let device = KeyboardDevice::new(id, name, keyboard, self.attributes.repeat());
        self.registry.insert_device(device);
        debug!(seat = name, device = ?id, "added keyboard");
    }

    /// The compositor named seat `name`.
    pub fn seat_name(&mut self, name: u32, label: String) {
        trace!(name, label, "seat name");
        self.registry.set_seat_label(name, label);
    }

    /// An event for the keyboard `device`.
    pub fn keyboard_event(&mut self, device: DeviceId, event: KeyboardEvent<P::Keymap>) {
        if self.tearing_down {
            return;
        }

        let Self { platform, registry, handler, target, .. } = &mut *self;
        let device = match registry.device_mut(device) {
            Some(device) => device,
            // Released devices may still have events in flight.
            None => return,
        };

        let ctx = DeviceContext { platform, handler: handler.as_mut(), target: *target };
        if device.handle_event(event, ctx) {
            self.update_focus();
        }
    }

    /// A repeat timer scheduled through the platform elapsed.
    pub fn repeat_timer_elapsed(&mut self, task: RepeatTask) {
        if self.tearing_down {
            return;
        }

        if let Some(device) = self.registry.device_mut(task.device) {
            device.repeat_timer_elapsed(task.generation, &mut self.platform);
        }
    }

    /// A repeat synchronization requested through the platform completed.
    pub fn repeat_sync_done(&mut self, task: RepeatTask) {
        if self.tearing_down {
            return;
        }

        if let Some(device) = self.registry.device_mut(task.device) {
            device.repeat_sync_done(task.generation, &mut self.platform, self.handler.as_mut());
        }
    }

    fn remove_seat_devices(&mut self, name: u32) {
        let mut lost_focus = false;
        for id in self.registry.seat_devices(name) {
            if let Some(mut device) = self.registry.remove_device(id) {
                lost_focus |= device.release(&mut self.platform);
                debug!(seat = name, device = ?id, "removed keyboard");
            }
        }

        if lost_focus {
            self.update_focus();
        }
    }

    fn update_focus(&mut self) {
        match self.focus.evaluate(self.registry.focus_flags()) {
            Some(FocusTransition::Entered) => self.handler.focus_entered(),
            Some(FocusTransition::Left) => self.handler.focus_left(),
            None => (),
        }
    }

    /// First teardown phase: stop every repeat and release every keyboard.
    ///
    /// The application handler is dropped, nothing is delivered to it from
    /// this point on. Device state stays alive so events still queued for the
    /// released keyboards have something to land on.
    pub fn release_devices(&mut self) {
        self.tearing_down = true;
        self.handler = Box::new(NoopHandler);
        self.focus.reset();

        for device in self.registry.devices_mut() {
            device.release(&mut self.platform);
        }
    }

    /// Second teardown phase, to run once in-flight events were flushed: free
    /// the devices and their decoders.
    pub fn destroy_devices(&mut self) {
        let count = self.registry.drain_devices().count();
        debug!(count, "destroyed keyboards");
    }

    /// Third teardown phase: release every seat.
    pub fn release_seats(&mut self) {
        let seats: Vec<_> = self.registry.drain_seats().collect();
        for seat in seats {
            self.platform.release_seat(seat.into_handle());
        }
    }
}

//! Seat and device bookkeeping.

use ahash::AHashMap;

use crate::device::KeyboardDevice;
use crate::platform::{DeviceId, Platform};

/// Interface name of seat globals.
pub const SEAT_INTERFACE: &str = "wl_seat";

/// A seat bound from a global.
#[derive(Debug)]
pub struct Seat<S> {
    /// Name of the global, stable for the lifetime of the seat.
    name: u32,
    /// Negotiated version.
    version: u32,
    seat: S,
    /// Name advertised by the compositor, for diagnostics only.
    label: Option<String>,
}

impl<S> Seat<S> {
    pub fn name(&self) -> u32 {
        self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn handle(&self) -> &S {
        &self.seat
    }

    pub(crate) fn into_handle(self) -> S {
        self.seat
    }
}

/// All known seats and the keyboards they expose.
pub struct SeatRegistry<P: Platform> {
    seats: AHashMap<u32, Seat<P::Seat>>,
    devices: AHashMap<DeviceId, KeyboardDevice<P>>,
    next_device: u64,
}

impl<P: Platform> Default for SeatRegistry<P> {
    fn default() -> Self {
        Self { seats: AHashMap::new(), devices: AHashMap::new(), next_device: 0 }
    }
}

impl<P: Platform> SeatRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a seat with that name is already known.
    pub(crate) fn insert_seat(&mut self, name: u32, version: u32, seat: P::Seat) -> bool {
        if self.seats.contains_key(&name) {
            return false;
        }
        self.seats.insert(name, Seat { name, version, seat, label: None });
        true
    }

    pub(crate) fn remove_seat(&mut self, name: u32) -> Option<Seat<P::Seat>> {
        self.seats.remove(&name)
    }

    pub(crate) fn drain_seats(&mut self) -> impl Iterator<Item = Seat<P::Seat>> + '_ {
        self.seats.drain().map(|(_, seat)| seat)
    }

    pub(crate) fn set_seat_label(&mut self, name: u32, label: String) {
        if let Some(seat) = self.seats.get_mut(&name) {
            seat.label = Some(label);
        }
    }

    pub fn seat(&self, name: u32) -> Option<&Seat<P::Seat>> {
        self.seats.get(&name)
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat<P::Seat>> {
        self.seats.values()
    }

    pub(crate) fn next_device_id(&mut self) -> DeviceId {
        self.next_device += 1;
        DeviceId::from_raw(self.next_device)
    }

    pub(crate) fn insert_device(&mut self, device: KeyboardDevice<P>) {
        let previous = self.devices.insert(device.id(), device);
        debug_assert!(previous.is_none(), "device ids are never reused");
    }

    pub(crate) fn remove_device(&mut self, id: DeviceId) -> Option<KeyboardDevice<P>> {
        self.devices.remove(&id)
    }

    pub(crate) fn drain_devices(&mut self) -> impl Iterator<Item = KeyboardDevice<P>> + '_ {
        self.devices.drain().map(|(_, device)| device)
    }

    pub fn device(&self, id: DeviceId) -> Option<&KeyboardDevice<P>> {
        self.devices.get(&id)
    }

    pub(crate) fn device_mut(&mut self, id: DeviceId) -> Option<&mut KeyboardDevice<P>> {
        self.devices.get_mut(&id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &KeyboardDevice<P>> {
        self.devices.values()
    }

    pub(crate) fn devices_mut(&mut self) -> impl Iterator<Item = &mut KeyboardDevice<P>> {
        self.devices.values_mut()
    }

    /// Devices owned by the seat `name`.
    pub fn seat_devices(&self, name: u32) -> Vec<DeviceId> {
        self.devices.values().filter(|device| device.seat() == name).map(|d| d.id()).collect()
    }

    /// Focus flags of every device, for focus aggregation.
    pub fn focus_flags(&self) -> impl Iterator<Item = bool> + '_ {
        self.devices.values().map(|device| device.has_focus())
    }
}

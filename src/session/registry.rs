//! Fixed-capacity arena of device sessions
//!
//! Every slot carries a generation counter that moves on each detach. A
//! [`SessionHandle`] names a slot *and* the generation it was issued for, so a handle kept
//! past a detach can never reach the session that later reuses the slot.
//!
//! The registry also owns the [`MappingTables`] of its device class and passes them by
//! reference into every poll cycle.

use crate::controller::direction::StickQuantizer;
use crate::controller::key_queue::OverflowPolicy;
use crate::controller::report::DeviceProfile;
use crate::mapping::{KeyCode, MapCommand, MappingError, MappingTables};
use crate::session::error::{AttachError, RegistryError};
use crate::session::session::{Attached, DeviceSession, KeyPoll};
use crate::transport::{DeviceId, Transport, UsbDeviceInfo};
use tracing::{debug, info, warn};

/// Upper bound on simultaneously attached devices.
pub const REGISTRY_CAPACITY: usize = 16;

/// Stable reference to one attached session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    slot: usize,
    generation: u32,
}

impl SessionHandle {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.slot, self.generation)
    }
}

/// The line input layer that polls named input sources
pub trait InputRegistry {
    fn register(&mut self, name: &str, handle: SessionHandle);
    fn unregister(&mut self, handle: SessionHandle);
}

/// In-memory [`InputRegistry`] that keeps the registered sources in order
#[derive(Debug, Default)]
pub struct RecordingInputRegistry {
    sources: Vec<(String, SessionHandle)>,
}

impl RecordingInputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sources(&self) -> &[(String, SessionHandle)] {
        &self.sources
    }

    pub fn contains(&self, handle: SessionHandle) -> bool {
        self.sources.iter().any(|(_, h)| *h == handle)
    }

    pub fn handle_by_name(&self, name: &str) -> Option<SessionHandle> {
        self.sources
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, handle)| *handle)
    }
}

impl InputRegistry for RecordingInputRegistry {
    fn register(&mut self, name: &str, handle: SessionHandle) {
        self.sources.push((name.to_string(), handle));
    }

    fn unregister(&mut self, handle: SessionHandle) {
        self.sources.retain(|(_, h)| *h != handle);
    }
}

/// Tunables applied to every session the registry creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    pub capacity: usize,
    pub name_prefix: String,
    pub overflow: OverflowPolicy,
    pub quantizer: StickQuantizer,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            capacity: REGISTRY_CAPACITY,
            name_prefix: "usb_gamepad".to_string(),
            overflow: OverflowPolicy::default(),
            quantizer: StickQuantizer::default(),
        }
    }
}

#[derive(Debug)]
struct SlotEntry {
    name: String,
    session: DeviceSession<Attached>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<SlotEntry>,
}

#[derive(Debug)]
pub struct DeviceRegistry {
    slots: Vec<Slot>,
    mappings: MappingTables,
    settings: RegistrySettings,
}

impl DeviceRegistry {
    /// Builds an empty registry. The capacity is clamped to `1..=REGISTRY_CAPACITY`.
    pub fn new(mut settings: RegistrySettings, mappings: MappingTables) -> Self {
        settings.capacity = settings.capacity.clamp(1, REGISTRY_CAPACITY);
        info!(
            "Initializing device registry with {} slots",
            settings.capacity
        );
        let slots = (0..settings.capacity).map(|_| Slot::default()).collect();
        Self {
            slots,
            mappings,
            settings,
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.entry.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mappings(&self) -> &MappingTables {
        &self.mappings
    }

    /// Runs a mapping command against this registry's tables.
    pub fn apply(&mut self, command: &MapCommand) -> Result<KeyCode, MappingError> {
        command.apply(&mut self.mappings)
    }

    /// Creates a session for `device`, submits its first read and registers it as an
    /// input source.
    pub fn attach<T, I>(
        &mut self,
        device: &UsbDeviceInfo,
        transport: &mut T,
        inputs: &mut I,
    ) -> Result<SessionHandle, AttachError>
    where
        T: Transport + ?Sized,
        I: InputRegistry + ?Sized,
    {
        let profile = DeviceProfile::from_ids(device.vendor_id, device.product_id)
            .ok_or(AttachError::UnsupportedDevice {
                vendor_id: device.vendor_id,
                product_id: device.product_id,
            })?;

        if self.find_device(device.id).is_some() {
            return Err(AttachError::AlreadyAttached(device.id));
        }

        let endpoint = *device
            .interrupt_in_endpoint()
            .ok_or(AttachError::NoInterruptEndpoint(device.id))?;

        let capacity = self.capacity();
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.entry.is_none())
            .ok_or(AttachError::RegistryFull { capacity })?;

        let session = DeviceSession::attach(
            device.id,
            profile,
            endpoint,
            self.settings.overflow,
            transport,
        )?;

        let handle = SessionHandle {
            slot: index,
            generation: slot.generation,
        };
        let name = format!("{}{}", self.settings.name_prefix, index);
        inputs.register(&name, handle);
        info!(
            "Attached {} ({}) as {} on endpoint {:#04x}",
            device.id,
            profile.name(),
            name,
            endpoint.address
        );
        slot.entry = Some(SlotEntry { name, session });
        Ok(handle)
    }

    /// Attach hook for the enumeration layer.
    ///
    /// Refusals are logged and swallowed; a full registry in particular is a silent
    /// capacity limit. Returns whether a session was created.
    pub fn on_device_attached<T, I>(
        &mut self,
        device: &UsbDeviceInfo,
        transport: &mut T,
        inputs: &mut I,
    ) -> bool
    where
        T: Transport + ?Sized,
        I: InputRegistry + ?Sized,
    {
        match self.attach(device, transport, inputs) {
            Ok(_) => true,
            Err(AttachError::RegistryFull { capacity }) => {
                debug!(
                    "Ignoring {}: all {} session slots in use",
                    device.id, capacity
                );
                false
            }
            Err(e) => {
                warn!("Not attaching {}: {}", device.id, e);
                false
            }
        }
    }

    /// Cancels the session's read, unregisters it and releases it.
    ///
    /// Detaching a handle that is already gone is a no-op and returns `false`.
    pub fn detach<T, I>(&mut self, handle: SessionHandle, transport: &mut T, inputs: &mut I) -> bool
    where
        T: Transport + ?Sized,
        I: InputRegistry + ?Sized,
    {
        let Some(slot) = self.slots.get_mut(handle.slot) else {
            return false;
        };
        if slot.generation != handle.generation {
            return false;
        }
        let Some(entry) = slot.entry.take() else {
            return false;
        };

        let detached = entry.session.detach(transport);
        inputs.unregister(handle);
        slot.generation = slot.generation.wrapping_add(1);
        info!("Removed {} from slot {}", entry.name, handle.slot);
        detached.release();
        true
    }

    /// Unplug notification keyed by the physical device.
    pub fn detach_device<T, I>(
        &mut self,
        device: DeviceId,
        transport: &mut T,
        inputs: &mut I,
    ) -> bool
    where
        T: Transport + ?Sized,
        I: InputRegistry + ?Sized,
    {
        match self.find_device(device) {
            Some(handle) => self.detach(handle, transport, inputs),
            None => {
                debug!("Unplug of {} ignored, no session", device);
                false
            }
        }
    }

    /// Detaches every live session.
    pub fn shutdown<T, I>(&mut self, transport: &mut T, inputs: &mut I)
    where
        T: Transport + ?Sized,
        I: InputRegistry + ?Sized,
    {
        let handles: Vec<SessionHandle> = self.handles().collect();
        info!(
            "Shutting down registry with {} live session(s)",
            handles.len()
        );
        for handle in handles {
            self.detach(handle, transport, inputs);
        }
    }

    /// One poll cycle for the session behind `handle`.
    pub fn poll<T>(
        &mut self,
        handle: SessionHandle,
        transport: &mut T,
    ) -> Result<KeyPoll, RegistryError>
    where
        T: Transport + ?Sized,
    {
        let entry = self
            .slots
            .get_mut(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_mut())
            .ok_or(RegistryError::StaleHandle(handle))?;

        Ok(entry
            .session
            .poll(transport, &self.mappings, &self.settings.quantizer))
    }

    pub fn key_status(&self, handle: SessionHandle) -> Result<u32, RegistryError> {
        self.session(handle)
            .map(|session| session.key_status())
            .ok_or(RegistryError::StaleHandle(handle))
    }

    pub fn session(&self, handle: SessionHandle) -> Option<&DeviceSession<Attached>> {
        self.entry(handle).map(|entry| &entry.session)
    }

    pub fn name(&self, handle: SessionHandle) -> Option<&str> {
        self.entry(handle).map(|entry| entry.name.as_str())
    }

    pub fn contains(&self, handle: SessionHandle) -> bool {
        self.entry(handle).is_some()
    }

    /// Current handle of the session living in `slot`, if any.
    pub fn handle_for_slot(&self, slot: usize) -> Option<SessionHandle> {
        let entry = self.slots.get(slot)?;
        entry.entry.as_ref().map(|_| SessionHandle {
            slot,
            generation: entry.generation,
        })
    }

    pub fn find_device(&self, device: DeviceId) -> Option<SessionHandle> {
        self.handles()
            .find(|&handle| self.session(handle).map(|s| s.device()) == Some(device))
    }

    pub fn handles(&self) -> impl Iterator<Item = SessionHandle> + '_ {
        (0..self.slots.len()).filter_map(|slot| self.handle_for_slot(slot))
    }

    /// Live sessions as `(handle, name, device)`.
    pub fn sessions(&self) -> impl Iterator<Item = (SessionHandle, &str, DeviceId)> + '_ {
        self.handles().filter_map(|handle| {
            let entry = self.entry(handle)?;
            Some((handle, entry.name.as_str(), entry.session.device()))
        })
    }

    fn entry(&self, handle: SessionHandle) -> Option<&SlotEntry> {
        self.slots
            .get(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(RegistrySettings::default(), MappingTables::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::direction::Direction;
    use crate::controller::report::Report;
    use crate::transport::{EndpointDescriptor, ReplayTransport, TransportOp};

    fn pad(id: u32) -> UsbDeviceInfo {
        UsbDeviceInfo {
            id: DeviceId(id),
            vendor_id: 0x046d,
            product_id: 0xc216,
            endpoints: vec![EndpointDescriptor::interrupt_in(1)],
        }
    }

    struct Rig {
        registry: DeviceRegistry,
        transport: ReplayTransport,
        inputs: RecordingInputRegistry,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                registry: DeviceRegistry::default(),
                transport: ReplayTransport::new(),
                inputs: RecordingInputRegistry::new(),
            }
        }

        fn attach(&mut self, id: u32) -> Result<SessionHandle, AttachError> {
            self.transport.plug(DeviceId(id));
            self.registry
                .attach(&pad(id), &mut self.transport, &mut self.inputs)
        }

        fn detach(&mut self, handle: SessionHandle) -> bool {
            self.registry
                .detach(handle, &mut self.transport, &mut self.inputs)
        }
    }

    #[test]
    fn attach_registers_a_named_source() {
        let mut rig = Rig::new();
        let handle = rig.attach(1).unwrap();
        assert_eq!(rig.registry.len(), 1);
        assert_eq!(rig.registry.name(handle), Some("usb_gamepad0"));
        assert_eq!(rig.inputs.handle_by_name("usb_gamepad0"), Some(handle));
    }

    #[test]
    fn same_device_attaches_once() {
        let mut rig = Rig::new();
        rig.attach(1).unwrap();
        assert_eq!(
            rig.attach(1),
            Err(AttachError::AlreadyAttached(DeviceId(1)))
        );
        assert_eq!(rig.registry.len(), 1);
    }

    #[test]
    fn refuses_foreign_devices_and_missing_endpoints() {
        let mut rig = Rig::new();
        let mut other = pad(2);
        other.vendor_id = 0x045e;
        assert_eq!(
            rig.registry
                .attach(&other, &mut rig.transport, &mut rig.inputs),
            Err(AttachError::UnsupportedDevice {
                vendor_id: 0x045e,
                product_id: 0xc216
            })
        );

        let mut no_endpoint = pad(3);
        no_endpoint.endpoints.clear();
        assert_eq!(
            rig.registry
                .attach(&no_endpoint, &mut rig.transport, &mut rig.inputs),
            Err(AttachError::NoInterruptEndpoint(DeviceId(3)))
        );
        assert!(rig.registry.is_empty());
        assert!(rig.inputs.sources().is_empty());
    }

    #[test]
    fn failed_initial_read_creates_nothing() {
        let mut rig = Rig::new();
        rig.transport.fail_next_submit(DeviceId(1));
        assert!(matches!(rig.attach(1), Err(AttachError::Submit(_))));
        assert!(rig.registry.is_empty());
        assert!(rig.inputs.sources().is_empty());
    }

    #[test]
    fn full_registry_refuses_silently() {
        let mut rig = Rig::new();
        for id in 0..REGISTRY_CAPACITY as u32 {
            rig.attach(id).unwrap();
        }
        rig.transport.plug(DeviceId(99));
        let attached =
            rig.registry
                .on_device_attached(&pad(99), &mut rig.transport, &mut rig.inputs);
        assert!(!attached);
        assert_eq!(rig.registry.len(), REGISTRY_CAPACITY);
        assert_eq!(rig.inputs.sources().len(), REGISTRY_CAPACITY);
    }

    #[test]
    fn capacity_is_clamped() {
        let settings = RegistrySettings {
            capacity: 64,
            ..RegistrySettings::default()
        };
        assert_eq!(
            DeviceRegistry::new(settings, MappingTables::new()).capacity(),
            REGISTRY_CAPACITY
        );
        let settings = RegistrySettings {
            capacity: 0,
            ..RegistrySettings::default()
        };
        let registry = DeviceRegistry::new(settings, MappingTables::new());
        assert_eq!(registry.capacity(), 1);
    }

    #[test]
    fn detach_cancels_then_unregisters_and_is_idempotent() {
        let mut rig = Rig::new();
        let handle = rig.attach(1).unwrap();
        rig.transport.clear_operations();

        assert!(rig.detach(handle));
        assert_eq!(
            rig.transport.operations(),
            &[TransportOp::Cancel {
                handle: crate::transport::TransferHandle(0)
            }]
        );
        assert!(!rig.inputs.contains(handle));
        assert!(rig.registry.is_empty());

        assert!(!rig.detach(handle));
        assert_eq!(rig.transport.operations().len(), 1);
        assert_eq!(
            rig.registry.poll(handle, &mut rig.transport),
            Err(RegistryError::StaleHandle(handle))
        );
        // the cancelled transfer is never queried
        assert_eq!(rig.transport.operations().len(), 1);
    }

    #[test]
    fn reused_slot_gets_a_new_generation() {
        let mut rig = Rig::new();
        let first = rig.attach(1).unwrap();
        rig.detach(first);
        let second = rig.attach(2).unwrap();

        assert_eq!(first.slot(), second.slot());
        assert_ne!(first, second);
        assert!(!rig.registry.contains(first));
        assert!(!rig.detach(first));
        assert!(rig.registry.contains(second));
    }

    #[test]
    fn detach_device_and_shutdown() {
        let mut rig = Rig::new();
        rig.attach(1).unwrap();
        rig.attach(2).unwrap();
        rig.attach(3).unwrap();

        assert!(rig
            .registry
            .detach_device(DeviceId(2), &mut rig.transport, &mut rig.inputs));
        assert!(!rig
            .registry
            .detach_device(DeviceId(2), &mut rig.transport, &mut rig.inputs));
        assert_eq!(rig.registry.len(), 2);

        rig.registry.shutdown(&mut rig.transport, &mut rig.inputs);
        assert!(rig.registry.is_empty());
        assert!(rig.inputs.sources().is_empty());
        assert_eq!(rig.transport.in_flight(), 0);
    }

    #[test]
    fn sessions_are_isolated() {
        let mut rig = Rig::new();
        rig.registry
            .apply(&"map-dpad up char U".parse().unwrap())
            .unwrap();
        let a = rig.attach(1).unwrap();
        let b = rig.attach(2).unwrap();

        let up = Report::IDLE.with_dpad(Direction::Up).to_bytes();
        rig.transport.push_report(DeviceId(1), up);
        assert_eq!(
            rig.registry.poll(a, &mut rig.transport),
            Ok(KeyPoll::Key(KeyCode::from('U')))
        );
        assert_eq!(
            rig.registry.poll(b, &mut rig.transport),
            Ok(KeyPoll::Pending)
        );
        assert_eq!(rig.registry.session(b).map(|s| s.queued_keys()), Some(0));
    }

    #[test]
    fn sessions_listing() {
        let mut rig = Rig::new();
        let a = rig.attach(10).unwrap();
        let b = rig.attach(11).unwrap();
        let listed: Vec<_> = rig
            .registry
            .sessions()
            .map(|(handle, name, device)| (handle, name.to_string(), device))
            .collect();
        assert_eq!(
            listed,
            vec![
                (a, "usb_gamepad0".to_string(), DeviceId(10)),
                (b, "usb_gamepad1".to_string(), DeviceId(11)),
            ]
        );
        assert_eq!(rig.registry.key_status(a), Ok(0));
    }
}

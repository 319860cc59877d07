//! Transport seam: asynchronous interrupt reads from a USB HID device
//!
//! The core never blocks on the bus. It submits a read, asks about it on later polls and
//! cancels it on detach. A completed transfer hands its report back by value, so no
//! buffer is shared between the core and the transport while a read is in flight.

pub mod replay;

use crate::controller::report::REPORT_LEN;
use thiserror::Error;

pub use replay::{ReplayTransport, TransportOp};

/// Opaque identity of one physical device on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dev#{}", self.0)
    }
}

/// Handle of one submitted read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferHandle(pub u64);

impl std::fmt::Display for TransferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "xfer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

/// The subset of a USB endpoint descriptor the driver looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Endpoint number, with bit 7 set for device-to-host (IN) endpoints.
    pub address: u8,
    /// bmAttributes; the low two bits hold the transfer type.
    pub attributes: u8,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl EndpointDescriptor {
    pub const DIRECTION_IN: u8 = 0x80;

    pub fn interrupt_in(number: u8) -> Self {
        Self {
            address: Self::DIRECTION_IN | (number & 0x0F),
            attributes: 0x03,
            max_packet_size: REPORT_LEN as u16,
            interval: 10,
        }
    }

    pub fn is_in(&self) -> bool {
        self.address & Self::DIRECTION_IN != 0
    }

    pub fn transfer_type(&self) -> TransferType {
        match self.attributes & 0x03 {
            0 => TransferType::Control,
            1 => TransferType::Isochronous,
            2 => TransferType::Bulk,
            _ => TransferType::Interrupt,
        }
    }
}

/// A device as announced by the enumeration layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    pub id: DeviceId,
    pub vendor_id: u16,
    pub product_id: u16,
    pub endpoints: Vec<EndpointDescriptor>,
}

impl UsbDeviceInfo {
    /// First interrupt endpoint pointing at the host, the one reports arrive on.
    pub fn interrupt_in_endpoint(&self) -> Option<&EndpointDescriptor> {
        self.endpoints
            .iter()
            .find(|ep| ep.is_in() && ep.transfer_type() == TransferType::Interrupt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("could not submit read on {device}: {reason}")]
    SubmitFailed { device: DeviceId, reason: String },

    #[error("no such device: {0}")]
    NoSuchDevice(DeviceId),

    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("unknown transfer: {0}")]
    UnknownTransfer(TransferHandle),
}

/// Outcome of a non-blocking query on a submitted read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Pending,
    Complete([u8; REPORT_LEN]),
    Failed(TransportError),
}

/// Asynchronous read transport used by device sessions.
///
/// A handle stops being valid once its transfer has completed, failed or been
/// cancelled; callers must not query it again.
pub trait Transport {
    fn submit_read(
        &mut self,
        device: DeviceId,
        endpoint: &EndpointDescriptor,
    ) -> Result<TransferHandle, TransportError>;

    fn check_transfer(&mut self, handle: TransferHandle) -> TransferStatus;

    fn cancel_transfer(&mut self, handle: TransferHandle);
}

use crate::session::registry::SessionHandle;
use crate::transport::{DeviceId, TransportError};
use thiserror::Error;

/// Why a device was not taken into the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    #[error("registry full ({capacity} sessions)")]
    RegistryFull { capacity: usize },

    #[error("{0} is already attached")]
    AlreadyAttached(DeviceId),

    #[error("unsupported device {vendor_id:04x}:{product_id:04x}")]
    UnsupportedDevice { vendor_id: u16, product_id: u16 },

    #[error("{0} has no interrupt IN endpoint")]
    NoInterruptEndpoint(DeviceId),

    #[error("initial read failed: {0}")]
    Submit(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("stale session handle {0}")]
    StaleHandle(SessionHandle),
}

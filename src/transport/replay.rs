//! Scripted in-memory transport
//!
//! Reports are queued per device and handed out one per completed read. Failures can be
//! injected, and every call is recorded so callers can check the order of operations
//! (cancel before release, no query after cancel).

use crate::controller::report::REPORT_LEN;
use crate::transport::{
    DeviceId, EndpointDescriptor, TransferHandle, TransferStatus, Transport, TransportError,
};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// One recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    Submit {
        device: DeviceId,
        handle: TransferHandle,
    },
    SubmitRejected {
        device: DeviceId,
    },
    Check {
        handle: TransferHandle,
    },
    Cancel {
        handle: TransferHandle,
    },
}

#[derive(Debug, Default)]
struct DeviceScript {
    reports: VecDeque<[u8; REPORT_LEN]>,
    failing_submits: usize,
    failing_transfers: usize,
}

#[derive(Debug, Default)]
pub struct ReplayTransport {
    devices: HashMap<DeviceId, DeviceScript>,
    in_flight: HashMap<TransferHandle, DeviceId>,
    next_handle: u64,
    operations: Vec<TransportOp>,
}

impl ReplayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `device` known to the bus. Reads can only be submitted to plugged devices.
    pub fn plug(&mut self, device: DeviceId) {
        self.devices.entry(device).or_default();
    }

    /// Removes the device; its in-flight reads fail on their next query.
    pub fn unplug(&mut self, device: DeviceId) {
        self.devices.remove(&device);
    }

    pub fn is_plugged(&self, device: DeviceId) -> bool {
        self.devices.contains_key(&device)
    }

    /// Queues a report for `device`, plugging it if needed.
    pub fn push_report(&mut self, device: DeviceId, report: [u8; REPORT_LEN]) {
        self.devices
            .entry(device)
            .or_default()
            .reports
            .push_back(report);
    }

    pub fn fail_next_submit(&mut self, device: DeviceId) {
        self.devices.entry(device).or_default().failing_submits += 1;
    }

    pub fn fail_next_transfer(&mut self, device: DeviceId) {
        self.devices.entry(device).or_default().failing_transfers += 1;
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn operations(&self) -> &[TransportOp] {
        &self.operations
    }

    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    fn record(&mut self, op: TransportOp) {
        self.operations.push(op);
    }
}

impl Transport for ReplayTransport {
    fn submit_read(
        &mut self,
        device: DeviceId,
        endpoint: &EndpointDescriptor,
    ) -> Result<TransferHandle, TransportError> {
        let Some(script) = self.devices.get_mut(&device) else {
            self.record(TransportOp::SubmitRejected { device });
            return Err(TransportError::NoSuchDevice(device));
        };

        if script.failing_submits > 0 {
            script.failing_submits -= 1;
            self.record(TransportOp::SubmitRejected { device });
            return Err(TransportError::SubmitFailed {
                device,
                reason: "injected failure".to_string(),
            });
        }

        let handle = TransferHandle(self.next_handle);
        self.next_handle += 1;
        self.in_flight.insert(handle, device);
        self.record(TransportOp::Submit { device, handle });
        debug!(
            "Submitted {} on {} endpoint {:#04x}",
            handle, device, endpoint.address
        );
        Ok(handle)
    }

    fn check_transfer(&mut self, handle: TransferHandle) -> TransferStatus {
        self.record(TransportOp::Check { handle });

        let Some(&device) = self.in_flight.get(&handle) else {
            return TransferStatus::Failed(TransportError::UnknownTransfer(handle));
        };
        let Some(script) = self.devices.get_mut(&device) else {
            self.in_flight.remove(&handle);
            return TransferStatus::Failed(TransportError::TransferFailed(format!(
                "{device} was unplugged"
            )));
        };

        if script.failing_transfers > 0 {
            script.failing_transfers -= 1;
            self.in_flight.remove(&handle);
            return TransferStatus::Failed(TransportError::TransferFailed(
                "injected failure".to_string(),
            ));
        }

        match script.reports.pop_front() {
            Some(report) => {
                self.in_flight.remove(&handle);
                TransferStatus::Complete(report)
            }
            None => TransferStatus::Pending,
        }
    }

    fn cancel_transfer(&mut self, handle: TransferHandle) {
        self.record(TransportOp::Cancel { handle });
        if self.in_flight.remove(&handle).is_some() {
            debug!("Cancelled {}", handle);
        }
    }
}

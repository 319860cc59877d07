//! Per-device session with statum state machine
//!
//! # State Machine
//!
//! ```text
//! (attach: first read submitted) ──► Attached ──► Detached ──► (released)
//!                                       │  ▲       (in-flight read cancelled)
//!                                       └──┘
//!                                       poll
//! ```
//!
//! Only an attached session can be polled. Detaching consumes it, cancels the outstanding
//! read first and only then hands back the detached value, so a completion can never land
//! in a released session.

use crate::controller::direction::StickQuantizer;
use crate::controller::edge_detector::generate_keys;
use crate::controller::key_queue::{KeyEventQueue, OverflowPolicy};
use crate::controller::report::{DeviceProfile, Report};
use crate::mapping::{KeyCode, MappingTables};
use crate::transport::{
    DeviceId, EndpointDescriptor, TransferHandle, TransferStatus, Transport, TransportError,
};
use statum::{machine, state};
use tracing::{debug, info, warn};

/// Result of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPoll {
    /// The outstanding read has not completed; nothing was consumed.
    Pending,
    /// A poll cycle ran but the queue was empty.
    NoKey,
    Key(KeyCode),
}

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Attached, // Read in flight (or awaiting resubmission), pollable
    Detached, // Read cancelled, waiting to be released
}

#[machine]
#[derive(Debug)]
pub struct DeviceSession<S: SessionState> {
    device: DeviceId,
    profile: DeviceProfile,
    endpoint: EndpointDescriptor,
    transfer: Option<TransferHandle>,
    previous: Report,
    queue: KeyEventQueue,
}

impl<S: SessionState> DeviceSession<S> {
    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    /// Last report the key generator has seen.
    pub fn previous_report(&self) -> &Report {
        &self.previous
    }

    pub fn queued_keys(&self) -> usize {
        self.queue.len()
    }
}

impl DeviceSession<Attached> {
    /// Submits the first read and creates the session around it.
    ///
    /// The previous report starts at the profile's idle value, so a pad at rest produces no
    /// keys on its first report.
    pub fn attach<T: Transport + ?Sized>(
        device: DeviceId,
        profile: DeviceProfile,
        endpoint: EndpointDescriptor,
        overflow: OverflowPolicy,
        transport: &mut T,
    ) -> Result<Self, TransportError> {
        let handle = transport.submit_read(device, &endpoint)?;
        debug!("Initial read {} submitted for {}", handle, device);

        Ok(Self::new(
            device,
            profile,
            endpoint,
            Some(handle),
            profile.idle_report(),
            KeyEventQueue::with_policy(overflow),
        ))
    }

    /// One non-blocking poll cycle.
    ///
    /// While the read is outstanding this returns [`KeyPoll::Pending`] without touching
    /// the queue. Once it completes the report is diffed, the next read is submitted and
    /// one key is popped. A failed read, or a session whose last resubmission failed,
    /// skips the diff but still resubmits and pops, so queued keys stay consumable.
    pub fn poll<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        tables: &MappingTables,
        quantizer: &StickQuantizer,
    ) -> KeyPoll {
        if let Some(handle) = self.transfer {
            match transport.check_transfer(handle) {
                TransferStatus::Pending => return KeyPoll::Pending,
                TransferStatus::Complete(raw) => {
                    self.transfer = None;
                    debug!("Received report from {}: {}", self.device, hex::encode(raw));

                    let current = self.profile.decode(&raw);
                    let pushed = generate_keys(
                        &mut self.previous,
                        &current,
                        tables,
                        quantizer,
                        &mut self.queue,
                    );
                    if pushed > 0 {
                        debug!(
                            "Queued {} key(s) for {} ({} pending)",
                            pushed,
                            self.device,
                            self.queue.len()
                        );
                    }
                }
                TransferStatus::Failed(e) => {
                    self.transfer = None;
                    warn!("Read {} on {} failed: {}", handle, self.device, e);
                }
            }
        }

        self.resubmit(transport);

        match self.queue.pop() {
            Some(key) => KeyPoll::Key(key),
            None => KeyPoll::NoKey,
        }
    }

    fn resubmit<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        match transport.submit_read(self.device, &self.endpoint) {
            Ok(handle) => self.transfer = Some(handle),
            Err(e) => {
                warn!(
                    "Could not resubmit read for {}, no new keys until a later poll succeeds: {}",
                    self.device, e
                );
                self.transfer = None;
            }
        }
    }

    /// Modifier state for the line input layer. The pad has no modifier keys.
    pub fn key_status(&self) -> u32 {
        0
    }

    pub fn has_read_in_flight(&self) -> bool {
        self.transfer.is_some()
    }

    /// Cancels the outstanding read and leaves the session ready to be released.
    pub fn detach<T: Transport + ?Sized>(mut self, transport: &mut T) -> DeviceSession<Detached> {
        if let Some(handle) = self.transfer.take() {
            debug!("Cancelling {} for {}", handle, self.device);
            transport.cancel_transfer(handle);
        }
        info!(
            "Detached {} with {} unread key(s)",
            self.device,
            self.queue.len()
        );
        self.transition()
    }
}

impl DeviceSession<Detached> {
    /// Drops the session. Nothing can reach it any more once it is detached.
    pub fn release(self) {
        debug!("Released session for {}", self.device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::direction::Direction;
    use crate::controller::report::Side;
    use crate::transport::{ReplayTransport, TransportOp};

    const DEV: DeviceId = DeviceId(3);

    fn attached(transport: &mut ReplayTransport) -> DeviceSession<Attached> {
        transport.plug(DEV);
        DeviceSession::attach(
            DEV,
            DeviceProfile::RumblePad,
            EndpointDescriptor::interrupt_in(1),
            OverflowPolicy::DropOldest,
            transport,
        )
        .unwrap()
    }

    fn up_tables() -> MappingTables {
        let mut tables = MappingTables::new();
        tables.dpad[Direction::Up.index()] = KeyCode::from('U');
        tables
    }

    #[test]
    fn pending_read_consumes_nothing() {
        let mut transport = ReplayTransport::new();
        let mut session = attached(&mut transport);
        let tables = up_tables();
        let quantizer = StickQuantizer::default();

        assert_eq!(
            session.poll(&mut transport, &tables, &quantizer),
            KeyPoll::Pending
        );
        assert_eq!(session.previous_report(), &Report::IDLE);
    }

    #[test]
    fn completed_read_is_diffed_and_resubmitted() {
        let mut transport = ReplayTransport::new();
        let mut session = attached(&mut transport);
        let tables = up_tables();
        let quantizer = StickQuantizer::default();

        let up = Report::IDLE.with_dpad(Direction::Up);
        transport.push_report(DEV, up.to_bytes());
        assert_eq!(
            session.poll(&mut transport, &tables, &quantizer),
            KeyPoll::Key(KeyCode::from('U'))
        );
        assert!(session.has_read_in_flight());
        assert_eq!(transport.in_flight(), 1);
        assert_eq!(
            session.poll(&mut transport, &tables, &quantizer),
            KeyPoll::Pending
        );
    }

    #[test]
    fn pending_read_leaves_queued_keys_alone() {
        let mut transport = ReplayTransport::new();
        let mut session = attached(&mut transport);
        let mut tables = up_tables();
        tables.bumpers[Side::Left.index()] = KeyCode::from('b');
        let quantizer = StickQuantizer::default();

        let report = Report::IDLE
            .with_dpad(Direction::Up)
            .with_bumper(Side::Left, true);
        transport.push_report(DEV, report.to_bytes());
        assert_eq!(
            session.poll(&mut transport, &tables, &quantizer),
            KeyPoll::Key(KeyCode::from('U'))
        );
        assert_eq!(session.queued_keys(), 1);

        for _ in 0..3 {
            assert_eq!(
                session.poll(&mut transport, &tables, &quantizer),
                KeyPoll::Pending
            );
            assert_eq!(session.queued_keys(), 1);
        }

        transport.push_report(DEV, report.to_bytes());
        assert_eq!(
            session.poll(&mut transport, &tables, &quantizer),
            KeyPoll::Key(KeyCode::from('b'))
        );
        assert_eq!(session.queued_keys(), 0);
    }

    #[test]
    fn idle_first_report_is_silent() {
        let mut transport = ReplayTransport::new();
        let mut session = attached(&mut transport);
        transport.push_report(DEV, Report::IDLE.to_bytes());
        assert_eq!(
            session.poll(&mut transport, &up_tables(), &StickQuantizer::default()),
            KeyPoll::NoKey
        );
    }

    #[test]
    fn failed_resubmission_keeps_queue_consumable() {
        let mut transport = ReplayTransport::new();
        let mut session = attached(&mut transport);
        let mut tables = up_tables();
        tables.bumpers[Side::Left.index()] = KeyCode::from('b');
        let quantizer = StickQuantizer::default();

        let report = Report::IDLE
            .with_dpad(Direction::Up)
            .with_bumper(Side::Left, true);
        transport.push_report(DEV, report.to_bytes());
        transport.fail_next_submit(DEV);

        assert_eq!(
            session.poll(&mut transport, &tables, &quantizer),
            KeyPoll::Key(KeyCode::from('U'))
        );
        assert!(!session.has_read_in_flight());

        // next poll retries the submission and still hands out the queued key
        assert_eq!(
            session.poll(&mut transport, &tables, &quantizer),
            KeyPoll::Key(KeyCode::from('b'))
        );
        assert!(session.has_read_in_flight());
    }

    #[test]
    fn failed_read_skips_the_diff() {
        let mut transport = ReplayTransport::new();
        let mut session = attached(&mut transport);
        transport.fail_next_transfer(DEV);
        assert_eq!(
            session.poll(&mut transport, &up_tables(), &StickQuantizer::default()),
            KeyPoll::NoKey
        );
        assert!(session.has_read_in_flight());
        assert_eq!(session.previous_report(), &Report::IDLE);
    }

    #[test]
    fn detach_cancels_outstanding_read() {
        let mut transport = ReplayTransport::new();
        let session = attached(&mut transport);
        transport.clear_operations();

        session.detach(&mut transport).release();
        assert_eq!(transport.in_flight(), 0);
        assert_eq!(
            transport.operations(),
            &[TransportOp::Cancel {
                handle: TransferHandle(0)
            }]
        );
    }

    #[test]
    fn key_status_is_always_zero() {
        let mut transport = ReplayTransport::new();
        let session = attached(&mut transport);
        assert_eq!(session.key_status(), 0);
    }
}

//! Line-oriented console driving a registry over the replay transport
//!
//! ```text
//! attach <vid>:<pid> [device-id]    plug a device in and attach it
//! detach <slot>                     detach the session in a slot
//! report <slot> <16 hex digits>     queue one raw report for the slot's device
//! poll <slot> [count]               run 1..=1024 poll cycles, one output line each
//! list                              live sessions
//! map-* ...                         mapping commands
//! # ...                             comment
//! ```

use crate::controller::report::REPORT_LEN;
use crate::mapping::{MapCommand, MappingError};
use crate::session::{
    AttachError, DeviceRegistry, KeyPoll, RecordingInputRegistry, RegistryError, SessionHandle,
};
use crate::transport::{DeviceId, EndpointDescriptor, ReplayTransport, UsbDeviceInfo};
use thiserror::Error;
use tracing::debug;

/// Most poll cycles one `poll` line may run.
pub const MAX_POLL_COUNT: u32 = 1024;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid argument '{value}' for {what}")]
    InvalidArgument { what: &'static str, value: String },

    #[error("slot {0} is empty")]
    EmptySlot(usize),

    #[error("invalid report: {0}")]
    InvalidReport(String),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Attach(#[from] AttachError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug)]
pub struct Console {
    registry: DeviceRegistry,
    transport: ReplayTransport,
    inputs: RecordingInputRegistry,
    next_device: u32,
}

impl Console {
    pub fn new(registry: DeviceRegistry) -> Self {
        Self {
            registry,
            transport: ReplayTransport::new(),
            inputs: RecordingInputRegistry::new(),
            next_device: 1,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &ReplayTransport {
        &self.transport
    }

    pub fn inputs(&self) -> &RecordingInputRegistry {
        &self.inputs
    }

    /// Runs one console line and returns its output lines.
    pub fn execute(&mut self, line: &str) -> Result<Vec<String>, ConsoleError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Vec::new());
        }

        let mut args = line.split_whitespace();
        let command = args
            .next()
            .ok_or(ConsoleError::MissingArgument("command"))?;
        debug!("Console command: {}", line);

        match command {
            "attach" => {
                let ids = next(&mut args, "vendor:product")?;
                let device = match args.next() {
                    Some(id) => DeviceId(parse_number(id, "device id")?),
                    None => DeviceId(self.next_device),
                };
                no_more(&mut args)?;
                let (vendor_id, product_id) = parse_ids(ids)?;
                self.attach(device, vendor_id, product_id)
            }
            "detach" => {
                let slot = parse_number(next(&mut args, "slot")?, "slot")?;
                no_more(&mut args)?;
                self.detach(slot as usize)
            }
            "report" => {
                let slot = parse_number(next(&mut args, "slot")?, "slot")?;
                let raw = parse_report(next(&mut args, "report bytes")?)?;
                no_more(&mut args)?;
                self.report(slot as usize, raw)
            }
            "poll" => {
                let slot = parse_number(next(&mut args, "slot")?, "slot")?;
                let count = match args.next() {
                    Some(count) => parse_poll_count(count)?,
                    None => 1,
                };
                no_more(&mut args)?;
                self.poll(slot as usize, count)
            }
            "list" => {
                no_more(&mut args)?;
                Ok(self.list())
            }
            _ if command.starts_with("map-") => {
                let mapping = MapCommand::parse(line)?;
                let key = self.registry.apply(&mapping)?;
                Ok(vec![format!("mapped {} to {}", mapping.control, key)])
            }
            other => Err(ConsoleError::UnknownCommand(other.to_string())),
        }
    }

    /// Detaches everything that is still attached.
    pub fn shutdown(&mut self) {
        self.registry
            .shutdown(&mut self.transport, &mut self.inputs);
    }

    fn attach(
        &mut self,
        device: DeviceId,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Vec<String>, ConsoleError> {
        let info = UsbDeviceInfo {
            id: device,
            vendor_id,
            product_id,
            endpoints: vec![EndpointDescriptor::interrupt_in(1)],
        };
        self.transport.plug(device);
        self.next_device = self.next_device.max(device.0.saturating_add(1));

        let handle = match self
            .registry
            .attach(&info, &mut self.transport, &mut self.inputs)
        {
            Ok(handle) => handle,
            Err(e) => {
                if self.registry.find_device(device).is_none() {
                    self.transport.unplug(device);
                }
                return Err(e.into());
            }
        };
        let name = self.registry.name(handle).unwrap_or_default();
        let slot = handle.slot();
        Ok(vec![format!("attached {device} as {name} (slot {slot})")])
    }

    fn detach(&mut self, slot: usize) -> Result<Vec<String>, ConsoleError> {
        let handle = self.handle(slot)?;
        let device = self.registry.session(handle).map(|s| s.device());
        self.registry
            .detach(handle, &mut self.transport, &mut self.inputs);
        if let Some(device) = device {
            self.transport.unplug(device);
        }
        Ok(vec![format!("detached slot {}", slot)])
    }

    fn report(&mut self, slot: usize, raw: [u8; REPORT_LEN]) -> Result<Vec<String>, ConsoleError> {
        let handle = self.handle(slot)?;
        let device = self
            .registry
            .session(handle)
            .map(|session| session.device())
            .ok_or(ConsoleError::EmptySlot(slot))?;
        self.transport.push_report(device, raw);
        Ok(Vec::new())
    }

    fn poll(&mut self, slot: usize, count: u32) -> Result<Vec<String>, ConsoleError> {
        let handle = self.handle(slot)?;
        let mut output = Vec::new();
        for _ in 0..count {
            let line = match self.registry.poll(handle, &mut self.transport)? {
                KeyPoll::Key(key) => format!("key {}", key),
                KeyPoll::NoKey => "no-key".to_string(),
                KeyPoll::Pending => "pending".to_string(),
            };
            output.push(line);
        }
        Ok(output)
    }

    fn list(&self) -> Vec<String> {
        self.registry
            .sessions()
            .map(|(handle, name, device)| {
                let queued = self
                    .registry
                    .session(handle)
                    .map_or(0, |session| session.queued_keys());
                format!(
                    "slot {} {} {} queued={}",
                    handle.slot(),
                    name,
                    device,
                    queued
                )
            })
            .collect()
    }

    fn handle(&self, slot: usize) -> Result<SessionHandle, ConsoleError> {
        self.registry
            .handle_for_slot(slot)
            .ok_or(ConsoleError::EmptySlot(slot))
    }
}

fn next<'a>(
    args: &mut impl Iterator<Item = &'a str>,
    what: &'static str,
) -> Result<&'a str, ConsoleError> {
    args.next().ok_or(ConsoleError::MissingArgument(what))
}

fn no_more<'a>(args: &mut impl Iterator<Item = &'a str>) -> Result<(), ConsoleError> {
    match args.next() {
        Some(extra) => Err(MappingError::UnexpectedArgument(extra.to_string()).into()),
        None => Ok(()),
    }
}

fn parse_number(text: &str, what: &'static str) -> Result<u32, ConsoleError> {
    text.parse().map_err(|_| ConsoleError::InvalidArgument {
        what,
        value: text.to_string(),
    })
}

fn parse_poll_count(text: &str) -> Result<u32, ConsoleError> {
    match parse_number(text, "count")? {
        count @ 1..=MAX_POLL_COUNT => Ok(count),
        _ => Err(ConsoleError::InvalidArgument {
            what: "count",
            value: text.to_string(),
        }),
    }
}

/// `046d:c216`, both halves in hex.
fn parse_ids(text: &str) -> Result<(u16, u16), ConsoleError> {
    let invalid = || ConsoleError::InvalidArgument {
        what: "vendor:product",
        value: text.to_string(),
    };
    let (vendor, product) = text.split_once(':').ok_or_else(invalid)?;
    let vendor = u16::from_str_radix(vendor, 16).map_err(|_| invalid())?;
    let product = u16::from_str_radix(product, 16).map_err(|_| invalid())?;
    Ok((vendor, product))
}

fn parse_report(text: &str) -> Result<[u8; REPORT_LEN], ConsoleError> {
    let bytes = hex::decode(text).map_err(|e| ConsoleError::InvalidReport(e.to_string()))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        ConsoleError::InvalidReport(format!("expected {REPORT_LEN} bytes, got {}", bytes.len()))
    })
}

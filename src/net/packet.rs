use super::{HostId, SwitchId};
use crate::runtime::Payload;
use crate::time::{Duration, SimTime};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

///
/// The identifier of a virtual machine.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VmId(pub u64);

impl Display for VmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vm#{}", self.0)
    }
}

///
/// A data transfer from one virtual machine to another.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmPacket {
    /// The sending VM.
    pub sender: VmId,
    /// The receiving VM.
    pub receiver: VmId,
    /// The payload size in bytes.
    pub size: u64,
}

impl VmPacket {
    /// Creates a new packet of `size` bytes.
    #[must_use]
    pub fn new(sender: VmId, receiver: VmId, size: u64) -> Self {
        Self {
            sender,
            receiver,
            size,
        }
    }
}

///
/// A [`VmPacket`] on its way through the switch fabric.
///
/// The host packet carries the accumulated switching delay and the
/// switches it traversed so far.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPacket {
    /// The transported VM packet.
    pub vm_packet: VmPacket,
    /// The host of the sending VM.
    pub sender_host: HostId,
    /// The host of the receiving VM.
    pub receiver_host: HostId,
    /// The sum of the switching delays of all traversed switches.
    pub delay: Duration,
    /// The time the packet was handed to the sending host.
    pub sent_at: SimTime,
    /// The traversed switches, in order.
    pub path: Vec<SwitchId>,
}

impl HostPacket {
    pub(crate) fn new(
        vm_packet: VmPacket,
        sender_host: HostId,
        receiver_host: HostId,
        sent_at: SimTime,
    ) -> Self {
        Self {
            vm_packet,
            sender_host,
            receiver_host,
            delay: Duration::ZERO,
            sent_at,
            path: Vec::new(),
        }
    }

    /// The payload size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.vm_packet.size
    }
}

///
/// A packet that reached the host of its receiver.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredPacket {
    /// The delivered packet.
    pub packet: HostPacket,
    /// The time of delivery.
    pub arrival: SimTime,
}

impl DeliveredPacket {
    /// The time between sending and delivery, including time spent
    /// waiting for bandwidth.
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.arrival.saturating_duration_since(self.packet.sent_at)
    }

    /// The time spent waiting for bandwidth.
    #[must_use]
    pub fn queueing_delay(&self) -> Duration {
        self.latency().saturating_sub(self.packet.delay)
    }
}

impl From<VmPacket> for Payload {
    fn from(value: VmPacket) -> Self {
        Payload::new(value)
    }
}

impl From<HostPacket> for Payload {
    fn from(value: HostPacket) -> Self {
        Payload::new(value)
    }
}

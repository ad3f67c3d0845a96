use super::{
    DeliveredPacket, HostId, HostPacket, NetworkError, SwitchDirectory, Topology, VmPacket,
};
use crate::entity::{Entity, EntityCore};
use crate::runtime::{Event, EventTag, RuntimeError, Simulation};
use crate::time::Duration;
use std::{any::Any, sync::Arc};

///
/// A physical machine hosting VMs.
///
/// A host injects the packets of its VMs into the fabric through its
/// edge switch and collects the packets addressed to them. Packets
/// between two VMs of the same host never touch a switch.
///
#[derive(Debug)]
pub struct Host {
    core: EntityCore,
    id: HostId,
    topology: Arc<Topology>,

    sent: usize,
    delivered: Vec<DeliveredPacket>,
}

impl Host {
    ///
    /// Creates the entity simulating the host `id` of a topology.
    ///
    /// # Errors
    ///
    /// Fails if the host does not exist.
    ///
    pub fn new(topology: Arc<Topology>, id: HostId) -> Result<Self, NetworkError> {
        let node = topology
            .host(id)
            .ok_or_else(|| NetworkError::UnknownHost(format!("{id:?}")))?;
        let core = EntityCore::new(node.name()).map_err(RuntimeError::from)?;

        Ok(Self {
            core,
            id,
            topology,
            sent: 0,
            delivered: Vec::new(),
        })
    }

    /// The index of the host in its topology.
    #[must_use]
    pub fn host_id(&self) -> HostId {
        self.id
    }

    /// The number of packets sent by the VMs of this host.
    #[must_use]
    pub fn num_sent(&self) -> usize {
        self.sent
    }

    /// The packets delivered to the VMs of this host, in arrival order.
    #[must_use]
    pub fn delivered(&self) -> &[DeliveredPacket] {
        &self.delivered
    }

    fn send_packet(&mut self, packet: VmPacket, sim: &mut Simulation) {
        if self.topology.host_for_vm(packet.sender) != Some(self.id) {
            tracing::warn!(vm = %packet.sender, "sending VM is not placed on this host");
        }
        let Some(receiver_host) = self.topology.host_for_vm(packet.receiver) else {
            tracing::warn!(vm = %packet.receiver, "receiving VM is not placed on any host, dropping");
            return;
        };

        self.sent += 1;
        let packet = HostPacket::new(packet, self.id, receiver_host, sim.now());

        if receiver_host == self.id {
            tracing::trace!(receiver = %packet.vm_packet.receiver, "delivering packet locally");
            self.deliver(packet, sim);
            return;
        }

        let edge = self
            .topology
            .host(self.id)
            .map(|node| self.topology.switch_entity(node.edge()))
            .unwrap_or_default();
        sim.send(edge, Duration::ZERO, EventTag::PacketUp, packet);
    }

    fn deliver(&mut self, packet: HostPacket, sim: &mut Simulation) {
        tracing::debug!(
            sender = %packet.vm_packet.sender,
            receiver = %packet.vm_packet.receiver,
            size = packet.size(),
            hops = packet.path.len(),
            "packet delivered"
        );
        self.delivered.push(DeliveredPacket {
            packet,
            arrival: sim.now(),
        });
    }
}

impl Entity for Host {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn process_event(&mut self, event: Event, sim: &mut Simulation) {
        let tag = event.tag();
        match tag {
            EventTag::PacketSend => match event.into_payload().take::<VmPacket>() {
                Ok(packet) => self.send_packet(packet, sim),
                Err(payload) => tracing::warn!(ty = payload.ty(), "expected a vm packet"),
            },
            EventTag::PacketDeliver => match event.into_payload().take::<HostPacket>() {
                Ok(packet) => self.deliver(packet, sim),
                Err(payload) => tracing::warn!(ty = payload.ty(), "expected a host packet"),
            },
            _ => tracing::debug!(?tag, "ignoring event"),
        }
    }
}

use super::{
    BandwidthMeter, HostId, HostPacket, NetworkError, SwitchDirectory, SwitchId, SwitchLevel,
    SwitchParams, Topology,
};
use crate::entity::{Entity, EntityCore};
use crate::runtime::{Event, EventTag, RuntimeError, Simulation};
use std::{any::Any, sync::Arc};

///
/// The next step of a packet, as decided by a switch.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    /// Forward to a parent switch.
    Up(SwitchId),
    /// Forward to a child switch.
    Down(SwitchId),
    /// Deliver to an attached host.
    Host(HostId),
    /// The destination is unreachable from this switch.
    Drop,
}

///
/// Decides where a packet coming from below travels next.
///
/// An edge switch delivers packets for its own hosts and sends everything
/// else to its first parent. An aggregate switch sends packets down if one
/// of its edges leads to the destination, up to its first parent otherwise.
/// A root switch sends the packet to the first aggregate (in declaration
/// order) whose edges contain the destination edge.
///
pub fn route_up<D: SwitchDirectory + ?Sized>(
    dir: &D,
    switch: SwitchId,
    level: SwitchLevel,
    dst_edge: SwitchId,
    dst_host: Option<HostId>,
) -> Hop {
    if dst_edge.is_null() {
        return Hop::Drop;
    }

    match level {
        SwitchLevel::Edge if dst_edge == switch => dst_host.map_or(Hop::Drop, Hop::Host),
        SwitchLevel::Aggregate if dir.downlink_switches(switch).contains(&dst_edge) => {
            Hop::Down(dst_edge)
        }
        SwitchLevel::Edge | SwitchLevel::Aggregate => dir
            .uplink_switches(switch)
            .first()
            .map_or(Hop::Drop, |&parent| Hop::Up(parent)),
        SwitchLevel::Root => {
            find_aggregate_for_edge(dir, switch, dst_edge).map_or(Hop::Drop, Hop::Down)
        }
    }
}

///
/// Decides where a packet coming from above travels next.
///
pub fn route_down<D: SwitchDirectory + ?Sized>(
    dir: &D,
    switch: SwitchId,
    level: SwitchLevel,
    dst_edge: SwitchId,
    dst_host: Option<HostId>,
) -> Hop {
    if dst_edge.is_null() {
        return Hop::Drop;
    }

    match level {
        SwitchLevel::Edge if dst_edge == switch => dst_host.map_or(Hop::Drop, Hop::Host),
        SwitchLevel::Aggregate if dir.downlink_switches(switch).contains(&dst_edge) => {
            Hop::Down(dst_edge)
        }
        SwitchLevel::Root => {
            find_aggregate_for_edge(dir, switch, dst_edge).map_or(Hop::Drop, Hop::Down)
        }
        SwitchLevel::Edge | SwitchLevel::Aggregate => Hop::Drop,
    }
}

///
/// Finds the first child of `root` that has `edge` as a child.
///
/// The search only spans the two levels below the root.
///
pub fn find_aggregate_for_edge<D: SwitchDirectory + ?Sized>(
    dir: &D,
    root: SwitchId,
    edge: SwitchId,
) -> Option<SwitchId> {
    dir.downlink_switches(root)
        .iter()
        .copied()
        .find(|&aggregate| dir.downlink_switches(aggregate).contains(&edge))
}

///
/// Counters of a switch.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchStats {
    /// Packets sent to a parent switch.
    pub forwarded_up: usize,
    /// Packets sent to a child switch.
    pub forwarded_down: usize,
    /// Packets handed to hosts.
    pub delivered: usize,
    /// Packets without a route.
    pub dropped: usize,
    /// Packets that had to wait for bandwidth.
    pub delayed: usize,
}

///
/// A switch of the datacenter fabric.
///
/// One entity type covers all three tiers. The level decides how packets
/// are routed, the [`SwitchParams`] how long forwarding takes and how many
/// bytes pass per tick in each direction.
///
#[derive(Debug)]
pub struct Switch {
    core: EntityCore,
    id: SwitchId,
    level: SwitchLevel,
    params: SwitchParams,
    topology: Arc<Topology>,

    uplink: BandwidthMeter<(Hop, HostPacket)>,
    downlink: BandwidthMeter<(Hop, HostPacket)>,
    tick_pending: bool,

    stats: SwitchStats,
}

impl Switch {
    ///
    /// Creates the entity simulating the switch `id` of a topology.
    ///
    /// # Errors
    ///
    /// Fails if the switch does not exist or has an invalid name.
    ///
    pub fn new(topology: Arc<Topology>, id: SwitchId) -> Result<Self, NetworkError> {
        let node = topology
            .switch(id)
            .ok_or_else(|| NetworkError::UnknownSwitch(format!("{id:?}")))?;
        let core = EntityCore::new(node.name()).map_err(RuntimeError::from)?;
        let level = node.level();
        let params = *node.params();

        Ok(Self {
            core,
            id,
            level,
            params,
            uplink: BandwidthMeter::new(params.uplink_bandwidth, topology.tick()),
            downlink: BandwidthMeter::new(params.downlink_bandwidth, topology.tick()),
            topology,
            tick_pending: false,
            stats: SwitchStats::default(),
        })
    }

    /// The index of the switch in its topology.
    #[must_use]
    pub fn switch_id(&self) -> SwitchId {
        self.id
    }

    /// The tier of the switch.
    #[must_use]
    pub fn level(&self) -> SwitchLevel {
        self.level
    }

    /// The counters of the switch.
    #[must_use]
    pub fn stats(&self) -> &SwitchStats {
        &self.stats
    }

    /// Packets waiting for bandwidth.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.uplink.backlog_len() + self.downlink.backlog_len()
    }

    fn process_packet_up(&mut self, packet: HostPacket, sim: &mut Simulation) {
        let receiver = packet.vm_packet.receiver;
        let hop = route_up(
            &*self.topology,
            self.id,
            self.level,
            self.topology.switch_for_vm(receiver),
            self.topology.host_for_vm(receiver),
        );
        self.forward(hop, packet, sim);
    }

    fn process_packet_down(&mut self, packet: HostPacket, sim: &mut Simulation) {
        let receiver = packet.vm_packet.receiver;
        let hop = route_down(
            &*self.topology,
            self.id,
            self.level,
            self.topology.switch_for_vm(receiver),
            self.topology.host_for_vm(receiver),
        );
        self.forward(hop, packet, sim);
    }

    fn forward(&mut self, hop: Hop, packet: HostPacket, sim: &mut Simulation) {
        let now = sim.now();
        let meter = match hop {
            Hop::Drop => {
                self.stats.dropped += 1;
                tracing::warn!(
                    sender = %packet.vm_packet.sender,
                    receiver = %packet.vm_packet.receiver,
                    "no destination switch for packet, dropping"
                );
                return;
            }
            Hop::Up(_) => &mut self.uplink,
            Hop::Down(_) | Hop::Host(_) => &mut self.downlink,
        };

        let size = packet.size();
        if meter.try_consume(now, size) {
            self.transmit(hop, packet, sim);
            return;
        }

        meter.enqueue(size, (hop, packet));
        self.stats.delayed += 1;
        tracing::debug!(size, ?hop, "bandwidth exhausted, delaying packet");

        if !self.tick_pending {
            let next = meter.next_tick(now);
            sim.wake_in(next - now, EventTag::BandwidthTick, ());
            self.tick_pending = true;
        }
    }

    fn transmit(&mut self, hop: Hop, mut packet: HostPacket, sim: &mut Simulation) {
        let delay = self.params.switching_delay;
        packet.delay += delay;
        packet.path.push(self.id);

        let (dst, tag) = match hop {
            Hop::Up(sw) => {
                self.stats.forwarded_up += 1;
                (self.topology.switch_entity(sw), EventTag::PacketUp)
            }
            Hop::Down(sw) => {
                self.stats.forwarded_down += 1;
                (self.topology.switch_entity(sw), EventTag::PacketDown)
            }
            Hop::Host(host) => {
                self.stats.delivered += 1;
                (self.topology.host_entity(host), EventTag::PacketDeliver)
            }
            Hop::Drop => return,
        };

        tracing::trace!(?hop, %dst, "forwarding packet");
        sim.send(dst, delay, tag, packet);
    }

    fn on_bandwidth_tick(&mut self, sim: &mut Simulation) {
        self.tick_pending = false;
        let now = sim.now();

        let mut released = self.uplink.drain(now);
        released.extend(self.downlink.drain(now));
        for (hop, packet) in released {
            self.transmit(hop, packet, sim);
        }

        if self.backlog_len() > 0 {
            let next = self.uplink.next_tick(now).min(self.downlink.next_tick(now));
            sim.wake_in(next - now, EventTag::BandwidthTick, ());
            self.tick_pending = true;
        }
    }
}

impl Entity for Switch {
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
            EventTag::PacketUp | EventTag::PacketDown => {
                let packet = match event.into_payload().take::<HostPacket>() {
                    Ok(packet) => packet,
                    Err(payload) => {
                        tracing::warn!(?tag, ty = payload.ty(), "expected a host packet");
                        return;
                    }
                };

                if tag == EventTag::PacketUp {
                    self.process_packet_up(packet, sim);
                } else {
                    self.process_packet_down(packet, sim);
                }
            }
            EventTag::BandwidthTick => self.on_bandwidth_tick(sim),
            _ => tracing::debug!(?tag, "ignoring event"),
        }
    }

    fn shutdown_entity(&mut self, _: &mut Simulation) {
        let waiting = self.backlog_len();
        if waiting > 0 {
            tracing::warn!(waiting, "switch shut down with packets waiting for bandwidth");
        }
    }
}

use super::{NetworkError, VmId};
use crate::entity::EntityId;
use crate::time::Duration;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

///
/// The index of a switch in a [`Topology`].
///
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwitchId(pub(crate) usize);

impl SwitchId {
    /// The absent switch.
    pub const NULL: SwitchId = SwitchId(usize::MAX);

    /// Whether this is the absent switch.
    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// The position of the switch in the topology.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Debug for SwitchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "switch#null")
        } else {
            write!(f, "switch#{}", self.0)
        }
    }
}

///
/// The index of a host in a [`Topology`].
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostId(pub(crate) usize);

impl HostId {
    /// The position of the host in the topology.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

///
/// The tier of a switch in the three-tier datacenter tree.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchLevel {
    /// Level 0, connects the aggregate switches.
    Root,
    /// Level 1, connects edge switches.
    Aggregate,
    /// Level 2, connects hosts.
    Edge,
}

impl SwitchLevel {
    /// The numeric level, 0 being the root.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Root => 0,
            Self::Aggregate => 1,
            Self::Edge => 2,
        }
    }

    /// The level directly below this one.
    #[must_use]
    pub fn below(&self) -> Option<SwitchLevel> {
        match self {
            Self::Root => Some(Self::Aggregate),
            Self::Aggregate => Some(Self::Edge),
            Self::Edge => None,
        }
    }
}

impl Display for SwitchLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Aggregate => write!(f, "aggregate"),
            Self::Edge => write!(f, "edge"),
        }
    }
}

/// Bandwidth between a root and its aggregate switches, in bit/s.
pub const ROOT_DOWNLINK_BANDWIDTH: u64 = 40 * 1024 * 1024 * 1024;
/// Bandwidth between an aggregate and its edge switches, in bit/s.
pub const AGGREGATE_DOWNLINK_BANDWIDTH: u64 = 100 * 1024 * 1024;
/// Bandwidth between an edge switch and its hosts, in bit/s.
pub const EDGE_DOWNLINK_BANDWIDTH: u64 = 100 * 1024 * 1024;

///
/// The capabilities of a switch.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchParams {
    /// The number of downlink ports.
    pub ports: usize,
    /// The time needed to forward one packet.
    pub switching_delay: Duration,
    /// The bandwidth towards the parent switches in bit/s, 0 is unlimited.
    pub uplink_bandwidth: u64,
    /// The bandwidth towards the children in bit/s, 0 is unlimited.
    pub downlink_bandwidth: u64,
}

impl SwitchParams {
    /// The default capabilities of a switch of the given level.
    #[must_use]
    pub fn for_level(level: SwitchLevel) -> Self {
        match level {
            SwitchLevel::Root => Self {
                ports: 1,
                switching_delay: Duration::from_micros(2850),
                uplink_bandwidth: 0,
                downlink_bandwidth: ROOT_DOWNLINK_BANDWIDTH,
            },
            SwitchLevel::Aggregate => Self {
                ports: 1,
                switching_delay: Duration::from_micros(2450),
                uplink_bandwidth: ROOT_DOWNLINK_BANDWIDTH,
                downlink_bandwidth: AGGREGATE_DOWNLINK_BANDWIDTH,
            },
            SwitchLevel::Edge => Self {
                ports: 4,
                switching_delay: Duration::from_micros(1570),
                uplink_bandwidth: AGGREGATE_DOWNLINK_BANDWIDTH,
                downlink_bandwidth: EDGE_DOWNLINK_BANDWIDTH,
            },
        }
    }
}

///
/// A switch of a [`Topology`].
///
#[derive(Debug, Clone)]
pub struct SwitchNode {
    name: String,
    level: SwitchLevel,
    params: SwitchParams,
    downlinks: Vec<SwitchId>,
    uplinks: Vec<SwitchId>,
    hosts: Vec<HostId>,
    entity: EntityId,
}

impl SwitchNode {
    /// The name of the switch.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tier of the switch.
    #[must_use]
    pub fn level(&self) -> SwitchLevel {
        self.level
    }

    /// The capabilities of the switch.
    #[must_use]
    pub fn params(&self) -> &SwitchParams {
        &self.params
    }

    /// The child switches, in declaration order.
    #[must_use]
    pub fn downlinks(&self) -> &[SwitchId] {
        &self.downlinks
    }

    /// The parent switches, in declaration order.
    #[must_use]
    pub fn uplinks(&self) -> &[SwitchId] {
        &self.uplinks
    }

    /// The attached hosts (edge switches only).
    #[must_use]
    pub fn hosts(&self) -> &[HostId] {
        &self.hosts
    }

    /// The entity simulating the switch, once installed.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

///
/// A physical machine of a [`Topology`].
///
#[derive(Debug, Clone)]
pub struct HostNode {
    name: String,
    edge: SwitchId,
    vms: Vec<VmId>,
    entity: EntityId,
}

impl HostNode {
    /// The name of the host.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The edge switch the host is attached to.
    #[must_use]
    pub fn edge(&self) -> SwitchId {
        self.edge
    }

    /// The VMs placed on the host.
    #[must_use]
    pub fn vms(&self) -> &[VmId] {
        &self.vms
    }

    /// The entity simulating the host, once installed.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

///
/// Read-only lookups the switches need from the datacenter.
///
pub trait SwitchDirectory {
    /// The edge switch connected to the host of a VM, or [`SwitchId::NULL`].
    fn switch_for_vm(&self, vm: VmId) -> SwitchId;

    /// The host of a VM.
    fn host_for_vm(&self, vm: VmId) -> Option<HostId>;

    /// The children of a switch, in declaration order.
    fn downlink_switches(&self, switch: SwitchId) -> &[SwitchId];

    /// The parents of a switch, in declaration order.
    fn uplink_switches(&self, switch: SwitchId) -> &[SwitchId];

    /// The entity simulating a switch.
    fn switch_entity(&self, switch: SwitchId) -> EntityId;

    /// The entity simulating a host.
    fn host_entity(&self, host: HostId) -> EntityId;
}

///
/// The switch tree of a datacenter, stored as an arena.
///
/// Switches and hosts refer to each other by index. Links always lead
/// from one level to the level directly below, so the tree has no cycles.
/// A switch may have more than one parent.
///
#[derive(Debug, Clone)]
pub struct Topology {
    tick: Duration,
    switches: Vec<SwitchNode>,
    hosts: Vec<HostNode>,
    vm_hosts: FxHashMap<VmId, HostId>,
    names: FxHashMap<String, Node>,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Switch(SwitchId),
    Host(HostId),
}

impl Topology {
    /// The default length of a bandwidth accounting tick.
    pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

    /// Creates an empty topology with the given bandwidth accounting tick.
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            switches: Vec::new(),
            hosts: Vec::new(),
            vm_hosts: FxHashMap::default(),
            names: FxHashMap::default(),
        }
    }

    /// The length of a bandwidth accounting tick.
    #[must_use]
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// The number of switches.
    #[must_use]
    pub fn num_switches(&self) -> usize {
        self.switches.len()
    }

    /// The number of hosts.
    #[must_use]
    pub fn num_hosts(&self) -> usize {
        self.hosts.len()
    }

    ///
    /// Adds a switch with the default capabilities of its level.
    ///
    /// # Errors
    ///
    /// Fails if the name is already in use.
    ///
    pub fn add_switch(
        &mut self,
        name: impl Into<String>,
        level: SwitchLevel,
    ) -> Result<SwitchId, NetworkError> {
        self.add_switch_with(name, level, SwitchParams::for_level(level))
    }

    ///
    /// Adds a switch with custom capabilities.
    ///
    /// # Errors
    ///
    /// Fails if the name is already in use.
    ///
    pub fn add_switch_with(
        &mut self,
        name: impl Into<String>,
        level: SwitchLevel,
        params: SwitchParams,
    ) -> Result<SwitchId, NetworkError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(NetworkError::DuplicateName(name));
        }

        let id = SwitchId(self.switches.len());
        self.names.insert(name.clone(), Node::Switch(id));
        self.switches.push(SwitchNode {
            name,
            level,
            params,
            downlinks: Vec::new(),
            uplinks: Vec::new(),
            hosts: Vec::new(),
            entity: EntityId::NULL,
        });
        Ok(id)
    }

    ///
    /// Links `child` below `parent`. The child is appended to the
    /// downlinks of the parent.
    ///
    /// # Errors
    ///
    /// Fails if either switch is unknown or if the child is not exactly
    /// one level below the parent.
    ///
    pub fn connect(&mut self, parent: SwitchId, child: SwitchId) -> Result<(), NetworkError> {
        let (p, c) = match (self.switches.get(parent.0), self.switches.get(child.0)) {
            (Some(p), Some(c)) => (p, c),
            (None, _) => return Err(NetworkError::UnknownSwitch(format!("{parent:?}"))),
            (_, None) => return Err(NetworkError::UnknownSwitch(format!("{child:?}"))),
        };

        if p.level.below() != Some(c.level) {
            return Err(NetworkError::LevelMismatch {
                parent: p.name.clone(),
                parent_level: p.level,
                child: c.name.clone(),
                child_level: c.level,
            });
        }
        if p.downlinks.contains(&child) {
            return Ok(());
        }
        if p.downlinks.len() >= p.params.ports {
            tracing::warn!(
                switch = %p.name,
                ports = p.params.ports,
                "switch has more downlinks than ports"
            );
        }

        self.switches[parent.0].downlinks.push(child);
        self.switches[child.0].uplinks.push(parent);
        Ok(())
    }

    ///
    /// Adds a host attached to an edge switch.
    ///
    /// # Errors
    ///
    /// Fails if the name is in use or `edge` is no edge switch.
    ///
    pub fn add_host(&mut self, name: impl Into<String>, edge: SwitchId) -> Result<HostId, NetworkError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(NetworkError::DuplicateName(name));
        }
        let Some(sw) = self.switches.get_mut(edge.0) else {
            return Err(NetworkError::UnknownSwitch(format!("{edge:?}")));
        };
        if sw.level != SwitchLevel::Edge {
            return Err(NetworkError::NotAnEdge(sw.name.clone()));
        }

        let id = HostId(self.hosts.len());
        sw.hosts.push(id);
        self.names.insert(name.clone(), Node::Host(id));
        self.hosts.push(HostNode {
            name,
            edge,
            vms: Vec::new(),
            entity: EntityId::NULL,
        });
        Ok(id)
    }

    ///
    /// Places a VM on a host.
    ///
    /// # Errors
    ///
    /// Fails if the host is unknown or the VM is already placed.
    ///
    pub fn place_vm(&mut self, vm: VmId, host: HostId) -> Result<(), NetworkError> {
        if self.vm_hosts.contains_key(&vm) {
            return Err(NetworkError::DuplicateVm(vm));
        }
        let Some(node) = self.hosts.get_mut(host.0) else {
            return Err(NetworkError::UnknownHost(format!("{host:?}")));
        };

        node.vms.push(vm);
        self.vm_hosts.insert(vm, host);
        Ok(())
    }

    /// Resolves a switch by name.
    #[must_use]
    pub fn switch_by_name(&self, name: &str) -> Option<SwitchId> {
        match self.names.get(name)? {
            Node::Switch(id) => Some(*id),
            Node::Host(_) => None,
        }
    }

    /// Resolves a host by name.
    #[must_use]
    pub fn host_by_name(&self, name: &str) -> Option<HostId> {
        match self.names.get(name)? {
            Node::Host(id) => Some(*id),
            Node::Switch(_) => None,
        }
    }

    /// Returns a switch.
    #[must_use]
    pub fn switch(&self, id: SwitchId) -> Option<&SwitchNode> {
        self.switches.get(id.0)
    }

    /// Returns a host.
    #[must_use]
    pub fn host(&self, id: HostId) -> Option<&HostNode> {
        self.hosts.get(id.0)
    }

    /// Iterates over all switches in declaration order.
    pub fn switches(&self) -> impl Iterator<Item = (SwitchId, &SwitchNode)> {
        self.switches.iter().enumerate().map(|(i, s)| (SwitchId(i), s))
    }

    /// Iterates over all hosts in declaration order.
    pub fn hosts(&self) -> impl Iterator<Item = (HostId, &HostNode)> {
        self.hosts.iter().enumerate().map(|(i, h)| (HostId(i), h))
    }

    /// Maps switch and host names to their entities, switches first.
    pub(crate) fn bind_entities(&mut self, first: EntityId) {
        let base = first.raw();
        for (i, sw) in self.switches.iter_mut().enumerate() {
            sw.entity = EntityId(base + i);
        }
        let base = base + self.switches.len();
        for (i, host) in self.hosts.iter_mut().enumerate() {
            host.entity = EntityId(base + i);
        }
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TICK)
    }
}

impl SwitchDirectory for Topology {
    fn switch_for_vm(&self, vm: VmId) -> SwitchId {
        self.host_for_vm(vm)
            .and_then(|host| self.host(host))
            .map_or(SwitchId::NULL, HostNode::edge)
    }

    fn host_for_vm(&self, vm: VmId) -> Option<HostId> {
        self.vm_hosts.get(&vm).copied()
    }

    fn downlink_switches(&self, switch: SwitchId) -> &[SwitchId] {
        self.switch(switch)
            .map(SwitchNode::downlinks)
            .unwrap_or_default()
    }

    fn uplink_switches(&self, switch: SwitchId) -> &[SwitchId] {
        self.switch(switch)
            .map(SwitchNode::uplinks)
            .unwrap_or_default()
    }

    fn switch_entity(&self, switch: SwitchId) -> EntityId {
        self.switch(switch).map_or(EntityId::NULL, SwitchNode::entity)
    }

    fn host_entity(&self, host: HostId) -> EntityId {
        self.host(host).map_or(EntityId::NULL, HostNode::entity)
    }
}

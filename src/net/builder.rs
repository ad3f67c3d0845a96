use super::{
    Host, HostId, NetworkConfig, NetworkError, Switch, SwitchDirectory, SwitchId, Topology,
    VmPacket,
};
use crate::entity::{EntityError, EntityId};
use crate::runtime::{Event, EventId, EventTag, Runtime, RuntimeError};
use crate::time::SimTime;
use std::{path::Path, sync::Arc};

///
/// Installs a [`Topology`] into a [`Runtime`].
///
/// Every switch and every host becomes an entity named after it. Switches
/// are registered first, in declaration order, followed by the hosts.
///
#[derive(Debug)]
#[must_use]
pub struct NetworkBuilder {
    topology: Topology,
}

impl NetworkBuilder {
    /// Creates a builder for the given topology.
    pub fn new(topology: Topology) -> Self {
        Self { topology }
    }

    ///
    /// Creates a builder from a configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not describe a valid topology.
    ///
    pub fn from_config(config: &NetworkConfig) -> Result<Self, NetworkError> {
        Ok(Self::new(config.to_topology()?))
    }

    ///
    /// Creates a builder from a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is invalid.
    ///
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NetworkError> {
        Self::from_config(&NetworkConfig::from_file(path)?)
    }

    /// The topology to install.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    ///
    /// Registers all switch and host entities.
    ///
    /// # Errors
    ///
    /// Fails if the runtime was already started or a name is taken by
    /// another entity. Nothing is registered in that case.
    ///
    pub fn build(mut self, rt: &mut Runtime) -> Result<Network, NetworkError> {
        if rt.is_started() {
            return Err(RuntimeError::AlreadyStarted.into());
        }

        let taken = self
            .topology
            .switches()
            .map(|(_, switch)| switch.name())
            .chain(self.topology.hosts().map(|(_, host)| host.name()))
            .find(|name| !rt.entity_id(name).is_null());
        if let Some(name) = taken {
            return Err(RuntimeError::from(EntityError::DuplicateName(name.to_string())).into());
        }

        self.topology.bind_entities(rt.next_entity_id());
        let topology = Arc::new(self.topology);

        let switches = topology
            .switches()
            .map(|(id, _)| Switch::new(Arc::clone(&topology), id))
            .collect::<Result<Vec<_>, _>>()?;
        let hosts = topology
            .hosts()
            .map(|(id, _)| Host::new(Arc::clone(&topology), id))
            .collect::<Result<Vec<_>, _>>()?;

        for switch in switches {
            let id = switch.switch_id();
            let entity = rt.add_entity(switch)?;
            debug_assert_eq!(entity, topology.switch_entity(id));
        }
        for host in hosts {
            let id = host.host_id();
            let entity = rt.add_entity(host)?;
            debug_assert_eq!(entity, topology.host_entity(id));
        }

        tracing::info!(
            switches = topology.num_switches(),
            hosts = topology.num_hosts(),
            "installed network"
        );
        Ok(Network { topology })
    }
}

///
/// A handle onto a network installed in a runtime.
///
#[derive(Debug, Clone)]
pub struct Network {
    topology: Arc<Topology>,
}

impl Network {
    /// The installed topology.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The entity simulating the named switch.
    #[must_use]
    pub fn switch_entity(&self, name: &str) -> EntityId {
        self.topology
            .switch_by_name(name)
            .map_or(EntityId::NULL, |id| self.topology.switch_entity(id))
    }

    /// The entity simulating the named host.
    #[must_use]
    pub fn host_entity(&self, name: &str) -> EntityId {
        self.topology
            .host_by_name(name)
            .map_or(EntityId::NULL, |id| self.topology.host_entity(id))
    }

    /// Resolves a switch by name.
    #[must_use]
    pub fn switch_id(&self, name: &str) -> Option<SwitchId> {
        self.topology.switch_by_name(name)
    }

    /// Resolves a host by name.
    #[must_use]
    pub fn host_id(&self, name: &str) -> Option<HostId> {
        self.topology.host_by_name(name)
    }

    ///
    /// Schedules a VM to send a packet at the given time.
    ///
    /// # Errors
    ///
    /// Fails if the sending VM is not placed on any host or if `at` lies
    /// in the past.
    ///
    pub fn send(
        &self,
        rt: &mut Runtime,
        at: SimTime,
        packet: VmPacket,
    ) -> Result<EventId, NetworkError> {
        let host = self
            .topology
            .host_for_vm(packet.sender)
            .ok_or(NetworkError::UnknownVm(packet.sender))?;
        let dst = self.topology.host_entity(host);

        Ok(rt.schedule(Event::new(
            at,
            EntityId::NULL,
            dst,
            EventTag::PacketSend,
            packet,
        ))?)
    }
}

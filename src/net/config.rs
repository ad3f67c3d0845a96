use super::{NetworkError, SwitchLevel, SwitchParams, Topology, VmId};
use crate::time::{duration_from_secs, Duration};
use serde::{Deserialize, Serialize};
use std::path::Path;

///
/// A datacenter network, as described in a YAML file.
///
/// ```yaml
/// tick: 0.5
/// switches:
///   - { name: root, level: root }
///   - { name: agg-0, level: aggregate, parents: [root] }
///   - { name: edge-0, level: edge, parents: [agg-0], switching_delay: 0.001 }
/// hosts:
///   - { name: host-0, edge: edge-0, vms: [0, 1] }
/// ```
///
/// Switches must be declared after their parents. The order of
/// declaration is the order in which a parent lists its children.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// The length of a bandwidth accounting tick in seconds.
    #[serde(default = "default_tick")]
    pub tick: f64,
    /// All switches, parents first.
    pub switches: Vec<SwitchConfig>,
    /// All hosts.
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
}

fn default_tick() -> f64 {
    Topology::DEFAULT_TICK.as_secs_f64()
}

///
/// One switch of a [`NetworkConfig`]. Unset capabilities default to
/// those of the switch level.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchConfig {
    /// The unique name.
    pub name: String,
    /// The tier.
    pub level: SwitchLevel,
    /// The switches one level above.
    #[serde(default)]
    pub parents: Vec<String>,
    /// The number of downlink ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<usize>,
    /// The switching delay in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switching_delay: Option<f64>,
    /// The uplink bandwidth in bit/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplink_bandwidth: Option<u64>,
    /// The downlink bandwidth in bit/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_bandwidth: Option<u64>,
}

///
/// One host of a [`NetworkConfig`].
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// The unique name.
    pub name: String,
    /// The edge switch the host is attached to.
    pub edge: String,
    /// The VMs placed on the host.
    #[serde(default)]
    pub vms: Vec<VmId>,
}

impl NetworkConfig {
    ///
    /// Parses a configuration from YAML.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML, unknown fields or missing fields.
    ///
    pub fn from_yaml_str(s: &str) -> Result<Self, NetworkError> {
        Ok(serde_yml::from_str(s)?)
    }

    ///
    /// Reads a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    ///
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NetworkError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "reading network configuration");
        let s = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&s)
    }

    ///
    /// Serializes the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be represented, which does not
    /// happen for configurations with finite numbers.
    ///
    pub fn to_yaml_string(&self) -> Result<String, NetworkError> {
        Ok(serde_yml::to_string(self)?)
    }

    ///
    /// Builds the described topology.
    ///
    /// # Errors
    ///
    /// Fails on invalid numbers, duplicate names or VMs, references to
    /// unknown or later declared switches, or links that skip a level.
    ///
    pub fn to_topology(&self) -> Result<Topology, NetworkError> {
        let mut topology = Topology::new(secs("tick", self.tick)?);

        for sw in &self.switches {
            let mut params = SwitchParams::for_level(sw.level);
            if let Some(ports) = sw.ports {
                params.ports = ports;
            }
            if let Some(delay) = sw.switching_delay {
                params.switching_delay = secs(&format!("{}.switching_delay", sw.name), delay)?;
            }
            if let Some(bw) = sw.uplink_bandwidth {
                params.uplink_bandwidth = bw;
            }
            if let Some(bw) = sw.downlink_bandwidth {
                params.downlink_bandwidth = bw;
            }

            let id = topology.add_switch_with(sw.name.clone(), sw.level, params)?;
            for parent in &sw.parents {
                let parent = topology
                    .switch_by_name(parent)
                    .ok_or_else(|| NetworkError::UnknownSwitch(parent.clone()))?;
                topology.connect(parent, id)?;
            }
        }

        for host in &self.hosts {
            let edge = topology
                .switch_by_name(&host.edge)
                .ok_or_else(|| NetworkError::UnknownSwitch(host.edge.clone()))?;
            let id = topology.add_host(host.name.clone(), edge)?;
            for &vm in &host.vms {
                topology.place_vm(vm, id)?;
            }
        }

        tracing::debug!(
            switches = topology.num_switches(),
            hosts = topology.num_hosts(),
            "built topology"
        );
        Ok(topology)
    }
}

fn secs(field: &str, value: f64) -> Result<Duration, NetworkError> {
    duration_from_secs(value).ok_or_else(|| NetworkError::InvalidValue {
        field: field.to_string(),
        value,
    })
}

//!
//! The switch fabric of a datacenter.
//!
//! A [`Topology`] describes a three-tier tree of switches (root, aggregate,
//! edge) with hosts attached to the edge switches and VMs placed on the
//! hosts. Installed into a [`Runtime`](crate::runtime::Runtime) through a
//! [`NetworkBuilder`], every switch and host becomes an entity.
//!
//! A packet from one VM to another travels up the tree until it reaches a
//! switch that knows a way down to the edge switch of the receiver, then
//! down to the receiving host. Every hop is an event of its own, due after
//! the switching delay of the forwarding switch. Packets that exceed the
//! per-tick bandwidth of a link wait for a later tick. Packets without a
//! route are dropped and logged.
//!
//! # Examples
//!
//! ```
//! use dcsim::prelude::*;
//! use dcsim::net::*;
//!
//! let mut topology = Topology::default();
//! let root = topology.add_switch("root", SwitchLevel::Root).unwrap();
//! let agg = topology.add_switch("agg", SwitchLevel::Aggregate).unwrap();
//! let edge_a = topology.add_switch("edge-a", SwitchLevel::Edge).unwrap();
//! let edge_b = topology.add_switch("edge-b", SwitchLevel::Edge).unwrap();
//! topology.connect(root, agg).unwrap();
//! topology.connect(agg, edge_a).unwrap();
//! topology.connect(agg, edge_b).unwrap();
//!
//! let a = topology.add_host("host-a", edge_a).unwrap();
//! let b = topology.add_host("host-b", edge_b).unwrap();
//! topology.place_vm(VmId(1), a).unwrap();
//! topology.place_vm(VmId(2), b).unwrap();
//!
//! let mut rt = Builder::seeded(1).quiet().build();
//! let network = NetworkBuilder::new(topology).build(&mut rt).unwrap();
//! network.send(&mut rt, SimTime::ZERO, VmPacket::new(VmId(1), VmId(2), 512)).unwrap();
//!
//! let result = rt.run();
//! let host = result.entities().by_name::<Host>("host-b").unwrap();
//! assert_eq!(host.delivered().len(), 1);
//! assert_eq!(host.delivered()[0].packet.path.len(), 3);
//! ```
//!

mod bandwidth;
pub use self::bandwidth::*;

mod builder;
pub use self::builder::*;

mod config;
pub use self::config::*;

mod error;
pub use self::error::*;

mod host;
pub use self::host::*;

mod packet;
pub use self::packet::*;

mod switch;
pub use self::switch::*;

mod topology;
pub use self::topology::*;

#[cfg(test)]
mod tests;

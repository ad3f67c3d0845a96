#![allow(rustdoc::broken_intra_doc_links)]
//!
//! A discrete event simulator for cloud datacenters.
//!
//! The crate provides an event kernel in the style of classic cloud
//! simulators: [entities](crate::entity) exchange timestamped
//! [events](crate::runtime::Event) through a [`Runtime`](crate::runtime::Runtime)
//! that dispatches them in time order, one logical time step after the
//! other.
//!
//! # Building a simple event simulation
//!
//! ```
//! use dcsim::prelude::*;
//! use std::any::Any;
//!
//! struct Ping {
//!     core: EntityCore,
//!     pongs: usize,
//! }
//!
//! impl Entity for Ping {
//!     fn core(&self) -> &EntityCore { &self.core }
//!     fn core_mut(&mut self) -> &mut EntityCore { &mut self.core }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//!
//!     fn start_entity(&mut self, sim: &mut Simulation) {
//!         sim.wake_in(Duration::from_secs(1), EventTag::Custom(0), ());
//!     }
//!
//!     fn process_event(&mut self, _event: Event, sim: &mut Simulation) {
//!         self.pongs += 1;
//!         if self.pongs < 3 {
//!             sim.wake_in(Duration::from_secs(1), EventTag::Custom(0), ());
//!         }
//!     }
//! }
//!
//! let mut rt = Builder::seeded(1).quiet().build();
//! rt.add_entity(Ping { core: EntityCore::new("ping").unwrap(), pongs: 0 }).unwrap();
//!
//! let result = rt.run();
//! assert!(result.is_finished());
//! assert_eq!(result.time(), SimTime::from(3.0));
//! assert_eq!(result.entities().by_name::<Ping>("ping").unwrap().pongs, 3);
//! ```
//!
//! # Simulating a datacenter network
//!
//! The [`net`](crate::net) module, enabled by the default feature `net`,
//! models a three-tier switch tree that routes packets between VMs. The
//! [`scaling`](crate::scaling) module resizes VM resources based on
//! their utilization.
//!
//! # Logging
//!
//! All components log through [`tracing`](https://docs.rs/tracing). The
//! formatter in [`tracing`](crate::tracing) prefixes every line with the
//! simulation time and the name of the active entity.
//!

pub mod prelude;

pub mod entity;
pub mod runtime;
pub mod scaling;
pub mod time;
pub mod tracing;

#[cfg(feature = "net")]
pub mod net;

// # Features
//
// | Feature | Description                                                        |
// |---------|--------------------------------------------------------------------|
// | net     | The datacenter switch fabric and its YAML configuration (default). |

//!
//! Addressable, stateful actors of a simulation.
//!
//! An [`Entity`] is registered with a [`Runtime`](crate::runtime::Runtime)
//! before the simulation starts. From then on it is only ever driven by the
//! runtime: it is started once, receives every event addressed to its id
//! through [`Entity::process_event`] and is shut down exactly once when the
//! simulation ends (or earlier, on request).
//!
//! Entities never block. Waiting for something means recording enough state
//! in the entity's fields, scheduling (or expecting) a future event and
//! returning control to the runtime.
//!
//! ```
//! use dcsim::prelude::*;
//! use std::any::Any;
//!
//! struct Counter {
//!     core: EntityCore,
//!     seen: usize,
//! }
//!
//! impl Entity for Counter {
//!     fn core(&self) -> &EntityCore { &self.core }
//!     fn core_mut(&mut self) -> &mut EntityCore { &mut self.core }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//!
//!     fn process_event(&mut self, _event: Event, _sim: &mut Simulation) {
//!         self.seen += 1;
//!     }
//! }
//!
//! let counter = Counter { core: EntityCore::new("counter").unwrap(), seen: 0 };
//! assert_eq!(counter.name(), "counter");
//! assert_eq!(counter.state(), EntityState::Runnable);
//! ```

use crate::runtime::{Event, Simulation};
use std::{
    any::Any,
    error::Error,
    fmt::{Debug, Display},
};

mod null;
pub use null::*;

mod table;
pub use table::*;

///
/// A runtime unique identifier of an entity.
///
/// Ids are assigned on registration, starting at 1. The id 0 is
/// reserved for the [`NullEntity`].
///
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    /// The id of the null entity, used wherever an entity is absent.
    pub const NULL: EntityId = EntityId(0);

    /// Returns the raw numeric value of the id.
    #[must_use]
    pub fn raw(&self) -> usize {
        self.0
    }

    /// Indicates whether this is the null id.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub(crate) fn from_index(idx: usize) -> Self {
        Self(idx + 1)
    }

    pub(crate) fn index(&self) -> Option<usize> {
        self.0.checked_sub(1)
    }
}

impl Debug for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

///
/// A non-owning handle onto the simulation an entity belongs to.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SimulationId(pub(crate) u64);

impl SimulationId {
    /// The handle of an entity that is not part of any simulation.
    pub const NULL: SimulationId = SimulationId(0);

    /// Indicates whether this handle points to no simulation.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

///
/// The lifecycle state of an entity.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// The entity is executing its startup logic.
    Runnable,
    /// The entity is idle, expecting events from others.
    Waiting,
    /// The entity has at least one pending self-scheduled wake-up.
    Holding,
    /// The entity has been shut down. This state is terminal.
    Finished,
}

impl EntityState {
    /// Whether the entity can still receive events.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !matches!(self, Self::Finished)
    }
}

///
/// The identity and lifecycle bookkeeping every entity carries.
///
/// Only the runtime may change the id or the state of an entity.
///
#[derive(Debug, Clone)]
pub struct EntityCore {
    id: EntityId,
    name: String,
    state: EntityState,
    simulation: SimulationId,
}

impl EntityCore {
    ///
    /// Creates the core of a new, not yet registered entity.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::EmptyName`] if the name is empty or only
    /// consists of whitespace.
    ///
    pub fn new(name: impl Into<String>) -> Result<Self, EntityError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EntityError::EmptyName);
        }

        Ok(Self {
            id: EntityId::NULL,
            name,
            state: EntityState::Runnable,
            simulation: SimulationId::NULL,
        })
    }

    pub(crate) fn null() -> Self {
        Self {
            id: EntityId::NULL,
            name: String::new(),
            state: EntityState::Finished,
            simulation: SimulationId::NULL,
        }
    }

    /// The id of the entity, or [`EntityId::NULL`] if unregistered.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The unique name of the entity.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        self.state
    }

    /// The simulation this entity was registered with.
    #[must_use]
    pub fn simulation(&self) -> SimulationId {
        self.simulation
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) -> Result<(), EntityError> {
        if !self.id.is_null() {
            return Err(EntityError::AlreadyRegistered {
                name: self.name.clone(),
                id: self.id,
            });
        }
        self.id = id;
        Ok(())
    }

    pub(crate) fn set_state(&mut self, state: EntityState) {
        // FINISHED is terminal
        if self.state != EntityState::Finished {
            self.state = state;
        }
    }

    pub(crate) fn set_simulation(&mut self, simulation: SimulationId) {
        self.simulation = simulation;
    }
}

///
/// The contract every participant of the event loop implements.
///
/// Implementors only provide access to their [`EntityCore`] and their
/// event handling logic. Identity and lifecycle accessors are provided.
///
pub trait Entity: Any {
    /// The identity and lifecycle bookkeeping of the entity.
    fn core(&self) -> &EntityCore;

    /// Mutable access to the bookkeeping, used by the runtime.
    fn core_mut(&mut self) -> &mut EntityCore;

    /// Upcast for inspecting concrete entities after a run.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for inspecting concrete entities after a run.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    ///
    /// Called once when the simulation starts, in registration order.
    ///
    #[allow(unused_variables)]
    fn start_entity(&mut self, sim: &mut Simulation) {}

    ///
    /// Handles an event addressed to this entity.
    ///
    fn process_event(&mut self, event: Event, sim: &mut Simulation);

    ///
    /// Called exactly once before the entity becomes FINISHED.
    ///
    #[allow(unused_variables)]
    fn shutdown_entity(&mut self, sim: &mut Simulation) {}

    /// The id assigned by the runtime.
    fn id(&self) -> EntityId {
        self.core().id()
    }

    /// The unique name of the entity.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// The current lifecycle state.
    fn state(&self) -> EntityState {
        self.core().state()
    }

    /// The handle of the simulation the entity belongs to.
    fn simulation(&self) -> SimulationId {
        self.core().simulation()
    }

    /// Binds the entity to a simulation.
    fn set_simulation(&mut self, simulation: SimulationId) {
        self.core_mut().set_simulation(simulation);
    }
}

///
/// An error while creating or registering an entity.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    /// The entity name was empty.
    EmptyName,
    /// Another entity with the same name is already registered.
    DuplicateName(String),
    /// The entity was already registered with a runtime.
    AlreadyRegistered {
        /// The name of the entity.
        name: String,
        /// The id the entity was registered under.
        id: EntityId,
    },
}

impl Display for EntityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "entity names must not be empty"),
            Self::DuplicateName(name) => {
                write!(f, "an entity named '{name}' is already registered")
            }
            Self::AlreadyRegistered { name, id } => {
                write!(f, "entity '{name}' is already registered as {id}")
            }
        }
    }
}

impl Error for EntityError {}

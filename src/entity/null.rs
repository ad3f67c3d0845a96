use super::{Entity, EntityCore, EntityId, EntityState, SimulationId};
use crate::runtime::{Event, Simulation};
use std::any::Any;

///
/// The entity that stands in wherever an entity is absent.
///
/// Every operation is a no-op. The null entity has the id
/// [`EntityId::NULL`], an empty name, belongs to no simulation and is
/// permanently [`EntityState::Finished`]. The runtime hands events with
/// unknown destinations to it instead of failing.
///
#[derive(Debug)]
pub struct NullEntity {
    core: EntityCore,
}

impl NullEntity {
    /// Creates the null entity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: EntityCore::null(),
        }
    }
}

impl Default for NullEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity for NullEntity {
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

    fn start_entity(&mut self, _: &mut Simulation) {}

    fn process_event(&mut self, _: Event, _: &mut Simulation) {}

    fn shutdown_entity(&mut self, _: &mut Simulation) {}

    fn id(&self) -> EntityId {
        EntityId::NULL
    }

    fn name(&self) -> &str {
        ""
    }

    fn state(&self) -> EntityState {
        EntityState::Finished
    }

    fn simulation(&self) -> SimulationId {
        SimulationId::NULL
    }

    fn set_simulation(&mut self, _: SimulationId) {}
}

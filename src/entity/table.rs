use super::{Entity, EntityId};
use fxhash::FxHashMap;
use std::fmt::Debug;

///
/// The registry of all entities of a simulation, in registration order.
///
/// The table owns the entities. Entities only ever refer to each other
/// through [`EntityId`]s.
///
#[derive(Default)]
pub struct EntityTable {
    entities: Vec<Box<dyn Entity>>,
    names: FxHashMap<String, EntityId>,
}

impl EntityTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Indicates whether no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The id the next registered entity will receive.
    #[must_use]
    pub fn next_id(&self) -> EntityId {
        EntityId::from_index(self.entities.len())
    }

    /// Resolves an entity name, returning [`EntityId::NULL`] for unknown names.
    #[must_use]
    pub fn id_of(&self, name: &str) -> EntityId {
        self.names.get(name).copied().unwrap_or(EntityId::NULL)
    }

    /// Returns the entity with the given id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&dyn Entity> {
        self.entities.get(id.index()?).map(|e| &**e)
    }

    /// Returns the entity with the given id, if it is of type `T`.
    #[must_use]
    pub fn get_as<T: Entity>(&self, id: EntityId) -> Option<&T> {
        self.get(id)?.as_any().downcast_ref::<T>()
    }

    /// Returns the entity with the given name, if it is of type `T`.
    #[must_use]
    pub fn by_name<T: Entity>(&self, name: &str) -> Option<&T> {
        self.get_as(self.id_of(name))
    }

    /// Iterates over all entities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Entity> {
        self.entities.iter().map(|e| &**e)
    }

    pub(crate) fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub(crate) fn push(&mut self, entity: Box<dyn Entity>) -> EntityId {
        let id = entity.id();
        debug_assert_eq!(id, self.next_id());
        self.names.insert(entity.name().to_string(), id);
        self.entities.push(entity);
        id
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Box<dyn Entity>> {
        self.entities.get_mut(id.index()?)
    }
}

impl Debug for EntityTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entities.iter().map(|e| (e.id(), e.name())))
            .finish()
    }
}

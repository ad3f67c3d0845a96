//!
//! Convenience re-export of common members.
//!

//
// # Runtime
//

pub use crate::runtime::Builder;
pub use crate::runtime::Profiler;
pub use crate::runtime::RunReport;
pub use crate::runtime::Runtime;
pub use crate::runtime::RuntimeError;
pub use crate::runtime::RuntimeLimit;
pub use crate::runtime::RuntimeResult;
pub use crate::runtime::Simulation;

pub use crate::runtime::Event;
pub use crate::runtime::EventId;
pub use crate::runtime::EventTag;
pub use crate::runtime::Payload;
pub use crate::runtime::TraceRecord;

//
// # Entities
//

pub use crate::entity::Entity;
pub use crate::entity::EntityCore;
pub use crate::entity::EntityError;
pub use crate::entity::EntityId;
pub use crate::entity::EntityState;
pub use crate::entity::EntityTable;
pub use crate::entity::NullEntity;
pub use crate::entity::SimulationId;

//
// # Time
//

pub use crate::time::Duration;
pub use crate::time::SimTime;

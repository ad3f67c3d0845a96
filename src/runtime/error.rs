use crate::entity::EntityError;
use crate::time::SimTime;
use std::{error::Error, fmt::Display};

///
/// An error raised by the runtime to the caller of an operation.
///
/// Anomalies that occur while the event loop runs, like unroutable
/// packets or unknown destinations, are logged instead.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// An event was scheduled before the current logical time.
    InvalidTime {
        /// The time the event was scheduled for.
        requested: SimTime,
        /// The logical time at the moment of scheduling.
        now: SimTime,
    },
    /// An entity could not be registered.
    Entity(EntityError),
    /// Entities can only be registered before the simulation starts.
    AlreadyStarted,
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTime { requested, now } => write!(
                f,
                "cannot schedule an event at {requested}, the simulation is already at {now}"
            ),
            Self::Entity(e) => write!(f, "invalid entity: {e}"),
            Self::AlreadyStarted => {
                write!(f, "entities cannot be added to a running simulation")
            }
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Entity(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EntityError> for RuntimeError {
    fn from(value: EntityError) -> Self {
        Self::Entity(value)
    }
}

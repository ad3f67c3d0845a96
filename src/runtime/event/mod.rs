use crate::entity::EntityId;
use crate::time::SimTime;
use std::fmt::Debug;

mod payload;
pub use payload::*;

mod queue;
pub(crate) use queue::*;

///
/// A runtime unqiue identifier for a event, assigned in
/// scheduling order.
///
pub type EventId = usize;

///
/// The kind of an event.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    /// A VM asks its host to send a packet.
    PacketSend,
    /// A packet travels up the switch tree (from a host or child switch).
    PacketUp,
    /// A packet travels down the switch tree (from a parent switch).
    PacketDown,
    /// A packet is delivered to the host of its receiver VM.
    PacketDeliver,
    /// A switch retries packets held back by bandwidth limits.
    BandwidthTick,
    /// A periodic resource scaling check.
    ScalingCheck,
    /// Stops periodic resource scaling checks.
    ScalingStop,
    /// Terminates the simulation once processed.
    EndOfSimulation,
    /// A user defined event kind.
    Custom(u32),
}

///
/// An immutable record of something that will happen at a logical time,
/// addressed to exactly one entity.
///
#[derive(Debug)]
pub struct Event {
    pub(crate) id: EventId,
    time: SimTime,
    src: EntityId,
    dst: EntityId,
    tag: EventTag,
    payload: Payload,
}

impl Event {
    ///
    /// Creates a new event. The event receives its id once it is scheduled.
    ///
    #[must_use]
    pub fn new(
        time: SimTime,
        src: EntityId,
        dst: EntityId,
        tag: EventTag,
        payload: impl Into<Payload>,
    ) -> Self {
        Self {
            id: 0,
            time,
            src,
            dst,
            tag,
            payload: payload.into(),
        }
    }

    /// The id assigned when the event was scheduled.
    #[must_use]
    pub fn id(&self) -> EventId {
        self.id
    }

    /// The time the event is due.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// The entity that scheduled the event.
    #[must_use]
    pub fn src(&self) -> EntityId {
        self.src
    }

    /// The entity the event is addressed to.
    #[must_use]
    pub fn dst(&self) -> EntityId {
        self.dst
    }

    /// The kind of the event.
    #[must_use]
    pub fn tag(&self) -> EventTag {
        self.tag
    }

    /// The attached data.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consumes the event, yielding the attached data.
    #[must_use]
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Whether the event was scheduled by its receiver.
    #[must_use]
    pub fn is_self_addressed(&self) -> bool {
        !self.dst.is_null() && self.src == self.dst
    }
}

///
/// One line of the dispatch trace of a simulation.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceRecord {
    /// The time of dispatch.
    pub time: SimTime,
    /// The id of the dispatched event.
    pub event: EventId,
    /// The scheduling entity.
    pub src: EntityId,
    /// The receiving entity.
    pub dst: EntityId,
    /// The kind of the event.
    pub tag: EventTag,
}

impl From<&Event> for TraceRecord {
    fn from(event: &Event) -> Self {
        Self {
            time: event.time,
            event: event.id,
            src: event.src,
            dst: event.dst,
            tag: event.tag,
        }
    }
}

use super::{Event, EventId, EventQueue, EventTag, Payload, RuntimeError, TraceRecord};
use crate::entity::{EntityId, SimulationId};
use crate::time::{Duration, SimTime};
use fxhash::FxHashMap;
use rand::{
    distr::{Distribution, StandardUniform},
    rngs::StdRng,
    Rng,
};
use std::{
    fmt::Debug,
    sync::atomic::{AtomicU64, Ordering},
};

static SIMULATION_ID: AtomicU64 = AtomicU64::new(1);

///
/// The scheduling context of a simulation.
///
/// Entities receive a mutable reference to the context whenever the runtime
/// hands control to them. Through it they read the logical clock, schedule
/// and cancel events, resolve other entities by name and draw random numbers
/// from the seeded generator of the run.
///
pub struct Simulation {
    id: SimulationId,
    clock: SimTime,
    pub(super) queue: EventQueue,
    rng: StdRng,

    current: EntityId,
    names: FxHashMap<String, EntityId>,

    // Pending self-addressed events per entity.
    holds: FxHashMap<EntityId, usize>,
    pub(super) touched: Vec<EntityId>,

    terminated: bool,
    pub(super) shutdown_requests: Vec<EntityId>,
    trace: Option<Vec<TraceRecord>>,
}

impl Simulation {
    pub(super) fn new(rng: StdRng, start_time: SimTime, trace: bool) -> Self {
        Self {
            id: SimulationId(SIMULATION_ID.fetch_add(1, Ordering::SeqCst)),
            clock: start_time,
            queue: EventQueue::new(),
            rng,

            current: EntityId::NULL,
            names: FxHashMap::default(),

            holds: FxHashMap::default(),
            touched: Vec::new(),

            terminated: false,
            shutdown_requests: Vec::new(),
            trace: trace.then(Vec::new),
        }
    }

    /// A context that belongs to no runtime.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        use rand::SeedableRng;
        Self::new(StdRng::seed_from_u64(0), SimTime::ZERO, false)
    }

    /// The handle entities of this simulation are bound to.
    #[must_use]
    pub fn id(&self) -> SimulationId {
        self.id
    }

    /// The current logical time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.clock
    }

    /// The entity whose handler is currently executing.
    #[must_use]
    pub fn current_entity(&self) -> EntityId {
        self.current
    }

    /// Resolves an entity name, returning [`EntityId::NULL`] for unknown names.
    #[must_use]
    pub fn entity_id(&self, name: &str) -> EntityId {
        self.names.get(name).copied().unwrap_or(EntityId::NULL)
    }

    /// Whether the simulation was asked to terminate.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// The number of scheduled events that were not yet dispatched.
    #[must_use]
    pub fn num_pending_events(&self) -> usize {
        self.queue.len_future() + self.queue.len_deferred()
    }

    ///
    /// Inserts an event into the future queue.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidTime`] if the event is due before
    /// the current logical time. Such events are never clamped.
    ///
    pub fn schedule(&mut self, event: Event) -> Result<EventId, RuntimeError> {
        if event.time() < self.clock {
            return Err(RuntimeError::InvalidTime {
                requested: event.time(),
                now: self.clock,
            });
        }

        if event.is_self_addressed() {
            *self.holds.entry(event.dst()).or_default() += 1;
            self.touched.push(event.dst());
        }

        Ok(self.queue.push(event))
    }

    ///
    /// Sends an event from the current entity to `dst`, due after `delay`.
    ///
    /// A due time beyond [`SimTime::MAX`] saturates to it and is logged.
    ///
    pub fn send(
        &mut self,
        dst: EntityId,
        delay: Duration,
        tag: EventTag,
        payload: impl Into<Payload>,
    ) -> EventId {
        let time = self.clock.checked_add(delay).unwrap_or_else(|| {
            tracing::warn!(?delay, "due time overflows, saturating to SimTime::MAX");
            SimTime::MAX
        });
        let event = Event::new(time, self.current, dst, tag, payload);
        if event.is_self_addressed() {
            *self.holds.entry(dst).or_default() += 1;
            self.touched.push(dst);
        }
        self.queue.push(event)
    }

    ///
    /// Sends an event from the current entity to `dst`, due at `time`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidTime`] if `time` lies in the past.
    ///
    pub fn send_at(
        &mut self,
        dst: EntityId,
        time: SimTime,
        tag: EventTag,
        payload: impl Into<Payload>,
    ) -> Result<EventId, RuntimeError> {
        self.schedule(Event::new(time, self.current, dst, tag, payload))
    }

    ///
    /// Schedules a wake-up for the current entity. The entity is
    /// HOLDING until the wake-up fires or is cancelled. Overflowing due
    /// times saturate like [`Simulation::send`].
    ///
    pub fn wake_in(
        &mut self,
        delay: Duration,
        tag: EventTag,
        payload: impl Into<Payload>,
    ) -> EventId {
        self.send(self.current, delay, tag, payload)
    }

    ///
    /// Withdraws a future event. Returns whether the event was still
    /// pending. Events of the time step being dispatched cannot be
    /// withdrawn.
    ///
    pub fn cancel(&mut self, event: EventId) -> bool {
        self.cancel_where(|e| e.id() == event) > 0
    }

    ///
    /// Withdraws all future events matching the predicate, returning
    /// how many were withdrawn.
    ///
    pub fn cancel_where(&mut self, predicate: impl FnMut(&Event) -> bool) -> usize {
        let cancelled = self.queue.cancel_where(predicate);
        for event in &cancelled {
            if event.is_self_addressed() {
                self.release_hold(event.dst());
            }
            tracing::trace!(event = event.id(), tag = ?event.tag(), "cancelled event");
        }
        cancelled.len()
    }

    /// Stops the event loop once the current event has been handled.
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    ///
    /// Requests the shutdown of an entity once the current event has
    /// been handled.
    ///
    pub fn shutdown_entity(&mut self, entity: EntityId) {
        self.shutdown_requests.push(entity);
    }

    /// The random number generator of the run.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Generates a random instance of type T with a standard distribution.
    pub fn random<T>(&mut self) -> T
    where
        StandardUniform: Distribution<T>,
    {
        self.rng.random::<T>()
    }

    /// Generates a random instance of type T with a distribution of type D.
    pub fn sample<T, D>(&mut self, distr: D) -> T
    where
        D: Distribution<T>,
    {
        self.rng.sample::<T, D>(distr)
    }

    pub(super) fn register_name(&mut self, name: &str, id: EntityId) {
        self.names.insert(name.to_string(), id);
    }

    pub(super) fn set_current(&mut self, entity: EntityId) {
        self.current = entity;
    }

    pub(super) fn holds(&self, entity: EntityId) -> usize {
        self.holds.get(&entity).copied().unwrap_or(0)
    }

    pub(super) fn release_hold(&mut self, entity: EntityId) {
        if let Some(count) = self.holds.get_mut(&entity) {
            *count = count.saturating_sub(1);
            self.touched.push(entity);
        }
    }

    // The only place the logical clock moves.
    pub(super) fn advance(&mut self, time: SimTime) {
        debug_assert!(time >= self.clock, "the clock must never move backwards");
        self.clock = time;
        SimTime::set_now(time);
    }

    pub(super) fn record(&mut self, event: &Event) {
        if let Some(trace) = &mut self.trace {
            trace.push(TraceRecord::from(event));
        }
    }

    pub(super) fn take_trace(&mut self) -> Vec<TraceRecord> {
        self.trace.take().unwrap_or_default()
    }
}

impl Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("id", &self.id)
            .field("now", &self.clock)
            .field("current", &self.current)
            .field("pending", &self.num_pending_events())
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn past_events_are_rejected() {
        let mut sim = Simulation::detached();
        sim.advance(SimTime::from(10.0));

        let err = sim
            .schedule(Event::new(
                SimTime::from(9.5),
                EntityId::NULL,
                EntityId(1),
                EventTag::Custom(0),
                (),
            ))
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::InvalidTime {
                requested: SimTime::from(9.5),
                now: SimTime::from(10.0)
            }
        );
        assert_eq!(sim.num_pending_events(), 0);

        // events at the current time are fine
        sim.send_at(EntityId(1), SimTime::from(10.0), EventTag::Custom(0), ())
            .unwrap();
        assert_eq!(sim.num_pending_events(), 1);
    }

    #[test]
    fn self_events_hold_the_sender() {
        let mut sim = Simulation::detached();
        sim.set_current(EntityId(2));

        let a = sim.wake_in(Duration::from_secs(1), EventTag::ScalingCheck, ());
        let _ = sim.wake_in(Duration::from_secs(2), EventTag::ScalingCheck, ());
        sim.send(EntityId(3), Duration::from_secs(1), EventTag::Custom(1), ());
        assert_eq!(sim.holds(EntityId(2)), 2);
        assert_eq!(sim.holds(EntityId(3)), 0);

        assert!(sim.cancel(a));
        assert!(!sim.cancel(a));
        assert_eq!(sim.holds(EntityId(2)), 1);

        let n = sim.cancel_where(|e| e.tag() == EventTag::ScalingCheck);
        assert_eq!(n, 1);
        assert_eq!(sim.holds(EntityId(2)), 0);
        assert_eq!(sim.num_pending_events(), 1);
    }

    #[test]
    fn overflowing_delays_saturate() {
        let mut sim = Simulation::detached();
        sim.advance(SimTime::from(10.0));
        sim.set_current(EntityId(2));

        sim.wake_in(Duration::MAX, EventTag::ScalingCheck, ());
        assert_eq!(sim.num_pending_events(), 1);
        assert_eq!(sim.queue.peek_time(), Some(SimTime::MAX));
        assert_eq!(sim.holds(EntityId(2)), 1);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = Simulation::new(StdRng::seed_from_u64(7), SimTime::ZERO, false);
        let mut b = Simulation::new(StdRng::seed_from_u64(7), SimTime::ZERO, false);
        let xs: Vec<u64> = (0..8).map(|_| a.random()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.random()).collect();
        assert_eq!(xs, ys);
        assert_ne!(a.id(), b.id());
    }
}

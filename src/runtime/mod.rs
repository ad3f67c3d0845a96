//!
//! The discrete event simulation kernel.
//!
//! A [`Runtime`] owns the logical clock, the event queue and the registry
//! of entities. Its event loop is the only thing that advances a
//! simulation: it moves all events of the earliest pending time step into
//! the deferred queue, advances the clock to that time and dispatches the
//! deferred events one by one, in scheduling order, to their destination
//! entities. Handlers react by scheduling new events through the
//! [`Simulation`] context they are handed.
//!

use crate::entity::{Entity, EntityError, EntityId, EntityState, EntityTable, NullEntity};
use crate::time::SimTime;
use rand::distr::{Distribution, StandardUniform};
use std::{
    fmt::{Debug, Display},
    mem,
    sync::MutexGuard,
};

mod event;
pub use self::event::*;

mod limit;
pub use self::limit::*;

mod bench;
pub use self::bench::*;

mod builder;
pub use self::builder::*;

mod error;
pub use self::error::*;

mod sim;
pub use self::sim::*;

pub(crate) const FT_NET: bool = cfg!(feature = "net");

pub(crate) const SYM_CHECKMARK: char = '\u{2713}';
pub(crate) const SYM_CROSSMARK: char = '\u{02df}';

///
/// The central management point of a discrete event simulation.
///
/// # Usage
///
/// - Create a runtime with a [`Builder`].
/// - Register all entities with [`Runtime::add_entity`] and schedule the
///   initial events with [`Runtime::schedule`].
/// - Execute the simulation with [`Runtime::run`], or step through it
///   with [`Runtime::start`], the `dispatch_*` functions and
///   [`Runtime::finish`].
///
pub struct Runtime {
    sim: Simulation,
    entities: EntityTable,
    null: NullEntity,

    state: State,

    // Rt limits
    limit: RuntimeLimit,
    itr: usize,

    // Misc
    quiet: bool,
    profiler: Profiler,

    #[allow(dead_code)]
    permit: MutexGuard<'static, ()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    Running,
}

impl Runtime {
    ///
    /// Registers an entity, assigning it the next free id and binding it
    /// to this simulation.
    ///
    /// # Errors
    ///
    /// Fails if the simulation was already started, if the name of the
    /// entity is taken or if the entity was registered before.
    ///
    pub fn add_entity<E: Entity>(&mut self, mut entity: E) -> Result<EntityId, RuntimeError> {
        if self.state != State::Ready {
            return Err(RuntimeError::AlreadyStarted);
        }
        if self.entities.contains_name(entity.name()) {
            return Err(EntityError::DuplicateName(entity.name().to_string()).into());
        }

        let id = self.entities.next_id();
        entity.core_mut().assign_id(id)?;
        entity.set_simulation(self.sim.id());

        self.sim.register_name(entity.name(), id);
        crate::tracing::new_scope(id, entity.name());
        tracing::debug!(%id, name = entity.name(), "registered entity");

        Ok(self.entities.push(Box::new(entity)))
    }

    /// Whether entities were already started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state != State::Ready
    }

    /// The id the next registered entity will receive.
    #[must_use]
    pub fn next_entity_id(&self) -> EntityId {
        self.entities.next_id()
    }

    /// Resolves an entity name, returning [`EntityId::NULL`] for unknown names.
    #[must_use]
    pub fn entity_id(&self, name: &str) -> EntityId {
        self.entities.id_of(name)
    }

    /// Returns the entity with the given id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&dyn Entity> {
        self.entities.get(id)
    }

    /// All registered entities.
    #[must_use]
    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    /// The scheduling context of this runtime.
    #[must_use]
    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    ///
    /// Inserts an event into the future queue.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidTime`] if the event is due before
    /// the current logical time.
    ///
    pub fn schedule(&mut self, event: Event) -> Result<EventId, RuntimeError> {
        let id = self.sim.schedule(event)?;
        self.refresh_states();
        Ok(id)
    }

    ///
    /// Withdraws a future event. Returns whether the event was still pending.
    ///
    pub fn cancel(&mut self, event: EventId) -> bool {
        let cancelled = self.sim.cancel(event);
        self.refresh_states();
        cancelled
    }

    ///
    /// Withdraws all future events matching the predicate.
    ///
    pub fn cancel_where(&mut self, predicate: impl FnMut(&Event) -> bool) -> usize {
        let n = self.sim.cancel_where(predicate);
        self.refresh_states();
        n
    }

    ///
    /// Shuts an entity down. Its `shutdown_entity` handler runs immediately,
    /// afterwards the entity is FINISHED and ignores all further events.
    ///
    pub fn shutdown_entity(&mut self, id: EntityId) {
        self.sim.shutdown_entity(id);
        self.process_requests();
    }

    ///
    /// Returns the number of events that were scheduled on this [`Runtime`] instance.
    ///
    #[inline]
    #[must_use]
    pub fn num_events_scheduled(&self) -> usize {
        self.sim.queue.num_scheduled()
    }

    ///
    /// Returns the number of events that were dispatched on this [`Runtime`] instance.
    ///
    #[must_use]
    pub fn num_events_dispatched(&self) -> usize {
        self.itr
    }

    ///
    /// Returns the number of events that are scheduled, but not yet dispatched.
    ///
    #[must_use]
    pub fn num_events_pending(&self) -> usize {
        self.sim.num_pending_events()
    }

    ///
    /// Returns the current simulation time.
    ///
    #[must_use]
    pub fn sim_time(&self) -> SimTime {
        self.sim.now()
    }

    ///
    /// Generates a random value from the seeded RNG of the run.
    ///
    pub fn random<T>(&mut self) -> T
    where
        StandardUniform: Distribution<T>,
    {
        self.sim.random()
    }

    ///
    /// Samples a value from the seeded RNG of the run.
    ///
    pub fn rng_sample<T, D>(&mut self, distr: D) -> T
    where
        D: Distribution<T>,
    {
        self.sim.sample(distr)
    }

    /// Runs the simulation until it terminates or a limit is reached.
    ///
    /// # Examples
    ///
    /// ```
    /// use dcsim::prelude::*;
    ///
    /// let mut rt = Builder::seeded(1).quiet().build();
    /// rt.schedule(Event::new(
    ///     SimTime::from(3.0),
    ///     EntityId::NULL,
    ///     EntityId::NULL,
    ///     EventTag::EndOfSimulation,
    ///     (),
    /// )).unwrap();
    ///
    /// let result = rt.run();
    /// assert!(result.is_finished());
    /// assert_eq!(result.time(), SimTime::from(3.0));
    /// assert_eq!(result.profiler().event_count, 1);
    /// ```
    ///
    /// # Panics
    ///
    /// This function panics if the simulation was already started.
    pub fn run(mut self) -> RuntimeResult {
        assert_eq!(
            self.state,
            State::Ready,
            "Runtime::run can only be used for simulations in the ready state"
        );
        // (0) Start sim-start
        self.start();

        // (1) Event main loop
        self.dispatch_all();

        // (2) Finish sim-end
        self.finish()
    }

    /// Starts the simulation manually. If [`Runtime::run`] is not used, use the
    /// combination of start, dispatch and finish to complete a full execution cycle.
    ///
    /// Every entity is started in registration order. While its startup logic
    /// executes it is RUNNABLE, afterwards WAITING or HOLDING.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation was already started.
    pub fn start(&mut self) {
        assert_eq!(
            self.state,
            State::Ready,
            "only a simulation in the ready state can be started"
        );

        if !self.quiet {
            println!("\u{23A1}");
            println!("\u{23A2} Simulation starting");
            println!(
                "\u{23A2}  net [{}]",
                if FT_NET { SYM_CHECKMARK } else { SYM_CROSSMARK }
            );
            println!("\u{23A2}  Entities := {}", self.entities.len());
            println!("\u{23A2}  Event limit := {}", self.limit);
            println!("\u{23A3}");
        }

        self.profiler.start();
        self.state = State::Running;

        for idx in 0..self.entities.len() {
            let id = EntityId::from_index(idx);
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            if !entity.state().is_alive() {
                continue;
            }

            self.sim.set_current(id);
            crate::tracing::enter_scope(id);
            entity.start_entity(&mut self.sim);
            crate::tracing::leave_scope();
            self.sim.set_current(EntityId::NULL);

            self.sim.touched.push(id);
            self.process_requests();
        }
    }

    /// Executes the next n events of the runtime.
    ///
    /// Returns whether events remain that could be dispatched.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation has not been started.
    pub fn dispatch_n_events(&mut self, n: usize) -> bool {
        let limit = RuntimeLimit::EventCount(self.num_events_dispatched() + n);
        self.dispatch_with_limit(limit)
    }

    /// Executes all events that are due at or before the given time.
    ///
    /// Returns whether events remain that could be dispatched.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation has not been started.
    pub fn dispatch_events_until(&mut self, t: SimTime) -> bool {
        self.dispatch_with_limit(RuntimeLimit::SimTime(t))
    }

    /// Executes events until the simulation terminates or the
    /// configured limit applies.
    ///
    /// # Panics
    ///
    /// This function panics if the simulation has not been started.
    pub fn dispatch_all(&mut self) {
        assert_eq!(
            self.state,
            State::Running,
            "dispatching is only allowed for running simulations"
        );
        while !self.dispatch_event() {}
    }

    fn dispatch_with_limit(&mut self, limit: RuntimeLimit) -> bool {
        let configured = self.limit.clone();
        self.limit.add(limit);
        self.dispatch_all();
        self.limit = configured;

        !self.sim.is_terminated() && !self.sim.queue.is_empty()
    }

    /// Shuts the simulation down and returns its result.
    ///
    /// Every entity that is not yet FINISHED is shut down exactly once,
    /// in registration order.
    ///
    /// # Panics
    ///
    /// This function panics if the runtime has not yet been started.
    pub fn finish(mut self) -> RuntimeResult {
        assert_eq!(
            self.state,
            State::Running,
            "only a running simulation can be finished"
        );

        let active_events = self.sim.num_pending_events();
        let terminated = self.sim.is_terminated();

        for idx in 0..self.entities.len() {
            self.sim.shutdown_entity(EntityId::from_index(idx));
        }
        self.process_requests();

        self.profiler.finish(self.itr, self.entities.len());

        let time = self.sim.now();
        let report = RunReport {
            time,
            trace: self.sim.take_trace(),
            profiler: self.profiler,
            entities: self.entities,
        };

        if active_events == 0 && self.itr == 0 {
            if !self.quiet {
                println!("\u{23A1}");
                println!("\u{23A2} Empty simulation");
                println!("\u{23A2}  Ended at event #0 after {time}");
                println!("\u{23A3}");
            }

            return RuntimeResult::EmptySimulation(report);
        }

        if active_events == 0 || terminated {
            if !self.quiet {
                println!("\u{23A1}");
                println!("\u{23A2} Simulation ended");
                println!("\u{23A2}  Ended at event #{} after {}", self.itr, time);
                println!("\u{23A3}");
            }

            RuntimeResult::Finished(report)
        } else {
            if !self.quiet {
                println!("\u{23A1}");
                println!("\u{23A2} Simulation ended prematurly");
                println!(
                    "\u{23A2}  Ended at event #{} with {} active events after {}",
                    self.itr, active_events, time
                );
                println!("\u{23A3}");
            }

            RuntimeResult::PrematureAbort {
                report,
                active_events,
            }
        }
    }

    /// Processes the next deferred event, first moving the next time step
    /// into the deferred queue if required. Returns `true` if the
    /// simulation should stop.
    fn dispatch_event(&mut self) -> bool {
        if self.sim.is_terminated() {
            return true;
        }

        if self.sim.queue.len_deferred() == 0 {
            let Some(time) = self.sim.queue.peek_time() else {
                return true;
            };
            if self.limit.applies(self.itr + 1, time) {
                return true;
            }

            self.sim.queue.defer_next_step();
            self.sim.advance(time);
        }

        let Some(event) = self.sim.queue.pop_deferred() else {
            return true;
        };

        if self.limit.applies(self.itr + 1, event.time()) {
            self.sim.queue.unpop_deferred(event);
            self.sim.queue.requeue_deferred();
            return true;
        }

        self.itr += 1;
        self.dispatch(event);

        false
    }

    fn dispatch(&mut self, event: Event) {
        let dst = event.dst();
        let tag = event.tag();

        if event.is_self_addressed() {
            self.sim.release_hold(dst);
        }
        self.sim.record(&event);

        tracing::trace!(
            event = event.id(),
            src = %event.src(),
            %dst,
            ?tag,
            "dispatching event"
        );

        match self.entities.get_mut(dst) {
            Some(entity) if entity.state().is_alive() => {
                self.sim.set_current(dst);
                crate::tracing::enter_scope(dst);
                entity.process_event(event, &mut self.sim);
                crate::tracing::leave_scope();
                self.sim.set_current(EntityId::NULL);

                self.sim.touched.push(dst);
            }
            Some(entity) => {
                tracing::debug!(
                    entity = entity.name(),
                    ?tag,
                    "dropping event addressed to a finished entity"
                );
            }
            None => {
                if !(dst.is_null() && tag == EventTag::EndOfSimulation) {
                    tracing::warn!(%dst, ?tag, "event addressed to an unknown entity");
                }
                self.null.process_event(event, &mut self.sim);
            }
        }

        if tag == EventTag::EndOfSimulation {
            tracing::info!("end of simulation requested");
            self.sim.terminate();
        }

        self.process_requests();
    }

    fn process_requests(&mut self) {
        loop {
            let requests = mem::take(&mut self.sim.shutdown_requests);
            if requests.is_empty() {
                break;
            }

            for id in requests {
                self.shutdown_one(id);
            }
        }

        self.refresh_states();
    }

    fn shutdown_one(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(id) else {
            tracing::warn!(%id, "cannot shut down an unknown entity");
            return;
        };
        if !entity.state().is_alive() {
            return;
        }

        let prev = self.sim.current_entity();
        self.sim.set_current(id);
        crate::tracing::enter_scope(id);

        entity.shutdown_entity(&mut self.sim);
        entity.core_mut().set_state(EntityState::Finished);
        tracing::debug!("entity finished");

        if prev.is_null() {
            crate::tracing::leave_scope();
        } else {
            crate::tracing::enter_scope(prev);
        }
        self.sim.set_current(prev);
    }

    fn refresh_states(&mut self) {
        for id in mem::take(&mut self.sim.touched) {
            let holds = self.sim.holds(id);
            if let Some(entity) = self.entities.get_mut(id) {
                // RUNNABLE only lasts until the startup logic returned
                if self.state == State::Ready {
                    continue;
                }
                let state = if holds > 0 {
                    EntityState::Holding
                } else {
                    EntityState::Waiting
                };
                entity.core_mut().set_state(state);
            }
        }
    }
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runtime {{ sim_time: {} (itr {} / {}) scheduled: {} pending: {} entities: {:?} }}",
            self.sim_time(),
            self.num_events_dispatched(),
            self.limit,
            self.num_events_scheduled(),
            self.num_events_pending(),
            self.entities,
        )
    }
}

impl Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runtime {{ sim_time: {} (itr {} / {}) scheduled: {} pending: {} }}",
            self.sim_time(),
            self.num_events_dispatched(),
            self.limit,
            self.num_events_scheduled(),
            self.num_events_pending()
        )
    }
}

///
/// Everything that remains of a simulation after it finished.
///
#[derive(Debug)]
pub struct RunReport {
    /// The logical time the simulation ended at.
    pub time: SimTime,
    /// The profile of the run.
    pub profiler: Profiler,
    /// All entities, all of them FINISHED.
    pub entities: EntityTable,
    /// The dispatch trace, if tracing was enabled.
    pub trace: Vec<TraceRecord>,
}

///
/// The outcome of a simulation run.
///
#[derive(Debug)]
pub enum RuntimeResult {
    /// No event was ever dispatched.
    EmptySimulation(RunReport),
    /// The future queue ran dry or the simulation was terminated explicitly.
    Finished(RunReport),
    /// A runtime limit stopped the simulation while events were pending.
    PrematureAbort {
        /// The state at the moment of the abort.
        report: RunReport,
        /// The number of events that were never dispatched.
        active_events: usize,
    },
}

impl RuntimeResult {
    /// Whether no events were dispatched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::EmptySimulation(_))
    }

    /// Whether the simulation ended regularly.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    /// Whether a limit stopped the simulation.
    #[must_use]
    pub fn is_premature_abort(&self) -> bool {
        matches!(self, Self::PrematureAbort { .. })
    }

    /// The report of the run.
    #[must_use]
    pub fn report(&self) -> &RunReport {
        match self {
            Self::EmptySimulation(report) | Self::Finished(report) => report,
            Self::PrematureAbort { report, .. } => report,
        }
    }

    /// Consumes the result, yielding the report of the run.
    #[must_use]
    pub fn into_report(self) -> RunReport {
        match self {
            Self::EmptySimulation(report) | Self::Finished(report) => report,
            Self::PrematureAbort { report, .. } => report,
        }
    }

    /// The logical time the simulation ended at.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.report().time
    }

    /// The profile of the run.
    #[must_use]
    pub fn profiler(&self) -> &Profiler {
        &self.report().profiler
    }

    /// All entities of the simulation.
    #[must_use]
    pub fn entities(&self) -> &EntityTable {
        &self.report().entities
    }

    /// The dispatch trace.
    #[must_use]
    pub fn trace(&self) -> &[TraceRecord] {
        &self.report().trace
    }
}

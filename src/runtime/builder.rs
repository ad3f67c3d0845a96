use super::{Profiler, Runtime, RuntimeLimit, Simulation, State};
use crate::entity::{EntityTable, NullEntity};
use crate::time::SimTime;
use rand::{rngs::StdRng, SeedableRng};
use std::{
    fmt::Debug,
    sync::{Mutex, TryLockError},
};

/// A lock the ensures only one runtime exits at a time.
static SIMULATION_LOCK: Mutex<()> = Mutex::new(());

/// A builder for a runtime instance.
#[must_use]
pub struct Builder {
    pub(super) quiet: bool,
    pub(super) rng: StdRng,
    pub(super) limit: RuntimeLimit,
    pub(super) start_time: SimTime,
    pub(super) trace: bool,
}

impl Builder {
    /// Creates a new unconfigured builder, with an RNG seeded
    /// by the operating system.
    pub fn new() -> Builder {
        Builder {
            quiet: false,
            rng: StdRng::from_os_rng(),
            limit: RuntimeLimit::None,
            start_time: SimTime::MIN,
            trace: false,
        }
    }

    /// Creates a `Builder` with a static seeded RNG.
    pub fn seeded(seed: u64) -> Builder {
        Builder {
            quiet: false,
            rng: StdRng::seed_from_u64(seed),
            limit: RuntimeLimit::None,
            start_time: SimTime::MIN,
            trace: false,
        }
    }

    ///
    /// Suppresses the start and end banners of the runtime.
    ///
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    ///
    /// Changes the logical time the simulation starts at.
    ///
    pub fn start_time(mut self, time: SimTime) -> Self {
        self.start_time = time;
        self
    }

    ///
    /// Limits the number of dispatched events.
    ///
    pub fn max_itr(mut self, max_itr: usize) -> Self {
        self.limit.add(RuntimeLimit::EventCount(max_itr));
        self
    }

    ///
    /// Limits the logical time of the runtime (default: inf).
    ///
    pub fn max_time(mut self, max_time: SimTime) -> Self {
        self.limit.add(RuntimeLimit::SimTime(max_time));
        self
    }

    ///
    /// Adds a custom limit, combined with all other limits by
    /// a logical OR.
    ///
    pub fn limit(mut self, limit: RuntimeLimit) -> Self {
        self.limit.add(limit);
        self
    }

    ///
    /// Records every dispatched event. The trace is part of
    /// the [`RuntimeResult`](super::RuntimeResult).
    ///
    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    ///
    /// Builds a new [`Runtime`] instance.
    ///
    /// Only one runtime can exist per process at a time. If another
    /// runtime is alive, this call blocks until it is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use dcsim::prelude::*;
    ///
    /// let rt = Builder::seeded(123).quiet().max_itr(100).build();
    /// assert_eq!(rt.sim_time(), SimTime::ZERO);
    /// assert!(rt.run().is_empty());
    /// ```
    pub fn build(self) -> Runtime {
        let permit = match SIMULATION_LOCK.try_lock() {
            Ok(permit) => permit,
            Err(TryLockError::WouldBlock) => {
                eprintln!(
                    "dcsim::warning ** another runtime allready exists ... waiting for simlock"
                );
                match SIMULATION_LOCK.lock() {
                    Ok(permit) => permit,
                    Err(p) => {
                        eprintln!("dcsim::error ** another runtime poisoned the simlock ... cleaning up");
                        p.into_inner()
                    }
                }
            }
            Err(TryLockError::Poisoned(p)) => {
                eprintln!("dcsim::error ** another runtime poisoned the simlock ... cleaning up");
                p.into_inner()
            }
        };

        SimTime::set_now(self.start_time);

        Runtime {
            sim: Simulation::new(self.rng, self.start_time, self.trace),
            entities: EntityTable::new(),
            null: NullEntity::new(),

            state: State::Ready,
            limit: self.limit,
            itr: 0,

            quiet: self.quiet,
            profiler: Profiler::default(),

            permit,
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("quiet", &self.quiet)
            .field("limit", &self.limit)
            .field("start_time", &self.start_time)
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}

use super::{Load, ResourceScaling, Thresholds};
use crate::entity::{Entity, EntityCore, EntityError};
use crate::runtime::{Event, EventId, EventTag, Simulation};
use crate::time::{Duration, SimTime};
use rand::Rng;
use std::{any::Any, fmt::Debug};

///
/// Where the utilization observed at a check comes from.
///
#[derive(Debug, Clone, PartialEq)]
pub enum UtilizationModel {
    /// Always the same utilization.
    Constant(f64),
    /// Drawn uniformly from `[min, max)` using the simulation RNG.
    Uniform {
        /// The lower bound.
        min: f64,
        /// The upper bound.
        max: f64,
    },
    /// One value per check. The last value repeats once the trace ends.
    Trace(Vec<f64>),
}

impl UtilizationModel {
    fn sample(&self, check: usize, sim: &mut Simulation) -> f64 {
        match self {
            Self::Constant(u) => *u,
            Self::Uniform { min, max } if min < max => sim.rng().random_range(*min..*max),
            Self::Uniform { min, .. } => *min,
            Self::Trace(values) => values
                .get(check)
                .or(values.last())
                .copied()
                .unwrap_or(0.0),
        }
    }
}

///
/// A capacity change applied by a [`VerticalScalingMonitor`].
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingRecord {
    /// The time of the check.
    pub time: SimTime,
    /// The observed utilization.
    pub utilization: f64,
    /// The capacity before the change.
    pub from: u64,
    /// The capacity after the change.
    pub to: u64,
}

///
/// An entity resizing one VM resource.
///
/// Once started, the monitor wakes up every `interval`, samples its
/// [`UtilizationModel`] and asks its [`ResourceScaling`] policy for a new
/// capacity whenever the utilization leaves the [`Thresholds`]. The
/// resulting capacity is clamped to `[min, max]`.
///
/// Checks stop after the configured budget or when the monitor receives
/// [`EventTag::ScalingStop`].
///
pub struct VerticalScalingMonitor {
    core: EntityCore,
    policy: Box<dyn ResourceScaling>,
    model: UtilizationModel,
    thresholds: Thresholds,

    interval: Duration,
    max_checks: Option<usize>,
    bounds: (u64, u64),
    capacity: u64,

    checks: usize,
    pending: Option<EventId>,
    history: Vec<ScalingRecord>,
}

impl VerticalScalingMonitor {
    /// The default time between two checks.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    ///
    /// Creates a monitor for a resource of the given initial capacity.
    ///
    /// # Errors
    ///
    /// Fails if the name is empty.
    ///
    pub fn new(
        name: impl Into<String>,
        capacity: u64,
        policy: impl ResourceScaling + 'static,
    ) -> Result<Self, EntityError> {
        Ok(Self {
            core: EntityCore::new(name)?,
            policy: Box::new(policy),
            model: UtilizationModel::Constant(0.5),
            thresholds: Thresholds::default(),

            interval: Self::DEFAULT_INTERVAL,
            max_checks: None,
            bounds: (0, u64::MAX),
            capacity,

            checks: 0,
            pending: None,
            history: Vec::new(),
        })
    }

    /// Sets the utilization model.
    #[must_use]
    pub fn with_model(mut self, model: UtilizationModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the accepted utilization band.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Sets the time between two checks. A zero interval is replaced by
    /// the default.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = if interval.is_zero() {
            Self::DEFAULT_INTERVAL
        } else {
            interval
        };
        self
    }

    /// Limits the number of checks.
    #[must_use]
    pub fn with_max_checks(mut self, max_checks: usize) -> Self {
        self.max_checks = Some(max_checks);
        self
    }

    /// Limits the capacity to `[min, max]`.
    #[must_use]
    pub fn with_bounds(mut self, min: u64, max: u64) -> Self {
        self.bounds = (min.min(max), min.max(max));
        self.capacity = self.capacity.clamp(self.bounds.0, self.bounds.1);
        self
    }

    /// The current capacity.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// The number of checks performed.
    #[must_use]
    pub fn num_checks(&self) -> usize {
        self.checks
    }

    /// All applied capacity changes, in order.
    #[must_use]
    pub fn history(&self) -> &[ScalingRecord] {
        &self.history
    }

    /// Whether another check is scheduled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    fn schedule_check(&mut self, sim: &mut Simulation) {
        if self.max_checks.is_some_and(|max| self.checks >= max) {
            tracing::debug!(checks = self.checks, "check budget exhausted");
            self.pending = None;
            return;
        }
        self.pending = Some(sim.wake_in(self.interval, EventTag::ScalingCheck, ()));
    }

    fn check(&mut self, sim: &mut Simulation) {
        self.pending = None;
        let utilization = self.model.sample(self.checks, sim);
        self.checks += 1;

        let load = self.thresholds.classify(utilization);
        if load != Load::Normal {
            let amount = self.policy.scale_amount(utilization, self.capacity);
            let to = self
                .capacity
                .saturating_add_signed(amount)
                .clamp(self.bounds.0, self.bounds.1);

            if to == self.capacity {
                tracing::debug!(?load, utilization, capacity = to, "cannot scale any further");
            } else {
                tracing::info!(?load, utilization, from = self.capacity, to, "scaling resource");
                self.history.push(ScalingRecord {
                    time: sim.now(),
                    utilization,
                    from: self.capacity,
                    to,
                });
                self.capacity = to;
            }
        }

        self.schedule_check(sim);
    }

    fn stop(&mut self, sim: &mut Simulation) {
        if let Some(id) = self.pending.take() {
            sim.cancel(id);
            tracing::debug!(checks = self.checks, "stopped scaling checks");
        }
    }
}

impl Debug for VerticalScalingMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerticalScalingMonitor")
            .field("core", &self.core)
            .field("capacity", &self.capacity)
            .field("checks", &self.checks)
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}

impl Entity for VerticalScalingMonitor {
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

    fn start_entity(&mut self, sim: &mut Simulation) {
        self.schedule_check(sim);
    }

    fn process_event(&mut self, event: Event, sim: &mut Simulation) {
        match event.tag() {
            EventTag::ScalingCheck if self.pending == Some(event.id()) => self.check(sim),
            EventTag::ScalingCheck => tracing::trace!(event = event.id(), "stale check"),
            EventTag::ScalingStop => self.stop(sim),
            tag => tracing::debug!(?tag, "ignoring event"),
        }
    }
}

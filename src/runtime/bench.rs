use std::time::{Duration, Instant, SystemTime};

/// A run profiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profiler {
    /// The wall clock time point where the simulation started.
    pub simulation_start: SystemTime,

    time_start: Instant,
    /// The wall clock duration of the simulation.
    pub duration: Duration,

    /// The number of events that where dispatched.
    pub event_count: usize,
    /// The number of entities that took part in the simulation.
    pub entity_count: usize,
    /// The active features.
    pub features: Vec<String>,
}

impl Profiler {
    /// Starts the profile.
    pub(super) fn start(&mut self) {
        self.simulation_start = SystemTime::now();
        self.time_start = Instant::now();
    }

    /// Finishes the profile.
    pub(super) fn finish(&mut self, event_count: usize, entity_count: usize) {
        self.event_count = event_count;
        self.entity_count = entity_count;
        self.duration = self.time_start.elapsed();
    }

    /// The number of dispatched events per wall clock second.
    #[must_use]
    pub fn events_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.event_count as f64 / secs
        }
    }
}

impl Default for Profiler {
    fn default() -> Self {
        let mut features = Vec::with_capacity(1);
        if super::FT_NET {
            features.push("net".into());
        }

        Self {
            simulation_start: SystemTime::now(),
            time_start: Instant::now(),
            duration: Duration::ZERO,

            event_count: 0,
            entity_count: 0,
            features,
        }
    }
}

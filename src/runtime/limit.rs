use crate::time::SimTime;
use std::{fmt::Display, mem};

///
/// A composed limit that stops the event loop of a runtime
/// before the future queue runs dry.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeLimit {
    /// An unbounded runtime. The runtime only stops once no events
    /// remain or the simulation is terminated explicitly.
    None,

    /// A bound on the number of dispatched events. The runtime stops
    /// before dispatching the event that would exceed the bound.
    EventCount(usize),

    /// A bound on the logical clock. The runtime stops once every
    /// event due at or before the given time has been dispatched.
    SimTime(SimTime),

    /// Both limits must apply for the runtime to stop.
    CombinedAnd(Box<RuntimeLimit>, Box<RuntimeLimit>),

    /// Either limit stops the runtime.
    CombinedOr(Box<RuntimeLimit>, Box<RuntimeLimit>),
}

impl RuntimeLimit {
    pub(crate) fn applies(&self, itr_count: usize, time: SimTime) -> bool {
        match self {
            Self::None => false,

            Self::EventCount(e) => itr_count > *e,
            Self::SimTime(t) => time > *t,

            Self::CombinedAnd(lhs, rhs) => {
                lhs.applies(itr_count, time) && rhs.applies(itr_count, time)
            }
            Self::CombinedOr(lhs, rhs) => {
                lhs.applies(itr_count, time) || rhs.applies(itr_count, time)
            }
        }
    }

    pub(crate) fn add(&mut self, limit: RuntimeLimit) {
        if matches!(self, Self::None) {
            *self = limit;
        } else {
            let other = mem::replace(self, Self::None);
            *self = Self::CombinedOr(Box::new(other), Box::new(limit));
        }
    }
}

impl Display for RuntimeLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),

            Self::EventCount(e) => write!(f, "MaxEventCount({e})"),
            Self::SimTime(t) => write!(f, "MaxSimTime({t})"),

            Self::CombinedAnd(lhs, rhs) => write!(f, "{lhs} and {rhs}"),
            Self::CombinedOr(lhs, rhs) => write!(f, "{lhs} or {rhs}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_limits() {
        let limit = RuntimeLimit::None;
        assert_eq!(limit.to_string(), "None");
        assert!(!limit.applies(usize::MAX, SimTime::MAX));

        let limit = RuntimeLimit::EventCount(10);
        assert_eq!(limit.to_string(), "MaxEventCount(10)");
        assert!(!limit.applies(10, SimTime::MAX));
        assert!(limit.applies(11, SimTime::ZERO));

        let limit = RuntimeLimit::SimTime(60.0.into());
        assert_eq!(limit.to_string(), "MaxSimTime(60s)");
        assert!(!limit.applies(0, 60.0.into()));
        assert!(limit.applies(0, 60.001.into()));
    }

    #[test]
    fn combined_limits() {
        use RuntimeLimit::*;

        let limit = CombinedAnd(Box::new(EventCount(10)), Box::new(SimTime(5.0.into())));
        assert_eq!(limit.to_string(), "MaxEventCount(10) and MaxSimTime(5s)");
        assert!(!limit.applies(20, 1.0.into()));
        assert!(!limit.applies(1, 20.0.into()));
        assert!(limit.applies(11, 5.5.into()));

        let limit = CombinedOr(Box::new(EventCount(10)), Box::new(SimTime(5.0.into())));
        assert!(limit.applies(1, 20.0.into()));
        assert!(limit.applies(11, 1.0.into()));

        let mut other = RuntimeLimit::None;
        other.add(EventCount(10));
        other.add(SimTime(5.0.into()));
        assert_eq!(limit, other);
    }
}

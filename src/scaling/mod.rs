//!
//! Vertical scaling of VM resources.
//!
//! A [`ResourceScaling`] policy decides by how much the capacity of a
//! resource changes once its utilization leaves the accepted band of
//! [`Thresholds`]. The [`VerticalScalingMonitor`] entity checks the
//! utilization periodically and applies the policy.
//!
//! ```
//! use dcsim::scaling::*;
//!
//! let policy = GradualScaling::new(0.5, Thresholds::new(0.2, 0.8));
//! assert_eq!(policy.scale_amount(0.9, 1000), 500);
//! assert_eq!(policy.scale_amount(0.5, 1000), 0);
//! assert_eq!(policy.scale_amount(0.1, 1000), -500);
//!
//! let double = |_: f64, capacity: u64| capacity as i64;
//! assert_eq!(double.scale_amount(1.0, 8), 8);
//! assert_eq!(NullScaling.scale_amount(1.0, 8), 0);
//! ```
//!

mod monitor;
pub use self::monitor::*;

mod policy;
pub use self::policy::*;

///
/// Computes by how much a resource should grow (positive) or shrink
/// (negative), given its utilization in `[0, 1]` and its current capacity.
///
pub trait ResourceScaling {
    /// The signed change of capacity.
    fn scale_amount(&self, utilization: f64, capacity: u64) -> i64;
}

impl<F> ResourceScaling for F
where
    F: Fn(f64, u64) -> i64,
{
    fn scale_amount(&self, utilization: f64, capacity: u64) -> i64 {
        self(utilization, capacity)
    }
}

///
/// A policy that never scales.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullScaling;

impl ResourceScaling for NullScaling {
    fn scale_amount(&self, _: f64, _: u64) -> i64 {
        0
    }
}

///
/// The band of accepted utilization.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Below this a resource is underloaded.
    pub lower: f64,
    /// Above this a resource is overloaded.
    pub upper: f64,
}

///
/// The load of a resource relative to its [`Thresholds`].
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Load {
    /// Utilization is below the lower threshold.
    Under,
    /// Utilization is within the band.
    Normal,
    /// Utilization is above the upper threshold.
    Over,
}

impl Thresholds {
    /// Creates a band, swapping the bounds if given in the wrong order.
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        if lower <= upper {
            Self { lower, upper }
        } else {
            Self {
                lower: upper,
                upper: lower,
            }
        }
    }

    /// Classifies a utilization.
    #[must_use]
    pub fn classify(&self, utilization: f64) -> Load {
        if utilization > self.upper {
            Load::Over
        } else if utilization < self.lower {
            Load::Under
        } else {
            Load::Normal
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            lower: 0.3,
            upper: 0.7,
        }
    }
}

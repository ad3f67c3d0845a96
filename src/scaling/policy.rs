use super::{Load, ResourceScaling, Thresholds};

///
/// Scales by a fixed fraction of the current capacity per check.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradualScaling {
    factor: f64,
    thresholds: Thresholds,
}

impl GradualScaling {
    /// Creates a policy scaling by `factor × capacity`. Negative
    /// factors are treated as their absolute value.
    #[must_use]
    pub fn new(factor: f64, thresholds: Thresholds) -> Self {
        Self {
            factor: factor.abs(),
            thresholds,
        }
    }

    /// The fraction of capacity added or removed per check.
    #[must_use]
    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl ResourceScaling for GradualScaling {
    fn scale_amount(&self, utilization: f64, capacity: u64) -> i64 {
        let step = (capacity as f64 * self.factor).ceil() as i64;
        match self.thresholds.classify(utilization) {
            Load::Over => step,
            Load::Under => -step,
            Load::Normal => 0,
        }
    }
}

///
/// Resizes in one step, so that the used amount of the resource sits
/// exactly at the violated threshold afterwards.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstantaneousScaling {
    thresholds: Thresholds,
}

impl InstantaneousScaling {
    /// Creates a policy targeting the bounds of `thresholds`.
    #[must_use]
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl ResourceScaling for InstantaneousScaling {
    fn scale_amount(&self, utilization: f64, capacity: u64) -> i64 {
        let target = match self.thresholds.classify(utilization) {
            Load::Over => self.thresholds.upper,
            Load::Under => self.thresholds.lower,
            Load::Normal => return 0,
        };
        if target <= 0.0 {
            return 0;
        }

        let used = utilization * capacity as f64;
        let wanted = (used / target).ceil() as i64;
        wanted - capacity as i64
    }
}

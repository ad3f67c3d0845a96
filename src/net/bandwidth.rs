use crate::time::{Duration, SimTime};
use std::collections::VecDeque;

///
/// Per-tick bandwidth accounting for one direction of a switch.
///
/// Time is divided into ticks of fixed length, aligned to `SimTime::ZERO`.
/// Within one tick at most `bandwidth * tick / 8` bytes pass. Items that
/// do not fit wait in a FIFO backlog for a later tick. An item always
/// fits into a tick that has not carried anything yet, so oversized
/// packets are delayed but never starve.
///
#[derive(Debug, Clone)]
pub struct BandwidthMeter<T> {
    capacity: u64,
    tick: Duration,
    tick_start: SimTime,
    used: u64,
    backlog: VecDeque<(u64, T)>,
}

impl<T> BandwidthMeter<T> {
    ///
    /// Creates a meter for a link with the given bandwidth in bit/s.
    /// A bandwidth of 0 or a zero tick disables the accounting.
    ///
    #[must_use]
    pub fn new(bandwidth: u64, tick: Duration) -> Self {
        let capacity = if tick.is_zero() {
            0
        } else {
            let bits = bandwidth as f64 * tick.as_secs_f64();
            ((bits / 8.0).floor() as u64).max(u64::from(bandwidth != 0))
        };

        Self {
            capacity,
            tick,
            tick_start: SimTime::ZERO,
            used: 0,
            backlog: VecDeque::new(),
        }
    }

    /// The number of bytes that pass per tick, 0 if unlimited.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Whether the meter limits anything.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.capacity == 0
    }

    /// The number of waiting items.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// The bytes consumed in the tick containing `now`.
    #[must_use]
    pub fn used(&self, now: SimTime) -> u64 {
        if now >= self.tick_start + self.tick {
            0
        } else {
            self.used
        }
    }

    ///
    /// Tries to reserve `size` bytes in the current tick. Fails if the
    /// bytes do not fit or if earlier items are still waiting.
    ///
    pub fn try_consume(&mut self, now: SimTime, size: u64) -> bool {
        if self.is_unlimited() {
            return true;
        }
        self.roll(now);

        self.backlog.is_empty() && self.reserve(size)
    }

    /// Appends an item of `size` bytes to the backlog.
    pub fn enqueue(&mut self, size: u64, item: T) {
        self.backlog.push_back((size, item));
    }

    ///
    /// Releases as many waiting items, in order, as fit into the
    /// tick containing `now`.
    ///
    pub fn drain(&mut self, now: SimTime) -> Vec<T> {
        self.roll(now);

        let mut released = Vec::new();
        while let Some((size, _)) = self.backlog.front() {
            if !self.is_unlimited() && !self.reserve(*size) {
                break;
            }
            if let Some((_, item)) = self.backlog.pop_front() {
                released.push(item);
            }
        }
        released
    }

    /// The start of the tick after the one containing `now`.
    #[must_use]
    pub fn next_tick(&self, now: SimTime) -> SimTime {
        Self::tick_start_of(now, self.tick) + self.tick
    }

    fn reserve(&mut self, size: u64) -> bool {
        if self.used == 0 || self.used.saturating_add(size) <= self.capacity {
            self.used = self.used.saturating_add(size);
            true
        } else {
            false
        }
    }

    fn roll(&mut self, now: SimTime) {
        let start = Self::tick_start_of(now, self.tick);
        if start != self.tick_start {
            self.tick_start = start;
            self.used = 0;
        }
    }

    fn tick_start_of(now: SimTime, tick: Duration) -> SimTime {
        let tick = tick.as_nanos();
        if tick == 0 {
            return now;
        }
        let nanos = now.as_nanos() / tick * tick;
        let secs = u64::try_from(nanos / 1_000_000_000).unwrap_or(u64::MAX);
        // remainder is always below 10^9
        let subsec = (nanos % 1_000_000_000) as u32;
        SimTime::from_duration(Duration::new(secs, subsec))
    }
}

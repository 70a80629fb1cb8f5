//! Randomized grain trigger timing.

use rand::Rng;

// -------------------------------------------------------------------------------------------------

/// Counts down frames until the next grain pair should be spawned.
///
/// Trigger intervals are drawn uniformly from a `min_hop..=max_hop` range around the base hop
/// size, so grains never trigger periodically (which would cause audible comb artifacts).
///
/// Usage per frame: when [`Self::is_due`], spawn grains and [`Self::reschedule`], then
/// [`Self::tick`] once.
#[derive(Debug, Clone)]
pub(crate) struct TriggerScheduler {
    min_hop: usize,
    max_hop: usize,
    counter: isize,
    next_interval: usize,
}

impl TriggerScheduler {
    pub fn new() -> Self {
        Self {
            min_hop: 1,
            max_hop: 2,
            counter: 0,
            next_interval: 0,
        }
    }

    /// Apply a new inclusive hop range and schedule the first trigger.
    pub fn configure(&mut self, hop_range: (usize, usize), rng: &mut impl Rng) {
        let (min_hop, max_hop) = hop_range;
        debug_assert!(min_hop >= 1 && max_hop >= min_hop, "Invalid hop range");
        self.min_hop = min_hop.max(1);
        self.max_hop = max_hop.max(self.min_hop);
        self.counter = 0;
        self.reschedule(rng);
    }

    /// Inclusive range of possible trigger intervals.
    #[allow(unused)]
    pub fn hop_range(&self) -> (usize, usize) {
        (self.min_hop, self.max_hop)
    }

    /// Frames left until the next trigger fires.
    #[allow(unused)]
    pub fn remaining(&self) -> isize {
        self.counter
    }

    /// The most recently drawn trigger interval.
    #[allow(unused)]
    pub fn next_interval(&self) -> usize {
        self.next_interval
    }

    /// True when grains should be spawned in the current frame.
    #[inline]
    pub fn is_due(&self) -> bool {
        self.counter <= 0
    }

    /// Count down one frame.
    #[inline]
    pub fn tick(&mut self) {
        debug_assert!(self.counter >= 0, "Missed a trigger");
        self.counter -= 1;
    }

    /// Draw a new random trigger interval and restart the countdown.
    pub fn reschedule(&mut self, rng: &mut impl Rng) {
        self.next_interval = rng.random_range(self.min_hop..=self.max_hop);
        self.counter = self.next_interval as isize;
    }
}

impl Default for TriggerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

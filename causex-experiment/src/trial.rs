use causex_core::{StimulusAdapter, TrialCondition};

/// The trial currently on screen
pub struct Trial<S: StimulusAdapter, T> {
    /// 0-based index within the current trial list
    pub index: usize,
    pub condition: TrialCondition,
    pub stimulus: S,
    pub start: T,
}

impl<S: StimulusAdapter, T> Trial<S, T> {
    /// Last moment the objects are still drawn, ms from trial start
    pub fn display_end_ms(&self, grace_ms: u64) -> u64 {
        self.stimulus.t2_time() + self.stimulus.change_duration() + grace_ms
    }

    pub fn wants_two_targets(&self) -> bool {
        self.stimulus.num_targets() > 1
    }
}

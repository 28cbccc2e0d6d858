use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StimulusError;
use crate::trial::{ResponsePair, TrialCondition};

pub type Rgba = [u8; 4];

pub const GREEN: Rgba = [0, 200, 0, 255];
pub const BLUE: Rgba = [40, 110, 255, 255];
pub const WHITE: Rgba = [255, 255, 255, 255];

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectId {
    O1,
    O2,
}

impl ObjectId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectId::O1 => "o1",
            ObjectId::O2 => "o2",
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one moving object looks like on the current frame
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTrace {
    pub x: f32,
    pub y: f32,
    pub color: Rgba,
    pub text: String,
}

impl ObjectTrace {
    pub fn new(color: Rgba, text: impl Into<String>) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            color,
            text: text.into(),
        }
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum StimulusState {
    #[default]
    Running,
    Asking,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct BurstWindow {
    pub start_ms: u64,
    pub duration_ms: u64,
}

impl BurstWindow {
    pub fn is_active(&self, elapsed_ms: u64) -> bool {
        elapsed_ms >= self.start_ms && elapsed_ms - self.start_ms < self.duration_ms
    }
}

/// Snapshot a stimulus hands back once the trial is scored
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StimulusResults {
    pub o1_start: Option<usize>,
    pub o2_start: Option<usize>,
    pub score: Option<u32>,
    pub t1_value: Option<char>,
    pub t2_value: Option<char>,
    pub t1_object: Option<ObjectId>,
    pub t2_object: Option<ObjectId>,
    pub attention_prompt: Option<String>,
    pub t1_time_ms: Option<u64>,
    pub t2_time_ms: Option<u64>,
}

/// Everything needed to build one trial's stimulus
#[derive(Debug, Clone)]
pub struct StimulusSpec {
    pub o1: ObjectTrace,
    pub o2: ObjectTrace,
    pub condition: TrialCondition,
    pub participant_id: String,
    pub is_training: bool,
    pub num_targets: u8,
}

/// A drivable stimulus for one trial.
///
/// `update` must be a pure function of the elapsed time: calling it twice
/// with the same value leaves the stimulus in the same state.
pub trait StimulusAdapter {
    fn update(&mut self, elapsed_ms: u64) -> Result<(), StimulusError>;

    fn state(&self) -> StimulusState;

    /// Running -> asking; the state never goes back.
    fn begin_asking(&mut self);

    /// Scores the trial. A second submission is rejected.
    fn submit_response(&mut self, responses: &ResponsePair) -> Result<(), StimulusError>;

    fn results(&self) -> StimulusResults;

    /// Onset of the second target, ms from trial start
    fn t2_time(&self) -> u64;

    /// How long each target stays on screen
    fn change_duration(&self) -> u64;

    fn burst(&self) -> Option<BurstWindow>;

    fn o1(&self) -> &ObjectTrace;

    fn o2(&self) -> &ObjectTrace;

    fn num_targets(&self) -> u8;
}

pub trait StimulusFactory {
    type Stimulus: StimulusAdapter;

    fn build(&mut self, spec: &StimulusSpec) -> Result<Self::Stimulus, StimulusError>;
}

//! Two objects on a circular track, each cycling through digits, with the
//! target letters flashed around the moment the objects meet.
//!
//! All randomness is drawn when the stimulus is built; `update` is a pure
//! function of elapsed time afterwards.

use std::f32::consts::{FRAC_PI_2, TAU};

use causex_core::{
    BurstWindow, CollisionType, ObjectId, ObjectTrace, Response, ResponsePair, StimulusAdapter,
    StimulusError, StimulusFactory, StimulusResults, StimulusSpec, StimulusState, TrialCondition,
    CANVAS_HEIGHT, CANVAS_WIDTH,
};
use rand::Rng;

pub const POSITION_COUNT: usize = 36;
pub const TRACK_RADIUS: f32 = 200.0;
pub const DIGIT_INTERVAL_MS: u64 = 100;
pub const CHANGE_DURATION_MS: u64 = 100;
pub const BURST_DURATION_MS: u64 = 300;
/// Launch delay that breaks the causal impression
pub const FAKE_CAUSAL_PAUSE_MS: u64 = 250;
const LEAD_IN_MS: (u64, u64) = (1000, 1500);
const START_GAP: (usize, usize) = (6, 12);
/// Speed of the leading object, positions per second
const O2_SPEED: f32 = 3.0;
const LETTERS: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ";
/// Digit streams run this long past the last target
const STREAM_TAIL_MS: u64 = 3000;

fn track_point(position: f32) -> (f32, f32) {
    let angle = position / POSITION_COUNT as f32 * TAU - FRAC_PI_2;
    (
        CANVAS_WIDTH / 2.0 + TRACK_RADIUS * angle.cos(),
        CANVAS_HEIGHT / 2.0 + TRACK_RADIUS * angle.sin(),
    )
}

#[derive(Debug, Clone)]
pub struct OrbitStimulus {
    condition: TrialCondition,
    num_targets: u8,
    o1: ObjectTrace,
    o2: ObjectTrace,
    o1_start: usize,
    o2_start: usize,
    o1_speed: f32,
    contact_ms: u64,
    t2_time: u64,
    t1_letter: Option<char>,
    t2_letter: char,
    digits: Vec<[char; 2]>,
    state: StimulusState,
    score: Option<u32>,
}

impl OrbitStimulus {
    pub fn new<R: Rng + ?Sized>(spec: &StimulusSpec, rng: &mut R) -> Result<Self, StimulusError> {
        if !(1..=2).contains(&spec.num_targets) {
            return Err(StimulusError::InvalidCondition(format!(
                "{} targets requested, expected 1 or 2",
                spec.num_targets
            )));
        }
        let condition = spec.condition;
        if condition.lag_ms() == 0 {
            return Err(StimulusError::InvalidCondition("lag must be positive".into()));
        }

        let o1_start = rng.random_range(0..POSITION_COUNT);
        let gap = rng.random_range(START_GAP.0..=START_GAP.1);
        let o2_start = (o1_start + gap) % POSITION_COUNT;
        let contact_ms = rng.random_range(LEAD_IN_MS.0..=LEAD_IN_MS.1);
        let o1_speed = O2_SPEED + gap as f32 / (contact_ms as f32 / 1000.0);
        let t2_time = contact_ms + u64::from(condition.lag_ms());

        let t1 = LETTERS[rng.random_range(0..LETTERS.len())] as char;
        let t2 = loop {
            let c = LETTERS[rng.random_range(0..LETTERS.len())] as char;
            if c != t1 {
                break c;
            }
        };

        let slots = ((t2_time + STREAM_TAIL_MS) / DIGIT_INTERVAL_MS + 1) as usize;
        let digits = (0..slots)
            .map(|_| {
                [
                    char::from(b'0' + rng.random_range(0..10u8)),
                    char::from(b'0' + rng.random_range(0..10u8)),
                ]
            })
            .collect();

        let mut stimulus = Self {
            condition,
            num_targets: spec.num_targets,
            o1: spec.o1.clone(),
            o2: spec.o2.clone(),
            o1_start,
            o2_start,
            o1_speed,
            contact_ms,
            t2_time,
            t1_letter: (spec.num_targets > 1).then_some(t1),
            t2_letter: t2,
            digits,
            state: StimulusState::Running,
            score: None,
        };
        stimulus.update(0)?;
        Ok(stimulus)
    }

    /// Track positions of (o1, o2) at `t` ms
    fn positions(&self, t: u64) -> (f32, f32) {
        let secs = |ms: u64| ms as f32 / 1000.0;
        let gap = (self.o2_start + POSITION_COUNT - self.o1_start) % POSITION_COUNT;
        let o1_base = self.o1_start as f32;
        let o2_base = o1_base + gap as f32;

        if t <= self.contact_ms {
            return (
                o1_base + self.o1_speed * secs(t),
                o2_base + O2_SPEED * secs(t),
            );
        }
        let meet = o1_base + self.o1_speed * secs(self.contact_ms);
        let after = t - self.contact_ms;
        match self.condition.collision_type() {
            CollisionType::Overtaking => (
                o1_base + self.o1_speed * secs(t),
                o2_base + O2_SPEED * secs(t),
            ),
            CollisionType::TrueCausal => (meet, meet + self.o1_speed * secs(after)),
            CollisionType::FakeCausal => {
                let moving = after.saturating_sub(FAKE_CAUSAL_PAUSE_MS);
                (meet, meet + self.o1_speed * secs(moving))
            }
        }
    }

    fn in_window(t: u64, onset: u64) -> bool {
        t >= onset && t - onset < CHANGE_DURATION_MS
    }

    /// Letter (if any) each object shows at `t`
    fn letters_at(&self, t: u64) -> (Option<char>, Option<char>) {
        let mut shown = (None, None);
        if let Some(t1) = self.t1_letter {
            if Self::in_window(t, self.contact_ms) {
                shown.0 = Some(t1);
            }
        }
        if Self::in_window(t, self.t2_time) {
            match self.condition.which_changes().t2_object() {
                ObjectId::O1 => shown.0 = Some(self.t2_letter),
                ObjectId::O2 => shown.1 = Some(self.t2_letter),
            }
        }
        shown
    }
}

impl StimulusAdapter for OrbitStimulus {
    fn update(&mut self, elapsed_ms: u64) -> Result<(), StimulusError> {
        let (p1, p2) = self.positions(elapsed_ms);
        if !p1.is_finite() || !p2.is_finite() {
            return Err(StimulusError::Corrupted(format!(
                "non-finite track position at {elapsed_ms} ms"
            )));
        }
        (self.o1.x, self.o1.y) = track_point(p1);
        (self.o2.x, self.o2.y) = track_point(p2);

        let slot = ((elapsed_ms / DIGIT_INTERVAL_MS) as usize).min(self.digits.len() - 1);
        let [d1, d2] = self.digits[slot];
        let (l1, l2) = self.letters_at(elapsed_ms);
        self.o1.text = l1.unwrap_or(d1).to_string();
        self.o2.text = l2.unwrap_or(d2).to_string();
        Ok(())
    }

    fn state(&self) -> StimulusState {
        self.state
    }

    fn begin_asking(&mut self) {
        self.state = StimulusState::Asking;
    }

    fn submit_response(&mut self, responses: &ResponsePair) -> Result<(), StimulusError> {
        if self.score.is_some() {
            return Err(StimulusError::AlreadySubmitted);
        }
        let hit = |given: Option<Response>, target: Option<char>| {
            matches!((given.and_then(|r| r.letter()), target), (Some(g), Some(t)) if g == t)
        };
        let score = u32::from(hit(responses.response1, self.t1_letter))
            + u32::from(hit(Some(responses.response2), Some(self.t2_letter)));
        self.score = Some(score);
        Ok(())
    }

    fn results(&self) -> StimulusResults {
        let two = self.t1_letter.is_some();
        StimulusResults {
            o1_start: Some(self.o1_start),
            o2_start: Some(self.o2_start),
            score: self.score,
            t1_value: self.t1_letter,
            t2_value: Some(self.t2_letter),
            t1_object: two.then_some(ObjectId::O1),
            t2_object: Some(self.condition.which_changes().t2_object()),
            attention_prompt: None,
            t1_time_ms: two.then_some(self.contact_ms),
            t2_time_ms: Some(self.t2_time),
        }
    }

    fn t2_time(&self) -> u64 {
        self.t2_time
    }

    fn change_duration(&self) -> u64 {
        CHANGE_DURATION_MS
    }

    fn burst(&self) -> Option<BurstWindow> {
        self.condition.burst().then_some(BurstWindow {
            start_ms: self.contact_ms,
            duration_ms: BURST_DURATION_MS,
        })
    }

    fn o1(&self) -> &ObjectTrace {
        &self.o1
    }

    fn o2(&self) -> &ObjectTrace {
        &self.o2
    }

    fn num_targets(&self) -> u8 {
        self.num_targets
    }
}

/// Builds `OrbitStimulus` values from a shared random source
#[derive(Debug, Clone)]
pub struct OrbitFactory<R: Rng> {
    rng: R,
}

impl<R: Rng> OrbitFactory<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> StimulusFactory for OrbitFactory<R> {
    type Stimulus = OrbitStimulus;

    fn build(&mut self, spec: &StimulusSpec) -> Result<OrbitStimulus, StimulusError> {
        OrbitStimulus::new(spec, &mut self.rng)
    }
}

use causex_core::{CollisionType, TrialCondition};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::ExperimentConfig;

/// Practice conditions; only the last one bursts.
pub const TRAINING_ARCHETYPES: [(CollisionType, bool); 4] = [
    (CollisionType::Overtaking, false),
    (CollisionType::FakeCausal, false),
    (CollisionType::TrueCausal, false),
    (CollisionType::TrueCausal, true),
];

/// Every lag × collision combination, `repetitions_per_condition` times, in
/// uniformly random order. The burst coin is thrown once per combination,
/// so all repetitions of a true-causal combination agree.
pub fn generate_block_trials<R: Rng + ?Sized>(
    rng: &mut R,
    config: &ExperimentConfig,
) -> Vec<TrialCondition> {
    let mut trials = Vec::with_capacity(config.block_trial_count());
    for &lag in &config.lags_ms {
        for collision in CollisionType::ALL {
            let burst = collision == CollisionType::TrueCausal
                && rng.random_bool(config.burst_probability);
            let condition = TrialCondition::new(collision, lag, burst);
            trials.extend(std::iter::repeat_n(condition, config.repetitions_per_condition));
        }
    }
    trials.shuffle(rng);
    trials
}

/// Practice list: archetype and lag are drawn independently, with
/// replacement, for every trial.
pub fn generate_training_trials<R: Rng + ?Sized>(
    rng: &mut R,
    config: &ExperimentConfig,
) -> Vec<TrialCondition> {
    (0..config.training_trials)
        .map(|_| {
            let (collision, burst) =
                TRAINING_ARCHETYPES[rng.random_range(0..TRAINING_ARCHETYPES.len())];
            let lag = config.lags_ms[rng.random_range(0..config.lags_ms.len())];
            TrialCondition::new(collision, lag, burst)
        })
        .collect()
}

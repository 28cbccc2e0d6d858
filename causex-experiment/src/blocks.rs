use causex_core::{Rgba, TrialCondition, BLUE, GREEN};
use rand::Rng;

use crate::config::ExperimentConfig;
use crate::trials::{generate_block_trials, generate_training_trials};

/// Color assignment and target count of the four main blocks, in
/// canonical (1-based) order.
pub const BLOCK_COMBINATIONS: [(Rgba, Rgba, u8); 4] = [
    (GREEN, BLUE, 2),
    (BLUE, GREEN, 2),
    (GREEN, BLUE, 1),
    (BLUE, GREEN, 1),
];

#[derive(Debug, Clone, PartialEq)]
pub struct BlockConfig {
    pub o1_color: Rgba,
    pub o2_color: Rgba,
    pub num_targets: u8,
    /// 1-based position in `BLOCK_COMBINATIONS`
    pub combination: usize,
    trials: Vec<TrialCondition>,
}

impl BlockConfig {
    pub fn new(combination: usize, trials: Vec<TrialCondition>) -> Self {
        let (o1_color, o2_color, num_targets) = BLOCK_COMBINATIONS[combination - 1];
        Self {
            o1_color,
            o2_color,
            num_targets,
            combination,
            trials,
        }
    }

    pub fn trials(&self) -> &[TrialCondition] {
        &self.trials
    }
}

/// Builds the four blocks and orders them. Only the pairs (1,2) and (3,4)
/// are ever swapped, each on its own coin flip; the pairs themselves stay
/// in place.
pub fn plan_blocks<R: Rng + ?Sized>(rng: &mut R, config: &ExperimentConfig) -> Vec<BlockConfig> {
    let mut blocks: Vec<BlockConfig> = (1..=BLOCK_COMBINATIONS.len())
        .map(|combination| BlockConfig::new(combination, generate_block_trials(rng, config)))
        .collect();
    if rng.random_bool(0.5) {
        blocks.swap(0, 1);
    }
    if rng.random_bool(0.5) {
        blocks.swap(2, 3);
    }
    blocks
}

/// The frozen trial structure of one session
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentPlan {
    training: Vec<TrialCondition>,
    blocks: Vec<BlockConfig>,
}

impl ExperimentPlan {
    pub fn new(training: Vec<TrialCondition>, blocks: Vec<BlockConfig>) -> Self {
        Self { training, blocks }
    }

    pub fn generate<R: Rng + ?Sized>(config: &ExperimentConfig, rng: &mut R) -> Self {
        let training = generate_training_trials(rng, config);
        let blocks = plan_blocks(rng, config);
        Self::new(training, blocks)
    }

    pub fn training(&self) -> &[TrialCondition] {
        &self.training
    }

    pub fn blocks(&self) -> &[BlockConfig] {
        &self.blocks
    }

    /// 1-based block lookup
    pub fn block(&self, number: usize) -> Option<&BlockConfig> {
        number.checked_sub(1).and_then(|i| self.blocks.get(i))
    }

    pub fn block_order(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.combination).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    const ALLOWED: [[usize; 4]; 4] = [[1, 2, 3, 4], [1, 2, 4, 3], [2, 1, 3, 4], [2, 1, 4, 3]];

    fn small_config() -> ExperimentConfig {
        ExperimentConfig {
            repetitions_per_condition: 1,
            ..Default::default()
        }
    }

    #[test]
    fn orders_stay_within_pairs() {
        let config = small_config();
        let mut seen = HashSet::new();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let order = ExperimentPlan::generate(&config, &mut rng).block_order();
            assert!(ALLOWED.iter().any(|a| a[..] == order[..]), "{order:?}");
            seen.insert(order);
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn blocks_cover_every_combination() {
        let mut rng = StdRng::seed_from_u64(3);
        let blocks = plan_blocks(&mut rng, &ExperimentConfig::default());
        assert_eq!(blocks.len(), 4);
        for (combination, (o1, o2, n)) in BLOCK_COMBINATIONS.iter().enumerate() {
            let block = blocks
                .iter()
                .find(|b| b.combination == combination + 1)
                .unwrap();
            assert_eq!((block.o1_color, block.o2_color, block.num_targets), (*o1, *o2, *n));
            assert_eq!(block.trials().len(), 120);
        }
    }

    #[test]
    fn block_lookup_is_one_based() {
        let mut rng = StdRng::seed_from_u64(5);
        let plan = ExperimentPlan::generate(&small_config(), &mut rng);
        assert!(plan.block(0).is_none());
        assert_eq!(plan.block(1), plan.blocks().first());
        assert!(plan.block(5).is_none());
        assert_eq!(plan.training().len(), 20);
    }
}

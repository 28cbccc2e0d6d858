pub mod blocks;
pub mod config;
pub mod orbit;
pub mod response;
pub mod results;
pub mod screens;
pub mod state;
pub mod trial;
pub mod trials;

pub use blocks::{plan_blocks, BlockConfig, ExperimentPlan};
pub use config::{ExperimentConfig, POST_DISPLAY_GRACE_MS};
pub use orbit::{OrbitFactory, OrbitStimulus};
pub use response::{CollectorOutcome, ResponseCollector};
pub use results::{ExportOutcome, ResultsLog, CSV_HEADER, CSV_VALUE_ENCODING};
pub use state::{ExperimentEvent, ExperimentStateMachine};
pub use trial::Trial;
pub use trials::{generate_block_trials, generate_training_trials};

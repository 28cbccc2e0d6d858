pub mod error;
pub mod input;
pub mod phase;
pub mod scene;
pub mod stimulus;
pub mod trial;

pub use error::{ConfigError, ExperimentError, ExportError, StimulusError};
pub use input::Key;
pub use phase::{Phase, Screen};
pub use scene::{Scene, TextScreen, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use stimulus::{
    BurstWindow, ObjectId, ObjectTrace, Rgba, StimulusAdapter, StimulusFactory, StimulusResults,
    StimulusSpec, StimulusState, BLUE, GREEN, WHITE,
};
pub use trial::{
    BlockLabel, CollisionType, ResultRecord, Response, ResponsePair, TrialCondition, WhichChanges,
};

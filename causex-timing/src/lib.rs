pub mod pacer;
pub mod timer;

pub use pacer::FramePacer;
pub use timer::{CalibrationStats, HighPrecisionTimer, ManualTimer, Timer};

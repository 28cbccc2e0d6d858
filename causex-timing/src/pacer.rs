use std::time::Duration;

use crate::timer::Timer;

/// Holds the tick loop at a fixed rate by sleeping out whatever is left of
/// each frame budget. Late frames are recorded as-is and never made up.
#[derive(Debug, Clone)]
pub struct FramePacer<T: Timer<Timestamp = u64>> {
    timer: T,
    frame_ns: u64,
    frame_start: u64,
}

impl<T: Timer<Timestamp = u64>> FramePacer<T> {
    pub fn new(timer: T, rate_hz: u32) -> Self {
        let frame_start = timer.now();
        Self {
            timer,
            frame_ns: 1_000_000_000 / u64::from(rate_hz.max(1)),
            frame_start,
        }
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_nanos(self.frame_ns)
    }

    /// Sleeps until the current frame's budget is used up, then starts the
    /// next frame. Returns how long the finished frame actually took.
    pub fn wait_next(&mut self) -> Duration {
        let spent = self.timer.elapsed(self.frame_start);
        let budget = self.frame_budget();
        if spent < budget {
            self.timer.sleep(budget - spent);
        }
        let frame = self.timer.elapsed(self.frame_start);
        self.timer.record_frame(frame);
        self.frame_start = self.timer.now();
        frame
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

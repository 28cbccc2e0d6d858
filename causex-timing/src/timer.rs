use std::time::{Duration, Instant};

/// Monotonic clock the session reads trial time from
pub trait Timer: Clone {
    type Timestamp: Copy + Clone;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&mut self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn calibration_stats(&self) -> CalibrationStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl CalibrationStats {
    fn from_frames(frames: &[Duration]) -> Self {
        if frames.is_empty() {
            return Self::default();
        }
        let times: Vec<f64> = frames.iter().map(|d| d.as_nanos() as f64).collect();
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        CalibrationStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

/// Bounded ring of recent frame durations
#[derive(Debug, Clone)]
struct FrameLog {
    frames: Vec<Duration>,
    max_samples: usize,
}

impl FrameLog {
    fn new(max_samples: usize) -> Self {
        Self {
            frames: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    fn push(&mut self, d: Duration) {
        if self.frames.len() >= self.max_samples {
            self.frames.remove(0);
        }
        self.frames.push(d);
    }
}

/// Wall clock with platform-specific precise sleeps
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
    frames: FrameLog,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&mut self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_frame(&mut self, d: Duration) {
        self.frames.push(d);
    }
    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_frames(&self.frames.frames)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frames: FrameLog::new(1000),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        self.hybrid_sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn hybrid_sleep(&self, duration: Duration) {
        // thread::sleep overshoots below this, so the tail is spun
        const SPIN_THRESHOLD: Duration = Duration::from_micros(500);
        let deadline = Instant::now() + duration;
        if duration > SPIN_THRESHOLD {
            std::thread::sleep(duration - SPIN_THRESHOLD);
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock that only moves when told to. Sleeping advances it instantly,
/// so pacing code runs unchanged against it.
#[derive(Debug, Clone)]
pub struct ManualTimer {
    now_ns: u64,
    frames: FrameLog,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self {
            now_ns: 0,
            frames: FrameLog::new(1000),
        }
    }

    pub fn advance(&mut self, d: Duration) {
        self.now_ns += d.as_nanos() as u64;
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ManualTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.now_ns
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now_ns.saturating_sub(ts))
    }
    fn sleep(&mut self, d: Duration) {
        self.advance(d);
    }
    fn record_frame(&mut self, d: Duration) {
        self.frames.push(d);
    }
    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_frames(&self.frames.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_timer_moves_only_when_advanced() {
        let mut t = ManualTimer::new();
        let start = t.now();
        assert_eq!(t.elapsed(start), Duration::ZERO);
        t.advance_ms(250);
        assert_eq!(t.elapsed(start), Duration::from_millis(250));
        t.sleep(Duration::from_millis(50));
        assert_eq!(t.now(), 300_000_000);
    }

    #[test]
    fn elapsed_saturates_for_future_timestamps() {
        let t = ManualTimer::new();
        assert_eq!(t.elapsed(5_000), Duration::ZERO);
    }

    #[test]
    fn stats_of_uniform_frames() {
        let mut t = ManualTimer::new();
        for _ in 0..10 {
            t.record_frame(Duration::from_micros(31_250));
        }
        let stats = t.calibration_stats();
        assert!((stats.effective_fps - 32.0).abs() < 1e-6);
        assert_eq!(stats.jitter_ns, 0.0);
        assert_eq!(stats.min_frame_time_ns, stats.max_frame_time_ns);
    }

    #[test]
    fn stats_empty_is_zeroed() {
        assert_eq!(
            HighPrecisionTimer::new().calibration_stats(),
            CalibrationStats::default()
        );
    }

    #[test]
    fn frame_log_is_bounded() {
        let mut log = FrameLog::new(3);
        for ms in 1..=5 {
            log.push(Duration::from_millis(ms));
        }
        assert_eq!(
            log.frames,
            vec![
                Duration::from_millis(3),
                Duration::from_millis(4),
                Duration::from_millis(5)
            ]
        );
    }

    #[test]
    fn high_precision_sleep_waits_at_least_requested() {
        let t = HighPrecisionTimer::new();
        let before = Instant::now();
        t.high_precision_sleep(Duration::from_millis(2));
        assert!(before.elapsed() >= Duration::from_millis(2));
    }
}

use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic count of ticks delivered by the runtime.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Delta time is clamped so a debugger pause or a minimized window does not
/// produce a pathological frame time.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Average frame rate over a reporting interval.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FpsReport {
    pub frames: u32,
    pub avg_fps: f32,
    pub avg_frame_ms: f32,
}

/// Accumulates frame times and yields one `FpsReport` per elapsed interval.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    interval: f32,
    elapsed: f32,
    frames: u32,
}

impl FpsCounter {
    /// `interval` is in seconds and must be positive.
    pub fn new(interval: f32) -> Self {
        debug_assert!(interval > 0.0);
        Self {
            interval,
            elapsed: 0.0,
            frames: 0,
        }
    }

    /// Records one frame; returns a report once `interval` seconds have accumulated.
    pub fn record(&mut self, time: &FrameTime) -> Option<FpsReport> {
        self.elapsed += time.dt;
        self.frames += 1;

        if self.elapsed < self.interval {
            return None;
        }

        let report = FpsReport {
            frames: self.frames,
            avg_fps: self.frames as f32 / self.elapsed,
            avg_frame_ms: self.elapsed * 1000.0 / self.frames as f32,
        };
        self.elapsed = 0.0;
        self.frames = 0;
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ft(dt: f32) -> FrameTime {
        FrameTime {
            dt,
            now: Instant::now(),
            frame_index: 0,
        }
    }

    #[test]
    fn tick_counts_frames() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick().frame_index, 0);
        assert_eq!(clock.tick().frame_index, 1);
        assert_eq!(clock.tick().frame_index, 2);
    }

    #[test]
    fn tick_dt_is_clamped() {
        let mut clock =
            FrameClock::with_clamps(Duration::from_millis(5), Duration::from_millis(10));
        let dt = clock.tick().dt;
        assert!((0.005..=0.010).contains(&dt), "dt = {dt}");
    }

    // ── fps counter ───────────────────────────────────────────────────────

    #[test]
    fn fps_counter_waits_for_interval() {
        let mut c = FpsCounter::new(1.0);
        for _ in 0..9 {
            assert!(c.record(&ft(0.1)).is_none());
        }
        let r = c.record(&ft(0.1001)).unwrap();
        assert_eq!(r.frames, 10);
        assert!((r.avg_fps - 10.0).abs() < 0.01);
        assert!((r.avg_frame_ms - 100.0).abs() < 0.1);
    }

    #[test]
    fn fps_counter_resets_after_report() {
        let mut c = FpsCounter::new(0.5);
        assert!(c.record(&ft(0.6)).is_some());
        assert!(c.record(&ft(0.1)).is_none());
    }
}

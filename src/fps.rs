//! Frame timing: the frames-per-second readout and the frame budget.

use instant::Duration;

/// Frame rate the loop aims for unless a flow configures another one.
pub const DEFAULT_TARGET_FPS: u32 = 60;

/// Time between two frames at `target_fps`. Zero means "as fast as possible".
pub fn frame_budget(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs(1) / target_fps
    }
}

/// Counts frames and publishes their average rate once per second.
#[derive(Debug, Default, Clone)]
pub struct FpsCounter {
    frames: u32,
    elapsed: Duration,
    current: u32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame that took `dt`. Returns `true` when the published
    /// value was refreshed.
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed < Duration::from_secs(1) {
            return false;
        }
        self.current = (self.frames as f64 / self.elapsed.as_secs_f64()).round() as u32;
        self.frames = 0;
        self.elapsed = Duration::ZERO;
        true
    }

    /// Average frames per second over the last full window.
    pub fn fps(&self) -> u32 {
        self.current
    }
}

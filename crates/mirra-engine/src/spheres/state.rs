use super::shader::VsParams;
use super::{ROT_X_STEP, ROT_Y_STEP};

/// `(write, read)` render-target indices for frame `frame_index`.
///
/// `write = n % 2`, `read = (n + 1) % 2`; they always differ.
#[inline]
pub fn ping_pong_indices(frame_index: u64) -> (usize, usize) {
    let write = (frame_index % 2) as usize;
    // (n + 1) % 2 without overflowing at u64::MAX
    (write, write ^ 1)
}

/// Mutable per-session state owned by the scheduler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameState {
    /// Radians; grows by [`ROT_X_STEP`] per frame, never wrapped.
    pub angle_x: f32,
    /// Radians; grows by [`ROT_Y_STEP`] per frame, never wrapped.
    pub angle_y: f32,
    /// Rendered frames so far. Only its parity is used.
    pub frame_index: u64,
    /// Last uniform value pushed, overwritten by every pass.
    pub vs_params: VsParams,
}

impl FrameState {
    /// Advances the angles and the frame counter by one frame.
    pub fn step(&mut self) {
        self.angle_y += ROT_Y_STEP;
        self.angle_x += ROT_X_STEP;
        self.frame_index += 1;
    }

    pub fn indices(&self) -> (usize, usize) {
        ping_pong_indices(self.frame_index)
    }
}

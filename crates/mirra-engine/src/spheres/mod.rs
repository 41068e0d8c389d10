//! The infinite-spheres effect.
//!
//! Two offscreen render targets alternate roles each frame: one is drawn
//! into while the other, holding the previous frame, is sampled as the
//! sphere's texture. The freshly written target is then shown on screen.

mod scheduler;
mod setup;
mod shader;
mod state;

use glam::Vec3;

pub use scheduler::InfiniteSpheres;
pub use setup::{SphereResources, render_target_desc};
pub use shader::{FS_TEXTURE_SLOT, VsParams, main_shader};
pub use state::{FrameState, ping_pong_indices};

/// Square size of both ping-pong render targets.
pub const RENDER_TARGET_SIZE: u32 = 512;

pub const SPHERE_RADIUS: f32 = 0.75;
pub const SPHERE_SLICES: u32 = 72;
pub const SPHERE_STACKS: u32 = 40;

/// Fixed sphere position in view space.
pub const SPHERE_POSITION: Vec3 = Vec3::new(0.0, 0.0, -2.0);

/// Per-frame rotation about X, radians. Twice the Y rate.
pub const ROT_X_STEP: f32 = 0.02;
/// Per-frame rotation about Y, radians.
pub const ROT_Y_STEP: f32 = 0.01;

pub const OFFSCREEN_CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const DISPLAY_CLEAR_COLOR: [f32; 4] = [0.25, 0.25, 0.25, 1.0];

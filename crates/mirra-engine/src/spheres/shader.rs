use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::gfx::ShaderDesc;

/// Texture slot the fragment stage samples the previous frame from.
pub const FS_TEXTURE_SLOT: u32 = 0;

/// Vertex-stage uniform block. Must match `VsParams` in `main.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct VsParams {
    pub model_view_projection: Mat4,
}

impl Default for VsParams {
    fn default() -> Self {
        Self {
            model_view_projection: Mat4::IDENTITY,
        }
    }
}

impl VsParams {
    pub fn new(model_view_projection: Mat4) -> Self {
        Self {
            model_view_projection,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// The single shader used by both passes.
pub fn main_shader() -> ShaderDesc {
    ShaderDesc {
        label: "mirra spheres shader",
        source: include_str!("shaders/main.wgsl"),
        vs_entry: "vs_main",
        fs_entry: "fs_main",
        uniform_block_size: std::mem::size_of::<VsParams>() as u64,
        texture_slots: 1,
    }
}

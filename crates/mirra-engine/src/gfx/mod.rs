//! Narrow graphics interface and its backends.

mod api;
mod desc;
mod id;
mod pass;
mod pool;
mod wgpu_gfx;

#[cfg(test)]
pub(crate) mod recording;

pub use api::Gfx;
pub use desc::{
    BlendDesc, ClearState, DepthStencilDesc, DisplayAttrs, DrawStateDesc, FrameStatus, PassTarget,
    RasterizerDesc, RenderTargetDesc, ShaderDesc, TextureBlockDesc,
};
pub use id::{Id, ResourceKind};
pub use wgpu_gfx::{MAX_UNIFORM_BLOCK_SIZE, WgpuGfx};

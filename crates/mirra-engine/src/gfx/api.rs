use anyhow::Result;

use super::{
    ClearState, DisplayAttrs, DrawStateDesc, FrameStatus, Id, PassTarget, RenderTargetDesc,
    ShaderDesc, TextureBlockDesc,
};
use crate::shape::MeshData;

/// Narrow graphics interface.
///
/// A frame is `begin_frame`, then one or more passes, then `commit_frame`.
/// A pass is `apply_render_target` followed by bindings and draws. Every
/// draw needs a draw state, a uniform block and a texture block applied
/// in the current pass, and the bound textures must not include the
/// pass's own destination.
pub trait Gfx {
    fn display_attrs(&self) -> DisplayAttrs;

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<Id>;
    fn create_mesh(&mut self, data: &MeshData) -> Result<Id>;
    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<Id>;
    fn create_draw_state(&mut self, desc: &DrawStateDesc) -> Result<Id>;
    fn create_texture_block(&mut self, desc: &TextureBlockDesc) -> Result<Id>;

    fn begin_frame(&mut self) -> Result<FrameStatus>;
    fn apply_render_target(&mut self, target: PassTarget, clear: &ClearState) -> Result<()>;
    fn apply_draw_state(&mut self, draw_state: Id) -> Result<()>;
    fn apply_uniform_block(&mut self, data: &[u8]) -> Result<()>;
    fn apply_texture_block(&mut self, texture_block: Id) -> Result<()>;
    fn draw(&mut self, primitive_group: usize) -> Result<()>;
    fn commit_frame(&mut self) -> Result<()>;

    /// Releases every resource. Idempotent; later calls are ignored.
    fn discard(&mut self);
    fn is_discarded(&self) -> bool;
}

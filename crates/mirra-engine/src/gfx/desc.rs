use wgpu::{AddressMode, CompareFunction, Face, FilterMode, TextureFormat};

use super::Id;

/// Offscreen color (+ optional depth) texture that can later be sampled.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDesc {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub wrap_u: AddressMode,
    pub wrap_v: AddressMode,
}

impl RenderTargetDesc {
    pub fn new(label: &'static str, width: u32, height: u32) -> Self {
        Self {
            label,
            width,
            height,
            color_format: TextureFormat::Rgba8Unorm,
            depth_format: None,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            wrap_u: AddressMode::ClampToEdge,
            wrap_v: AddressMode::ClampToEdge,
        }
    }

    pub(crate) fn attrs(&self) -> TargetAttrs {
        TargetAttrs {
            color_format: self.color_format,
            depth_format: self.depth_format,
            sample_count: 1,
        }
    }
}

/// WGSL program plus the resource layout it expects.
///
/// Group 0 binding 0 is a uniform block read by the vertex stage with a
/// dynamic offset. Group 1 holds `texture_slots` texture/sampler pairs at
/// bindings `2 * slot` and `2 * slot + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDesc {
    pub label: &'static str,
    pub source: &'static str,
    pub vs_entry: &'static str,
    pub fs_entry: &'static str,
    pub uniform_block_size: u64,
    pub texture_slots: u32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DepthStencilDesc {
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_write_enabled: false,
            depth_compare: CompareFunction::Always,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RasterizerDesc {
    pub cull_mode: Option<Face>,
    pub sample_count: u32,
}

impl Default for RasterizerDesc {
    fn default() -> Self {
        Self {
            cull_mode: None,
            sample_count: 1,
        }
    }
}

/// Output formats the pipeline renders into.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlendDesc {
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
}

impl Default for BlendDesc {
    fn default() -> Self {
        Self {
            color_format: TextureFormat::Rgba8Unorm,
            depth_format: None,
        }
    }
}

/// Pipeline configuration binding a mesh to a shader.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawStateDesc {
    pub label: &'static str,
    pub mesh: Id,
    pub shader: Id,
    pub depth_stencil: DepthStencilDesc,
    pub rasterizer: RasterizerDesc,
    pub blend: BlendDesc,
}

impl DrawStateDesc {
    pub fn from_mesh_and_shader(label: &'static str, mesh: Id, shader: Id) -> Self {
        Self {
            label,
            mesh,
            shader,
            depth_stencil: DepthStencilDesc::default(),
            rasterizer: RasterizerDesc::default(),
            blend: BlendDesc::default(),
        }
    }

    /// Targets the formats and sample count of an offscreen render target.
    pub fn targeting(mut self, rt: &RenderTargetDesc) -> Self {
        self.blend.color_format = rt.color_format;
        self.blend.depth_format = rt.depth_format;
        self.rasterizer.sample_count = 1;
        self
    }

    /// Targets the window's default render target.
    pub fn targeting_display(mut self, display: &DisplayAttrs) -> Self {
        self.blend.color_format = display.color_format;
        self.blend.depth_format = Some(display.depth_format);
        self.rasterizer.sample_count = display.sample_count;
        self
    }

    pub(crate) fn attrs(&self) -> TargetAttrs {
        TargetAttrs {
            color_format: self.blend.color_format,
            depth_format: self.blend.depth_format,
            sample_count: self.rasterizer.sample_count,
        }
    }
}

/// Render targets bound to a shader's texture slots.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBlockDesc {
    pub label: &'static str,
    pub shader: Id,
    pub slots: Vec<(u32, Id)>,
}

impl TextureBlockDesc {
    pub fn new(label: &'static str, shader: Id) -> Self {
        Self {
            label,
            shader,
            slots: Vec::new(),
        }
    }

    pub fn with_slot(mut self, slot: u32, render_target: Id) -> Self {
        self.slots.push((slot, render_target));
        self
    }

    pub fn textures(&self) -> Vec<Id> {
        self.slots.iter().map(|&(_, id)| id).collect()
    }
}

/// What to clear when a pass begins; `None` keeps prior contents.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearState {
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
}

impl ClearState {
    pub const fn clear_all(color: [f32; 4]) -> Self {
        Self {
            color: Some(color),
            depth: Some(1.0),
        }
    }
}

impl Default for ClearState {
    fn default() -> Self {
        Self::clear_all([0.0, 0.0, 0.0, 1.0])
    }
}

/// Destination of a render pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassTarget {
    Offscreen(Id),
    /// The window's swapchain image.
    Default,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    Ready,
    /// No drawable this frame (minimized, surface lost); issue nothing.
    Skip,
}

/// Properties of the window's default render target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DisplayAttrs {
    pub framebuffer_width: u32,
    pub framebuffer_height: u32,
    pub color_format: TextureFormat,
    pub depth_format: TextureFormat,
    pub sample_count: u32,
}

impl DisplayAttrs {
    pub(crate) fn attrs(&self) -> TargetAttrs {
        TargetAttrs {
            color_format: self.color_format,
            depth_format: Some(self.depth_format),
            sample_count: self.sample_count,
        }
    }
}

/// Attachment configuration a pipeline must agree with.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct TargetAttrs {
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
    pub sample_count: u32,
}

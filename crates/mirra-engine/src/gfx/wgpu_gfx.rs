use std::num::NonZeroU64;

use anyhow::{Context, Result, bail, ensure};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use super::desc::TargetAttrs;
use super::pass::PassTracker;
use super::pool::ResourcePool;
use super::{
    ClearState, DisplayAttrs, DrawStateDesc, FrameStatus, Gfx, Id, PassTarget, RenderTargetDesc,
    ResourceKind, ShaderDesc, TextureBlockDesc,
};
use crate::device::{DISPLAY_DEPTH_FORMAT, Gpu, GpuFrame};
use crate::shape::{MeshData, PrimitiveGroup, ShapeVertex};

/// Largest uniform block a shader may declare.
pub const MAX_UNIFORM_BLOCK_SIZE: u64 = 256;

/// Uniform uploads allowed between `begin_frame` and `commit_frame`.
const UNIFORM_SLOTS_PER_FRAME: u32 = 16;

const SHAPE_VERTEX_ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Snorm8x4,
    2 => Float32x2,
];

fn shape_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<ShapeVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &SHAPE_VERTEX_ATTRS,
    }
}

struct GpuRenderTarget {
    desc: RenderTargetDesc,
    color_view: wgpu::TextureView,
    depth_view: Option<wgpu::TextureView>,
    sampler: wgpu::Sampler,
}

struct GpuMesh {
    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    groups: Vec<PrimitiveGroup>,
}

struct GpuShader {
    desc: ShaderDesc,
    module: wgpu::ShaderModule,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_bind_group: wgpu::BindGroup,
}

struct GpuDrawState {
    pipeline: wgpu::RenderPipeline,
    mesh: Id,
    shader: Id,
    attrs: TargetAttrs,
}

struct GpuTextureBlock {
    bind_group: wgpu::BindGroup,
    shader: Id,
    textures: Vec<Id>,
}

/// MSAA color and depth attachments of the default framebuffer.
struct DisplayAttachments {
    msaa_color: Option<wgpu::TextureView>,
    depth: wgpu::TextureView,
    size: PhysicalSize<u32>,
}

impl DisplayAttachments {
    fn new(gpu: &Gpu<'_>) -> Self {
        let size = gpu.size();
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let samples = gpu.sample_count();
        let make = |label: &'static str, format: wgpu::TextureFormat| {
            gpu.device()
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: extent,
                    mip_level_count: 1,
                    sample_count: samples,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        };
        Self {
            msaa_color: (samples > 1).then(|| make("mirra display msaa color", gpu.surface_format())),
            depth: make("mirra display depth", DISPLAY_DEPTH_FORMAT),
            size,
        }
    }
}

/// Per-frame ring of dynamic-offset uniform slots.
///
/// Every upload in a frame lands in its own slot, so passes encoded into
/// the same command buffer see their own values.
struct UniformRing {
    buffer: wgpu::Buffer,
    stride: u32,
    cursor: u32,
}

impl UniformRing {
    fn new(device: &wgpu::Device) -> Self {
        let align = device.limits().min_uniform_buffer_offset_alignment.max(1);
        let stride = (MAX_UNIFORM_BLOCK_SIZE as u32).div_ceil(align) * align;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mirra uniform ring"),
            size: u64::from(stride) * u64::from(UNIFORM_SLOTS_PER_FRAME),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            stride,
            cursor: 0,
        }
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn push(&mut self, queue: &wgpu::Queue, data: &[u8]) -> Result<u32> {
        ensure!(
            data.len() as u64 <= MAX_UNIFORM_BLOCK_SIZE,
            "uniform block of {} bytes exceeds {MAX_UNIFORM_BLOCK_SIZE}",
            data.len()
        );
        ensure!(
            self.cursor < UNIFORM_SLOTS_PER_FRAME,
            "more than {UNIFORM_SLOTS_PER_FRAME} uniform uploads in one frame"
        );
        let offset = self.cursor * self.stride;
        queue.write_buffer(&self.buffer, u64::from(offset), data);
        self.cursor += 1;
        Ok(offset)
    }
}

struct RecordedDraw {
    draw_state: Id,
    texture_block: Id,
    uniform_offset: u32,
    group: PrimitiveGroup,
}

struct RecordedPass {
    target: PassTarget,
    clear: ClearState,
    draws: Vec<RecordedDraw>,
}

struct FrameRecording {
    frame: GpuFrame,
    passes: Vec<RecordedPass>,
    uniform_offset: Option<u32>,
}

/// [`Gfx`] on top of wgpu.
///
/// Passes are recorded as plain data and encoded in order into the frame's
/// single command encoder at `commit_frame`.
pub struct WgpuGfx<'w> {
    gpu: Gpu<'w>,
    render_targets: ResourcePool<GpuRenderTarget>,
    meshes: ResourcePool<GpuMesh>,
    shaders: ResourcePool<GpuShader>,
    draw_states: ResourcePool<GpuDrawState>,
    texture_blocks: ResourcePool<GpuTextureBlock>,
    uniform_layout: wgpu::BindGroupLayout,
    uniforms: UniformRing,
    display: Option<DisplayAttachments>,
    tracker: PassTracker,
    frame: Option<FrameRecording>,
}

impl<'w> WgpuGfx<'w> {
    pub fn new(gpu: Gpu<'w>) -> Result<Self> {
        let device = gpu.device();
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mirra uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(MAX_UNIFORM_BLOCK_SIZE),
                },
                count: None,
            }],
        });
        let uniforms = UniformRing::new(device);
        let display = DisplayAttachments::new(&gpu);

        Ok(Self {
            gpu,
            render_targets: ResourcePool::new(ResourceKind::RenderTarget),
            meshes: ResourcePool::new(ResourceKind::Mesh),
            shaders: ResourcePool::new(ResourceKind::Shader),
            draw_states: ResourcePool::new(ResourceKind::DrawState),
            texture_blocks: ResourcePool::new(ResourceKind::TextureBlock),
            uniform_layout,
            uniforms,
            display: Some(display),
            tracker: PassTracker::default(),
            frame: None,
        })
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    /// Reconfigures the swapchain and recreates the display attachments.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        if self.gpu.is_zero_sized() || self.display.is_none() {
            return;
        }
        if self.display.as_ref().is_some_and(|d| d.size != self.gpu.size()) {
            self.display = Some(DisplayAttachments::new(&self.gpu));
        }
    }

    fn ensure_live(&self) -> Result<()> {
        ensure!(self.display.is_some(), "graphics context already discarded");
        Ok(())
    }

    fn recording(&mut self) -> Result<&mut FrameRecording> {
        self.frame
            .as_mut()
            .context("no frame in progress; call begin_frame first")
    }

    fn fail_frame(&mut self, err: anyhow::Error) -> anyhow::Error {
        self.frame = None;
        self.tracker.abort_frame();
        err
    }

    /// Runs a per-frame operation; any error abandons the frame.
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let res = op(self);
        res.map_err(|e| self.fail_frame(e))
    }

    /// Clears a freshly created render target so its first read is defined.
    fn clear_render_target(&self, rt: &GpuRenderTarget) {
        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("mirra render target init"),
            });
        {
            let clear = ClearState::default();
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(rt.desc.label),
                color_attachments: &[Some(color_attachment(&rt.color_view, None, &clear))],
                depth_stencil_attachment: rt
                    .depth_view
                    .as_ref()
                    .map(|view| depth_attachment(view, &clear)),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        pass: &RecordedPass,
    ) -> Result<()> {
        let display = self.display.as_ref().context("display attachments released")?;
        let (color, resolve, depth) = match pass.target {
            PassTarget::Offscreen(id) => {
                let rt = self.render_targets.get(id)?;
                (&rt.color_view, None, rt.depth_view.as_ref())
            }
            PassTarget::Default => match display.msaa_color.as_ref() {
                Some(msaa) => (msaa, Some(surface_view), Some(&display.depth)),
                None => (surface_view, None, Some(&display.depth)),
            },
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("mirra pass"),
            color_attachments: &[Some(color_attachment(color, resolve, &pass.clear))],
            depth_stencil_attachment: depth.map(|view| depth_attachment(view, &pass.clear)),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for draw in &pass.draws {
            let ds = self.draw_states.get(draw.draw_state)?;
            let mesh = self.meshes.get(ds.mesh)?;
            let shader = self.shaders.get(ds.shader)?;
            let tb = self.texture_blocks.get(draw.texture_block)?;

            rpass.set_pipeline(&ds.pipeline);
            rpass.set_bind_group(0, &shader.uniform_bind_group, &[draw.uniform_offset]);
            rpass.set_bind_group(1, &tb.bind_group, &[]);
            rpass.set_vertex_buffer(0, mesh.vbo.slice(..));
            rpass.set_index_buffer(mesh.ibo.slice(..), wgpu::IndexFormat::Uint16);
            let first = draw.group.base_element;
            rpass.draw_indexed(first..first + draw.group.num_elements, 0, 0..1);
        }
        Ok(())
    }
}

fn color_attachment<'a>(
    view: &'a wgpu::TextureView,
    resolve_target: Option<&'a wgpu::TextureView>,
    clear: &ClearState,
) -> wgpu::RenderPassColorAttachment<'a> {
    let load = match clear.color {
        Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
            r: f64::from(r),
            g: f64::from(g),
            b: f64::from(b),
            a: f64::from(a),
        }),
        None => wgpu::LoadOp::Load,
    };
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target,
        ops: wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    }
}

fn depth_attachment<'a>(
    view: &'a wgpu::TextureView,
    clear: &ClearState,
) -> wgpu::RenderPassDepthStencilAttachment<'a> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: match clear.depth {
                Some(d) => wgpu::LoadOp::Clear(d),
                None => wgpu::LoadOp::Load,
            },
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

impl Gfx for WgpuGfx<'_> {
    fn display_attrs(&self) -> DisplayAttrs {
        let size = self.gpu.size();
        DisplayAttrs {
            framebuffer_width: size.width,
            framebuffer_height: size.height,
            color_format: self.gpu.surface_format(),
            depth_format: DISPLAY_DEPTH_FORMAT,
            sample_count: self.gpu.sample_count(),
        }
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<Id> {
        self.ensure_live()?;
        ensure!(
            desc.width > 0 && desc.height > 0,
            "render target '{}' has zero size",
            desc.label
        );
        let device = self.gpu.device();
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth_view = desc.depth_format.map(|format| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(desc.label),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(desc.label),
            address_mode_u: desc.wrap_u,
            address_mode_v: desc.wrap_v,
            mag_filter: desc.mag_filter,
            min_filter: desc.min_filter,
            ..Default::default()
        });

        let rt = GpuRenderTarget {
            desc: desc.clone(),
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view,
            sampler,
        };
        self.clear_render_target(&rt);
        let id = self.render_targets.insert(rt)?;
        log::debug!(
            "created {id} '{}' {}x{} {:?}/{:?}",
            desc.label,
            desc.width,
            desc.height,
            desc.color_format,
            desc.depth_format
        );
        Ok(id)
    }

    fn create_mesh(&mut self, data: &MeshData) -> Result<Id> {
        self.ensure_live()?;
        ensure!(
            !data.vertices.is_empty() && !data.indices.is_empty(),
            "mesh has no geometry"
        );
        let total = data.indices.len() as u64;
        for g in &data.primitive_groups {
            ensure!(
                u64::from(g.base_element) + u64::from(g.num_elements) <= total,
                "primitive group {g:?} exceeds {total} indices"
            );
        }
        let device = self.gpu.device();
        let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mirra mesh vbo"),
            contents: data.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mirra mesh ibo"),
            contents: data.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.meshes.insert(GpuMesh {
            vbo,
            ibo,
            groups: data.primitive_groups.clone(),
        })
    }

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<Id> {
        self.ensure_live()?;
        ensure!(
            desc.uniform_block_size > 0 && desc.uniform_block_size <= MAX_UNIFORM_BLOCK_SIZE,
            "shader '{}' uniform block size {} out of range",
            desc.label,
            desc.uniform_block_size
        );
        let device = self.gpu.device();
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..desc.texture_slots)
            .flat_map(|slot| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: slot * 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: slot * 2 + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(desc.label),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[&self.uniform_layout, &texture_layout],
            immediate_size: 0,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(desc.label),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &self.uniforms.buffer,
                    offset: 0,
                    size: NonZeroU64::new(MAX_UNIFORM_BLOCK_SIZE),
                }),
            }],
        });

        self.shaders.insert(GpuShader {
            desc: desc.clone(),
            module,
            texture_layout,
            pipeline_layout,
            uniform_bind_group,
        })
    }

    fn create_draw_state(&mut self, desc: &DrawStateDesc) -> Result<Id> {
        self.ensure_live()?;
        self.meshes.get(desc.mesh)?;
        let shader = self.shaders.get(desc.shader)?;
        let device = self.gpu.device();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&shader.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader.module,
                entry_point: Some(shader.desc.vs_entry),
                compilation_options: Default::default(),
                buffers: &[shape_vertex_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader.module,
                entry_point: Some(shader.desc.fs_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.blend.color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: desc.rasterizer.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: desc.blend.depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: desc.depth_stencil.depth_write_enabled,
                depth_compare: desc.depth_stencil.depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: desc.rasterizer.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        self.draw_states.insert(GpuDrawState {
            pipeline,
            mesh: desc.mesh,
            shader: desc.shader,
            attrs: desc.attrs(),
        })
    }

    fn create_texture_block(&mut self, desc: &TextureBlockDesc) -> Result<Id> {
        self.ensure_live()?;
        let shader = self.shaders.get(desc.shader)?;
        let slots = shader.desc.texture_slots;
        ensure!(
            desc.slots.len() == slots as usize,
            "texture block '{}' fills {} of {slots} slots",
            desc.label,
            desc.slots.len()
        );

        let mut bound = Vec::with_capacity(desc.slots.len());
        for slot in 0..slots {
            let Some(&(_, rt_id)) = desc.slots.iter().find(|(s, _)| *s == slot) else {
                bail!("texture block '{}' leaves slot {slot} empty", desc.label);
            };
            bound.push((slot, self.render_targets.get(rt_id)?));
        }
        let entries: Vec<wgpu::BindGroupEntry> = bound
            .iter()
            .flat_map(|(slot, rt)| {
                [
                    wgpu::BindGroupEntry {
                        binding: slot * 2,
                        resource: wgpu::BindingResource::TextureView(&rt.color_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot * 2 + 1,
                        resource: wgpu::BindingResource::Sampler(&rt.sampler),
                    },
                ]
            })
            .collect();
        let bind_group = self
            .gpu
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(desc.label),
                layout: &shader.texture_layout,
                entries: &entries,
            });

        self.texture_blocks.insert(GpuTextureBlock {
            bind_group,
            shader: desc.shader,
            textures: desc.textures(),
        })
    }

    fn begin_frame(&mut self) -> Result<FrameStatus> {
        self.ensure_live()?;
        ensure!(self.frame.is_none(), "begin_frame called twice without commit");
        if self.gpu.is_zero_sized() {
            return Ok(FrameStatus::Skip);
        }
        let frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                let msg = err.to_string();
                let action = self.gpu.handle_surface_error(err);
                if !action.is_recoverable() {
                    bail!("surface acquisition failed: {msg}");
                }
                log::debug!("skipping frame ({msg}, {action:?})");
                return Ok(FrameStatus::Skip);
            }
        };
        self.tracker.begin_frame()?;
        self.uniforms.reset();
        self.frame = Some(FrameRecording {
            frame,
            passes: Vec::new(),
            uniform_offset: None,
        });
        Ok(FrameStatus::Ready)
    }

    fn apply_render_target(&mut self, target: PassTarget, clear: &ClearState) -> Result<()> {
        self.guarded(|g| {
            let attrs = match target {
                PassTarget::Offscreen(id) => g.render_targets.get(id)?.desc.attrs(),
                PassTarget::Default => g.display_attrs().attrs(),
            };
            g.tracker.begin_pass(target, attrs)?;
            let rec = g.recording()?;
            rec.uniform_offset = None;
            rec.passes.push(RecordedPass {
                target,
                clear: *clear,
                draws: Vec::new(),
            });
            Ok(())
        })
    }

    fn apply_draw_state(&mut self, draw_state: Id) -> Result<()> {
        self.guarded(|g| {
            let ds = g.draw_states.get(draw_state)?;
            let groups = g.meshes.get(ds.mesh)?.groups.len();
            g.tracker.bind_draw_state(draw_state, ds.attrs, groups)
        })
    }

    fn apply_uniform_block(&mut self, data: &[u8]) -> Result<()> {
        self.guarded(|g| {
            g.recording()?;
            let offset = g.uniforms.push(g.gpu.queue(), data)?;
            g.tracker.bind_uniform()?;
            g.recording()?.uniform_offset = Some(offset);
            Ok(())
        })
    }

    fn apply_texture_block(&mut self, texture_block: Id) -> Result<()> {
        self.guarded(|g| {
            let textures = g.texture_blocks.get(texture_block)?.textures.clone();
            g.tracker.bind_texture_block(texture_block, textures)
        })
    }

    fn draw(&mut self, primitive_group: usize) -> Result<()> {
        self.guarded(|g| {
            let b = g.tracker.check_draw(primitive_group)?;
            let ds = g.draw_states.get(b.draw_state)?;
            let tb = g.texture_blocks.get(b.texture_block)?;
            ensure!(
                tb.shader == ds.shader,
                "{} was built for {}, draw state uses {}",
                b.texture_block,
                tb.shader,
                ds.shader
            );
            let group = g
                .meshes
                .get(ds.mesh)?
                .groups
                .get(primitive_group)
                .copied()
                .with_context(|| format!("primitive group {primitive_group} missing"))?;
            let rec = g.recording()?;
            let uniform_offset = rec.uniform_offset.context("uniform block not uploaded")?;
            let pass = rec.passes.last_mut().context("no pass recorded")?;
            pass.draws.push(RecordedDraw {
                draw_state: b.draw_state,
                texture_block: b.texture_block,
                uniform_offset,
                group,
            });
            Ok(())
        })
    }

    fn commit_frame(&mut self) -> Result<()> {
        let passes_expected = self.guarded(|g| g.tracker.end_frame())?;
        let Some(FrameRecording {
            mut frame, passes, ..
        }) = self.frame.take()
        else {
            bail!("commit_frame called without an acquired frame");
        };
        debug_assert_eq!(passes.len(), passes_expected as usize);
        for pass in &passes {
            self.encode_pass(&mut frame.encoder, &frame.view, pass)?;
        }
        self.gpu.submit(frame);
        log::trace!("committed frame with {} passes", passes.len());
        Ok(())
    }

    fn discard(&mut self) {
        if self.display.is_none() {
            log::warn!("graphics context discarded twice; ignoring");
            return;
        }
        self.frame = None;
        self.tracker.abort_frame();
        let released = self.texture_blocks.release_all()
            + self.draw_states.release_all()
            + self.shaders.release_all()
            + self.meshes.release_all()
            + self.render_targets.release_all();
        self.display = None;
        log::info!("released {released} graphics resources");
    }

    fn is_discarded(&self) -> bool {
        self.display.is_none()
    }
}

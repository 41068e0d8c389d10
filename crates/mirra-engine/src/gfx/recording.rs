//! In-memory [`Gfx`] that records calls for assertions.

use anyhow::{Result, bail, ensure};
use wgpu::TextureFormat;

use super::desc::TargetAttrs;
use super::pass::PassTracker;
use super::pool::ResourcePool;
use super::{
    ClearState, DisplayAttrs, DrawStateDesc, FrameStatus, Gfx, Id, PassTarget, RenderTargetDesc,
    ResourceKind, ShaderDesc, TextureBlockDesc,
};
use crate::core::QuitSignal;
use crate::shape::MeshData;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateRenderTarget(Id),
    CreateMesh(Id),
    CreateShader(Id),
    CreateDrawState(Id),
    CreateTextureBlock(Id),
    BeginFrame(FrameStatus),
    ApplyRenderTarget(PassTarget, ClearState),
    ApplyDrawState(Id),
    ApplyUniformBlock(Vec<u8>),
    ApplyTextureBlock(Id),
    Draw(usize),
    CommitFrame,
    Discard,
}

impl Call {
    fn name(&self) -> &'static str {
        match self {
            Call::CreateRenderTarget(_) => "create_render_target",
            Call::CreateMesh(_) => "create_mesh",
            Call::CreateShader(_) => "create_shader",
            Call::CreateDrawState(_) => "create_draw_state",
            Call::CreateTextureBlock(_) => "create_texture_block",
            Call::BeginFrame(_) => "begin_frame",
            Call::ApplyRenderTarget(..) => "apply_render_target",
            Call::ApplyDrawState(_) => "apply_draw_state",
            Call::ApplyUniformBlock(_) => "apply_uniform_block",
            Call::ApplyTextureBlock(_) => "apply_texture_block",
            Call::Draw(_) => "draw",
            Call::CommitFrame => "commit_frame",
            Call::Discard => "discard",
        }
    }
}

/// One committed pass as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PassRecord {
    pub(crate) target: PassTarget,
    pub(crate) draw_state: Id,
    pub(crate) texture_block: Id,
    pub(crate) uniform: Vec<u8>,
    pub(crate) draws: usize,
}

pub(crate) struct RecordingGfx {
    pub(crate) display: DisplayAttrs,
    pub(crate) calls: Vec<Call>,
    pub(crate) render_targets: ResourcePool<RenderTargetDesc>,
    pub(crate) meshes: ResourcePool<MeshData>,
    pub(crate) shaders: ResourcePool<ShaderDesc>,
    pub(crate) draw_states: ResourcePool<DrawStateDesc>,
    pub(crate) texture_blocks: ResourcePool<TextureBlockDesc>,
    tracker: PassTracker,
    fail_on: Option<(&'static str, usize)>,
    quit_on: Option<(&'static str, QuitSignal)>,
    skip_next: u32,
    discarded: bool,
}

impl RecordingGfx {
    pub(crate) fn new() -> Self {
        Self::with_display(800, 600, 4)
    }

    pub(crate) fn with_display(width: u32, height: u32, sample_count: u32) -> Self {
        Self {
            display: DisplayAttrs {
                framebuffer_width: width,
                framebuffer_height: height,
                color_format: TextureFormat::Bgra8UnormSrgb,
                depth_format: TextureFormat::Depth24Plus,
                sample_count,
            },
            calls: Vec::new(),
            render_targets: ResourcePool::new(ResourceKind::RenderTarget),
            meshes: ResourcePool::new(ResourceKind::Mesh),
            shaders: ResourcePool::new(ResourceKind::Shader),
            draw_states: ResourcePool::new(ResourceKind::DrawState),
            texture_blocks: ResourcePool::new(ResourceKind::TextureBlock),
            tracker: PassTracker::default(),
            fail_on: None,
            quit_on: None,
            skip_next: 0,
            discarded: false,
        }
    }

    /// Fails the `nth` (0-based) future call of `name`.
    pub(crate) fn fail_on(&mut self, name: &'static str, nth: usize) {
        self.fail_on = Some((name, nth));
    }

    /// Requests `quit` the next time `name` is called.
    pub(crate) fn quit_on(&mut self, name: &'static str, quit: QuitSignal) {
        self.quit_on = Some((name, quit));
    }

    /// Reports `Skip` from the next `n` calls to `begin_frame`.
    pub(crate) fn skip_frames(&mut self, n: u32) {
        self.skip_next = n;
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| c.name() == name).count()
    }

    /// Committed passes in call order.
    pub(crate) fn passes(&self) -> Vec<PassRecord> {
        let mut done = Vec::new();
        let mut frame: Vec<PassRecord> = Vec::new();
        let mut uniform = Vec::new();
        let mut draw_state = None;
        let mut texture_block = None;
        for call in &self.calls {
            match call {
                Call::BeginFrame(_) => frame.clear(),
                Call::ApplyRenderTarget(target, _) => {
                    frame.push(PassRecord {
                        target: *target,
                        draw_state: Id::new(ResourceKind::DrawState, u32::MAX),
                        texture_block: Id::new(ResourceKind::TextureBlock, u32::MAX),
                        uniform: Vec::new(),
                        draws: 0,
                    });
                }
                Call::ApplyDrawState(id) => draw_state = Some(*id),
                Call::ApplyUniformBlock(bytes) => uniform = bytes.clone(),
                Call::ApplyTextureBlock(id) => texture_block = Some(*id),
                Call::Draw(_) => {
                    if let (Some(p), Some(ds), Some(tb)) =
                        (frame.last_mut(), draw_state, texture_block)
                    {
                        p.draw_state = ds;
                        p.texture_block = tb;
                        p.uniform = uniform.clone();
                        p.draws += 1;
                    }
                }
                Call::CommitFrame => done.append(&mut frame),
                _ => {}
            }
        }
        done
    }

    fn enter(&mut self, call: Call) -> Result<()> {
        let name = call.name();
        if let Some((fail_name, nth)) = self.fail_on {
            if fail_name == name {
                if nth == 0 {
                    self.fail_on = None;
                    self.tracker.abort_frame();
                    bail!("injected failure in {name}");
                }
                self.fail_on = Some((fail_name, nth - 1));
            }
        }
        ensure!(!self.discarded, "{name} after discard");
        if let Some((_, quit)) = self.quit_on.take_if(|(n, _)| *n == name) {
            quit.request();
        }
        self.calls.push(call);
        Ok(())
    }

    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let res = op(self);
        if res.is_err() {
            self.tracker.abort_frame();
        }
        res
    }

    fn target_attrs(&self, target: PassTarget) -> Result<TargetAttrs> {
        Ok(match target {
            PassTarget::Offscreen(id) => self.render_targets.get(id)?.attrs(),
            PassTarget::Default => self.display.attrs(),
        })
    }
}

impl Gfx for RecordingGfx {
    fn display_attrs(&self) -> DisplayAttrs {
        self.display
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<Id> {
        ensure!(desc.width > 0 && desc.height > 0, "zero-sized render target");
        let id = self.render_targets.insert(desc.clone())?;
        self.enter(Call::CreateRenderTarget(id))?;
        Ok(id)
    }

    fn create_mesh(&mut self, data: &MeshData) -> Result<Id> {
        ensure!(!data.indices.is_empty(), "mesh has no geometry");
        let id = self.meshes.insert(data.clone())?;
        self.enter(Call::CreateMesh(id))?;
        Ok(id)
    }

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<Id> {
        let id = self.shaders.insert(desc.clone())?;
        self.enter(Call::CreateShader(id))?;
        Ok(id)
    }

    fn create_draw_state(&mut self, desc: &DrawStateDesc) -> Result<Id> {
        self.meshes.get(desc.mesh)?;
        self.shaders.get(desc.shader)?;
        let id = self.draw_states.insert(desc.clone())?;
        self.enter(Call::CreateDrawState(id))?;
        Ok(id)
    }

    fn create_texture_block(&mut self, desc: &TextureBlockDesc) -> Result<Id> {
        let slots = self.shaders.get(desc.shader)?.texture_slots;
        ensure!(desc.slots.len() == slots as usize, "texture block slot mismatch");
        for &(_, rt) in &desc.slots {
            self.render_targets.get(rt)?;
        }
        let id = self.texture_blocks.insert(desc.clone())?;
        self.enter(Call::CreateTextureBlock(id))?;
        Ok(id)
    }

    fn begin_frame(&mut self) -> Result<FrameStatus> {
        let status = if self.skip_next > 0 {
            self.skip_next -= 1;
            FrameStatus::Skip
        } else {
            FrameStatus::Ready
        };
        self.enter(Call::BeginFrame(status))?;
        if status == FrameStatus::Ready {
            self.tracker.begin_frame()?;
        }
        Ok(status)
    }

    fn apply_render_target(&mut self, target: PassTarget, clear: &ClearState) -> Result<()> {
        self.guarded(|g| {
            g.enter(Call::ApplyRenderTarget(target, *clear))?;
            let attrs = g.target_attrs(target)?;
            g.tracker.begin_pass(target, attrs)
        })
    }

    fn apply_draw_state(&mut self, draw_state: Id) -> Result<()> {
        self.guarded(|g| {
            g.enter(Call::ApplyDrawState(draw_state))?;
            let desc = g.draw_states.get(draw_state)?;
            let attrs = desc.attrs();
            let groups = g.meshes.get(desc.mesh)?.primitive_groups.len();
            g.tracker.bind_draw_state(draw_state, attrs, groups)
        })
    }

    fn apply_uniform_block(&mut self, data: &[u8]) -> Result<()> {
        self.guarded(|g| {
            g.enter(Call::ApplyUniformBlock(data.to_vec()))?;
            g.tracker.bind_uniform()
        })
    }

    fn apply_texture_block(&mut self, texture_block: Id) -> Result<()> {
        self.guarded(|g| {
            g.enter(Call::ApplyTextureBlock(texture_block))?;
            let textures = g.texture_blocks.get(texture_block)?.textures();
            g.tracker.bind_texture_block(texture_block, textures)
        })
    }

    fn draw(&mut self, primitive_group: usize) -> Result<()> {
        self.guarded(|g| {
            g.enter(Call::Draw(primitive_group))?;
            g.tracker.check_draw(primitive_group).map(|_| ())
        })
    }

    fn commit_frame(&mut self) -> Result<()> {
        self.guarded(|g| {
            g.enter(Call::CommitFrame)?;
            g.tracker.end_frame().map(|_| ())
        })
    }

    fn discard(&mut self) {
        if self.discarded {
            return;
        }
        self.calls.push(Call::Discard);
        self.texture_blocks.release_all();
        self.draw_states.release_all();
        self.shaders.release_all();
        self.meshes.release_all();
        self.render_targets.release_all();
        self.discarded = true;
    }

    fn is_discarded(&self) -> bool {
        self.discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeBuilder;

    fn shader() -> ShaderDesc {
        ShaderDesc {
            label: "test",
            source: "",
            vs_entry: "vs_main",
            fs_entry: "fs_main",
            uniform_block_size: 64,
            texture_slots: 1,
        }
    }

    #[test]
    fn injected_failure_hits_the_requested_call() {
        let mut gfx = RecordingGfx::new();
        gfx.fail_on("create_shader", 1);
        gfx.create_shader(&shader()).unwrap();
        assert!(gfx.create_shader(&shader()).is_err());
        gfx.create_shader(&shader()).unwrap();
        assert_eq!(gfx.count("create_shader"), 2);
    }

    #[test]
    fn passes_are_reported_after_commit() {
        let mut gfx = RecordingGfx::new();
        let mesh = gfx
            .create_mesh(&ShapeBuilder::new().sphere(1.0, 8, 4).build().unwrap())
            .unwrap();
        let sh = gfx.create_shader(&shader()).unwrap();
        let rt = gfx
            .create_render_target(&RenderTargetDesc::new("rt", 4, 4))
            .unwrap();
        let tb = gfx
            .create_texture_block(&TextureBlockDesc::new("tb", sh).with_slot(0, rt))
            .unwrap();
        let display = gfx.display_attrs();
        let ds = gfx
            .create_draw_state(
                &DrawStateDesc::from_mesh_and_shader("ds", mesh, sh).targeting_display(&display),
            )
            .unwrap();

        assert_eq!(gfx.begin_frame().unwrap(), FrameStatus::Ready);
        gfx.apply_render_target(PassTarget::Default, &ClearState::default())
            .unwrap();
        gfx.apply_draw_state(ds).unwrap();
        gfx.apply_uniform_block(&[1, 2, 3, 4]).unwrap();
        gfx.apply_texture_block(tb).unwrap();
        gfx.draw(0).unwrap();
        assert!(gfx.passes().is_empty());
        gfx.commit_frame().unwrap();

        assert_eq!(
            gfx.passes(),
            vec![PassRecord {
                target: PassTarget::Default,
                draw_state: ds,
                texture_block: tb,
                uniform: vec![1, 2, 3, 4],
                draws: 1,
            }]
        );
    }

    #[test]
    fn discard_is_idempotent() {
        let mut gfx = RecordingGfx::new();
        let sh = gfx.create_shader(&shader()).unwrap();
        gfx.discard();
        gfx.discard();
        assert_eq!(gfx.count("discard"), 1);
        assert!(gfx.shaders.get(sh).is_err());
        assert!(gfx.begin_frame().is_err());
    }
}

use anyhow::{Context, Result, ensure};
use glam::Mat4;

use super::setup::SphereResources;
use super::shader::VsParams;
use super::state::FrameState;
use super::{DISPLAY_CLEAR_COLOR, OFFSCREEN_CLEAR_COLOR, SPHERE_POSITION};
use crate::core::{AppControl, QuitSignal};
use crate::gfx::{ClearState, FrameStatus, Gfx, Id, PassTarget};
use crate::transform::{compute_model, compute_mvp, perspective, perspective_for};

/// Ping-pong scheduler: owns the effect's handles and [`FrameState`] and
/// issues the two passes of every frame.
#[derive(Debug)]
pub struct InfiniteSpheres {
    resources: SphereResources,
    state: FrameState,
    offscreen_proj: Mat4,
    view: Mat4,
    stopped: bool,
    poisoned: bool,
}

impl InfiniteSpheres {
    pub fn setup(gfx: &mut impl Gfx) -> Result<Self> {
        let resources = SphereResources::create(gfx)?;
        Ok(Self::with_resources(resources))
    }

    pub fn with_resources(resources: SphereResources) -> Self {
        Self {
            resources,
            state: FrameState::default(),
            offscreen_proj: perspective(1.0),
            view: Mat4::IDENTITY,
            stopped: false,
            poisoned: false,
        }
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    pub fn resources(&self) -> &SphereResources {
        &self.resources
    }

    /// Runs one frame: offscreen pass, display pass, commit, then a quit
    /// check.
    ///
    /// A skipped frame (no drawable) issues nothing and leaves the state
    /// alone. After `Exit` has been returned no further pass is issued. Any
    /// error aborts the frame and every later call fails.
    pub fn advance(&mut self, gfx: &mut impl Gfx, quit: &QuitSignal) -> Result<AppControl> {
        ensure!(!self.poisoned, "infinite spheres aborted by an earlier failure");
        if self.stopped {
            return Ok(AppControl::Exit);
        }

        let status = gfx.begin_frame().inspect_err(|_| self.poisoned = true)?;
        if status == FrameStatus::Skip {
            return Ok(self.poll_quit(quit));
        }

        self.state.step();
        if let Err(err) = self.render_frame(gfx) {
            self.poisoned = true;
            return Err(err.context(format!("frame {} aborted", self.state.frame_index)));
        }

        Ok(self.poll_quit(quit))
    }

    fn poll_quit(&mut self, quit: &QuitSignal) -> AppControl {
        if quit.is_requested() {
            self.stopped = true;
            log::info!("stopping after frame {}", self.state.frame_index);
            return AppControl::Exit;
        }
        AppControl::Continue
    }

    fn render_frame(&mut self, gfx: &mut impl Gfx) -> Result<()> {
        let (write, read) = self.state.indices();
        let (ax, ay) = (self.state.angle_x, self.state.angle_y);
        let render_targets = self.resources.render_targets;
        let texture_blocks = self.resources.texture_blocks;

        // previous frame's target textures the sphere drawn into the other one
        let model = compute_model(SPHERE_POSITION, ax, ay);
        let mvp = compute_mvp(self.offscreen_proj, self.view, model);
        self.draw_pass(
            gfx,
            PassTarget::Offscreen(render_targets[write]),
            &ClearState::clear_all(OFFSCREEN_CLEAR_COLOR),
            self.resources.offscreen_draw_state,
            mvp,
            texture_blocks[read],
        )
        .context("offscreen pass")?;

        let display = gfx.display_attrs();
        let display_proj = perspective_for(display.framebuffer_width, display.framebuffer_height);
        let model = compute_model(SPHERE_POSITION, -ax, -ay);
        let mvp = compute_mvp(display_proj, self.view, model);
        self.draw_pass(
            gfx,
            PassTarget::Default,
            &ClearState::clear_all(DISPLAY_CLEAR_COLOR),
            self.resources.display_draw_state,
            mvp,
            texture_blocks[write],
        )
        .context("display pass")?;

        gfx.commit_frame().context("commit")
    }

    fn draw_pass(
        &mut self,
        gfx: &mut impl Gfx,
        target: PassTarget,
        clear: &ClearState,
        draw_state: Id,
        mvp: Mat4,
        texture_block: Id,
    ) -> Result<()> {
        gfx.apply_render_target(target, clear)?;
        gfx.apply_draw_state(draw_state)?;
        self.state.vs_params = VsParams::new(mvp);
        gfx.apply_uniform_block(self.state.vs_params.as_bytes())?;
        gfx.apply_texture_block(texture_block)?;
        gfx.draw(0)
    }

    /// Releases every GPU resource of the session.
    pub fn teardown(self, gfx: &mut impl Gfx) {
        log::info!(
            "tearing down infinite spheres after {} frames",
            self.state.frame_index
        );
        gfx.discard();
    }
}

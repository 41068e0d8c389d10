use anyhow::{Context, Result};
use mirra_engine::core::{App, AppControl, FrameCtx, InitCtx};
use mirra_engine::gfx::WgpuGfx;
use mirra_engine::spheres::InfiniteSpheres;
use mirra_engine::time::FpsCounter;

/// Seconds between frame-rate log lines.
const FPS_LOG_INTERVAL_SECS: f32 = 5.0;

/// Hosts the infinite-spheres effect inside the engine runtime.
pub struct SpheresApp {
    spheres: Option<InfiniteSpheres>,
    fps: FpsCounter,
}

impl SpheresApp {
    pub fn new() -> Self {
        Self {
            spheres: None,
            fps: FpsCounter::new(FPS_LOG_INTERVAL_SECS),
        }
    }
}

impl App for SpheresApp {
    fn on_init(&mut self, ctx: &mut InitCtx<'_, '_>) -> Result<()> {
        let (w, h) = ctx.window.logical_size();
        log::debug!("window {:?} ready, {w}x{h} logical", ctx.window.id);
        self.spheres = Some(InfiniteSpheres::setup(ctx.gfx)?);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        let spheres = self.spheres.as_mut().context("effect not initialized")?;
        if let Some(report) = self.fps.record(&ctx.time) {
            log::debug!(
                "{:.1} fps ({:.2} ms/frame over {} frames)",
                report.avg_fps,
                report.avg_frame_ms,
                report.frames
            );
        }
        spheres.advance(ctx.gfx, ctx.quit)
    }

    fn on_cleanup(&mut self, gfx: &mut WgpuGfx<'_>) {
        if let Some(spheres) = self.spheres.take() {
            spheres.teardown(gfx);
        }
    }
}

use anyhow::{Context, Result};
use wgpu::{AddressMode, CompareFunction, FilterMode, TextureFormat};

use super::shader::{FS_TEXTURE_SLOT, main_shader};
use super::{RENDER_TARGET_SIZE, SPHERE_RADIUS, SPHERE_SLICES, SPHERE_STACKS};
use crate::gfx::{DrawStateDesc, Gfx, Id, RenderTargetDesc, TextureBlockDesc};
use crate::shape::ShapeBuilder;

/// Handles created once at startup; index 0/1 follows frame parity.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereResources {
    pub render_targets: [Id; 2],
    /// `texture_blocks[i]` samples `render_targets[i]`.
    pub texture_blocks: [Id; 2],
    pub mesh: Id,
    pub shader: Id,
    pub offscreen_draw_state: Id,
    pub display_draw_state: Id,
}

/// 512x512 RGBA8 color with 16-bit depth, linear filtering, repeat wrap.
pub fn render_target_desc() -> RenderTargetDesc {
    RenderTargetDesc {
        color_format: TextureFormat::Rgba8Unorm,
        depth_format: Some(TextureFormat::Depth16Unorm),
        min_filter: FilterMode::Linear,
        mag_filter: FilterMode::Linear,
        wrap_u: AddressMode::Repeat,
        wrap_v: AddressMode::Repeat,
        ..RenderTargetDesc::new("mirra ping-pong target", RENDER_TARGET_SIZE, RENDER_TARGET_SIZE)
    }
}

impl SphereResources {
    /// Creates every GPU object the effect uses. Any failure is fatal.
    pub fn create(gfx: &mut impl Gfx) -> Result<Self> {
        let rt = render_target_desc();
        let render_targets = [
            gfx.create_render_target(&rt)
                .context("failed to create render target 0")?,
            gfx.create_render_target(&rt)
                .context("failed to create render target 1")?,
        ];

        let mesh_data = ShapeBuilder::new()
            .sphere(SPHERE_RADIUS, SPHERE_SLICES, SPHERE_STACKS)
            .build()?;
        let mesh = gfx
            .create_mesh(&mesh_data)
            .context("failed to create sphere mesh")?;
        let shader = gfx
            .create_shader(&main_shader())
            .context("failed to create sphere shader")?;

        let mut dss = DrawStateDesc::from_mesh_and_shader("mirra display draw state", mesh, shader);
        dss.depth_stencil.depth_write_enabled = true;
        dss.depth_stencil.depth_compare = CompareFunction::LessEqual;

        let display = gfx.display_attrs();
        let display_draw_state = gfx
            .create_draw_state(&dss.clone().targeting_display(&display))
            .context("failed to create display draw state")?;

        dss.label = "mirra offscreen draw state";
        let offscreen_draw_state = gfx
            .create_draw_state(&dss.targeting(&rt))
            .context("failed to create offscreen draw state")?;

        let mut texture_block = |i: usize| {
            let desc = TextureBlockDesc::new("mirra ping-pong texture block", shader)
                .with_slot(FS_TEXTURE_SLOT, render_targets[i]);
            gfx.create_texture_block(&desc)
                .with_context(|| format!("failed to create texture block {i}"))
        };
        let texture_blocks: [Id; 2] = [texture_block(0)?, texture_block(1)?];

        log::info!(
            "infinite spheres ready: {}x{} targets, {} indices, display {}x{} @ {}x MSAA",
            rt.width,
            rt.height,
            mesh_data.indices.len(),
            display.framebuffer_width,
            display.framebuffer_height,
            display.sample_count
        );

        Ok(Self {
            render_targets,
            texture_blocks,
            mesh,
            shader,
            offscreen_draw_state,
            display_draw_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::RecordingGfx;
    use crate::gfx::ResourceKind;

    #[test]
    fn creates_every_resource_once() {
        let mut gfx = RecordingGfx::new();
        let res = SphereResources::create(&mut gfx).unwrap();

        assert_eq!(gfx.count("create_render_target"), 2);
        assert_eq!(gfx.count("create_mesh"), 1);
        assert_eq!(gfx.count("create_shader"), 1);
        assert_eq!(gfx.count("create_draw_state"), 2);
        assert_eq!(gfx.count("create_texture_block"), 2);
        assert_ne!(res.render_targets[0], res.render_targets[1]);
        assert_ne!(res.texture_blocks[0], res.texture_blocks[1]);
        assert_eq!(res.texture_blocks[0].kind(), ResourceKind::TextureBlock);
    }

    #[test]
    fn render_targets_match_the_effect_layout() {
        let mut gfx = RecordingGfx::new();
        let res = SphereResources::create(&mut gfx).unwrap();
        for id in res.render_targets {
            let desc = gfx.render_targets.get(id).unwrap();
            assert_eq!((desc.width, desc.height), (512, 512));
            assert_eq!(desc.color_format, TextureFormat::Rgba8Unorm);
            assert_eq!(desc.depth_format, Some(TextureFormat::Depth16Unorm));
            assert_eq!(desc.min_filter, FilterMode::Linear);
            assert_eq!(desc.mag_filter, FilterMode::Linear);
            assert_eq!(desc.wrap_u, AddressMode::Repeat);
            assert_eq!(desc.wrap_v, AddressMode::Repeat);
        }
    }

    #[test]
    fn texture_blocks_pair_with_their_targets() {
        let mut gfx = RecordingGfx::new();
        let res = SphereResources::create(&mut gfx).unwrap();
        for i in 0..2 {
            let tb = gfx.texture_blocks.get(res.texture_blocks[i]).unwrap();
            assert_eq!(tb.shader, res.shader);
            assert_eq!(tb.slots, vec![(FS_TEXTURE_SLOT, res.render_targets[i])]);
        }
    }

    #[test]
    fn draw_states_differ_only_in_target_config() {
        let mut gfx = RecordingGfx::with_display(800, 600, 4);
        let res = SphereResources::create(&mut gfx).unwrap();
        let display = gfx.draw_states.get(res.display_draw_state).unwrap().clone();
        let offscreen = gfx.draw_states.get(res.offscreen_draw_state).unwrap().clone();

        assert_eq!(display.blend.color_format, TextureFormat::Bgra8UnormSrgb);
        assert_eq!(display.blend.depth_format, Some(TextureFormat::Depth24Plus));
        assert_eq!(display.rasterizer.sample_count, 4);
        assert_eq!(offscreen.blend.color_format, TextureFormat::Rgba8Unorm);
        assert_eq!(offscreen.blend.depth_format, Some(TextureFormat::Depth16Unorm));
        assert_eq!(offscreen.rasterizer.sample_count, 1);

        for ds in [&display, &offscreen] {
            assert!(ds.depth_stencil.depth_write_enabled);
            assert_eq!(ds.depth_stencil.depth_compare, CompareFunction::LessEqual);
        }

        let mut normalized = offscreen.clone();
        normalized.label = display.label;
        normalized.blend = display.blend;
        normalized.rasterizer.sample_count = display.rasterizer.sample_count;
        assert_eq!(normalized, display);
    }

    #[test]
    fn creation_failure_is_fatal() {
        for call in [
            "create_render_target",
            "create_mesh",
            "create_shader",
            "create_draw_state",
            "create_texture_block",
        ] {
            let mut gfx = RecordingGfx::new();
            gfx.fail_on(call, 0);
            let err = SphereResources::create(&mut gfx).unwrap_err();
            assert!(format!("{err:#}").contains("injected failure"), "{call}: {err:#}");
        }
    }
}

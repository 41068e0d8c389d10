use anyhow::{Result, bail, ensure};

use super::desc::TargetAttrs;
use super::{Id, PassTarget};

#[derive(Debug)]
struct BoundDrawState {
    id: Id,
    groups: usize,
}

#[derive(Debug)]
struct OpenPass {
    target: PassTarget,
    attrs: TargetAttrs,
    draw_state: Option<BoundDrawState>,
    uniform_bound: bool,
    texture_block: Option<(Id, Vec<Id>)>,
}

/// Resolved bindings for one draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct DrawBindings {
    pub draw_state: Id,
    pub texture_block: Id,
}

/// Frame/pass ordering rules shared by every backend.
#[derive(Debug, Default)]
pub(crate) struct PassTracker {
    in_frame: bool,
    pass: Option<OpenPass>,
    passes: u32,
}

impl PassTracker {
    pub(crate) fn begin_frame(&mut self) -> Result<()> {
        ensure!(!self.in_frame, "begin_frame called twice without commit");
        self.in_frame = true;
        self.pass = None;
        self.passes = 0;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn in_frame(&self) -> bool {
        self.in_frame
    }

    pub(crate) fn begin_pass(&mut self, target: PassTarget, attrs: TargetAttrs) -> Result<()> {
        ensure!(self.in_frame, "render target applied outside a frame");
        self.pass = Some(OpenPass {
            target,
            attrs,
            draw_state: None,
            uniform_bound: false,
            texture_block: None,
        });
        self.passes += 1;
        Ok(())
    }

    fn open(&mut self) -> Result<&mut OpenPass> {
        match self.pass.as_mut() {
            Some(p) => Ok(p),
            None => bail!("no render target applied in this frame"),
        }
    }

    pub(crate) fn bind_draw_state(
        &mut self,
        id: Id,
        attrs: TargetAttrs,
        groups: usize,
    ) -> Result<()> {
        let pass = self.open()?;
        ensure!(
            attrs == pass.attrs,
            "{id} renders to {attrs:?} but {:?} expects {:?}",
            pass.target,
            pass.attrs
        );
        pass.draw_state = Some(BoundDrawState { id, groups });
        Ok(())
    }

    pub(crate) fn bind_uniform(&mut self) -> Result<()> {
        self.open()?.uniform_bound = true;
        Ok(())
    }

    pub(crate) fn bind_texture_block(&mut self, id: Id, textures: Vec<Id>) -> Result<()> {
        let pass = self.open()?;
        if let PassTarget::Offscreen(dst) = pass.target {
            ensure!(
                !textures.contains(&dst),
                "{id} samples {dst}, which is the current render target"
            );
        }
        pass.texture_block = Some((id, textures));
        Ok(())
    }

    pub(crate) fn check_draw(&self, group: usize) -> Result<DrawBindings> {
        let Some(pass) = self.pass.as_ref() else {
            bail!("draw issued without a render target");
        };
        let Some(ds) = pass.draw_state.as_ref() else {
            bail!("draw issued without a draw state");
        };
        ensure!(pass.uniform_bound, "draw issued without a uniform block");
        let Some((tb, _)) = pass.texture_block.as_ref() else {
            bail!("draw issued without a texture block");
        };
        ensure!(
            group < ds.groups,
            "primitive group {group} out of range for {} ({} groups)",
            ds.id,
            ds.groups
        );
        Ok(DrawBindings {
            draw_state: ds.id,
            texture_block: *tb,
        })
    }

    /// Closes the frame and returns how many passes it contained.
    pub(crate) fn end_frame(&mut self) -> Result<u32> {
        ensure!(self.in_frame, "commit_frame called outside a frame");
        self.in_frame = false;
        self.pass = None;
        Ok(self.passes)
    }

    /// Drops an in-progress frame after a failure.
    pub(crate) fn abort_frame(&mut self) {
        self.in_frame = false;
        self.pass = None;
    }
}

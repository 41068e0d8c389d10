use core::fmt;

/// Kind of GPU object an [`Id`] refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    RenderTarget,
    Mesh,
    Shader,
    DrawState,
    TextureBlock,
}

/// Opaque handle to a GPU object created through [`super::Gfx`].
///
/// Only identity is meaningful; the slot is private to the backend that
/// issued the handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Id {
    kind: ResourceKind,
    slot: u32,
}

impl Id {
    #[inline]
    pub(crate) const fn new(kind: ResourceKind, slot: u32) -> Self {
        Self { kind, slot }
    }

    #[inline]
    pub const fn kind(self) -> ResourceKind {
        self.kind
    }

    #[inline]
    pub(crate) const fn slot(self) -> u32 {
        self.slot
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.kind, self.slot)
    }
}

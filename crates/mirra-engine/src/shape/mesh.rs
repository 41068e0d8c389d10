use bytemuck::{Pod, Zeroable};

/// Interleaved vertex as uploaded to the GPU.
///
/// Layout: position `Float3`, normal `Byte4N` (signed normalized, w unused),
/// texcoord `Float2`. 24 bytes, no padding.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ShapeVertex {
    pub position: [f32; 3],
    pub normal: [i8; 4],
    pub texcoord: [f32; 2],
}

impl ShapeVertex {
    /// Packs a unit vector into signed-normalized bytes.
    pub fn pack_normal(n: [f32; 3]) -> [i8; 4] {
        let q = |v: f32| (v.clamp(-1.0, 1.0) * 127.0).round() as i8;
        [q(n[0]), q(n[1]), q(n[2]), 0]
    }

    pub fn unpack_normal(&self) -> [f32; 3] {
        let u = |v: i8| f32::from(v) / 127.0;
        [u(self.normal[0]), u(self.normal[1]), u(self.normal[2])]
    }
}

/// Contiguous index range drawn with one draw call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PrimitiveGroup {
    pub base_element: u32,
    pub num_elements: u32,
}

/// Geometry ready for [`crate::gfx::Gfx::create_mesh`].
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<ShapeVertex>,
    pub indices: Vec<u16>,
    pub primitive_groups: Vec<PrimitiveGroup>,
}

impl MeshData {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(core::mem::size_of::<ShapeVertex>(), 24);
    }

    #[test]
    fn normal_packing_is_symmetric() {
        let packed = ShapeVertex::pack_normal([1.0, -1.0, 0.0]);
        assert_eq!(packed, [127, -127, 0, 0]);
        let v = ShapeVertex {
            position: [0.0; 3],
            normal: packed,
            texcoord: [0.0; 2],
        };
        assert_eq!(v.unpack_normal(), [1.0, -1.0, 0.0]);
    }
}

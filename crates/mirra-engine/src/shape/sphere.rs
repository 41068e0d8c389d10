use core::f32::consts::PI;

use anyhow::{Context, Result};

use super::{MeshData, PrimitiveGroup, ShapeVertex};

#[derive(Debug, Copy, Clone)]
struct SphereShape {
    radius: f32,
    slices: u32,
    stacks: u32,
}

/// Accumulates shapes into one [`MeshData`]; each shape becomes its own
/// primitive group, in insertion order.
#[derive(Debug, Default)]
pub struct ShapeBuilder {
    spheres: Vec<SphereShape>,
}

impl ShapeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// UV sphere centred on the origin. `slices` divide the equator,
    /// `stacks` divide pole to pole.
    pub fn sphere(mut self, radius: f32, slices: u32, stacks: u32) -> Self {
        self.spheres.push(SphereShape {
            radius,
            slices,
            stacks,
        });
        self
    }

    pub fn build(self) -> Result<MeshData> {
        let mut mesh = MeshData::default();
        for s in &self.spheres {
            append_sphere(&mut mesh, s)?;
        }
        anyhow::ensure!(!mesh.primitive_groups.is_empty(), "shape builder is empty");
        Ok(mesh)
    }
}

fn append_sphere(mesh: &mut MeshData, s: &SphereShape) -> Result<()> {
    anyhow::ensure!(s.radius > 0.0, "sphere radius must be positive");
    anyhow::ensure!(
        s.slices >= 3 && s.stacks >= 2,
        "sphere needs at least 3 slices and 2 stacks (got {}x{})",
        s.slices,
        s.stacks
    );

    let base_vertex = mesh.vertices.len();
    let ring = s.slices + 1;
    let vertex_total = base_vertex + (ring * (s.stacks + 1)) as usize;
    anyhow::ensure!(
        vertex_total <= usize::from(u16::MAX) + 1,
        "sphere {}x{} exceeds 16-bit index range",
        s.slices,
        s.stacks
    );

    for i in 0..=s.stacks {
        let v = i as f32 / s.stacks as f32;
        let phi = PI * v;
        for j in 0..=s.slices {
            let u = j as f32 / s.slices as f32;
            let theta = 2.0 * PI * u;
            let n = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
            mesh.vertices.push(ShapeVertex {
                position: [n[0] * s.radius, n[1] * s.radius, n[2] * s.radius],
                normal: ShapeVertex::pack_normal(n),
                texcoord: [u, v],
            });
        }
    }

    let base_element = u32::try_from(mesh.indices.len()).context("index buffer too large")?;
    let idx = |i: u32, j: u32| (base_vertex as u32 + i * ring + j) as u16;
    for i in 0..s.stacks {
        for j in 0..s.slices {
            let (a, b, c, d) = (idx(i, j), idx(i + 1, j), idx(i, j + 1), idx(i + 1, j + 1));
            // top and bottom rows collapse one triangle of each quad onto the pole
            if i != 0 {
                mesh.indices.extend_from_slice(&[a, c, b]);
            }
            if i != s.stacks - 1 {
                mesh.indices.extend_from_slice(&[c, d, b]);
            }
        }
    }

    let num_elements = mesh.indices.len() as u32 - base_element;
    mesh.primitive_groups.push(PrimitiveGroup {
        base_element,
        num_elements,
    });
    log::debug!(
        "sphere r={} {}x{}: {} vertices, {} indices",
        s.radius,
        s.slices,
        s.stacks,
        vertex_total - base_vertex,
        num_elements
    );
    Ok(())
}

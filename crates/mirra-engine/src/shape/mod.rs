//! CPU-side mesh generation.

mod mesh;
mod sphere;

pub use mesh::{MeshData, PrimitiveGroup, ShapeVertex};
pub use sphere::ShapeBuilder;

//! Mirra engine crate.
//!
//! Platform + GPU runtime pieces and the infinite-spheres effect built on
//! them.

pub mod core;
pub mod device;
pub mod gfx;
pub mod logging;
pub mod shape;
pub mod spheres;
pub mod time;
pub mod transform;
pub mod window;

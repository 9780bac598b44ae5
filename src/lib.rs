//! Lazy loaders for the ModelNet 3D shape benchmark.
//!
//! Samples are read from disk when accessed and converted into triangle
//! meshes, point clouds sampled from the mesh surfaces, or voxel grids.
pub mod io;

pub mod mesh;
pub mod pointcloud;
pub mod sampling;
pub mod voxel;

pub mod error;
pub use error::{Error, Result};

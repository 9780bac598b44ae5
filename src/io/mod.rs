//! Readers for the third party file formats of the ModelNet dataset.
mod off;
pub use off::{read_off, read_off_from};
mod mat;
pub use mat::{read_mat, MatClass, MatFile, MatVariable};
mod geometry;
pub use geometry::Geometry;
mod error;
pub use error::LoadError;
pub mod dataset;

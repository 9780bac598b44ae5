use std::path::Path;

use ndarray::{Array3, ArrayD, Ix3};

use crate::error::{Error, Result};
use crate::io::read_mat;

/// Dense occupancy grid.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    pub data: Array3<f32>,
}

impl VoxelGrid {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Coerces any numeric array to a floating point grid. The array must be 3-D.
    pub fn from_array(array: ArrayD<f64>) -> Result<Self> {
        let shape = array.shape().to_vec();
        let grid = array.into_dimensionality::<Ix3>().map_err(|_| {
            Error::invalid_parameter(format!("Voxel grids must be 3-D, got shape {shape:?}"))
        })?;
        Ok(Self::new(grid.mapv(|v| v as f32)))
    }

    /// Reads the variable `variable` of a `.mat` file as a voxel grid.
    pub fn from_mat<P: AsRef<Path>>(filepath: P, variable: &str) -> Result<Self> {
        let filepath = filepath.as_ref();
        let mut mat = read_mat(filepath)?;
        let var = mat.take(variable).ok_or_else(|| {
            Error::invalid_parameter(format!(
                "{} has no numeric variable `{variable}`",
                filepath.display()
            ))
        })?;
        Self::from_array(var.data)
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Number of non-empty cells.
    pub fn occupied(&self) -> usize {
        self.data.iter().filter(|v| **v != 0.0).count()
    }
}

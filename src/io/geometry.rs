use ndarray::prelude::*;

/// Generic representation of attributes found in 3D model/object/geometry files.
#[derive(Debug, Clone)]
pub struct Geometry {
    /// The 3D points. Shape is (Nx3).
    pub points: Array2<f32>,
    /// Per vertices normals. Shape is (Nx3)
    pub normals: Option<Array2<f32>>,
    /// The indices to conect vertices that make faces in the geometry.
    /// Shape is (Fx3), we always convert to triangles.
    pub faces: Option<Array2<usize>>,
}

impl Geometry {
    pub fn len_vertices(&self) -> usize {
        self.points.nrows()
    }

    pub fn len_faces(&self) -> usize {
        self.faces.as_ref().map_or(0, |faces| faces.nrows())
    }
}

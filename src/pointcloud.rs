use ndarray::prelude::*;

use super::io::Geometry;

#[derive(Debug, Clone)]
pub struct PointCloud {
    pub points: Array2<f32>,
    pub normals: Option<Array2<f32>>,
}

impl PointCloud {
    pub fn new(points: Array2<f32>) -> Self {
        Self {
            points,
            normals: None,
        }
    }

    pub fn from_geometry(geometry: Geometry) -> Self {
        Self {
            points: geometry.points,
            normals: geometry.normals,
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            points: Array2::<f32>::zeros((len, 3)),
            normals: None,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<PointCloud> for Geometry {
    fn from(pcl: PointCloud) -> Geometry {
        Geometry {
            points: pcl.points,
            normals: pcl.normals,
            faces: None,
        }
    }
}

use std::path::Path;

use nalgebra::Vector3;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::error::{Error, Result};
use crate::io::{read_off, Geometry};

/// Triangle mesh: vertices (Nx3) and faces (Fx3) indexing them.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub vertices: Array2<f32>,
    pub faces: Array2<usize>,
}

fn to_vector3(row: ArrayView1<f32>) -> Vector3<f32> {
    Vector3::new(row[0], row[1], row[2])
}

impl TriangleMesh {
    pub fn new(vertices: Array2<f32>, faces: Array2<usize>) -> Result<Self> {
        if vertices.ncols() != 3 || faces.ncols() != 3 {
            return Err(Error::invalid_parameter(format!(
                "Mesh arrays must be Nx3, got vertices {:?} and faces {:?}",
                vertices.dim(),
                faces.dim()
            )));
        }
        if let Some(bad) = faces.iter().find(|index| **index >= vertices.nrows()) {
            return Err(Error::invalid_parameter(format!(
                "Face index {bad} out of range for {} vertices",
                vertices.nrows()
            )));
        }
        Ok(Self { vertices, faces })
    }

    /// Builds a mesh from a geometry, which must have faces.
    pub fn from_geometry(geometry: Geometry) -> Result<Self> {
        let faces = geometry
            .faces
            .ok_or_else(|| Error::invalid_parameter("Geometry has no faces"))?;
        Self::new(geometry.points, faces)
    }

    pub fn from_off<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        Self::from_geometry(read_off(filepath)?)
    }

    pub fn len_vertices(&self) -> usize {
        self.vertices.nrows()
    }

    pub fn len_faces(&self) -> usize {
        self.faces.nrows()
    }

    fn triangle(&self, face: usize) -> [Vector3<f32>; 3] {
        let face = self.faces.row(face);
        [
            to_vector3(self.vertices.row(face[0])),
            to_vector3(self.vertices.row(face[1])),
            to_vector3(self.vertices.row(face[2])),
        ]
    }

    /// Area of each face.
    pub fn face_areas(&self) -> Array1<f32> {
        Array1::from_shape_fn(self.len_faces(), |f| {
            let [p0, p1, p2] = self.triangle(f);
            (p1 - p0).cross(&(p2 - p0)).norm() * 0.5
        })
    }

    /// Unit normal of each face. Degenerate faces get a zero normal.
    pub fn face_normals(&self) -> Array2<f32> {
        let mut normals = Array2::<f32>::zeros((self.len_faces(), 3));
        for (f, mut normal_row) in normals.axis_iter_mut(Axis(0)).enumerate() {
            let [p0, p1, p2] = self.triangle(f);
            let mut normal = (p1 - p0).cross(&(p2 - p0));
            let mag = normal.magnitude();
            if mag > 0.0 {
                normal /= mag;
            }
            normal_row[0] = normal[0];
            normal_row[1] = normal[1];
            normal_row[2] = normal[2];
        }
        normals
    }

    /// Per vertex normals, averaged from the normals of the faces touching the vertex.
    pub fn compute_normals(&self) -> Array2<f32> {
        let face_normals = self.face_normals();
        let mut vertex_normals = vec![Vector3::<f32>::zeros(); self.len_vertices()];
        self.faces
            .axis_iter(Axis(0))
            .zip(face_normals.axis_iter(Axis(0)))
            .for_each(|(face, face_normal)| {
                let face_normal = to_vector3(face_normal);
                for f in [face[0], face[1], face[2]] {
                    vertex_normals[f] += face_normal;
                }
            });

        let mut normals = Array2::<f32>::zeros((self.len_vertices(), 3));
        for (mut row, normal) in normals.axis_iter_mut(Axis(0)).zip(vertex_normals) {
            let normal = normal.try_normalize(f32::EPSILON).unwrap_or(normal);
            row[0] = normal[0];
            row[1] = normal[1];
            row[2] = normal[2];
        }
        normals
    }

    /// Samples points uniformly over the surface of the mesh.
    ///
    /// A face is drawn with probability proportional to its area and a point
    /// is drawn uniformly inside it.
    ///
    /// # Returns
    ///
    /// The sampled points (num_points x 3) and the face each one was drawn from.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        num_points: usize,
        rng: &mut R,
    ) -> Result<(Array2<f32>, Array1<usize>)> {
        let areas = self.face_areas();
        let face_dist = WeightedIndex::new(areas.iter()).map_err(|err| {
            Error::sampling(format!(
                "Cannot sample a mesh with {} faces: {err}",
                self.len_faces()
            ))
        })?;

        let mut points = Array2::<f32>::zeros((num_points, 3));
        let mut face_choices = Array1::<usize>::zeros(num_points);
        for (i, mut point) in points.axis_iter_mut(Axis(0)).enumerate() {
            let face = face_dist.sample(rng);
            let [p0, p1, p2] = self.triangle(face);

            let r1 = rng.gen::<f32>().sqrt();
            let r2 = rng.gen::<f32>();
            let sample = p0 * (1.0 - r1) + p1 * (r1 * (1.0 - r2)) + p2 * (r1 * r2);

            point[0] = sample[0];
            point[1] = sample[1];
            point[2] = sample[2];
            face_choices[i] = face;
        }

        Ok((points, face_choices))
    }
}

impl From<TriangleMesh> for Geometry {
    fn from(mesh: TriangleMesh) -> Geometry {
        Geometry {
            points: mesh.vertices,
            normals: None,
            faces: Some(mesh.faces),
        }
    }
}

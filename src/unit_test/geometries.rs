use rstest::fixture;

use crate::mesh::TriangleMesh;

/// OFF file of a unit cube with outward facing quads.
pub const CUBE_OFF_PATH: &str = "tests/data/cube.off";

#[fixture]
pub fn sample_cube_mesh() -> TriangleMesh {
    TriangleMesh::from_off(CUBE_OFF_PATH).unwrap()
}

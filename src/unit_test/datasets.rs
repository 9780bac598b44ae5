use std::fs;
use std::path::Path;

use rstest::fixture;
use tempfile::TempDir;

use super::{mat_bytes, MatStorage, CUBE_OFF_PATH};

fn write_file(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// `<root>/<category>/<split>/*.off` tree:
/// bed 1 train 1 test, chair 2 train 1 test, table 2 train 1 test.
#[fixture]
pub fn sample_modelnet_tree() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    let layout = [
        ("bed", "train", 1),
        ("bed", "test", 1),
        ("chair", "train", 2),
        ("chair", "test", 1),
        ("table", "train", 2),
        ("table", "test", 1),
    ];
    for (category, split, count) in layout {
        for i in 0..count {
            let path = root
                .path()
                .join(category)
                .join(split)
                .join(format!("{category}_{split}_{i:04}.off"));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::copy(CUBE_OFF_PATH, &path).unwrap();
        }
    }
    // Neither a category nor a sample.
    write_file(&root.path().join("README.txt"), b"ModelNet");
    write_file(&root.path().join("chair/train/notes.txt"), b"not a mesh");
    root
}

/// `<root>/ModelNet/volumetric_data/<category>/30/<split>/*_<view>.mat` tree
/// with 4x4x4 grids: chair has a shape per split, desk a train shape, each
/// in 2 rotations.
#[fixture]
pub fn sample_voxel_tree() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    let data_dir = root.path().join("ModelNet/volumetric_data");
    let grid = (0..64).map(|v| (v % 3 == 0) as u8 as f64).collect::<Vec<_>>();
    let files = [
        ("chair", "train", "chair_000000001"),
        ("chair", "test", "chair_000000002"),
        ("desk", "train", "desk_000000001"),
    ];
    for (category, split, shape) in files {
        for view in 1..=2 {
            let path = data_dir
                .join(category)
                .join("30")
                .join(split)
                .join(format!("{shape}_{view}.mat"));
            write_file(
                &path,
                &mat_bytes("instance", &[4, 4, 4], &grid, MatStorage::Compressed),
            );
        }
    }
    root
}

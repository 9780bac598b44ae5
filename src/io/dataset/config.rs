use std::path::{Path, PathBuf};

use serde_derive::{Deserialize, Serialize};

use super::core::{Representation, Split};
use super::modelnet::ModelNet;
use super::pointcloud::ModelNetPointCloud;
use super::voxels::ModelNetVoxels;
use crate::error::Result;

/// Serializable description of a dataset, to keep experiments in JSON files.
///
/// ```json
/// { "root": "/data/ModelNet10", "representation": "pointcloud",
///   "split": "test", "categories": ["chair", "sofa"], "num_points": 2048 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub root: PathBuf,
    pub representation: Representation,
    pub split: Split,
    /// All categories found under `root` when `None`.
    pub categories: Option<Vec<String>>,
    pub num_points: usize,
    /// Points cached per mesh by [`ModelNetPointCloud`].
    pub sample_points: usize,
    pub seed: Option<u64>,
    /// Voxel datasets only: keep the first rotation of each shape.
    pub single_view: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            representation: Representation::Mesh,
            split: Split::Train,
            categories: None,
            num_points: 1024,
            sample_points: 4096,
            seed: None,
            single_view: true,
        }
    }
}

impl DatasetConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        let file = std::fs::File::open(filepath)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn build_modelnet(&self) -> Result<ModelNet> {
        let mut builder = ModelNet::builder(&self.root)
            .split(self.split)
            .representation(self.representation)
            .num_points(self.num_points);
        if let Some(categories) = &self.categories {
            builder = builder.categories(categories.iter().cloned());
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }

    pub fn build_point_cloud(&self) -> Result<ModelNetPointCloud> {
        let mut builder = ModelNetPointCloud::builder(&self.root)
            .split(self.split)
            .num_points(self.num_points)
            .sample_points(self.sample_points);
        if let Some(categories) = &self.categories {
            builder = builder.categories(categories.iter().cloned());
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }

    /// Builds a voxel dataset over `split` only.
    pub fn build_voxels(&self) -> Result<ModelNetVoxels> {
        let mut builder = ModelNetVoxels::builder(&self.root)
            .train(self.split == Split::Train)
            .test(self.split == Split::Test)
            .single_view(self.single_view);
        if let Some(categories) = &self.categories {
            builder = builder.categories(categories.iter().cloned());
        }
        builder.build()
    }
}

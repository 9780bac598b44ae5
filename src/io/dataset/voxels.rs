use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde_derive::Serialize;

use super::core::{available_categories, check_index, glob_files, ShapeDataset, Split, Transform};
use crate::error::{Error, Result};
use crate::voxel::VoxelGrid;

/// Name of the `.mat` variable holding the occupancy grid.
const VOXEL_VARIABLE: &str = "instance";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoxelAttributes {
    /// File name of the sample.
    pub name: String,
    /// Category of the sample.
    pub class: String,
    /// Position of the category in the requested categories.
    pub label: usize,
}

#[derive(Debug, Clone)]
pub struct VoxelSample {
    pub attributes: VoxelAttributes,
    pub voxels: VoxelGrid,
}

/// Voxelized ModelNet shapes, as distributed with 3D ShapeNets.
///
/// Expects `<root>/ModelNet/volumetric_data/<category>/<subdir>/<split>/*.mat`,
/// each file storing the grid in the `instance` variable. Shapes come in 12
/// rotations (`*_1.mat` to `*_12.mat`); only the first one is used in single
/// view mode.
pub struct ModelNetVoxels {
    categories: Vec<String>,
    samples: Vec<(PathBuf, usize)>,
    transform: Option<Transform<VoxelGrid>>,
}

pub struct ModelNetVoxelsBuilder {
    root: PathBuf,
    categories: Vec<String>,
    train: bool,
    test: bool,
    single_view: bool,
    transform: Option<Transform<VoxelGrid>>,
}

impl ModelNetVoxelsBuilder {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            categories: vec!["chair".to_string()],
            train: true,
            test: true,
            single_view: true,
            transform: None,
        }
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Includes the train split.
    pub fn train(mut self, value: bool) -> Self {
        self.train = value;
        self
    }

    /// Includes the test split.
    pub fn test(mut self, value: bool) -> Self {
        self.test = value;
        self
    }

    /// Keeps only the first rotation of each shape.
    pub fn single_view(mut self, value: bool) -> Self {
        self.single_view = value;
        self
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(VoxelGrid) -> VoxelGrid + 'static,
    {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn build(self) -> Result<ModelNetVoxels> {
        let modelnet_dir = self.root.join("ModelNet");
        if !modelnet_dir.is_dir() {
            return Err(Error::invalid_parameter(format!(
                "ModelNet is not found under {}",
                self.root.display()
            )));
        }
        if !self.train && !self.test {
            return Err(Error::invalid_parameter(
                "Either train or test must be enabled",
            ));
        }

        let data_dir = modelnet_dir.join("volumetric_data");
        let available = available_categories(&data_dir)?;
        let splits = [(self.train, Split::Train), (self.test, Split::Test)]
            .into_iter()
            .filter_map(|(enabled, split)| enabled.then_some(split))
            .collect_vec();
        let file_pattern = if self.single_view { "*_1.mat" } else { "*.mat" };

        let mut samples = Vec::new();
        for (label, category) in self.categories.iter().enumerate() {
            if !available.contains(category) {
                return Err(Error::invalid_parameter(format!(
                    "Object class {category} not in list of available classes: [{}]",
                    available.iter().join(", ")
                )));
            }
            for split in &splits {
                let files = glob_files(
                    &data_dir.join(category),
                    &format!("*/{}/{file_pattern}", split.as_str()),
                )?;
                log::debug!("{category}/{split}: {} voxel files", files.len());
                samples.extend(files.into_iter().map(|path| (path, label)));
            }
        }
        log::info!(
            "Found {} voxel samples in {} categories under {}",
            samples.len(),
            self.categories.len(),
            data_dir.display()
        );

        Ok(ModelNetVoxels {
            categories: self.categories,
            samples,
            transform: self.transform,
        })
    }
}

impl ModelNetVoxels {
    pub fn builder<P: AsRef<Path>>(root: P) -> ModelNetVoxelsBuilder {
        ModelNetVoxelsBuilder::new(root.as_ref().to_path_buf())
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.samples.iter().map(|(path, _)| path.as_path())
    }
}

impl ShapeDataset for ModelNetVoxels {
    type Item = VoxelSample;

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Result<VoxelSample> {
        check_index(index, self.len())?;
        let (path, label) = &self.samples[index];

        let voxels = VoxelGrid::from_mat(path, VOXEL_VARIABLE)?;
        let voxels = match &self.transform {
            Some(transform) => transform(voxels),
            None => voxels,
        };

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(VoxelSample {
            attributes: VoxelAttributes {
                name,
                class: self.categories[*label].clone(),
                label: *label,
            },
            voxels,
        })
    }
}

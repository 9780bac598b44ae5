use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::core::{SampleIndex, ShapeDataset, Split, Transform};
use crate::error::{Error, Result};
use crate::mesh::TriangleMesh;
use crate::pointcloud::PointCloud;
use crate::sampling::subsample;

/// ModelNet meshes served as fixed size point clouds.
///
/// The first access to a sample draws `sample_points` points from the mesh
/// surface and keeps them for the lifetime of the dataset. Every access then
/// returns `num_points` of those, chosen without replacement. The cache is
/// never evicted, memory grows with the number of distinct samples accessed.
pub struct ModelNetPointCloud {
    index: SampleIndex,
    num_points: usize,
    sample_points: usize,
    transform: Option<Transform<PointCloud>>,
    sample_cache: RefCell<HashMap<usize, Array2<f32>>>,
    rng: RefCell<StdRng>,
}

pub struct ModelNetPointCloudBuilder {
    root: PathBuf,
    split: Split,
    categories: Option<Vec<String>>,
    num_points: usize,
    sample_points: usize,
    seed: Option<u64>,
    transform: Option<Transform<PointCloud>>,
}

impl ModelNetPointCloudBuilder {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            split: Split::Train,
            categories: None,
            num_points: 1 << 10,
            sample_points: 1 << 12,
            seed: None,
            transform: None,
        }
    }

    pub fn split(mut self, split: Split) -> Self {
        self.split = split;
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    /// Number of points returned per access.
    pub fn num_points(mut self, num_points: usize) -> Self {
        self.num_points = num_points;
        self
    }

    /// Number of points sampled from the surface and cached per mesh.
    pub fn sample_points(mut self, sample_points: usize) -> Self {
        self.sample_points = sample_points;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(PointCloud) -> PointCloud + 'static,
    {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn build(self) -> Result<ModelNetPointCloud> {
        if self.num_points > self.sample_points {
            return Err(Error::invalid_parameter(format!(
                "num_points ({}) must not exceed sample_points ({})",
                self.num_points, self.sample_points
            )));
        }

        let index = SampleIndex::scan(&self.root, self.categories.as_deref(), self.split, "off")?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(ModelNetPointCloud {
            index,
            num_points: self.num_points,
            sample_points: self.sample_points,
            transform: self.transform,
            sample_cache: RefCell::new(HashMap::new()),
            rng: RefCell::new(rng),
        })
    }
}

impl ModelNetPointCloud {
    pub fn builder<P: AsRef<Path>>(root: P) -> ModelNetPointCloudBuilder {
        ModelNetPointCloudBuilder::new(root.as_ref().to_path_buf())
    }

    pub fn categories(&self) -> &[String] {
        self.index.categories()
    }

    pub fn index(&self) -> &SampleIndex {
        &self.index
    }

    /// Number of samples whose surface points are cached.
    pub fn cached_len(&self) -> usize {
        self.sample_cache.borrow().len()
    }

    /// The cached full resolution points of a sample, if it was accessed before.
    pub fn cached_points(&self, index: usize) -> Option<Array2<f32>> {
        self.sample_cache.borrow().get(&index).cloned()
    }
}

impl ShapeDataset for ModelNetPointCloud {
    type Item = (PointCloud, usize);

    fn len(&self) -> usize {
        self.index.len()
    }

    fn get(&self, index: usize) -> Result<(PointCloud, usize)> {
        let (path, label) = self.index.get(index)?;
        let mut rng = self.rng.borrow_mut();

        let mut cache = self.sample_cache.borrow_mut();
        if !cache.contains_key(&index) {
            log::debug!("Sampling {} points from {}", self.sample_points, path.display());
            let mesh = TriangleMesh::from_off(path)?;
            let (points, _) = mesh.sample(self.sample_points, &mut *rng)?;
            cache.insert(index, points);
        }

        let points = subsample(&cache[&index].view(), self.num_points, &mut *rng)?;
        drop(cache);

        let pcl = PointCloud::new(points);
        let pcl = match &self.transform {
            Some(transform) => transform(pcl),
            None => pcl,
        };
        Ok((pcl, label))
    }
}

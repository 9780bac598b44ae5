use std::cell::RefCell;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::core::{Representation, SampleIndex, ShapeDataset, Split, Transform};
use crate::error::Result;
use crate::mesh::TriangleMesh;
use crate::pointcloud::PointCloud;

/// A loaded ModelNet shape, in the representation the dataset was built with.
#[derive(Debug, Clone)]
pub enum Shape {
    Mesh(TriangleMesh),
    PointCloud(PointCloud),
}

impl Shape {
    pub fn as_mesh(&self) -> Option<&TriangleMesh> {
        match self {
            Shape::Mesh(mesh) => Some(mesh),
            Shape::PointCloud(_) => None,
        }
    }

    pub fn as_point_cloud(&self) -> Option<&PointCloud> {
        match self {
            Shape::PointCloud(pcl) => Some(pcl),
            Shape::Mesh(_) => None,
        }
    }

    /// Number of points or vertices.
    pub fn len_points(&self) -> usize {
        match self {
            Shape::Mesh(mesh) => mesh.len_vertices(),
            Shape::PointCloud(pcl) => pcl.len(),
        }
    }
}

/// Parser for the ModelNet10/40 mesh datasets. Available at:
///  https://modelnet.cs.princeton.edu/.
///  Zhirong Wu, Shuran Song, Aditya Khosla, Fisher Yu, Linguang Zhang,
///  Xiaoou Tang and Jianxiong Xiao, 3D ShapeNets: A Deep Representation
///  for Volumetric Shapes. CVPR, 2015.
///
/// Expects the layout `<root>/<category>/<split>/*.off`. Meshes are read
/// when accessed, and converted into point clouds if requested.
pub struct ModelNet {
    index: SampleIndex,
    representation: Representation,
    num_points: usize,
    transform: Option<Transform<Shape>>,
    rng: RefCell<StdRng>,
}

/// Parameters of [`ModelNet`].
pub struct ModelNetBuilder {
    root: PathBuf,
    split: Split,
    categories: Option<Vec<String>>,
    representation: Representation,
    num_points: usize,
    seed: Option<u64>,
    transform: Option<Transform<Shape>>,
}

impl ModelNetBuilder {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            split: Split::Train,
            categories: None,
            representation: Representation::Mesh,
            num_points: 1024,
            seed: None,
            transform: None,
        }
    }

    pub fn split(mut self, split: Split) -> Self {
        self.split = split;
        self
    }

    /// Categories to load, in label order. All categories found under the
    /// root are loaded when not set.
    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    /// Number of points of the returned point clouds.
    pub fn num_points(mut self, num_points: usize) -> Self {
        self.num_points = num_points;
        self
    }

    /// Seeds the surface sampling. Sampling is seeded from the OS otherwise.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Shape) -> Shape + 'static,
    {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn build(self) -> Result<ModelNet> {
        let index = SampleIndex::scan(&self.root, self.categories.as_deref(), self.split, "off")?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(ModelNet {
            index,
            representation: self.representation,
            num_points: self.num_points,
            transform: self.transform,
            rng: RefCell::new(rng),
        })
    }
}

impl ModelNet {
    pub fn builder<P: AsRef<Path>>(root: P) -> ModelNetBuilder {
        ModelNetBuilder::new(root.as_ref().to_path_buf())
    }

    pub fn categories(&self) -> &[String] {
        self.index.categories()
    }

    pub fn index(&self) -> &SampleIndex {
        &self.index
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }
}

impl ShapeDataset for ModelNet {
    type Item = (Shape, usize);

    fn len(&self) -> usize {
        self.index.len()
    }

    fn get(&self, index: usize) -> Result<(Shape, usize)> {
        let (path, label) = self.index.get(index)?;
        let mesh = TriangleMesh::from_off(path)?;

        let shape = match self.representation {
            Representation::Mesh => Shape::Mesh(mesh),
            Representation::PointCloud => {
                let (points, _) = mesh.sample(self.num_points, &mut *self.rng.borrow_mut())?;
                Shape::PointCloud(PointCloud::new(points))
            }
        };

        let shape = match &self.transform {
            Some(transform) => transform(shape),
            None => shape,
        };
        Ok((shape, label))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::error::Error;
    use crate::unit_test::sample_modelnet_tree;

    #[rstest]
    fn should_load_meshes(sample_modelnet_tree: TempDir) {
        let dataset = ModelNet::builder(sample_modelnet_tree.path())
            .categories(["chair"])
            .build()
            .unwrap();
        assert_eq!(dataset.len(), 2);

        let (shape, label) = dataset.get(1).unwrap();
        assert_eq!(label, 0);
        let mesh = shape.as_mesh().unwrap();
        assert_eq!(mesh.len_vertices(), 8);
        assert_eq!(mesh.len_faces(), 12);
    }

    #[rstest]
    fn should_sample_point_clouds(sample_modelnet_tree: TempDir) {
        let dataset = ModelNet::builder(sample_modelnet_tree.path())
            .split(Split::Test)
            .representation(Representation::PointCloud)
            .num_points(64)
            .seed(7)
            .build()
            .unwrap();
        // bed, chair and table have one test file each.
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.categories(), ["bed", "chair", "table"]);

        let (shape, label) = dataset.get(2).unwrap();
        assert_eq!(label, 2);
        assert_eq!(shape.as_point_cloud().unwrap().points.dim(), (64, 3));
    }

    #[rstest]
    fn should_apply_transform_last(sample_modelnet_tree: TempDir) {
        let dataset = ModelNet::builder(sample_modelnet_tree.path())
            .representation(Representation::PointCloud)
            .num_points(10)
            .transform(|shape| match shape {
                Shape::PointCloud(mut pcl) => {
                    pcl.points.mapv_inplace(|v| v + 100.0);
                    Shape::PointCloud(pcl)
                }
                other => other,
            })
            .build()
            .unwrap();
        let (shape, _) = dataset.get(0).unwrap();
        assert!(shape
            .as_point_cloud()
            .unwrap()
            .points
            .iter()
            .all(|v| *v >= 100.0));
    }

    #[rstest]
    fn should_fail_on_unknown_category(sample_modelnet_tree: TempDir) {
        let result = ModelNet::builder(sample_modelnet_tree.path())
            .categories(["airplane"])
            .build();
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[rstest]
    fn should_fail_on_out_of_range_index(sample_modelnet_tree: TempDir) {
        let dataset = ModelNet::builder(sample_modelnet_tree.path()).build().unwrap();
        assert!(matches!(
            dataset.get(dataset.len()),
            Err(Error::InvalidParameter(_))
        ));
    }
}

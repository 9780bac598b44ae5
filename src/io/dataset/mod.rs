mod core;
pub use self::core::{
    available_categories, resolve_categories, scan_samples, Representation, SampleIndex,
    ShapeDataset, Split, SubsetDataset, Transform, MODELNET10_CLASSES,
};

mod config;
pub use config::DatasetConfig;

mod modelnet;
pub use modelnet::{ModelNet, ModelNetBuilder, Shape};

mod pointcloud;
pub use pointcloud::{ModelNetPointCloud, ModelNetPointCloudBuilder};

mod voxels;
pub use voxels::{ModelNetVoxels, ModelNetVoxelsBuilder, VoxelAttributes, VoxelSample};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The ten categories of ModelNet10.
pub const MODELNET10_CLASSES: [&str; 10] = [
    "bathtub",
    "bed",
    "chair",
    "desk",
    "dresser",
    "monitor",
    "night_stand",
    "sofa",
    "table",
    "toilet",
];

/// Hook applied to every loaded sample, after conversion.
pub type Transform<T> = Box<dyn Fn(T) -> T>;

/// Train/test partition of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    #[default]
    Train,
    Test,
}

impl Split {
    /// Name of the split directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl FromStr for Split {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            _ => Err(Error::invalid_parameter(format!(
                "Split must be one of 'train' or 'test'. Got '{s}' instead"
            ))),
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a mesh file is converted into when loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    #[default]
    Mesh,
    PointCloud,
}

impl FromStr for Representation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mesh" => Ok(Representation::Mesh),
            "pointcloud" => Ok(Representation::PointCloud),
            _ => Err(Error::invalid_parameter(format!(
                "Representation must be one of 'mesh' or 'pointcloud'. Got '{s}' instead"
            ))),
        }
    }
}

/// Names of the subdirectories of `root`, sorted.
pub fn available_categories(root: &Path) -> Result<Vec<String>> {
    let mut categories = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        // Follows symbolic links, datasets are often linked into place.
        if entry.path().is_dir() {
            categories.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    categories.sort();
    Ok(categories)
}

/// Returns `requested` if every entry is a subdirectory of `root`, or all the
/// subdirectories when nothing was requested.
pub fn resolve_categories(root: &Path, requested: Option<&[String]>) -> Result<Vec<String>> {
    let available = available_categories(root)?;
    let categories = match requested {
        Some(requested) if !requested.is_empty() => requested.to_vec(),
        _ => return Ok(available),
    };

    if let Some(invalid) = categories.iter().find(|cat| !available.contains(*cat)) {
        return Err(Error::invalid_parameter(format!(
            "Invalid ModelNet class {invalid}. Valid classes are [{}]",
            available.iter().join(", ")
        )));
    }
    Ok(categories)
}

/// Lists the files of `dir` matching `file_pattern`, in path order.
/// Unreadable entries are skipped.
pub(crate) fn glob_files(dir: &Path, file_pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{file_pattern}",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) => files.push(path),
            Err(err) => log::warn!("Skipping unreadable entry of {pattern}: {err}"),
        }
    }
    Ok(files)
}

/// Builds the sample index of a `<root>/<category>/<split>/*.<extension>` tree.
/// The label of a sample is the position of its category in `categories`.
pub fn scan_samples(
    root: &Path,
    categories: &[String],
    split: Split,
    extension: &str,
) -> Result<Vec<(PathBuf, usize)>> {
    let mut samples = Vec::new();
    for (label, category) in categories.iter().enumerate() {
        let split_dir = root.join(category).join(split.as_str());
        let files = glob_files(&split_dir, &format!("*.{extension}"))?;
        log::debug!("{category}/{split}: {} files", files.len());
        samples.extend(files.into_iter().map(|path| (path, label)));
    }
    Ok(samples)
}

/// Files of a dataset paired with their category label.
#[derive(Debug, Clone)]
pub struct SampleIndex {
    categories: Vec<String>,
    samples: Vec<(PathBuf, usize)>,
}

impl SampleIndex {
    /// Scans `<root>/<category>/<split>/*.<extension>` for the requested
    /// categories, or for every category found under `root`.
    pub fn scan(
        root: &Path,
        requested: Option<&[String]>,
        split: Split,
        extension: &str,
    ) -> Result<Self> {
        let categories = resolve_categories(root, requested)?;
        let samples = scan_samples(root, &categories, split, extension)?;
        log::info!(
            "Found {} {split} samples in {} categories under {}",
            samples.len(),
            categories.len(),
            root.display()
        );
        Ok(Self {
            categories,
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Category names, the label of a category is its position.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.samples.iter().map(|(path, _)| path.as_path())
    }

    pub fn labels(&self) -> impl Iterator<Item = usize> + '_ {
        self.samples.iter().map(|(_, label)| *label)
    }

    pub fn get(&self, index: usize) -> Result<(&Path, usize)> {
        check_index(index, self.len())?;
        let (path, label) = &self.samples[index];
        Ok((path.as_path(), *label))
    }
}

/// Random access collection of samples, loaded when accessed.
pub trait ShapeDataset {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Self::Item>;
}

pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(Error::invalid_parameter(format!(
            "Index {index} out of range for dataset of length {len}"
        )));
    }
    Ok(())
}

/// View over some indices of another dataset.
pub struct SubsetDataset<D> {
    dataset: D,
    indices: Vec<usize>,
}

impl<D: ShapeDataset> SubsetDataset<D> {
    pub fn new(dataset: D, indices: Vec<usize>) -> Result<Self> {
        if let Some(bad) = indices.iter().find(|index| **index >= dataset.len()) {
            return Err(Error::invalid_parameter(format!(
                "Subset index {bad} out of range for dataset of length {}",
                dataset.len()
            )));
        }
        Ok(Self { dataset, indices })
    }

    pub fn into_inner(self) -> D {
        self.dataset
    }
}

impl<D: ShapeDataset> ShapeDataset for SubsetDataset<D> {
    type Item = D::Item;

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn get(&self, index: usize) -> Result<D::Item> {
        check_index(index, self.len())?;
        self.dataset.get(self.indices[index])
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::unit_test::sample_modelnet_tree;

    struct Numbers(usize);

    impl ShapeDataset for Numbers {
        type Item = usize;

        fn len(&self) -> usize {
            self.0
        }

        fn get(&self, index: usize) -> Result<usize> {
            check_index(index, self.0)?;
            Ok(index * 10)
        }
    }

    #[test]
    fn should_parse_split_and_representation() {
        assert_eq!("train".parse::<Split>().unwrap(), Split::Train);
        assert_eq!("test".parse::<Split>().unwrap(), Split::Test);
        assert!(matches!(
            "validation".parse::<Split>(),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(
            "pointcloud".parse::<Representation>().unwrap(),
            Representation::PointCloud
        );
        assert!(matches!(
            "voxels".parse::<Representation>(),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[rstest]
    fn should_list_sorted_categories(sample_modelnet_tree: TempDir) {
        let categories = available_categories(sample_modelnet_tree.path()).unwrap();
        assert_eq!(categories, vec!["bed", "chair", "table"]);
    }

    #[rstest]
    fn should_reject_unknown_category(sample_modelnet_tree: TempDir) {
        let requested = vec!["chair".to_string(), "airplane".to_string()];
        let err = resolve_categories(sample_modelnet_tree.path(), Some(&requested)).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(msg) if msg.contains("airplane")));
    }

    #[rstest]
    fn should_label_by_position(sample_modelnet_tree: TempDir) {
        let categories = vec!["table".to_string(), "bed".to_string()];
        let samples = scan_samples(sample_modelnet_tree.path(), &categories, Split::Train, "off")
            .unwrap();
        assert_eq!(samples.len(), 3);
        assert!(samples[..2].iter().all(|(path, label)| {
            *label == 0 && path.parent().unwrap().parent().unwrap().ends_with("table")
        }));
        assert_eq!(samples[2].1, 1);
    }

    #[cfg(unix)]
    #[rstest]
    fn should_follow_linked_categories(sample_modelnet_tree: TempDir) {
        let storage = tempfile::tempdir().unwrap();
        let sofa_dir = storage.path().join("sofa");
        std::fs::create_dir_all(sofa_dir.join("train")).unwrap();
        std::fs::copy(
            sample_modelnet_tree.path().join("bed/train/bed_train_0000.off"),
            sofa_dir.join("train/sofa_0001.off"),
        )
        .unwrap();
        std::os::unix::fs::symlink(&sofa_dir, sample_modelnet_tree.path().join("sofa")).unwrap();

        let categories = available_categories(sample_modelnet_tree.path()).unwrap();
        assert_eq!(categories, vec!["bed", "chair", "sofa", "table"]);

        let samples = scan_samples(
            sample_modelnet_tree.path(),
            &["sofa".to_string()],
            Split::Train,
            "off",
        )
        .unwrap();
        assert_eq!(samples.len(), 1);
        assert!(samples[0].0.ends_with("sofa/train/sofa_0001.off"));
    }

    #[test]
    fn test_subset_dataset() {
        let subset = SubsetDataset::new(Numbers(5), vec![4, 1]).unwrap();
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.get(0).unwrap(), 40);
        assert_eq!(subset.get(1).unwrap(), 10);
        assert!(subset.get(2).is_err());
        assert!(SubsetDataset::new(Numbers(5), vec![5]).is_err());
    }
}

use std::path::PathBuf;

use clap::Parser;
use kdam::tqdm;
use modelnet3d::io::dataset::{DatasetConfig, Representation, ShapeDataset, Split};

#[derive(Parser)]
struct Args {
    /// Root of the dataset. For voxels, the directory containing `ModelNet/`
    root: Option<PathBuf>,
    /// JSON dataset description, overridden by the other arguments
    #[clap(long)]
    config: Option<PathBuf>,
    /// Representation: mesh, pointcloud, or voxels
    #[clap(long, default_value = "mesh")]
    rep: String,
    /// Split: train or test
    #[clap(long)]
    split: Option<String>,
    /// Category to load, may be repeated. All categories when omitted
    #[clap(long = "category", short)]
    categories: Vec<String>,
    /// Number of points of each point cloud
    #[clap(long)]
    num_points: Option<usize>,
    /// Serves point clouds from a per mesh cache of this many points
    #[clap(long)]
    sample_points: Option<usize>,
    #[clap(long)]
    seed: Option<u64>,
    /// Maximum number of samples to load
    #[clap(long)]
    max_samples: Option<usize>,
}

struct Summary {
    counts: Vec<usize>,
    sizes: Vec<usize>,
    failures: usize,
}

fn summarize<D, F>(
    dataset: &D,
    num_categories: usize,
    max_samples: Option<usize>,
    measure: F,
) -> Summary
where
    D: ShapeDataset,
    F: Fn(&D::Item) -> (usize, usize),
{
    let total = max_samples.map_or(dataset.len(), |max| max.min(dataset.len()));
    let mut summary = Summary {
        counts: vec![0; num_categories],
        sizes: vec![0; num_categories],
        failures: 0,
    };

    for i in tqdm!(0..total, total = total, desc = "Loading samples") {
        match dataset.get(i) {
            Ok(item) => {
                let (label, size) = measure(&item);
                summary.counts[label] += 1;
                summary.sizes[label] += size;
            }
            Err(err) => {
                log::error!("Sample {i}: {err}");
                summary.failures += 1;
            }
        }
    }
    summary
}

fn print_summary(categories: &[String], summary: &Summary, size_name: &str) {
    println!();
    println!("{:<16} {:>8} {:>16}", "category", "samples", size_name);
    for (label, category) in categories.iter().enumerate() {
        let count = summary.counts[label];
        let mean = if count > 0 {
            summary.sizes[label] as f64 / count as f64
        } else {
            0.0
        };
        println!("{category:<16} {count:>8} {mean:>16.1}");
    }
    if summary.failures > 0 {
        println!("{} samples failed to load", summary.failures);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DatasetConfig::from_json_file(path)?,
        None => DatasetConfig::default(),
    };
    if let Some(root) = args.root {
        config.root = root;
    }
    if let Some(split) = &args.split {
        config.split = split.parse::<Split>()?;
    }
    if !args.categories.is_empty() {
        config.categories = Some(args.categories);
    }
    if let Some(num_points) = args.num_points {
        config.num_points = num_points;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    if args.rep == "voxels" {
        let dataset = config.build_voxels()?;
        let summary = summarize(
            &dataset,
            dataset.categories().len(),
            args.max_samples,
            |sample| (sample.attributes.label, sample.voxels.occupied()),
        );
        print_summary(dataset.categories(), &summary, "occupied voxels");
        return Ok(());
    }

    config.representation = args.rep.parse::<Representation>()?;
    if let Some(sample_points) = args.sample_points {
        config.sample_points = sample_points;
        let dataset = config.build_point_cloud()?;
        let summary = summarize(
            &dataset,
            dataset.categories().len(),
            args.max_samples,
            |(pcl, label)| (*label, pcl.len()),
        );
        print_summary(dataset.categories(), &summary, "points");
    } else {
        let dataset = config.build_modelnet()?;
        let size_name = match config.representation {
            Representation::Mesh => "vertices",
            Representation::PointCloud => "points",
        };
        let summary = summarize(
            &dataset,
            dataset.categories().len(),
            args.max_samples,
            |(shape, label)| (*label, shape.len_points()),
        );
        print_summary(dataset.categories(), &summary, size_name);
    }

    Ok(())
}

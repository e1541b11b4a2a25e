//! Match a pair of images and estimate their two-view geometry.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use twoview::cache::ResultCache;
use twoview::calib3d::{
    sort_by_match_cost, usac_estimate_fundamental_norm, usac_estimate_homography_norm,
};
use twoview::core::{ByteImage, Mat3, UniformSampler};
use twoview::error::Result;
use twoview::features2d::{match_brute_force, KeypointStore, SiftDetector, SiftParams};

#[derive(Parser, Debug)]
#[command(
    name = "twoview",
    about = "Detect SIFT keypoints in two images, match them and fit a homography or fundamental matrix"
)]
struct Args {
    /// Left (first) image
    #[arg(short = 'l', long)]
    left: PathBuf,

    /// Right (second) image
    #[arg(short = 'r', long)]
    right: PathBuf,

    /// Double the input image size before computation
    #[arg(long)]
    sift_double_image: bool,

    /// Number of intermediate scales within each octave
    #[arg(long, default_value_t = 3)]
    sift_n_scales_per_octave: usize,

    /// Initial sigma for the input image
    #[arg(long, default_value_t = 1.6)]
    sift_sigma0: f32,

    /// Multiplier for filter size computation
    #[arg(long, default_value_t = 4.0)]
    sift_kernel_truncation_factor: f32,

    /// Distance to border within which to skip extraction
    #[arg(long, default_value_t = 5)]
    sift_border_distance: usize,

    /// DoG score threshold, decrease to get more keypoints
    #[arg(long, default_value_t = 0.08)]
    sift_peak_threshold: f32,

    /// Threshold for filtering edge-like regions
    #[arg(long, default_value_t = 10.0)]
    sift_edge_threshold: f32,

    /// Multiplier to determine descriptor radius
    #[arg(long, default_value_t = 3.0)]
    sift_magnification_factor: f32,

    /// Second-nearest-neighbor distance ratio threshold; outside (0, 1)
    /// disables the ratio test
    #[arg(long, default_value_t = 0.8)]
    snn_threshold: f32,

    /// Maximum number of robust estimation iterations
    #[arg(long, default_value_t = 1000)]
    ransac_max_n_iterations: usize,

    /// Inlier tolerance in pixels
    #[arg(long, default_value_t = 3.0)]
    ransac_inlier_threshold: f64,

    /// Fit a fundamental matrix instead of a homography
    #[arg(long)]
    fundamental: bool,

    /// Directory for cached detection and matching results
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Seed for the random sampler; seeded from entropy when absent
    #[arg(long)]
    seed: Option<u64>,
}

fn load_gray(path: &PathBuf) -> Result<ByteImage> {
    let img = image::open(path)?.to_luma8();
    let (width, height) = img.dimensions();
    ByteImage::from_raw(
        img.into_raw(),
        width as usize,
        height as usize,
        1,
        width as usize,
    )
}

fn print_matrix(label: &str, m: &Mat3) {
    println!("{label} =");
    for r in 0..3 {
        println!("  [{:+.6e} {:+.6e} {:+.6e}]", m.at(r, 0), m.at(r, 1), m.at(r, 2));
    }
}

fn run(args: &Args) -> Result<()> {
    let params = SiftParams {
        double_image: args.sift_double_image,
        n_scales_per_octave: args.sift_n_scales_per_octave,
        sigma0: args.sift_sigma0,
        kernel_truncation_factor: args.sift_kernel_truncation_factor,
        border_distance: args.sift_border_distance,
        peak_threshold: args.sift_peak_threshold,
        edge_threshold: args.sift_edge_threshold,
        magnification_factor: args.sift_magnification_factor,
    };

    let left = load_gray(&args.left)?;
    let right = load_gray(&args.right)?;

    let mut detector = SiftDetector::new(params);
    let mut keys_left = KeypointStore::new();
    let mut keys_right = KeypointStore::new();
    let cache = args.cache_dir.as_ref().map(ResultCache::new);

    let mut matches = if let Some(cache) = &cache {
        cache.detect(&mut detector, &left, &mut keys_left)?;
        cache.detect(&mut detector, &right, &mut keys_right)?;
        cache.match_brute_force(&keys_left, &keys_right, args.snn_threshold)
    } else {
        detector.compute(&left, &mut keys_left)?;
        detector.compute(&right, &mut keys_right)?;
        match_brute_force(&keys_left, &keys_right, args.snn_threshold)
    };

    info!(
        "{} keypoints in {}, {} in {}",
        keys_left.len(),
        args.left.display(),
        keys_right.len(),
        args.right.display()
    );
    println!(
        "keypoints: {} / {}, putative matches: {}",
        keys_left.len(),
        keys_right.len(),
        matches.len()
    );

    sort_by_match_cost(&mut matches);

    let mut sampler = match args.seed {
        Some(seed) => UniformSampler::with_seed(seed),
        None => UniformSampler::new(),
    };

    let mut model = Mat3::identity();
    let n_inliers = if args.fundamental {
        usac_estimate_fundamental_norm(
            &mut model,
            &mut matches,
            args.ransac_inlier_threshold,
            args.ransac_max_n_iterations,
            &mut sampler,
        )
    } else {
        usac_estimate_homography_norm(
            &mut model,
            &mut matches,
            args.ransac_inlier_threshold,
            args.ransac_max_n_iterations,
            &mut sampler,
        )
    };

    println!("inliers: {n_inliers} of {}", matches.len());
    print_matrix(if args.fundamental { "F" } else { "H" }, &model);

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

//! Detector and matcher integration tests on synthetic images.

use twoview::core::ByteImage;
use twoview::features2d::{
    match_brute_force, Keypoint, KeypointStore, SiftDetector, SiftParams, SIFT_DESC_DIM,
};

/// A field of Gaussian-ish blobs, enough structure for stable keypoints
fn blob_image(width: usize, height: usize) -> ByteImage {
    let mut img = ByteImage::new(width, height, 1).unwrap();
    let centers = [
        (0.25, 0.25, 6.0),
        (0.7, 0.3, 9.0),
        (0.35, 0.7, 12.0),
        (0.75, 0.75, 7.0),
        (0.5, 0.5, 15.0),
    ];

    for y in 0..height {
        let row = img.row_mut(y);
        for (x, p) in row.iter_mut().enumerate() {
            let mut v = 30.0f64;
            for &(cx, cy, s) in &centers {
                let dx = x as f64 - cx * width as f64;
                let dy = y as f64 - cy * height as f64;
                v += 200.0 * (-(dx * dx + dy * dy) / (2.0 * s * s)).exp();
            }
            *p = v.min(255.0) as u8;
        }
    }
    img
}

#[test]
fn test_detector_finds_blobs() {
    let img = blob_image(160, 120);
    let mut detector = SiftDetector::new(SiftParams::default());
    let mut store = KeypointStore::new();
    let n = detector.compute(&img, &mut store).unwrap();

    assert!(n > 0);
    assert_eq!(store.len(), n);
    assert_eq!(store.descriptors().len(), n * SIFT_DESC_DIM);
}

#[test]
fn test_keypoints_respect_border_and_scale_invariants() {
    let img = blob_image(160, 120);
    let params = SiftParams::default();
    let border = params.border_distance as f32;
    let mut detector = SiftDetector::new(params);
    let mut store = KeypointStore::new();
    detector.compute(&img, &mut store).unwrap();
    assert!(!store.is_empty());

    for (i, k) in store.keypoints().iter().enumerate() {
        assert!(k.sigma > 0.0);
        assert!(k.scale > 0.0);
        assert!(k.ori > -std::f32::consts::PI - 1e-6);
        assert!(k.ori <= std::f32::consts::PI + 1e-6);
        assert_eq!(k.id, i as u64);

        // refined coordinates stay in the valid region of their level
        let level_w = 160.0 / k.scale;
        let level_h = 120.0 / k.scale;
        assert!(k.xs >= border - 2.0 && k.xs <= level_w - border + 2.0);
        assert!(k.ys >= border - 2.0 && k.ys <= level_h - border + 2.0);
    }
}

#[test]
fn test_below_minimum_size_image_detects_nothing() {
    let params = SiftParams {
        double_image: false,
        ..SiftParams::default()
    };
    let side = 2 * params.border_distance + 2;
    let img = blob_image(side, side);
    let mut detector = SiftDetector::new(params);
    let mut store = KeypointStore::new();
    let n = detector.compute(&img, &mut store).unwrap();
    assert_eq!(n, 0);
    assert!(store.is_empty());
}

#[test]
fn test_detection_is_byte_identical_across_runs() {
    let img = blob_image(160, 120);
    let mut detector = SiftDetector::new(SiftParams::default());

    let mut first = KeypointStore::new();
    let mut second = KeypointStore::new();
    detector.compute(&img, &mut first).unwrap();
    detector.compute(&img, &mut second).unwrap();

    assert_eq!(first.keypoints(), second.keypoints());
    assert_eq!(first.descriptors(), second.descriptors());
}

#[test]
fn test_lower_peak_threshold_detects_more() {
    let img = blob_image(160, 120);
    let mut store = KeypointStore::new();

    let mut strict = SiftDetector::new(SiftParams {
        peak_threshold: 0.16,
        ..SiftParams::default()
    });
    let n_strict = strict.compute(&img, &mut store).unwrap();

    let mut loose = SiftDetector::new(SiftParams {
        peak_threshold: 0.02,
        ..SiftParams::default()
    });
    let n_loose = loose.compute(&img, &mut store).unwrap();

    assert!(n_loose >= n_strict);
    assert!(n_loose > 0);
}

/// Store of one-hot descriptors at the given byte offsets
fn one_hot_store(offsets: &[usize]) -> KeypointStore {
    let mut store = KeypointStore::new();
    for (i, &off) in offsets.iter().enumerate() {
        let id = store.append();
        *store.keypoint_mut(id) = Keypoint {
            x: i as i32,
            y: i as i32,
            xs: i as f32,
            ys: i as f32,
            scale: 1.0,
            sigma: 1.6,
            id: i as u64,
            ..Keypoint::default()
        };
        store.descriptor_mut(id)[off] = 255;
    }
    store
}

#[test]
fn test_matcher_identical_sets_give_zero_cost_matches() {
    let offsets: Vec<usize> = (0..16).collect();
    let store = one_hot_store(&offsets);
    let storep = one_hot_store(&offsets);

    let matches = match_brute_force(&store, &storep, 0.6);
    assert_eq!(matches.len(), 16);
    for m in &matches {
        assert_eq!(m.match_cost, 0.0);
        assert_eq!(m.id, m.idp);
    }
}

#[test]
fn test_matcher_disjoint_sets_give_no_matches() {
    // every query is equidistant from all train descriptors, so the ratio
    // test can never pass
    let offsets_a: Vec<usize> = (0..16).collect();
    let offsets_b: Vec<usize> = (16..32).collect();
    let store = one_hot_store(&offsets_a);
    let storep = one_hot_store(&offsets_b);

    let matches = match_brute_force(&store, &storep, 0.6);
    assert!(matches.is_empty());
}

#[test]
fn test_end_to_end_shifted_image_matches() {
    // the same blob field, twice, must match onto itself almost everywhere
    let img = blob_image(160, 120);
    let mut detector = SiftDetector::new(SiftParams::default());

    let mut keys = KeypointStore::new();
    let mut keys_p = KeypointStore::new();
    detector.compute(&img, &mut keys).unwrap();
    detector.compute(&img, &mut keys_p).unwrap();
    assert!(!keys.is_empty());

    let matches = match_brute_force(&keys, &keys_p, 0.8);
    assert!(!matches.is_empty());
    for m in &matches {
        assert_eq!(m.match_cost, 0.0);
        assert_eq!(m.x, m.xp);
    }
}

//! Content-addressed on-disk cache for detection and matching results
//!
//! The cache is a correctness-preserving shortcut only: entries are keyed by
//! a SHA-256 hash over a canonical serialization of the inputs, hits skip
//! computation, and any I/O failure degrades to recomputing.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::calib3d::PointMatch2D;
use crate::core::ByteImage;
use crate::error::Result;
use crate::features2d::{match_brute_force, KeypointStore, SiftDetector, SiftParams};

/// On-disk cache rooted at a directory
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Detect keypoints, consulting the cache first
    pub fn detect(
        &self,
        detector: &mut SiftDetector,
        image: &ByteImage,
        store: &mut KeypointStore,
    ) -> Result<usize> {
        let key = detection_key(detector.params(), image);
        let path = self.dir.join(format!("{key}.sift"));

        if path.is_file() {
            match read_store(&path) {
                Ok(cached) => {
                    debug!("read {} keypoints from cache file {}", cached.len(), path.display());
                    *store = cached;
                    return Ok(store.len());
                }
                Err(e) => {
                    warn!("failed to read cache file {}: {e}; recomputing", path.display());
                }
            }
        }

        let n_keys = detector.compute(image, store)?;
        if let Err(e) = write_store(&self.dir, &path, store) {
            warn!("failed to write cache file {}: {e}", path.display());
        } else {
            debug!("cached {n_keys} keypoints to {}", path.display());
        }
        Ok(n_keys)
    }

    /// Match two keypoint stores, consulting the cache first
    #[must_use]
    pub fn match_brute_force(
        &self,
        store: &KeypointStore,
        storep: &KeypointStore,
        dist_ratio_thr: f32,
    ) -> Vec<PointMatch2D> {
        let key = match_key(store, storep, dist_ratio_thr);
        let path = self.dir.join(format!("{key}.sift_matches"));

        if path.is_file() {
            match read_matches(&path) {
                Ok(matches) => {
                    debug!("read {} matches from cache file {}", matches.len(), path.display());
                    return matches;
                }
                Err(e) => {
                    warn!("failed to read cache file {}: {e}; recomputing", path.display());
                }
            }
        }

        let matches = match_brute_force(store, storep, dist_ratio_thr);
        if let Err(e) = write_matches(&self.dir, &path, &matches) {
            warn!("failed to write cache file {}: {e}", path.display());
        } else {
            debug!("cached {} matches to {}", matches.len(), path.display());
        }
        matches
    }
}

fn hash_params(hasher: &mut Sha256, params: &SiftParams) {
    hasher.update([u8::from(params.double_image)]);
    hasher.update((params.n_scales_per_octave as u32).to_le_bytes());
    hasher.update(params.sigma0.to_le_bytes());
    hasher.update(params.kernel_truncation_factor.to_le_bytes());
    hasher.update((params.border_distance as u32).to_le_bytes());
    hasher.update(params.peak_threshold.to_le_bytes());
    hasher.update(params.edge_threshold.to_le_bytes());
    hasher.update(params.magnification_factor.to_le_bytes());
}

fn hex_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut s = String::with_capacity(2 * digest.len());
    for b in digest {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Hash over the image rows and the detector parameters
fn detection_key(params: &SiftParams, image: &ByteImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update((image.width() as u32).to_le_bytes());
    hasher.update((image.height() as u32).to_le_bytes());
    hasher.update((image.channels() as u32).to_le_bytes());
    for y in 0..image.height() {
        hasher.update(image.row(y));
    }
    hash_params(&mut hasher, params);
    hex_digest(hasher)
}

fn hash_store(hasher: &mut Sha256, store: &KeypointStore) {
    hasher.update((store.len() as u32).to_le_bytes());
    for k in store.keypoints() {
        hasher.update(k.x.to_le_bytes());
        hasher.update(k.y.to_le_bytes());
        hasher.update(k.xs.to_le_bytes());
        hasher.update(k.ys.to_le_bytes());
        hasher.update(k.octave.to_le_bytes());
        hasher.update(k.scale.to_le_bytes());
        hasher.update(k.sigma.to_le_bytes());
        hasher.update(k.response.to_le_bytes());
        hasher.update(k.ori.to_le_bytes());
        hasher.update(k.id.to_le_bytes());
    }
    hasher.update(store.descriptors());
}

/// Hash over both keypoint stores and the ratio threshold
fn match_key(store: &KeypointStore, storep: &KeypointStore, dist_ratio_thr: f32) -> String {
    let mut hasher = Sha256::new();
    hash_store(&mut hasher, store);
    hash_store(&mut hasher, storep);
    hasher.update(dist_ratio_thr.to_le_bytes());
    hex_digest(hasher)
}

fn read_store(path: &Path) -> std::io::Result<KeypointStore> {
    let mut reader = BufReader::new(File::open(path)?);
    KeypointStore::read_from(&mut reader)
}

fn write_store(dir: &Path, path: &Path, store: &KeypointStore) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut writer = BufWriter::new(File::create(path)?);
    store.write_to(&mut writer)
}

fn read_matches(path: &Path) -> std::io::Result<Vec<PointMatch2D>> {
    let mut r = BufReader::new(File::open(path)?);
    let n = r.read_u32::<LittleEndian>()? as usize;
    let mut matches = Vec::with_capacity(n);
    for _ in 0..n {
        matches.push(PointMatch2D {
            x: [r.read_f32::<LittleEndian>()?, r.read_f32::<LittleEndian>()?],
            xp: [r.read_f32::<LittleEndian>()?, r.read_f32::<LittleEndian>()?],
            match_cost: r.read_f32::<LittleEndian>()?,
            sigma_x: r.read_f32::<LittleEndian>()?,
            sigma_xp: r.read_f32::<LittleEndian>()?,
            id: r.read_u64::<LittleEndian>()?,
            idp: r.read_u64::<LittleEndian>()?,
            is_inlier: r.read_u8()? != 0,
        });
    }
    Ok(matches)
}

fn write_matches(dir: &Path, path: &Path, matches: &[PointMatch2D]) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut w = BufWriter::new(File::create(path)?);
    w.write_u32::<LittleEndian>(matches.len() as u32)?;
    for m in matches {
        w.write_f32::<LittleEndian>(m.x[0])?;
        w.write_f32::<LittleEndian>(m.x[1])?;
        w.write_f32::<LittleEndian>(m.xp[0])?;
        w.write_f32::<LittleEndian>(m.xp[1])?;
        w.write_f32::<LittleEndian>(m.match_cost)?;
        w.write_f32::<LittleEndian>(m.sigma_x)?;
        w.write_f32::<LittleEndian>(m.sigma_xp)?;
        w.write_u64::<LittleEndian>(m.id)?;
        w.write_u64::<LittleEndian>(m.idp)?;
        w.write_u8(u8::from(m.is_inlier))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features2d::SiftParams;

    fn gradient_image(width: usize, height: usize) -> ByteImage {
        let mut img = ByteImage::new(width, height, 1).unwrap();
        for y in 0..height {
            let row = img.row_mut(y);
            for (x, p) in row.iter_mut().enumerate() {
                *p = (((x * 13 + y * 7) % 31) * 8) as u8;
            }
        }
        img
    }

    #[test]
    fn test_detection_cache_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(tmp.path());
        let image = gradient_image(96, 96);
        let mut detector = SiftDetector::new(SiftParams::default());

        let mut first = KeypointStore::new();
        cache.detect(&mut detector, &image, &mut first).unwrap();

        // second run must be served from disk and be identical
        let mut second = KeypointStore::new();
        cache.detect(&mut detector, &image, &mut second).unwrap();
        assert_eq!(first.keypoints(), second.keypoints());
        assert_eq!(first.descriptors(), second.descriptors());

        let n_files = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(n_files, 1);
    }

    #[test]
    fn test_different_params_use_different_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(tmp.path());
        let image = gradient_image(64, 64);

        let mut store = KeypointStore::new();
        let mut det_a = SiftDetector::new(SiftParams::default());
        cache.detect(&mut det_a, &image, &mut store).unwrap();

        let mut det_b = SiftDetector::new(SiftParams {
            peak_threshold: 0.02,
            ..SiftParams::default()
        });
        cache.detect(&mut det_b, &image, &mut store).unwrap();

        let n_files = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(n_files, 2);
    }

    #[test]
    fn test_corrupt_entry_degrades_to_recompute() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(tmp.path());
        let image = gradient_image(96, 96);
        let mut detector = SiftDetector::new(SiftParams::default());

        let mut reference = KeypointStore::new();
        detector.compute(&image, &mut reference).unwrap();

        let key = detection_key(detector.params(), &image);
        let path = tmp.path().join(format!("{key}.sift"));
        fs::write(&path, b"not a cache file").unwrap();

        let mut store = KeypointStore::new();
        cache.detect(&mut detector, &image, &mut store).unwrap();
        assert_eq!(store.keypoints(), reference.keypoints());
    }

    #[test]
    fn test_match_cache_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(tmp.path());
        let image = gradient_image(96, 96);
        let mut detector = SiftDetector::new(SiftParams::default());

        let mut store = KeypointStore::new();
        detector.compute(&image, &mut store).unwrap();

        let first = cache.match_brute_force(&store, &store, 0.8);
        let second = cache.match_brute_force(&store, &store, 0.8);
        assert_eq!(first, second);
    }
}

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
use std::f32::consts::PI;

use log::debug;

use crate::core::{sym_solve_3x3, ByteImage, FloatImage, Mat3};
use crate::error::{Error, Result};
use crate::features2d::{Keypoint, KeypointStore, SIFT_DESC_DIM};
use crate::imgproc::smooth_in_place;

const N_ORI_BINS: usize = 36;
const N_PATCH_XY: usize = 4;
const N_DESC_ORI_BINS: usize = 8;

/// SIFT detector configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiftParams {
    /// 2x upsample the input before building the scale space
    pub double_image: bool,
    /// Number of intermediate scales within each octave
    pub n_scales_per_octave: usize,
    /// Target blur of the base level
    pub sigma0: f32,
    /// Multiplier for kernel half-width derived from sigma
    pub kernel_truncation_factor: f32,
    /// Skip this many pixels from each image edge
    pub border_distance: usize,
    /// Reject extrema with refined DoG response below this
    pub peak_threshold: f32,
    /// Principal-curvature ratio for edge rejection
    pub edge_threshold: f32,
    /// Descriptor patch size relative to sigma
    pub magnification_factor: f32,
}

impl Default for SiftParams {
    fn default() -> Self {
        Self {
            double_image: true,
            n_scales_per_octave: 3,
            sigma0: 1.6,
            kernel_truncation_factor: 4.0,
            border_distance: 5,
            peak_threshold: 0.08,
            edge_threshold: 10.0,
            magnification_factor: 3.0,
        }
    }
}

/// Scale-space SIFT detector and descriptor
///
/// Owns the Gaussian and DoG pyramid levels plus the gradient images of the
/// level under inspection; all buffers are reused across `compute` calls.
#[derive(Debug)]
pub struct SiftDetector {
    params: SiftParams,
    gx: FloatImage,
    gy: FloatImage,
    levels: Vec<FloatImage>,
    dogs: Vec<FloatImage>,
    work: FloatImage,
}

fn kernel_sigma(sigma_current: f32, sigma_desired: f32) -> f32 {
    (sigma_desired * sigma_desired - sigma_current * sigma_current).sqrt()
}

impl SiftDetector {
    #[must_use]
    pub fn new(params: SiftParams) -> Self {
        assert!(params.n_scales_per_octave >= 1);
        assert!(params.sigma0 > 0.0);

        let n_scales = params.n_scales_per_octave;
        Self {
            params,
            gx: FloatImage::default(),
            gy: FloatImage::default(),
            levels: (0..n_scales + 3).map(|_| FloatImage::default()).collect(),
            dogs: (0..n_scales + 2).map(|_| FloatImage::default()).collect(),
            work: FloatImage::default(),
        }
    }

    #[must_use]
    pub fn params(&self) -> &SiftParams {
        &self.params
    }

    /// Detect keypoints and compute descriptors for a grayscale byte image.
    /// The store is cleared first; returns the number of keypoints.
    pub fn compute(&mut self, image: &ByteImage, store: &mut KeypointStore) -> Result<usize> {
        if image.channels() != 1 {
            return Err(Error::InvalidParameter(
                "SIFT requires a grayscale image".to_string(),
            ));
        }

        self.work.convert_from_bytes(image)?;
        self.detect(store)
    }

    /// Detect keypoints and compute descriptors for a float image
    pub fn compute_float(
        &mut self,
        image: &FloatImage,
        store: &mut KeypointStore,
    ) -> Result<usize> {
        self.work.copy_from(image);
        self.detect(store)
    }

    fn detect(&mut self, store: &mut KeypointStore) -> Result<usize> {
        store.clear();

        let min_dim = 2 * self.params.border_distance + 2;
        let mut sigma_c = 0.5f32;
        let mut octave: i32 = 0;

        if self.params.double_image {
            let (work, levels) = (&self.work, &mut self.levels);
            levels[0].upsample_from(work);
            sigma_c *= 2.0;
            octave -= 1;
        } else {
            let (work, levels) = (&self.work, &mut self.levels);
            levels[0].copy_from(work);
        }

        if self.params.sigma0 > sigma_c {
            let sigma_g = kernel_sigma(sigma_c, self.params.sigma0);
            if smooth_in_place(
                &mut self.levels[0],
                sigma_g,
                sigma_g,
                self.params.kernel_truncation_factor,
            )
            .is_err()
            {
                debug!("base smoothing kernel does not fit; no scale space built");
                return Ok(0);
            }
            sigma_c = self.params.sigma0;
        }

        let n_scales = self.params.n_scales_per_octave;
        while self.levels[0].width() > min_dim && self.levels[0].height() > min_dim {
            if !self.prepare_octave(sigma_c)? {
                debug!("smoothing kernel no longer fits at octave {octave}; stopping");
                break;
            }
            self.process_octave(store, octave, sigma_c);

            let (head, tail) = self.levels.split_at_mut(1);
            head[0].downsample_from(&tail[n_scales - 1]);
            octave += 1;
        }

        Ok(store.len())
    }

    /// Chain incremental smoothings to fill the Gaussian levels, then build
    /// the DoG levels. Returns false when the kernel no longer fits.
    fn prepare_octave(&mut self, sigma_c: f32) -> Result<bool> {
        let n_scales = self.params.n_scales_per_octave;
        let scale_multiplier = 2.0f32.powf(1.0 / n_scales as f32);

        let mut sc = sigma_c;
        for i in 1..n_scales + 3 {
            let (prev, rest) = self.levels.split_at_mut(i);
            rest[0].copy_from(&prev[i - 1]);

            let sigma_g = kernel_sigma(sc, scale_multiplier * sc);
            if smooth_in_place(
                &mut rest[0],
                sigma_g,
                sigma_g,
                self.params.kernel_truncation_factor,
            )
            .is_err()
            {
                return Ok(false);
            }
            sc *= scale_multiplier;
        }

        for i in 0..n_scales + 2 {
            let (dog, levels) = (&mut self.dogs[i], &self.levels);
            dog.subtract_from(&levels[i], &levels[i + 1])?;
        }

        Ok(true)
    }

    fn process_octave(&mut self, store: &mut KeypointStore, octave: i32, sigma_c: f32) {
        let n_scales = self.params.n_scales_per_octave;
        for i in 1..=n_scales {
            self.gx.deriv_x_from(&self.levels[i - 1]);
            self.gy.deriv_y_from(&self.levels[i - 1]);
            self.process_dog(store, octave, sigma_c, i);
        }
    }

    fn process_dog(&self, store: &mut KeypointStore, octave: i32, sigma_c: f32, i: usize) {
        let n_scales = self.params.n_scales_per_octave;
        let peak_thr = self.params.peak_threshold / n_scales as f32;
        let edge_thr = self.params.edge_threshold;

        let dog = &self.dogs[i];
        let dogm = &self.dogs[i - 1];
        let dogp = &self.dogs[i + 1];

        let b = self.params.border_distance.max(1);
        let (w, h) = (dog.width(), dog.height());
        for y in b..h - b {
            let rows = [
                dogm.row(y - 1),
                dogm.row(y),
                dogm.row(y + 1),
                dog.row(y - 1),
                dog.row(y),
                dog.row(y + 1),
                dogp.row(y - 1),
                dogp.row(y),
                dogp.row(y + 1),
            ];
            for x in b..w - b {
                let dval = rows[4][x];
                if dval.abs() > 0.8 * peak_thr
                    && is_scale_space_extremum(dval, &rows, x)
                    && check_edge_threshold(rows[3], rows[4], rows[5], x, edge_thr)
                {
                    self.interp_peak_location(store, octave, sigma_c, i, x, y);
                }
            }
        }
    }

    /// Iteratively solve for the sub-pixel offset of a DoG extremum, shifting
    /// the integer location while the offset keeps escaping the pixel
    fn interp_peak_location(
        &self,
        store: &mut KeypointStore,
        octave: i32,
        sigma_c: f32,
        i: usize,
        mut x: usize,
        mut y: usize,
    ) {
        let n_scales = self.params.n_scales_per_octave;
        let peak_thr = self.params.peak_threshold / n_scales as f32;

        let dog = &self.dogs[i];
        let dogm = &self.dogs[i - 1];
        let dogp = &self.dogs[i + 1];
        let (w, h) = (dog.width(), dog.height());

        let mut b = [0.0f64; 3];
        let mut dval = 0.0f32;

        let mut n_tries = 5;
        while n_tries > 0 {
            n_tries -= 1;

            let dogm_row = dogm.row(y);
            let dog_rowm = dog.row(y - 1);
            let dog_row = dog.row(y);
            let dog_rowp = dog.row(y + 1);
            let dogp_row = dogp.row(y);

            let g = [
                f64::from(dog_row[x + 1] - dog_row[x - 1]) / 2.0,
                f64::from(dog_rowp[x] - dog_rowm[x]) / 2.0,
                f64::from(dogp_row[x] - dogm_row[x]) / 2.0,
            ];
            b = [-g[0], -g[1], -g[2]];

            let hxx = f64::from(dog_row[x - 1]) - 2.0 * f64::from(dog_row[x])
                + f64::from(dog_row[x + 1]);
            let hxy = (f64::from(dog_rowp[x + 1] - dog_rowp[x - 1])
                - f64::from(dog_rowm[x + 1] - dog_rowm[x - 1]))
                / 4.0;
            let hxs = (f64::from(dogp_row[x + 1] - dogp_row[x - 1])
                - f64::from(dogm.row(y)[x + 1] - dogm.row(y)[x - 1]))
                / 4.0;
            let hyy = f64::from(dog_rowm[x]) - 2.0 * f64::from(dog_row[x])
                + f64::from(dog_rowp[x]);
            let hys = (f64::from(dogp.row(y + 1)[x] - dogp.row(y - 1)[x])
                - f64::from(dogm.row(y + 1)[x] - dogm.row(y - 1)[x]))
                / 4.0;
            let hss =
                f64::from(dogm_row[x]) - 2.0 * f64::from(dog_row[x]) + f64::from(dogp_row[x]);

            let a = Mat3::from_row_major([hxx, hxy, hxs, hxy, hyy, hys, hxs, hys, hss]);
            if !sym_solve_3x3(&a, &mut b) {
                return;
            }

            dval = dog_row[x] + 0.5 * (g[0] * b[0] + g[1] * b[1] + g[2] * b[2]) as f32;

            let mut dx = 0i32;
            let mut dy = 0i32;
            if b[0] > 0.6 && x < w - 3 {
                dx += 1;
            } else if b[0] < -0.6 && x > 3 {
                dx -= 1;
            }
            if b[1] > 0.6 && y < h - 3 {
                dy += 1;
            } else if b[1] < -0.6 && y > 3 {
                dy -= 1;
            }
            if dx == 0 && dy == 0 {
                break;
            }
            x = (x as i32 + dx) as usize;
            y = (y as i32 + dy) as usize;
        }

        if b[0].abs() > 1.5
            || b[1].abs() > 1.5
            || b[2].abs() > 1.5
            || dval.abs() < peak_thr
        {
            return;
        }

        self.compute_keys(
            store,
            octave,
            sigma_c,
            dval,
            i as f32 + b[2] as f32,
            x as f32 + b[0] as f32,
            y as f32 + b[1] as f32,
        );
    }

    /// Build the orientation histogram at a refined extremum and emit one
    /// keypoint per dominant peak
    fn compute_keys(
        &self,
        store: &mut KeypointStore,
        octave: i32,
        sigma_c: f32,
        dog_val: f32,
        i: f32,
        x: f32,
        y: f32,
    ) {
        let n_scales = self.params.n_scales_per_octave;

        // hist[1..=N] are the bins; the two extra slots carry the cyclic border
        let mut hist = [0.0f32; N_ORI_BINS + 2];
        let sigma = sigma_c * 2.0f32.powf(i / n_scales as f32);
        let hist_peak = self.compute_ori_hist(&mut hist, x, y, sigma);

        for b in 1..=N_ORI_BINS {
            if hist[b] > hist[b - 1] && hist[b] > hist[b + 1] && hist[b] > hist_peak * 0.8 {
                // interpolate the peak position for y = cx^2 + dx + e
                let d = 0.5 * (hist[b + 1] - hist[b - 1]);
                let two_c = hist[b - 1] + hist[b + 1] - 2.0 * hist[b];
                let peak_offset = -d / two_c;
                let ori = PI * (2.0 * (b as f32 - 0.5 + peak_offset) / N_ORI_BINS as f32 - 1.0);

                let id = store.append();
                let key = store.keypoint_mut(id);
                key.x = (x + 0.5) as i32;
                key.y = (y + 0.5) as i32;
                key.xs = x;
                key.ys = y;
                key.octave = octave;
                key.scale = 2.0f32.powi(octave);
                key.sigma = sigma;
                key.response = dog_val;
                key.ori = ori;
                key.id = id as u64;

                let key = *key;
                let mut desc = [0u8; SIFT_DESC_DIM];
                self.compute_descriptor(&key, &mut desc);
                store.descriptor_mut(id).copy_from_slice(&desc);
            }
        }
    }

    fn compute_ori_hist(&self, hist: &mut [f32; N_ORI_BINS + 2], x: f32, y: f32, sigma: f32) -> f32 {
        for h in &mut hist[1..=N_ORI_BINS] {
            *h = 0.0;
        }

        // grow sigma for orientation estimation
        let sigma = sigma * 1.5;
        let sigma_sq = sigma * sigma;
        let dist_factor = -0.5 / sigma_sq;

        let r = (sigma * 3.0) as i32;
        let w = self.gx.width() as i32;
        let h = self.gx.height() as i32;
        let xi = (x + 0.5) as i32;
        let yi = (y + 0.5) as i32;
        for v in (yi - r)..=(yi + r) {
            if v <= 0 || v >= h - 2 {
                continue;
            }
            let rx = self.gx.row(v as usize);
            let ry = self.gy.row(v as usize);
            for u in (xi - r)..=(xi + r) {
                if u <= 0 || u >= w - 2 {
                    continue;
                }

                let dr_sq = (u as f32 - x) * (u as f32 - x) + (v as f32 - y) * (v as f32 - y);
                if dr_sq > (r * r) as f32 + 0.5 {
                    continue;
                }

                let gx_val = rx[u as usize];
                let gy_val = -ry[u as usize];
                let gmag = (gx_val * gx_val + gy_val * gy_val).sqrt();
                let gori = gy_val.atan2(gx_val);
                let mut bin =
                    (N_ORI_BINS as f32 * (gori + PI + 1e-5) / (2.0 * PI)) as usize;
                if bin >= N_ORI_BINS {
                    bin = N_ORI_BINS - 1;
                }
                hist[bin + 1] += (dist_factor * dr_sq).exp() * gmag;
            }
        }

        // smooth by cyclic averaging, using an auxiliary buffer for the borders
        let mut buffer = [0.0f32; N_ORI_BINS + 2];
        for _ in 0..6 {
            buffer[1..=N_ORI_BINS].copy_from_slice(&hist[1..=N_ORI_BINS]);
            buffer[0] = buffer[N_ORI_BINS];
            buffer[N_ORI_BINS + 1] = buffer[1];
            for j in 1..=N_ORI_BINS {
                buffer[j - 1] = (buffer[j - 1] + buffer[j] + buffer[j + 1]) / 3.0;
            }
            hist[1..=N_ORI_BINS].copy_from_slice(&buffer[0..N_ORI_BINS]);
        }
        // cyclic border of length one
        hist[0] = hist[N_ORI_BINS];
        hist[N_ORI_BINS + 1] = hist[1];

        let mut hist_peak = hist[1];
        for &v in &hist[2..=N_ORI_BINS] {
            if v > hist_peak {
                hist_peak = v;
            }
        }
        hist_peak
    }

    /// Accumulate the raw (float) descriptor by trilinear interpolation over
    /// spatial cells and orientation bins
    fn compute_fdescriptor(&self, key: &Keypoint, desc: &mut [f32; SIFT_DESC_DIM]) {
        desc.fill(0.0);

        let patch_size = key.sigma * self.params.magnification_factor;
        let radius_in_patches = (N_PATCH_XY as f32 + 1.0) / 2.0;
        let sample_radius = (patch_size * radius_in_patches * 2.0f32.sqrt() + 0.5) as i32;
        let cori = key.ori.cos();
        let sori = key.ori.sin();
        let rx_offset = key.xs - key.x as f32;
        let ry_offset = key.ys - key.y as f32;

        let (w, h) = (self.gx.width() as i32, self.gx.height() as i32);
        for dy in -sample_radius..=sample_radius {
            let sample_y = dy + key.y;
            if sample_y < 0 || sample_y >= h {
                continue;
            }
            let gx_row = self.gx.row(sample_y as usize);
            let gy_row = self.gy.row(sample_y as usize);
            for dx in -sample_radius..=sample_radius {
                let sample_x = dx + key.x;
                if sample_x < 0 || sample_x >= w {
                    continue;
                }

                // sample location in rotated patch coordinates
                let ry = cori * dy as f32 + sori * dx as f32;
                let rx = -sori * dy as f32 + cori * dx as f32;
                let patch_x = (rx - rx_offset) / patch_size;
                let patch_y = (ry - ry_offset) / patch_size;

                if patch_x > -radius_in_patches
                    && patch_x < radius_in_patches
                    && patch_y > -radius_in_patches
                    && patch_y < radius_in_patches
                {
                    let gx = gx_row[sample_x as usize];
                    let gy = -gy_row[sample_x as usize];
                    let gmag = (gx * gx + gy * gy).sqrt();
                    let gori = gy.atan2(gx);
                    let patch_sigma = 0.5 * N_PATCH_XY as f32;
                    let gweight = (-0.5 * (patch_x * patch_x + patch_y * patch_y)
                        / (patch_sigma * patch_sigma))
                        .exp();

                    let sample_weight = gweight * gmag;
                    let mut sample_ori = gori - key.ori;
                    while sample_ori > 2.0 * PI {
                        sample_ori -= 2.0 * PI;
                    }
                    while sample_ori < 0.0 {
                        sample_ori += 2.0 * PI;
                    }

                    let px = patch_x + N_PATCH_XY as f32 / 2.0 - 0.5;
                    let py = patch_y + N_PATCH_XY as f32 / 2.0 - 0.5;
                    let hb = N_DESC_ORI_BINS as f32 * (sample_ori / (2.0 * PI));
                    let pxi = px.floor() as i32;
                    let pyi = py.floor() as i32;
                    let hi = hb.floor() as i32;
                    let hi0 = if hi >= N_DESC_ORI_BINS as i32 { 0 } else { hi as usize };
                    let hi1 = if hi0 + 1 >= N_DESC_ORI_BINS { 0 } else { hi0 + 1 };
                    let xeps = px - pxi as f32;
                    let yeps = py - pyi as f32;
                    let heps = hb - hi as f32;

                    let mut scatter = |cell_x: i32, cell_y: i32, weight: f32| {
                        if cell_x >= 0
                            && cell_x < N_PATCH_XY as i32
                            && cell_y >= 0
                            && cell_y < N_PATCH_XY as i32
                        {
                            let base = (cell_y as usize * N_PATCH_XY + cell_x as usize)
                                * N_DESC_ORI_BINS;
                            let ww1 = weight * heps;
                            let ww0 = weight - ww1;
                            desc[base + hi0] += ww0;
                            desc[base + hi1] += ww1;
                        }
                    };

                    let wy0 = sample_weight * (1.0 - yeps);
                    let wy1 = sample_weight * yeps;
                    scatter(pxi, pyi, wy0 * (1.0 - xeps));
                    scatter(pxi + 1, pyi, wy0 * xeps);
                    scatter(pxi, pyi + 1, wy1 * (1.0 - xeps));
                    scatter(pxi + 1, pyi + 1, wy1 * xeps);
                }
            }
        }
    }

    /// Compute the byte descriptor: unit-normalize, clip at 0.2, re-normalize
    /// and quantize
    fn compute_descriptor(&self, key: &Keypoint, desc: &mut [u8; SIFT_DESC_DIM]) {
        let mut fdesc = [0.0f32; SIFT_DESC_DIM];
        self.compute_fdescriptor(key, &mut fdesc);
        normalize_to_unit(&mut fdesc);

        for v in &mut fdesc {
            if *v > 0.2 {
                *v = 0.2;
            }
        }
        normalize_to_unit(&mut fdesc);

        for (d, v) in desc.iter_mut().zip(fdesc.iter()) {
            *d = ((512.0 * v) as i32).clamp(0, 255) as u8;
        }
    }
}

fn normalize_to_unit(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}

/// Strict 26-neighbor extremum test across three adjacent DoG levels.
/// `rows` holds the three rows of each level, minus scale first.
fn is_scale_space_extremum(dval: f32, rows: &[&[f32]; 9], x: usize) -> bool {
    if dval > 0.0 {
        for (ri, row) in rows.iter().enumerate() {
            for dx in 0..3 {
                if ri == 4 && dx == 1 {
                    continue;
                }
                if dval <= row[x + dx - 1] {
                    return false;
                }
            }
        }
        true
    } else if dval < 0.0 {
        for (ri, row) in rows.iter().enumerate() {
            for dx in 0..3 {
                if ri == 4 && dx == 1 {
                    continue;
                }
                if dval >= row[x + dx - 1] {
                    return false;
                }
            }
        }
        true
    } else {
        false
    }
}

/// Reject edge-like extrema via the principal-curvature ratio of the 2x2
/// spatial Hessian
fn check_edge_threshold(
    dog_rowm: &[f32],
    dog_row: &[f32],
    dog_rowp: &[f32],
    x: usize,
    edge_thr: f32,
) -> bool {
    let edge_thr_p1 = edge_thr + 1.0;

    let ha = dog_rowm[x] - 2.0 * dog_row[x] + dog_rowp[x];
    let hb = dog_row[x - 1] - 2.0 * dog_row[x] + dog_row[x + 1];
    let hc = ((dog_rowp[x + 1] - dog_rowp[x - 1]) - (dog_rowm[x + 1] - dog_rowm[x - 1])) / 4.0;
    let det = ha * hb - hc * hc;
    let tr = ha + hb;

    det * edge_thr_p1 * edge_thr_p1 > edge_thr * tr * tr
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: usize, height: usize, period: usize) -> ByteImage {
        let mut img = ByteImage::new(width, height, 1).unwrap();
        for y in 0..height {
            let row = img.row_mut(y);
            for (x, p) in row.iter_mut().enumerate() {
                *p = if ((x / period) + (y / period)) % 2 == 0 {
                    230
                } else {
                    25
                };
            }
        }
        img
    }

    #[test]
    fn test_flat_image_has_no_keypoints() {
        let img = ByteImage::new(128, 128, 1).unwrap();
        let mut det = SiftDetector::new(SiftParams::default());
        let mut store = KeypointStore::new();
        let n = det.compute(&img, &mut store).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_checkerboard_produces_keypoints() {
        let img = checkerboard(128, 128, 16);
        let mut det = SiftDetector::new(SiftParams::default());
        let mut store = KeypointStore::new();
        let n = det.compute(&img, &mut store).unwrap();
        assert!(n > 0);
    }

    #[test]
    fn test_keypoint_invariants() {
        let img = checkerboard(128, 96, 12);
        let params = SiftParams::default();
        let mut det = SiftDetector::new(params);
        let mut store = KeypointStore::new();
        det.compute(&img, &mut store).unwrap();

        for (i, k) in store.keypoints().iter().enumerate() {
            assert!(k.sigma > 0.0);
            assert!(k.ori > -PI && k.ori <= PI + 1e-6);
            assert_eq!(k.id, i as u64);
            assert!(k.scale > 0.0);
        }
    }

    #[test]
    fn test_descriptor_bytes_bounded() {
        let img = checkerboard(96, 96, 8);
        let mut det = SiftDetector::new(SiftParams::default());
        let mut store = KeypointStore::new();
        det.compute(&img, &mut store).unwrap();

        // bytes are u8 by construction; check the quantizer left headroom
        for i in 0..store.len() {
            let desc = store.descriptor(i);
            assert_eq!(desc.len(), SIFT_DESC_DIM);
            assert!(desc.iter().any(|&b| b > 0));
        }
    }

    #[test]
    fn test_tiny_image_yields_nothing() {
        let params = SiftParams {
            double_image: false,
            ..SiftParams::default()
        };
        let side = 2 * params.border_distance + 2;
        let img = checkerboard(side, side, 2);
        let mut det = SiftDetector::new(params);
        let mut store = KeypointStore::new();
        let n = det.compute(&img, &mut store).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let img = checkerboard(128, 128, 10);
        let mut det = SiftDetector::new(SiftParams::default());
        let mut a = KeypointStore::new();
        let mut b = KeypointStore::new();
        det.compute(&img, &mut a).unwrap();
        det.compute(&img, &mut b).unwrap();

        assert_eq!(a.keypoints(), b.keypoints());
        assert_eq!(a.descriptors(), b.descriptors());
    }
}

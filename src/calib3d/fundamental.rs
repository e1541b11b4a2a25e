use log::warn;

use crate::calib3d::homography::svd_min_singular;
use crate::calib3d::{PointMatch2D, PointMatchStats};
use crate::core::{Mat3, UniformSampler};
use crate::error::{Error, Result};

/// Forward point-to-epipolar-line distance: the distance of `xp` to the line
/// `F x` in the second image
#[must_use]
pub fn fundamental_epipolar_dist_fwd(f: &Mat3, x: [f32; 2], xp: [f32; 2]) -> f64 {
    let l = f.map_homogeneous([f64::from(x[0]), f64::from(x[1])]);
    let num = (f64::from(xp[0]) * l[0] + f64::from(xp[1]) * l[1] + l[2]).abs();
    num / (l[0] * l[0] + l[1] * l[1]).sqrt()
}

#[must_use]
pub fn fundamental_count_inliers(matches: &[PointMatch2D]) -> usize {
    matches.iter().filter(|c| c.is_inlier).count()
}

/// Relabel every match by its forward epipolar distance under `f`; returns
/// the inlier count
pub fn fundamental_mark_inliers(
    f: &Mat3,
    matches: &mut [PointMatch2D],
    inlier_tolerance: f64,
) -> usize {
    let mut n_inliers = 0;
    for c in matches.iter_mut() {
        let d = fundamental_epipolar_dist_fwd(f, c.x, c.xp);
        if d < inlier_tolerance {
            c.is_inlier = true;
            n_inliers += 1;
        } else {
            c.is_inlier = false;
        }
    }
    n_inliers
}

/// One epipolar constraint row per correspondence, unknowns in row-major
/// order
fn fundamental_constraints(c: &PointMatch2D) -> [f64; 9] {
    let x = f64::from(c.x[0]);
    let y = f64::from(c.x[1]);
    let xp = f64::from(c.xp[0]);
    let yp = f64::from(c.xp[1]);

    [x * xp, xp * y, xp, yp * x, yp * y, yp, x, y, 1.0]
}

/// Minimal 8-point linear fit; returns the matrix and the smallest singular
/// value of the constraint stack
#[must_use]
pub fn fundamental_estimate_8pt(corr_ids: &[usize], matches: &[PointMatch2D]) -> (Mat3, f64) {
    debug_assert!(corr_ids.len() >= 8);

    let mut rows = Vec::with_capacity(corr_ids.len());
    for &id in corr_ids.iter().take(8) {
        rows.push(fundamental_constraints(&matches[id]));
    }

    let (f, sval) = svd_min_singular(&rows);
    (Mat3::from_row_major(f), sval)
}

/// 8-point linear fit over all correspondences
pub fn fundamental_estimate(matches: &[PointMatch2D]) -> Result<(Mat3, f64)> {
    if matches.len() < 8 {
        warn!("insufficient correspondences for fundamental matrix estimation");
        return Err(Error::InsufficientData(
            "Fundamental matrix estimation needs at least 8 correspondences".to_string(),
        ));
    }

    let rows: Vec<[f64; 9]> = matches.iter().map(fundamental_constraints).collect();
    let (f, sval) = svd_min_singular(&rows);
    Ok((Mat3::from_row_major(f), sval))
}

/// 8-point linear fit over the currently labeled inliers
pub fn fundamental_estimate_inliers(matches: &[PointMatch2D]) -> Result<(Mat3, f64)> {
    let n_inliers = fundamental_count_inliers(matches);
    if n_inliers < 8 {
        warn!("insufficient inliers for fundamental matrix estimation");
        return Err(Error::InsufficientData(
            "Fundamental matrix estimation needs at least 8 inliers".to_string(),
        ));
    }

    let rows: Vec<[f64; 9]> = matches
        .iter()
        .filter(|c| c.is_inlier)
        .map(fundamental_constraints)
        .collect();
    let (f, sval) = svd_min_singular(&rows);
    Ok((Mat3::from_row_major(f), sval))
}

/// Re-fit on the current inliers and relabel, repeating while the inlier
/// count improves by more than 5; returns the final count
pub fn fundamental_refine_inliers(
    f: &mut Mat3,
    matches: &mut [PointMatch2D],
    inlier_tolerance: f64,
) -> usize {
    let mut n_inliers_best = fundamental_mark_inliers(f, matches, inlier_tolerance);
    let mut n_inliers = 1;
    while n_inliers_best > n_inliers + 5 {
        if let Ok((refit, _)) = fundamental_estimate_inliers(matches) {
            *f = refit;
        }
        n_inliers = n_inliers_best;
        n_inliers_best = fundamental_mark_inliers(f, matches, inlier_tolerance);
    }
    n_inliers_best
}

/// Draw `ids.len()` distinct indices from `[0, n)`
pub(crate) fn select_uniform_candidates(
    sampler: &mut UniformSampler,
    n: usize,
    ids: &mut [usize],
) {
    debug_assert!(n >= ids.len());

    for i in 0..ids.len() {
        loop {
            let candidate = sampler.below(n);
            if !ids[..i].contains(&candidate) {
                ids[i] = candidate;
                break;
            }
        }
    }
}

/// Robust fundamental-matrix estimation with uniform 8-point sampling
///
/// Mirrors the homography loop: track the best-supported candidate until
/// `max_n_iter` iterations or 100 inliers, then refine on the inlier set
/// while the count keeps improving by more than 5.
pub fn fundamental_estimate_ransac(
    f: &mut Mat3,
    matches: &mut [PointMatch2D],
    inlier_tolerance: f64,
    max_n_iter: usize,
    sampler: &mut UniformSampler,
) -> usize {
    let n_corr = matches.len();
    if n_corr < 8 {
        return 0;
    }

    let mut f_best = Mat3::zeros();
    let mut n_inliers_best = 0;
    let mut n_inliers = 0;
    let mut ids = [0usize; 8];

    let mut iter = 0;
    while iter < max_n_iter && n_inliers < 100 {
        select_uniform_candidates(sampler, n_corr, &mut ids);
        let (cand, _) = fundamental_estimate_8pt(&ids, matches);
        *f = cand;

        n_inliers = fundamental_mark_inliers(f, matches, inlier_tolerance);
        if n_inliers > n_inliers_best {
            f_best = *f;
            n_inliers_best = n_inliers;
        }

        iter += 1;
    }

    *f = f_best;
    fundamental_refine_inliers(f, matches, inlier_tolerance)
}

/// `fundamental_estimate_ransac` on normalized coordinates; the model and the
/// match list come back in the original frame
pub fn fundamental_estimate_norm_ransac(
    f: &mut Mat3,
    matches: &mut [PointMatch2D],
    inlier_tolerance: f64,
    max_n_iter: usize,
    sampler: &mut UniformSampler,
) -> usize {
    let stats = match PointMatchStats::normalize_matches(matches) {
        Ok(stats) => stats,
        Err(_) => return 0,
    };

    let norm_tol = inlier_tolerance / stats.dp;
    let n_inliers = fundamental_estimate_ransac(f, matches, norm_tol, max_n_iter, sampler);

    stats.denormalize_fundamental(f);
    stats.denormalize_matches(matches);

    n_inliers
}

use log::warn;
use nalgebra::DMatrix;

use crate::calib3d::{sort_by_match_cost, PointMatch2D, PointMatchStats};
use crate::core::{Mat3, UniformSampler};
use crate::error::{Error, Result};

/// Default threshold on the cosine between projected-square diagonals,
/// corresponding to a minimum angle of 15 degrees
#[must_use]
pub fn homography_max_abs_cos_default() -> f64 {
    15.0f64.to_radians().cos().abs()
}

fn line_eqn_2d(p1: [f64; 2], p2: [f64; 2]) -> [f64; 3] {
    let l0 = p2[1] - p1[1];
    let l1 = p1[0] - p2[0];
    [l0, l1, -p1[0] * l0 - p1[1] * l1]
}

/// Structural validity of a homography: the projection of a square centered
/// around the origin must keep its corner order and not collapse its
/// diagonals below the minimum angle
#[must_use]
pub fn homography_check(h: &Mat3, max_abs_cos: f64) -> bool {
    let m = &h.m;
    let t_sum = [m[0] + m[3], m[1] + m[4], m[2] + m[5]];
    let t_diff = [m[0] - m[3], m[1] - m[4], m[2] - m[5]];

    // projections of (-1,-1), (+1,-1), (+1,+1), (-1,+1)
    let mut s_inv = 1.0 / (-t_sum[2] + m[8]);
    let a = [(-t_sum[0] + m[6]) * s_inv, (-t_sum[1] + m[7]) * s_inv];

    s_inv = 1.0 / (t_diff[2] + m[8]);
    let b = [(t_diff[0] + m[6]) * s_inv, (t_diff[1] + m[7]) * s_inv];

    s_inv = 1.0 / (t_sum[2] + m[8]);
    let c = [(t_sum[0] + m[6]) * s_inv, (t_sum[1] + m[7]) * s_inv];

    s_inv = 1.0 / (-t_diff[2] + m[8]);
    let d = [(-t_diff[0] + m[6]) * s_inv, (-t_diff[1] + m[7]) * s_inv];

    let mut l_ac = line_eqn_2d(a, c);
    let mut n_inv = 1.0 / (l_ac[0] * l_ac[0] + l_ac[1] * l_ac[1]);
    l_ac[0] *= n_inv;
    l_ac[1] *= n_inv;
    l_ac[2] *= n_inv;

    let b_val = l_ac[0] * b[0] + l_ac[1] * b[1] + l_ac[2];
    let d_val = l_ac[0] * d[0] + l_ac[1] * d[1] + l_ac[2];
    let cross_check = b_val > 0.0 && d_val < 0.0;

    let ac = [-l_ac[1], l_ac[0]];
    let mut bd = [b[0] - d[0], b[1] - d[1]];
    n_inv = 1.0 / (bd[0] * bd[0] + bd[1] * bd[1]);
    bd[0] *= n_inv;
    bd[1] *= n_inv;

    let cos_ac_bd = ac[0] * bd[0] + ac[1] * bd[1];
    let angle_check = cos_ac_bd.abs() <= max_abs_cos;

    cross_check && angle_check
}

/// Map a match coordinate through a homography
#[must_use]
pub fn homography_map(h: &Mat3, x: [f32; 2]) -> [f32; 2] {
    let p = h.map_point([f64::from(x[0]), f64::from(x[1])]);
    [p[0] as f32, p[1] as f32]
}

#[must_use]
pub fn homography_count_inliers(matches: &[PointMatch2D]) -> usize {
    matches.iter().filter(|c| c.is_inlier).count()
}

/// Relabel every match by its forward transfer distance under `h`; returns
/// the inlier count
pub fn homography_mark_inliers(
    h: &Mat3,
    matches: &mut [PointMatch2D],
    inlier_tolerance: f64,
) -> usize {
    let tol_sqr = inlier_tolerance * inlier_tolerance;
    let mut n_inliers = 0;

    for c in matches.iter_mut() {
        let mp = h.map_point([f64::from(c.x[0]), f64::from(c.x[1])]);
        let dx = mp[0] - f64::from(c.xp[0]);
        let dy = mp[1] - f64::from(c.xp[1]);
        if dx * dx + dy * dy < tol_sqr {
            c.is_inlier = true;
            n_inliers += 1;
        } else {
            c.is_inlier = false;
        }
    }

    n_inliers
}

/// Closed-form homography mapping the quad `x = [TL, TR, BR, BL]` onto the
/// unit square `(0,0)-(1,0)-(1,1)-(0,1)`
///
/// Returns the matrix and the determinant of the inversion; a zero
/// determinant marks a degenerate quad.
#[must_use]
pub fn homography_estimate_unit(x: &[f64; 8]) -> (Mat3, f64) {
    let (x0, y0) = (x[0], x[1]);
    let (x1, y1) = (x[2], x[3]);
    let (x2, y2) = (x[4], x[5]);
    let (x3, y3) = (x[6], x[7]);

    // projective interpolation of the unit square onto the quad, inverted
    let sx = x0 - x1 + x2 - x3;
    let sy = y0 - y1 + y2 - y3;
    let dx1 = x1 - x2;
    let dy1 = y1 - y2;
    let dx2 = x3 - x2;
    let dy2 = y3 - y2;

    let den = dx1 * dy2 - dx2 * dy1;
    if den == 0.0 {
        return (Mat3::zeros(), 0.0);
    }
    let g = (sx * dy2 - sy * dx2) / den;
    let hc = (dx1 * sy - dy1 * sx) / den;

    let unit_to_quad = Mat3::from_row_major([
        x1 - x0 + g * x1,
        x3 - x0 + hc * x3,
        x0,
        y1 - y0 + g * y1,
        y3 - y0 + hc * y3,
        y0,
        g,
        hc,
        1.0,
    ]);

    unit_to_quad.inverse()
}

/// Minimal 4-point fit: reduce both sides to the unit square and compose.
/// Returns a zero determinant when either reduction is degenerate.
#[must_use]
pub fn homography_estimate_4pt(corr_ids: &[usize], matches: &[PointMatch2D]) -> (Mat3, f64) {
    debug_assert!(corr_ids.len() >= 4);

    let mut x = [0.0f64; 8];
    for (i, &id) in corr_ids.iter().take(4).enumerate() {
        x[2 * i] = f64::from(matches[id].x[0]);
        x[2 * i + 1] = f64::from(matches[id].x[1]);
    }
    let (hu, det_u) = homography_estimate_unit(&x);

    let mut xp = [0.0f64; 8];
    for (i, &id) in corr_ids.iter().take(4).enumerate() {
        xp[2 * i] = f64::from(matches[id].xp[0]);
        xp[2 * i + 1] = f64::from(matches[id].xp[1]);
    }
    let (hup, det_up) = homography_estimate_unit(&xp);

    if det_u == 0.0 || det_up == 0.0 {
        return (Mat3::zeros(), 0.0);
    }

    let (hup_inv, det_inv) = hup.inverse();
    if det_inv == 0.0 {
        return (Mat3::zeros(), 0.0);
    }

    (hup_inv.mul(&hu), det_u * det_up)
}

/// Right singular vector of least singular value for a stack of 9-column
/// constraint rows; rows are zero-padded up to 9 so the full basis exists
pub(crate) fn svd_min_singular(rows: &[[f64; 9]]) -> ([f64; 9], f64) {
    let m = rows.len().max(9);
    let mut a = DMatrix::<f64>::zeros(m, 9);
    for (i, r) in rows.iter().enumerate() {
        for (j, &v) in r.iter().enumerate() {
            a[(i, j)] = v;
        }
    }

    let svd = a.svd(false, true);
    let Some(v_t) = svd.v_t else {
        return ([0.0; 9], f64::MAX);
    };

    let mut min_idx = 0;
    for i in 1..svd.singular_values.len() {
        if svd.singular_values[i] < svd.singular_values[min_idx] {
            min_idx = i;
        }
    }

    let mut h = [0.0f64; 9];
    for (j, hj) in h.iter_mut().enumerate() {
        *hj = v_t[(min_idx, j)];
    }
    (h, svd.singular_values[min_idx])
}

/// Two DLT constraint rows per correspondence, unknowns in row-major order
fn homography_constraints(c: &PointMatch2D) -> [[f64; 9]; 2] {
    let m0 = f64::from(c.x[0]);
    let m1 = f64::from(c.x[1]);
    let mp0 = f64::from(c.xp[0]);
    let mp1 = f64::from(c.xp[1]);

    [
        [0.0, 0.0, 0.0, -m0, -m1, -1.0, mp1 * m0, mp1 * m1, mp1],
        [m0, m1, 1.0, 0.0, 0.0, 0.0, -mp0 * m0, -mp0 * m1, -mp0],
    ]
}

/// DLT over all correspondences; returns the homography and the smallest
/// singular value of the constraint stack
pub fn homography_estimate_dlt(matches: &[PointMatch2D]) -> Result<(Mat3, f64)> {
    if matches.len() < 4 {
        warn!("insufficient correspondences for homography estimation by DLT");
        return Err(Error::InsufficientData(
            "Homography DLT needs at least 4 correspondences".to_string(),
        ));
    }

    let mut rows = Vec::with_capacity(2 * matches.len());
    for c in matches {
        let [r0, r1] = homography_constraints(c);
        rows.push(r0);
        rows.push(r1);
    }

    let (h, sval) = svd_min_singular(&rows);
    Ok((Mat3::from_row_major(h), sval))
}

/// DLT over the currently labeled inliers
pub fn homography_estimate_dlt_inliers(matches: &[PointMatch2D]) -> Result<(Mat3, f64)> {
    let n_inliers = homography_count_inliers(matches);
    if n_inliers < 4 {
        warn!("insufficient inliers for homography estimation by DLT");
        return Err(Error::InsufficientData(
            "Homography DLT needs at least 4 inliers".to_string(),
        ));
    }

    let mut rows = Vec::with_capacity(2 * n_inliers);
    for c in matches.iter().filter(|c| c.is_inlier) {
        let [r0, r1] = homography_constraints(c);
        rows.push(r0);
        rows.push(r1);
    }

    let (h, sval) = svd_min_singular(&rows);
    Ok((Mat3::from_row_major(h), sval))
}

/// Mean sigma-weighted forward transfer error over the labeled inliers
#[must_use]
pub fn homography_transfer_error_fwd(h: &Mat3, matches: &[PointMatch2D]) -> f64 {
    let mut e = 0.0;
    for c in matches.iter().filter(|c| c.is_inlier) {
        let mp = h.map_point([f64::from(c.x[0]), f64::from(c.x[1])]);
        let dx = mp[0] - f64::from(c.xp[0]);
        let dy = mp[1] - f64::from(c.xp[1]);
        e += (dx * dx + dy * dy).sqrt() / f64::from(c.sigma_xp);
    }
    e / matches.len() as f64
}

/// Mean sigma-weighted backward transfer error over the labeled inliers
#[must_use]
pub fn homography_transfer_error_bwd(h: &Mat3, matches: &[PointMatch2D]) -> f64 {
    let (h_inv, _) = h.inverse();

    let mut e = 0.0;
    for c in matches.iter().filter(|c| c.is_inlier) {
        let x = h_inv.map_point([f64::from(c.xp[0]), f64::from(c.xp[1])]);
        let dx = x[0] - f64::from(c.x[0]);
        let dy = x[1] - f64::from(c.x[1]);
        e += (dx * dx + dy * dy).sqrt() / f64::from(c.sigma_x);
    }
    e / matches.len() as f64
}

#[must_use]
pub fn homography_transfer_error_sym(h: &Mat3, matches: &[PointMatch2D]) -> f64 {
    0.5 * (homography_transfer_error_fwd(h, matches) + homography_transfer_error_bwd(h, matches))
}

/// Re-fit with DLT on the current inliers and relabel, repeating while the
/// inlier count improves by more than 5; returns the final count
pub fn homography_refine_inliers(
    h: &mut Mat3,
    matches: &mut [PointMatch2D],
    inlier_tolerance: f64,
) -> usize {
    let mut n_inliers_best = homography_mark_inliers(h, matches, inlier_tolerance);
    let mut n_inliers = 1;
    while n_inliers_best > n_inliers + 5 {
        if let Ok((refit, _)) = homography_estimate_dlt_inliers(matches) {
            *h = refit;
        }
        n_inliers = n_inliers_best;
        n_inliers_best = homography_mark_inliers(h, matches, inlier_tolerance);
    }
    n_inliers_best
}

/// Draw four distinct indices from the top `n_top` matches into `ids[0..4]`
pub(crate) fn select_prosac_candidates(
    sampler: &mut UniformSampler,
    n_top: usize,
    ids: &mut [usize],
) {
    debug_assert!(n_top >= 4 && ids.len() >= 4);

    ids[0] = sampler.below(n_top);
    loop {
        ids[1] = sampler.below(n_top);
        if ids[1] != ids[0] {
            break;
        }
    }
    loop {
        ids[2] = sampler.below(n_top);
        if ids[2] != ids[1] && ids[2] != ids[0] {
            break;
        }
    }
    loop {
        ids[3] = sampler.below(n_top);
        if ids[3] != ids[2] && ids[3] != ids[1] && ids[3] != ids[0] {
            break;
        }
    }
}

/// Robust homography estimation with PROSAC-style ordered sampling
///
/// Reorders `matches` by ascending cost, then samples minimal sets from a top
/// window that grows by one per iteration. Stops at `max_n_iter` iterations
/// or once 100 inliers support the best model, then refines with DLT on the
/// inlier set while the count keeps improving by more than 5. Returns the
/// final inlier count, zero when no structurally valid model was found.
pub fn homography_estimate_ransac(
    h: &mut Mat3,
    matches: &mut [PointMatch2D],
    inlier_tolerance: f64,
    max_n_iter: usize,
    sampler: &mut UniformSampler,
) -> usize {
    const PROSAC_START: usize = 10;
    const PROSAC_INC: usize = 1;

    let max_abs_cos = homography_max_abs_cos_default();
    let n_corr = matches.len();
    if n_corr < 4 {
        return 0;
    }

    sort_by_match_cost(matches);
    let mut n_top_hypo = PROSAC_START.min(n_corr);

    let mut h_best = Mat3::zeros();
    let mut n_inliers_best = 0;
    let mut n_inliers = 0;
    let mut ids = [0usize; 4];

    let mut iter = 0;
    while iter < max_n_iter && n_inliers < 100 {
        // try a few samples for a structurally valid candidate
        let mut tries = 10;
        loop {
            select_prosac_candidates(sampler, n_top_hypo, &mut ids);
            let (cand, _) = homography_estimate_4pt(&ids, matches);
            *h = cand;
            tries -= 1;
            if tries == 0 || homography_check(h, max_abs_cos) {
                break;
            }
        }

        n_inliers = homography_mark_inliers(h, matches, inlier_tolerance);
        if n_inliers > n_inliers_best {
            h_best = *h;
            n_inliers_best = n_inliers;
        }

        iter += 1;
        n_top_hypo = (n_top_hypo + PROSAC_INC).min(n_corr);
    }

    *h = h_best;
    let n_inliers_final = homography_refine_inliers(h, matches, inlier_tolerance);

    if !homography_check(h, max_abs_cos) {
        return 0;
    }

    n_inliers_final
}

/// `homography_estimate_ransac` on normalized coordinates; the model and the
/// match list come back in the original frame
pub fn homography_estimate_norm_ransac(
    h: &mut Mat3,
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
    let n_inliers = homography_estimate_ransac(h, matches, norm_tol, max_n_iter, sampler);

    stats.denormalize_homography(h);
    stats.denormalize_matches(matches);

    n_inliers
}

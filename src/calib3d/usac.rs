use crate::calib3d::fundamental::{
    fundamental_estimate_8pt, fundamental_mark_inliers, fundamental_refine_inliers,
    select_uniform_candidates,
};
use crate::calib3d::homography::{
    homography_check, homography_estimate_4pt, homography_mark_inliers,
    homography_max_abs_cos_default, homography_refine_inliers, select_prosac_candidates,
};
use crate::calib3d::{sort_by_match_cost, PointMatch2D, PointMatchStats};
use crate::core::{Mat3, UniformSampler};

/// The callback contract of the universal sample-consensus driver
///
/// A problem supplies minimal-sample drawing, model fitting and scoring; the
/// driver owns the search loop. Defaults make the cheap filters permissive
/// and refinement a no-op.
pub trait UsacProblem {
    /// Fill `sample_ids` with a minimal sample
    fn sample(&mut self, sample_ids: &mut [usize]);

    /// Cheap pre-fit filter on the drawn sample
    fn sample_check(&self, _sample_ids: &[usize]) -> bool {
        true
    }

    /// Fit one or more candidate models from the sample
    fn fit(&mut self, models: &mut Vec<Mat3>, sample_ids: &[usize]);

    /// Structural validity of a candidate
    fn model_check(&self, _model: &Mat3, _sample_ids: &[usize]) -> bool {
        true
    }

    /// Scalar utility of a candidate; higher is better
    fn score(&mut self, model: &Mat3, sample_ids: &[usize]) -> f64;

    /// Reject configurations that masquerade as good models
    fn degeneracy_check(&self, _model: &Mat3, _sample_ids: &[usize]) -> bool {
        true
    }

    /// Optional refinement of a candidate using its sample support; returns
    /// true when `refined` was produced
    fn refine_local(&mut self, _refined: &mut Mat3, _model: &Mat3, _sample_ids: &[usize]) -> bool {
        false
    }

    /// Refine the best model using all current inliers
    fn refine_global(&mut self, refined: &mut Mat3, model: &Mat3);

    /// Decide when to stop; sees the best model and score so far
    fn terminate(&mut self, best_model: &Mat3, best_score: f64) -> bool;
}

/// Universal sample-consensus driver
///
/// Runs the sample / fit / check / score loop until the problem terminates,
/// then applies global refinement and returns the best model with its score.
/// The driver itself never fails; with nothing accepted it returns the zero
/// model and `-inf`.
pub fn usac<P: UsacProblem>(problem: &mut P, min_n_samples: usize) -> (Mat3, f64) {
    debug_assert!(min_n_samples >= 1);

    let mut best_model = Mat3::zeros();
    let mut best_score = f64::NEG_INFINITY;

    let mut models: Vec<Mat3> = Vec::with_capacity(1);
    let mut sample_ids = vec![0usize; min_n_samples];

    while !problem.terminate(&best_model, best_score) {
        problem.sample(&mut sample_ids);
        if !problem.sample_check(&sample_ids) {
            continue;
        }

        models.clear();
        problem.fit(&mut models, &sample_ids);

        for i in 0..models.len() {
            let model = models[i];
            if !problem.model_check(&model, &sample_ids) {
                continue;
            }

            let score = problem.score(&model, &sample_ids);
            if score > best_score {
                if !problem.degeneracy_check(&model, &sample_ids) {
                    continue;
                }

                let mut refined = Mat3::zeros();
                if problem.refine_local(&mut refined, &model, &sample_ids) {
                    let local_score = problem.score(&refined, &sample_ids);
                    if local_score > score {
                        best_model = refined;
                        best_score = local_score;
                    } else {
                        best_model = model;
                        best_score = score;
                    }
                } else {
                    best_model = model;
                    best_score = score;
                }
            }
        }
    }

    let mut refined = Mat3::zeros();
    problem.refine_global(&mut refined, &best_model);
    let global_score = problem.score(&refined, &sample_ids);
    if global_score > best_score {
        best_model = refined;
        best_score = global_score;
    }

    (best_model, best_score)
}

const PROSAC_START: usize = 10;
const PROSAC_INC: usize = 1;
const INLIER_COUNT_STOP: usize = 200;

struct HomographyProblem<'a> {
    matches: &'a mut [PointMatch2D],
    inlier_tolerance: f64,
    max_n_iter: usize,
    max_abs_cos: f64,
    n_top_hypo: usize,
    n_iterations: usize,
    sampler: &'a mut UniformSampler,
}

impl UsacProblem for HomographyProblem<'_> {
    fn sample(&mut self, sample_ids: &mut [usize]) {
        select_prosac_candidates(self.sampler, self.n_top_hypo, sample_ids);
    }

    fn fit(&mut self, models: &mut Vec<Mat3>, sample_ids: &[usize]) {
        let (h, det) = homography_estimate_4pt(sample_ids, self.matches);
        if det != 0.0 {
            models.push(h);
        }
    }

    fn model_check(&self, model: &Mat3, _sample_ids: &[usize]) -> bool {
        homography_check(model, self.max_abs_cos)
    }

    fn score(&mut self, model: &Mat3, _sample_ids: &[usize]) -> f64 {
        homography_mark_inliers(model, self.matches, self.inlier_tolerance) as f64
    }

    fn refine_global(&mut self, refined: &mut Mat3, model: &Mat3) {
        *refined = *model;
        homography_refine_inliers(refined, self.matches, self.inlier_tolerance);
    }

    fn terminate(&mut self, _best_model: &Mat3, best_score: f64) -> bool {
        self.n_iterations += 1;
        self.n_top_hypo = (self.n_top_hypo + PROSAC_INC).min(self.matches.len());

        let n_inliers = if best_score.is_finite() {
            best_score as usize
        } else {
            0
        };
        self.n_iterations >= self.max_n_iter || n_inliers >= INLIER_COUNT_STOP
    }
}

/// USAC homography estimation with PROSAC-style ordered sampling
///
/// Reorders `matches` by ascending cost. Returns the inlier count of the
/// final model, zero when no structurally valid model was found.
pub fn usac_estimate_homography(
    h: &mut Mat3,
    matches: &mut [PointMatch2D],
    inlier_tolerance: f64,
    max_n_iter: usize,
    sampler: &mut UniformSampler,
) -> usize {
    if matches.len() < 4 {
        return 0;
    }

    sort_by_match_cost(matches);

    let n_corr = matches.len();
    let max_abs_cos = homography_max_abs_cos_default();
    let mut problem = HomographyProblem {
        matches: &mut *matches,
        inlier_tolerance,
        max_n_iter,
        max_abs_cos,
        n_top_hypo: PROSAC_START.min(n_corr),
        n_iterations: 0,
        sampler: &mut *sampler,
    };

    let (best, _) = usac(&mut problem, 4);
    *h = best;

    let n_inliers = homography_mark_inliers(h, matches, inlier_tolerance);
    if !homography_check(h, max_abs_cos) {
        return 0;
    }
    n_inliers
}

/// `usac_estimate_homography` on normalized coordinates
pub fn usac_estimate_homography_norm(
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
    let n_inliers = usac_estimate_homography(h, matches, norm_tol, max_n_iter, sampler);

    stats.denormalize_homography(h);
    stats.denormalize_matches(matches);

    n_inliers
}

struct FundamentalProblem<'a> {
    matches: &'a mut [PointMatch2D],
    inlier_tolerance: f64,
    max_n_iter: usize,
    n_iterations: usize,
    sampler: &'a mut UniformSampler,
}

impl UsacProblem for FundamentalProblem<'_> {
    fn sample(&mut self, sample_ids: &mut [usize]) {
        select_uniform_candidates(self.sampler, self.matches.len(), sample_ids);
    }

    fn fit(&mut self, models: &mut Vec<Mat3>, sample_ids: &[usize]) {
        let (f, sval) = fundamental_estimate_8pt(sample_ids, self.matches);
        if sval.is_finite() {
            models.push(f);
        }
    }

    fn score(&mut self, model: &Mat3, _sample_ids: &[usize]) -> f64 {
        fundamental_mark_inliers(model, self.matches, self.inlier_tolerance) as f64
    }

    fn refine_global(&mut self, refined: &mut Mat3, model: &Mat3) {
        *refined = *model;
        fundamental_refine_inliers(refined, self.matches, self.inlier_tolerance);
    }

    fn terminate(&mut self, _best_model: &Mat3, best_score: f64) -> bool {
        self.n_iterations += 1;

        let n_inliers = if best_score.is_finite() {
            best_score as usize
        } else {
            0
        };
        self.n_iterations >= self.max_n_iter || n_inliers >= INLIER_COUNT_STOP
    }
}

/// USAC fundamental-matrix estimation with uniform 8-point sampling
pub fn usac_estimate_fundamental(
    f: &mut Mat3,
    matches: &mut [PointMatch2D],
    inlier_tolerance: f64,
    max_n_iter: usize,
    sampler: &mut UniformSampler,
) -> usize {
    if matches.len() < 8 {
        return 0;
    }

    let mut problem = FundamentalProblem {
        matches: &mut *matches,
        inlier_tolerance,
        max_n_iter,
        n_iterations: 0,
        sampler: &mut *sampler,
    };

    let (best, _) = usac(&mut problem, 8);
    *f = best;

    fundamental_mark_inliers(f, matches, inlier_tolerance)
}

/// `usac_estimate_fundamental` on normalized coordinates
pub fn usac_estimate_fundamental_norm(
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
    let n_inliers = usac_estimate_fundamental(f, matches, norm_tol, max_n_iter, sampler);

    stats.denormalize_fundamental(f);
    stats.denormalize_matches(matches);

    n_inliers
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts how the driver exercises each callback
    struct CountingProblem {
        n_samples: usize,
        n_fits: usize,
        n_scores: usize,
        n_global: usize,
        iterations: usize,
        max_iterations: usize,
    }

    impl UsacProblem for CountingProblem {
        fn sample(&mut self, sample_ids: &mut [usize]) {
            self.n_samples += 1;
            sample_ids.fill(0);
        }

        fn fit(&mut self, models: &mut Vec<Mat3>, _sample_ids: &[usize]) {
            self.n_fits += 1;
            models.push(Mat3::identity());
        }

        fn score(&mut self, _model: &Mat3, _sample_ids: &[usize]) -> f64 {
            self.n_scores += 1;
            self.n_fits as f64
        }

        fn refine_global(&mut self, refined: &mut Mat3, model: &Mat3) {
            self.n_global += 1;
            *refined = *model;
        }

        fn terminate(&mut self, _best_model: &Mat3, _best_score: f64) -> bool {
            self.iterations += 1;
            self.iterations > self.max_iterations
        }
    }

    #[test]
    fn test_driver_runs_until_termination() {
        let mut problem = CountingProblem {
            n_samples: 0,
            n_fits: 0,
            n_scores: 0,
            n_global: 0,
            iterations: 0,
            max_iterations: 10,
        };
        let (model, score) = usac(&mut problem, 4);

        assert_eq!(problem.n_samples, 10);
        assert_eq!(problem.n_fits, 10);
        // one score per candidate plus one for the globally refined model
        assert_eq!(problem.n_scores, 11);
        assert_eq!(problem.n_global, 1);
        assert!(score >= 10.0);
        assert_eq!(model, Mat3::identity());
    }

    /// A problem whose checks always fail keeps the zero model
    struct RejectingProblem {
        iterations: usize,
    }

    impl UsacProblem for RejectingProblem {
        fn sample(&mut self, sample_ids: &mut [usize]) {
            sample_ids.fill(0);
        }

        fn fit(&mut self, models: &mut Vec<Mat3>, _sample_ids: &[usize]) {
            models.push(Mat3::identity());
        }

        fn model_check(&self, _model: &Mat3, _sample_ids: &[usize]) -> bool {
            false
        }

        fn score(&mut self, _model: &Mat3, _sample_ids: &[usize]) -> f64 {
            f64::NEG_INFINITY
        }

        fn refine_global(&mut self, refined: &mut Mat3, _model: &Mat3) {
            *refined = Mat3::zeros();
        }

        fn terminate(&mut self, _best_model: &Mat3, _best_score: f64) -> bool {
            self.iterations += 1;
            self.iterations > 5
        }
    }

    #[test]
    fn test_driver_returns_best_so_far_without_acceptance() {
        let mut problem = RejectingProblem { iterations: 0 };
        let (model, _) = usac(&mut problem, 4);
        assert_eq!(model, Mat3::zeros());
    }
}

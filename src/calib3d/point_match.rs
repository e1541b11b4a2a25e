use crate::features2d::Keypoint;

/// A putative correspondence between two images
///
/// Coordinates are in input-image frames. `sigma_x`/`sigma_xp` carry the
/// per-point localization standard deviations used by the normalizer;
/// `is_inlier` is meaningful only after a model has been fitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMatch2D {
    pub x: [f32; 2],
    pub xp: [f32; 2],
    pub match_cost: f32,
    pub sigma_x: f32,
    pub sigma_xp: f32,
    pub id: u64,
    pub idp: u64,
    pub is_inlier: bool,
}

impl PointMatch2D {
    /// Build a match from a keypoint pair; `sigma0` is the localization
    /// standard deviation at unit scale
    #[must_use]
    pub fn from_keypoints(k: &Keypoint, kp: &Keypoint, sigma0: f32, match_cost: f32) -> Self {
        Self {
            x: [k.xs0(), k.ys0()],
            xp: [kp.xs0(), kp.ys0()],
            match_cost,
            sigma_x: sigma0 * k.scale,
            sigma_xp: sigma0 * kp.scale,
            id: k.id,
            idp: kp.id,
            is_inlier: false,
        }
    }
}

/// Sort matches by ascending match cost (best first)
pub fn sort_by_match_cost(matches: &mut [PointMatch2D]) {
    matches.sort_by(|a, b| {
        a.match_cost
            .partial_cmp(&b.match_cost)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

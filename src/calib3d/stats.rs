use log::warn;

use crate::calib3d::PointMatch2D;
use crate::core::Mat3;
use crate::error::{Error, Result};

/// Normalization statistics of a match list: per-side means and average
/// centered distances
///
/// Normalized coordinates are `(x - m) / d` on the first side and
/// `(x' - mp) / dp` on the second; denormalizing a model depends only on
/// these four numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMatchStats {
    pub m: [f64; 2],
    pub mp: [f64; 2],
    pub d: f64,
    pub dp: f64,
}

impl Default for PointMatchStats {
    fn default() -> Self {
        Self {
            m: [0.0; 2],
            mp: [0.0; 2],
            d: 1.0,
            dp: 1.0,
        }
    }
}

impl PointMatchStats {
    /// Center the match list, scale both sides to unit average distance and
    /// return the statistics needed to undo the transform
    pub fn normalize_matches(matches: &mut [PointMatch2D]) -> Result<Self> {
        let n = matches.len();
        if n == 0 {
            warn!("cannot normalize an empty match list");
            return Err(Error::InsufficientData(
                "Normalization requires at least one match".to_string(),
            ));
        }

        let mut stats = Self {
            m: [0.0; 2],
            mp: [0.0; 2],
            d: 0.0,
            dp: 0.0,
        };

        for c in matches.iter() {
            stats.m[0] += f64::from(c.x[0]);
            stats.m[1] += f64::from(c.x[1]);
            stats.mp[0] += f64::from(c.xp[0]);
            stats.mp[1] += f64::from(c.xp[1]);
        }
        stats.m[0] /= n as f64;
        stats.m[1] /= n as f64;
        stats.mp[0] /= n as f64;
        stats.mp[1] /= n as f64;

        for c in matches.iter_mut() {
            c.x[0] -= stats.m[0] as f32;
            c.x[1] -= stats.m[1] as f32;
            c.xp[0] -= stats.mp[0] as f32;
            c.xp[1] -= stats.mp[1] as f32;

            stats.d += f64::from(c.x[0] * c.x[0] + c.x[1] * c.x[1]).sqrt();
            stats.dp += f64::from(c.xp[0] * c.xp[0] + c.xp[1] * c.xp[1]).sqrt();
        }
        stats.d /= n as f64;
        stats.dp /= n as f64;

        if stats.d <= 0.0 || stats.dp <= 0.0 {
            warn!("zero spread in match list; normalization is under-determined");
            return Err(Error::InsufficientData(
                "Matches have zero spread on one side".to_string(),
            ));
        }

        for c in matches.iter_mut() {
            c.x[0] /= stats.d as f32;
            c.x[1] /= stats.d as f32;
            c.xp[0] /= stats.dp as f32;
            c.xp[1] /= stats.dp as f32;
            c.sigma_x /= stats.d as f32;
            c.sigma_xp /= stats.dp as f32;
        }

        Ok(stats)
    }

    /// Undo `normalize_matches` on the coordinates and sigmas
    pub fn denormalize_matches(&self, matches: &mut [PointMatch2D]) {
        for c in matches.iter_mut() {
            c.x[0] = (self.d * f64::from(c.x[0]) + self.m[0]) as f32;
            c.x[1] = (self.d * f64::from(c.x[1]) + self.m[1]) as f32;
            c.xp[0] = (self.dp * f64::from(c.xp[0]) + self.mp[0]) as f32;
            c.xp[1] = (self.dp * f64::from(c.xp[1]) + self.mp[1]) as f32;
            c.sigma_x *= self.d as f32;
            c.sigma_xp *= self.dp as f32;
        }
    }

    /// Rewrite a homography estimated in normalized coordinates so that it
    /// maps original first-side points to original second-side points
    pub fn denormalize_homography(&self, h: &mut Mat3) {
        let sx = 1.0 / self.d;
        let sxp = 1.0 / self.dp;

        let tx = -self.m[0] * sx;
        let ty = -self.m[1] * sx;
        let txp = -self.mp[0] * sxp;
        let typ = -self.mp[1] * sxp;

        let hm = &h.m;
        let t = [
            (hm[0] - hm[2] * txp) * self.dp,
            (hm[1] - hm[2] * typ) * self.dp,
            (hm[3] - hm[5] * txp) * self.dp,
            (hm[4] - hm[5] * typ) * self.dp,
        ];

        let mut out = [0.0f64; 9];
        out[0] = sx * t[0];
        out[1] = sx * t[1];
        out[2] = sx * hm[2];

        out[3] = sx * t[2];
        out[4] = sx * t[3];
        out[5] = sx * hm[5];

        out[6] = tx * t[0] + ty * t[2] + hm[6] * self.dp - hm[8] * txp * self.dp;
        out[7] = tx * t[1] + ty * t[3] + hm[7] * self.dp - hm[8] * typ * self.dp;
        out[8] = hm[8] + tx * hm[2] + ty * hm[5];

        h.m = out;
    }

    /// Rewrite a fundamental matrix estimated in normalized coordinates:
    /// with `T`/`Tp` the per-side normalizing similarities, the original-frame
    /// matrix is `Tp^T * F * T`
    pub fn denormalize_fundamental(&self, f: &mut Mat3) {
        let sx = 1.0 / self.d;
        let sxp = 1.0 / self.dp;

        let tx = -self.m[0] * sx;
        let ty = -self.m[1] * sx;
        let txp = -self.mp[0] * sxp;
        let typ = -self.mp[1] * sxp;

        let fm = &f.m;
        // G = Tp^T * F, column by column
        let g = [
            sxp * fm[0],
            sxp * fm[1],
            txp * fm[0] + typ * fm[1] + fm[2],
            sxp * fm[3],
            sxp * fm[4],
            txp * fm[3] + typ * fm[4] + fm[5],
            sxp * fm[6],
            sxp * fm[7],
            txp * fm[6] + typ * fm[7] + fm[8],
        ];

        let mut out = [0.0f64; 9];
        out[0] = sx * g[0];
        out[1] = sx * g[1];
        out[2] = sx * g[2];

        out[3] = sx * g[3];
        out[4] = sx * g[4];
        out[5] = sx * g[5];

        out[6] = tx * g[0] + ty * g[3] + g[6];
        out[7] = tx * g[1] + ty * g[4] + g[7];
        out[8] = tx * g[2] + ty * g[5] + g[8];

        f.m = out;
    }
}

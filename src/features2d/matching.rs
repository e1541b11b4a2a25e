use crate::calib3d::PointMatch2D;
use crate::features2d::KeypointStore;

/// Per-point localization standard deviation at unit scale
const SIFT_LOCALIZATION_STD_DEV: f32 = 0.3;

/// Squared L2 distance between two byte descriptors in integer arithmetic
#[must_use]
pub fn desc_dist_sq(a: &[u8], b: &[u8]) -> i32 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0i32;
    for (&ai, &bi) in a.iter().zip(b.iter()) {
        let d = i32::from(ai) - i32::from(bi);
        sum += d * d;
    }
    sum
}

/// Brute-force descriptor matching from `store` to `storep`
///
/// With `0 < dist_ratio_thr < 1` a match is emitted only when it passes
/// Lowe's ratio test against the second-nearest neighbor; any other threshold
/// emits the nearest neighbor for every query. The output is ordered by query
/// index; callers wanting ascending cost sort afterwards.
#[must_use]
pub fn match_brute_force(
    store: &KeypointStore,
    storep: &KeypointStore,
    dist_ratio_thr: f32,
) -> Vec<PointMatch2D> {
    let n = store.len();
    let np = storep.len();
    let mut matches = Vec::with_capacity(n.min(np.max(1)));
    if n == 0 || np == 0 {
        return matches;
    }

    let check_dist_ratio = dist_ratio_thr > 0.0 && dist_ratio_thr < 1.0;

    if check_dist_ratio {
        let dist_thr_sq = dist_ratio_thr * dist_ratio_thr;

        for i in 0..n {
            let mut nn_ids = [usize::MAX; 2];
            let mut nn_dist_sq = [i32::MAX; 2];
            let desc_i = store.descriptor(i);

            for j in 0..np {
                let d_sq = desc_dist_sq(desc_i, storep.descriptor(j));
                if d_sq < nn_dist_sq[0] {
                    nn_dist_sq[1] = nn_dist_sq[0];
                    nn_dist_sq[0] = d_sq;

                    nn_ids[1] = nn_ids[0];
                    nn_ids[0] = j;
                } else if d_sq < nn_dist_sq[1] {
                    nn_dist_sq[1] = d_sq;
                    nn_ids[1] = j;
                }
            }

            if (nn_dist_sq[0] as f32) < dist_thr_sq * nn_dist_sq[1] as f32 {
                matches.push(PointMatch2D::from_keypoints(
                    store.keypoint(i),
                    storep.keypoint(nn_ids[0]),
                    SIFT_LOCALIZATION_STD_DEV,
                    nn_dist_sq[0] as f32,
                ));
            }
        }
    } else {
        for i in 0..n {
            let mut nn_id = 0usize;
            let mut nn_dist_sq = i32::MAX;
            let desc_i = store.descriptor(i);

            for j in 0..np {
                let d_sq = desc_dist_sq(desc_i, storep.descriptor(j));
                if d_sq < nn_dist_sq {
                    nn_dist_sq = d_sq;
                    nn_id = j;
                }
            }

            matches.push(PointMatch2D::from_keypoints(
                store.keypoint(i),
                storep.keypoint(nn_id),
                SIFT_LOCALIZATION_STD_DEV,
                nn_dist_sq as f32,
            ));
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features2d::{Keypoint, SIFT_DESC_DIM};

    fn store_with_descriptors(descs: &[[u8; SIFT_DESC_DIM]]) -> KeypointStore {
        let mut store = KeypointStore::new();
        for (i, d) in descs.iter().enumerate() {
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
            store.descriptor_mut(id).copy_from_slice(d);
        }
        store
    }

    fn constant_desc(v: u8) -> [u8; SIFT_DESC_DIM] {
        [v; SIFT_DESC_DIM]
    }

    #[test]
    fn test_identical_sets_match_with_zero_cost() {
        let descs: Vec<_> = (0..8u8).map(|i| constant_desc(i * 30)).collect();
        let store = store_with_descriptors(&descs);
        let storep = store_with_descriptors(&descs);

        let matches = match_brute_force(&store, &storep, 0.6);
        assert_eq!(matches.len(), 8);
        for (i, m) in matches.iter().enumerate() {
            assert_eq!(m.match_cost, 0.0);
            assert_eq!(m.id, i as u64);
            assert_eq!(m.idp, i as u64);
        }
    }

    #[test]
    fn test_ratio_test_guarantee() {
        let descs: Vec<_> = (0..6u8).map(|i| constant_desc(i * 40)).collect();
        let descsp: Vec<_> = (0..6u8).map(|i| constant_desc(i * 40 + 3)).collect();
        let store = store_with_descriptors(&descs);
        let storep = store_with_descriptors(&descsp);

        let tau = 0.8f32;
        let matches = match_brute_force(&store, &storep, tau);
        for m in &matches {
            // second-best must lose by at least the squared ratio
            let desc = store.descriptor(m.id as usize);
            let mut dists: Vec<i32> = (0..storep.len())
                .map(|j| desc_dist_sq(desc, storep.descriptor(j)))
                .collect();
            dists.sort_unstable();
            assert!((m.match_cost as f32) < tau * tau * dists[1] as f32);
        }
    }

    #[test]
    fn test_nn_mode_emits_every_query() {
        let descs: Vec<_> = (0..5u8).map(|i| constant_desc(i * 50)).collect();
        let store = store_with_descriptors(&descs);
        let storep = store_with_descriptors(&descs[..2]);

        let matches = match_brute_force(&store, &storep, 0.0);
        assert_eq!(matches.len(), 5);
    }

    #[test]
    fn test_empty_inputs() {
        let empty = KeypointStore::new();
        let store = store_with_descriptors(&[constant_desc(1)]);
        assert!(match_brute_force(&empty, &store, 0.8).is_empty());
        assert!(match_brute_force(&store, &empty, 0.8).is_empty());
    }

    #[test]
    fn test_sigma_scales_with_keypoint() {
        let mut store = store_with_descriptors(&[constant_desc(0)]);
        store.keypoint_mut(0).scale = 2.0;
        let storep = store_with_descriptors(&[constant_desc(0)]);

        let matches = match_brute_force(&store, &storep, 0.0);
        assert!((matches[0].sigma_x - 0.6).abs() < 1e-6);
        assert!((matches[0].sigma_xp - 0.3).abs() < 1e-6);
    }
}

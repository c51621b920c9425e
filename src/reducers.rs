//! # Waypoint Reducers
//!
//! Five interchangeable polyline-simplification strategies behind the
//! [`WaypointReducer`] trait.
//!
//! ## Contract
//!
//! Every strategy classifies the points of a track as kept or discarded and
//! returns a boolean inclusion mask of the same length as the input. Points
//! are never created, reordered, or mutated; deleting the discarded points
//! is the caller's job (so that undo handling stays outside this crate).
//!
//! - tracks of length ≤ 2 come back all-true (nothing to remove)
//! - the first and last point of a non-empty track are always retained
//! - `epsilon` is a tolerance in meters, except for [`NthPoint`] where it
//!   is a stride count
//!
//! ## Chained invocation
//!
//! [`WaypointReducer::reduce_masked`] lets one reducer refine the result of
//! another: the algorithm runs only on the points a prior mask retained, and
//! points the prior mask excluded stay excluded. The output mask can only
//! narrow the retained set, never widen it.
//!
//! ## Algorithm references
//!
//! - Douglas-Peucker: <https://en.wikipedia.org/wiki/Ramer%E2%80%93Douglas%E2%80%93Peucker_algorithm>
//! - Visvalingam-Whyatt: <https://en.wikipedia.org/wiki/Visvalingam%E2%80%93Whyatt_algorithm>
//! - Reumann-Witkam / example values: <https://github.com/emcconville/point-reduction-algorithms>
//! - Radial distance: <https://github.com/mourner/simplify-js>

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::debug;

use crate::geo_utils::{distance, perpendicular_distance, triangle_area, DistanceAlgorithm};
use crate::{GeoPoint, ReduceError, ReducerSettings};

/// Common interface for all reduction strategies.
///
/// Implementations are stateless; a single shared instance can serve
/// concurrent callers.
pub trait WaypointReducer {
    /// Run the algorithm over `track` with the given tolerance and return
    /// the inclusion mask (`true` = keep).
    ///
    /// `epsilon` must be non-negative; negative values are clamped to zero
    /// after a debug assertion.
    fn reduce(&self, track: &[GeoPoint], epsilon: f64) -> Vec<bool>;

    /// Run the algorithm only on the points where `prior` is `true`.
    ///
    /// Returns a full-length mask in which previously excluded points stay
    /// excluded and previously retained points survive iff the algorithm
    /// kept them. This is the building block for reduction pipelines: a
    /// cheap pass can thin the track before an expensive pass refines it.
    ///
    /// # Errors
    ///
    /// [`ReduceError::MaskLengthMismatch`] when `prior.len() != track.len()`
    /// (a caller bug, never silently recovered), and
    /// [`ReduceError::NegativeEpsilon`] for `epsilon < 0`.
    fn reduce_masked(
        &self,
        track: &[GeoPoint],
        prior: &[bool],
        epsilon: f64,
    ) -> Result<Vec<bool>, ReduceError> {
        if prior.len() != track.len() {
            return Err(ReduceError::MaskLengthMismatch {
                expected: track.len(),
                actual: prior.len(),
            });
        }
        if epsilon < 0.0 {
            return Err(ReduceError::NegativeEpsilon(epsilon));
        }

        let subset: Vec<GeoPoint> = track
            .iter()
            .zip(prior)
            .filter(|(_, &retained)| retained)
            .map(|(p, _)| *p)
            .collect();
        debug!(
            "chained reduction: {} of {} points remain from prior mask",
            subset.len(),
            track.len()
        );

        let sub_keep = self.reduce(&subset, epsilon);

        let mut result = vec![false; track.len()];
        let mut cursor = 0;
        for (i, &retained) in prior.iter().enumerate() {
            if retained {
                result[i] = sub_keep[cursor];
                cursor += 1;
            }
        }
        Ok(result)
    }

    /// [`WaypointReducer::reduce`] with the process-wide default epsilon.
    fn reduce_with_defaults(&self, track: &[GeoPoint]) -> Vec<bool> {
        self.reduce(track, ReducerSettings::global().default_epsilon)
    }

    /// [`WaypointReducer::reduce_masked`] with the process-wide default
    /// epsilon.
    fn reduce_masked_with_defaults(
        &self,
        track: &[GeoPoint],
        prior: &[bool],
    ) -> Result<Vec<bool>, ReduceError> {
        self.reduce_masked(track, prior, ReducerSettings::global().default_epsilon)
    }
}

/// Epsilon is a precondition (`>= 0`); clamp after a debug assertion so
/// release builds degrade to a no-op reduction instead of misbehaving.
fn sanitize_epsilon(epsilon: f64) -> f64 {
    debug_assert!(epsilon >= 0.0, "epsilon must be non-negative, got {epsilon}");
    epsilon.max(0.0)
}

// ============================================================================
// Douglas-Peucker
// ============================================================================

/// Recursive divide-and-conquer simplification with a global error bound.
///
/// Within a span, the point farthest from the chord between the span's
/// endpoints is located; if that distance exceeds epsilon the point is kept
/// and both halves are processed recursively, otherwise every interior
/// point of the span is discarded. Ties on the maximum distance go to the
/// first occurrence by index.
#[derive(Debug, Clone, Copy)]
pub struct DouglasPeucker {
    /// Distance formula used for the point-to-chord measurements.
    pub algorithm: DistanceAlgorithm,
}

impl Default for DouglasPeucker {
    fn default() -> Self {
        Self {
            algorithm: DistanceAlgorithm::Haversine,
        }
    }
}

impl DouglasPeucker {
    pub fn new(algorithm: DistanceAlgorithm) -> Self {
        Self { algorithm }
    }
}

impl WaypointReducer for DouglasPeucker {
    fn reduce(&self, track: &[GeoPoint], epsilon: f64) -> Vec<bool> {
        let epsilon = sanitize_epsilon(epsilon);
        let n = track.len();
        if n <= 2 {
            return vec![true; n];
        }

        let mut keep = vec![false; n];
        keep[0] = true;
        keep[n - 1] = true;
        douglas_peucker_span(track, 0, n - 1, epsilon, self.algorithm, &mut keep);
        keep
    }
}

fn douglas_peucker_span(
    track: &[GeoPoint],
    first: usize,
    last: usize,
    epsilon: f64,
    algorithm: DistanceAlgorithm,
    keep: &mut [bool],
) {
    if last <= first + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_index = first;
    for i in first + 1..last {
        let dist = perpendicular_distance(&track[i], &track[first], &track[last], algorithm);
        // strict comparison keeps the first occurrence on ties
        if dist > max_dist {
            max_dist = dist;
            max_index = i;
        }
    }

    if max_dist > epsilon {
        keep[max_index] = true;
        douglas_peucker_span(track, first, max_index, epsilon, algorithm, keep);
        douglas_peucker_span(track, max_index, last, epsilon, algorithm, keep);
    }
}

// ============================================================================
// Visvalingam-Whyatt
// ============================================================================

/// Iterative removal of the point spanning the smallest triangle with its
/// current neighbors.
///
/// Runs until the smallest remaining triangle area reaches the threshold.
/// Epsilon is a distance in meters; the area threshold is `epsilon²` (the
/// area of a triangle whose base and height are both epsilon-scale).
///
/// Backed by a lazy-invalidation min-heap, so a track of n points costs
/// O(n log n) rather than the O(n²) of a linear rescan per removal. Ties
/// on equal area go to the lowest index, matching what a first-occurrence
/// linear scan would pick.
#[derive(Debug, Clone, Copy)]
pub struct VisvalingamWhyatt {
    /// Distance formula used for the triangle side lengths.
    pub algorithm: DistanceAlgorithm,
}

impl Default for VisvalingamWhyatt {
    fn default() -> Self {
        Self {
            algorithm: DistanceAlgorithm::Haversine,
        }
    }
}

impl VisvalingamWhyatt {
    pub fn new(algorithm: DistanceAlgorithm) -> Self {
        Self { algorithm }
    }
}

/// Heap entry ordered by (area, index); stale entries are recognized by a
/// per-point version counter.
#[derive(Debug, Clone, Copy)]
struct AreaEntry {
    area: f64,
    index: usize,
    version: u64,
}

impl PartialEq for AreaEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AreaEntry {}

impl Ord for AreaEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest area pops first,
        // with the lowest index winning equal areas
        self.area
            .total_cmp(&other.area)
            .then(self.index.cmp(&other.index))
            .reverse()
    }
}

impl PartialOrd for AreaEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl WaypointReducer for VisvalingamWhyatt {
    fn reduce(&self, track: &[GeoPoint], epsilon: f64) -> Vec<bool> {
        let epsilon = sanitize_epsilon(epsilon);
        let n = track.len();
        if n <= 2 {
            return vec![true; n];
        }

        // epsilon is a distance tolerance; triangles below epsilon² are
        // considered insignificant
        let threshold = epsilon * epsilon;

        // doubly linked list over indices, so neighbor lookups survive
        // removals without shifting the arrays
        let mut prev: Vec<usize> = (0..n).map(|i| i.saturating_sub(1)).collect();
        let mut next: Vec<usize> = (0..n).map(|i| (i + 1).min(n - 1)).collect();
        let mut area = vec![0.0_f64; n];
        let mut version = vec![0_u64; n];
        let mut keep = vec![true; n];

        let mut heap = BinaryHeap::with_capacity(n);
        for i in 1..n - 1 {
            area[i] = triangle_area(&track[i - 1], &track[i], &track[i + 1], self.algorithm);
            heap.push(AreaEntry {
                area: area[i],
                index: i,
                version: 0,
            });
        }

        while let Some(entry) = heap.pop() {
            let i = entry.index;
            if !keep[i] || entry.version != version[i] {
                continue; // stale entry, the point moved or is gone
            }
            if entry.area >= threshold {
                break;
            }

            keep[i] = false;

            let p = prev[i];
            let q = next[i];
            next[p] = q;
            prev[q] = p;

            // only the two ex-neighbors change their triangles
            for &j in &[p, q] {
                if j == 0 || j == n - 1 {
                    continue;
                }
                area[j] = triangle_area(&track[prev[j]], &track[j], &track[next[j]], self.algorithm);
                version[j] += 1;
                heap.push(AreaEntry {
                    area: area[j],
                    index: j,
                    version: version[j],
                });
            }
        }

        keep
    }
}

// ============================================================================
// Reumann-Witkam
// ============================================================================

/// Single forward sweep with a sliding key segment.
///
/// The key segment starts as the line through the first two points. Points
/// within epsilon perpendicular distance of the extended key line are
/// dropped; the first point beyond epsilon is kept, becomes the new second
/// key point, and the segment slides forward.
///
/// Distances are measured with the flat small-distance approximation
/// regardless of any other configuration; this reducer trades geodetic
/// rigor for speed on adjacent-point scale spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReumannWitkam;

impl WaypointReducer for ReumannWitkam {
    fn reduce(&self, track: &[GeoPoint], epsilon: f64) -> Vec<bool> {
        let epsilon = sanitize_epsilon(epsilon);
        let n = track.len();
        if n <= 2 {
            return vec![true; n];
        }

        let mut keep = vec![false; n];
        keep[0] = true;
        keep[n - 1] = true;

        // the key segment is always formed by kept points, so the initial
        // second key point is retained
        keep[1] = true;

        let mut key1 = 0;
        let mut key2 = 1;
        for i in 2..n - 1 {
            let dist = perpendicular_distance(
                &track[i],
                &track[key1],
                &track[key2],
                DistanceAlgorithm::SmallDistanceApproximation,
            );
            if dist < epsilon {
                continue; // still inside the tolerance corridor
            }
            keep[i] = true;
            key1 = key2;
            key2 = i;
        }

        keep
    }
}

// ============================================================================
// Radial Distance
// ============================================================================

/// Linear pass keeping a point only when its distance from the last kept
/// point exceeds epsilon.
///
/// The cheapest of the reducers, intended for fast interactive thinning
/// (e.g. chart rendering) rather than high-fidelity export. Distances use
/// the flat small-distance approximation regardless of any other
/// configuration. Because every surviving gap exceeds epsilon, re-applying
/// the reducer to its own (re-packed) output removes nothing further.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadialDistance;

impl WaypointReducer for RadialDistance {
    fn reduce(&self, track: &[GeoPoint], epsilon: f64) -> Vec<bool> {
        let epsilon = sanitize_epsilon(epsilon);
        let n = track.len();
        if n <= 2 {
            return vec![true; n];
        }

        let mut keep = vec![false; n];
        keep[0] = true;
        keep[n - 1] = true;

        let mut last_kept = 0;
        for i in 1..n - 1 {
            let dist = distance(
                &track[last_kept],
                &track[i],
                DistanceAlgorithm::SmallDistanceApproximation,
            );
            if dist > epsilon {
                keep[i] = true;
                last_kept = i;
            }
        }

        keep
    }
}

// ============================================================================
// Nth Point
// ============================================================================

/// Keeps every n-th point, where n is `epsilon` rounded to an integer
/// stride (minimum 1).
///
/// Convention: the 1-based indices divisible by the stride are kept, plus
/// the first and last point regardless of the stride. A 10-point track
/// with stride 2 therefore keeps the 1-based indices {1, 2, 4, 6, 8, 10}.
#[derive(Debug, Clone, Copy, Default)]
pub struct NthPoint;

impl WaypointReducer for NthPoint {
    fn reduce(&self, track: &[GeoPoint], epsilon: f64) -> Vec<bool> {
        let epsilon = sanitize_epsilon(epsilon);
        let n = track.len();
        if n <= 2 {
            return vec![true; n];
        }

        let stride = (epsilon.round().max(1.0)) as usize;

        let mut keep: Vec<bool> = (0..n).map(|i| (i + 1) % stride == 0).collect();
        keep[0] = true;
        keep[n - 1] = true;
        keep
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reducers() -> Vec<Box<dyn WaypointReducer>> {
        vec![
            Box::new(DouglasPeucker::default()),
            Box::new(VisvalingamWhyatt::default()),
            Box::new(ReumannWitkam),
            Box::new(RadialDistance),
            Box::new(NthPoint),
        ]
    }

    /// A wiggly track of ~100m-spaced points with some off-line jitter.
    fn sample_track() -> Vec<GeoPoint> {
        (0..20)
            .map(|i| {
                let jitter = if i % 3 == 0 { 0.0003 } else { 0.0 };
                GeoPoint::new(51.5 + 0.001 * i as f64, -0.1 + jitter)
            })
            .collect()
    }

    #[test]
    fn test_short_tracks_all_true() {
        let p = GeoPoint::new(51.5, -0.1);
        for reducer in reducers() {
            assert_eq!(reducer.reduce(&[], 10.0), Vec::<bool>::new());
            assert_eq!(reducer.reduce(&[p], 10.0), vec![true]);
            assert_eq!(reducer.reduce(&[p, p], 10.0), vec![true, true]);
        }
    }

    #[test]
    fn test_endpoints_and_length_contract() {
        let track = sample_track();
        for reducer in reducers() {
            for eps in [0.5, 10.0, 100.0, 10_000.0] {
                let mask = reducer.reduce(&track, eps);
                assert_eq!(mask.len(), track.len());
                assert!(mask[0], "first point dropped at eps={eps}");
                assert!(mask[track.len() - 1], "last point dropped at eps={eps}");
            }
        }
    }

    #[test]
    fn test_chained_narrowing_property() {
        let track = sample_track();
        let prior: Vec<bool> = (0..track.len()).map(|i| i % 2 == 0 || i == 19).collect();
        for reducer in reducers() {
            let mask = reducer.reduce_masked(&track, &prior, 20.0).unwrap();
            assert_eq!(mask.len(), track.len());
            for i in 0..track.len() {
                assert!(!mask[i] || prior[i], "point {i} resurrected");
            }
        }
    }

    #[test]
    fn test_chained_mask_length_mismatch() {
        let track = sample_track();
        let prior = vec![true; track.len() - 1];
        let err = DouglasPeucker::default()
            .reduce_masked(&track, &prior, 10.0)
            .unwrap_err();
        assert!(matches!(
            err,
            ReduceError::MaskLengthMismatch {
                expected: 20,
                actual: 19
            }
        ));
    }

    #[test]
    fn test_chained_negative_epsilon() {
        let track = sample_track();
        let prior = vec![true; track.len()];
        let err = RadialDistance
            .reduce_masked(&track, &prior, -1.0)
            .unwrap_err();
        assert!(matches!(err, ReduceError::NegativeEpsilon(_)));
    }

    #[test]
    fn test_chained_all_excluded_stays_excluded() {
        let track = sample_track();
        let prior = vec![false; track.len()];
        let mask = RadialDistance.reduce_masked(&track, &prior, 10.0).unwrap();
        assert!(mask.iter().all(|&k| !k));
    }

    #[test]
    fn test_douglas_peucker_colinear() {
        // Interior points on a straight line are always discardable
        let track = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(0.0, 2.0),
            GeoPoint::new(0.0, 3.0),
        ];
        let mask = DouglasPeucker::default().reduce(&track, 1.0);
        assert_eq!(mask, vec![true, false, false, true]);
    }

    #[test]
    fn test_douglas_peucker_keeps_outlier() {
        // One point far off the chord must survive a small epsilon
        let track = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.001),
            GeoPoint::new(0.01, 0.002), // ~1.1km off the chord
            GeoPoint::new(0.0, 0.003),
            GeoPoint::new(0.0, 0.004),
        ];
        let mask = DouglasPeucker::default().reduce(&track, 1.0);
        assert!(mask[2]);
    }

    #[test]
    fn test_douglas_peucker_monotonic_in_epsilon() {
        let track = sample_track();
        let reducer = DouglasPeucker::default();
        let mut last_count = usize::MAX;
        for eps in [0.1, 1.0, 5.0, 20.0, 100.0, 1000.0] {
            let count = reducer.reduce(&track, eps).iter().filter(|&&k| k).count();
            assert!(
                count <= last_count,
                "kept count grew from {last_count} to {count} at eps={eps}"
            );
            last_count = count;
        }
    }

    #[test]
    fn test_visvalingam_whyatt_colinear_removed() {
        let track = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.001),
            GeoPoint::new(0.0, 0.002),
            GeoPoint::new(0.0, 0.003),
        ];
        let mask = VisvalingamWhyatt::default().reduce(&track, 5.0);
        assert_eq!(mask, vec![true, false, false, true]);
    }

    #[test]
    fn test_visvalingam_whyatt_keeps_spike() {
        let track = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.001),
            GeoPoint::new(0.01, 0.002), // ~1.1km spike
            GeoPoint::new(0.0, 0.003),
            GeoPoint::new(0.0, 0.004),
        ];
        // threshold 300² = 90,000 m²: the flat neighbors span ~60,000 m²
        // triangles with the spike, the spike itself spans ~250,000 m²
        let mask = VisvalingamWhyatt::default().reduce(&track, 300.0);
        assert!(mask[2], "spike point removed");
        // the flat neighbors go
        assert!(!mask[1] && !mask[3]);
    }

    #[test]
    fn test_visvalingam_whyatt_epsilon_zero_keeps_all() {
        let track = sample_track();
        let mask = VisvalingamWhyatt::default().reduce(&track, 0.0);
        assert!(mask.iter().all(|&k| k));
    }

    #[test]
    fn test_reumann_witkam_drops_corridor_points() {
        // Nearly-straight line: everything between the key line and the
        // last point is within a generous tolerance
        let track: Vec<GeoPoint> = (0..10)
            .map(|i| GeoPoint::new(0.0, 0.001 * i as f64))
            .collect();
        let mask = ReumannWitkam.reduce(&track, 50.0);
        assert!(mask[0] && mask[9]);
        // only the initial key segment and the last point survive
        assert_eq!(mask.iter().filter(|&&k| k).count(), 3);
        assert!(mask[1]);
    }

    #[test]
    fn test_reumann_witkam_duplicate_points_survive() {
        // Coincident points must not wipe the whole track
        let p = GeoPoint::new(51.5, -0.1);
        let track = vec![
            p,
            p,
            p,
            GeoPoint::new(51.51, -0.1),
            GeoPoint::new(51.52, -0.12),
        ];
        let mask = ReumannWitkam.reduce(&track, 5.0);
        assert!(mask[0]);
        assert!(mask[4]);
    }

    #[test]
    fn test_radial_distance_basic() {
        // ~111m spacing; eps 150m keeps roughly every other point
        let track: Vec<GeoPoint> = (0..10)
            .map(|i| GeoPoint::new(0.001 * i as f64, 0.0))
            .collect();
        let mask = RadialDistance.reduce(&track, 150.0);
        assert!(mask[0] && mask[9]);
        for w in mask_to_indices(&mask).windows(2) {
            if w[1] == 9 {
                continue; // last point is force-kept
            }
            let d = distance(
                &track[w[0]],
                &track[w[1]],
                DistanceAlgorithm::SmallDistanceApproximation,
            );
            assert!(d > 150.0, "gap {}..{} is only {d}m", w[0], w[1]);
        }
    }

    #[test]
    fn test_radial_distance_idempotent_on_reduced_set() {
        let track = sample_track();
        let eps = 150.0;
        let mask = RadialDistance.reduce(&track, eps);

        // re-pack the kept points and reduce again
        let reduced: Vec<GeoPoint> = track
            .iter()
            .zip(&mask)
            .filter(|(_, &k)| k)
            .map(|(p, _)| *p)
            .collect();
        let second = RadialDistance.reduce(&reduced, eps);
        assert!(second.iter().all(|&k| k), "second pass removed points");
    }

    #[test]
    fn test_nth_point_stride_two_exact_mask() {
        let track: Vec<GeoPoint> = (0..10)
            .map(|i| GeoPoint::new(0.001 * i as f64, 0.0))
            .collect();
        let mask = NthPoint.reduce(&track, 2.0);
        // 1-based indices divisible by 2, plus first and last
        assert_eq!(
            mask,
            vec![true, true, false, true, false, true, false, true, false, true]
        );
    }

    #[test]
    fn test_nth_point_count_formula() {
        // kept = 1 + len/stride, +1 when the last point is off-stride
        for len in [10usize, 23, 30, 101] {
            let track: Vec<GeoPoint> = (0..len)
                .map(|i| GeoPoint::new(0.0001 * i as f64, 0.0))
                .collect();
            let mask = NthPoint.reduce(&track, 10.0);
            let mut expected = 1 + len / 10;
            if len % 10 != 0 {
                expected += 1;
            }
            assert_eq!(
                mask.iter().filter(|&&k| k).count(),
                expected,
                "len={len}"
            );
        }
    }

    #[test]
    fn test_nth_point_fractional_epsilon_rounds() {
        let track: Vec<GeoPoint> = (0..10)
            .map(|i| GeoPoint::new(0.001 * i as f64, 0.0))
            .collect();
        // 1.6 rounds to stride 2
        assert_eq!(NthPoint.reduce(&track, 1.6), NthPoint.reduce(&track, 2.0));
        // 0.0 clamps to stride 1: keep everything
        assert!(NthPoint.reduce(&track, 0.0).iter().all(|&k| k));
    }

    #[test]
    fn test_pipeline_radial_then_douglas_peucker() {
        let track = sample_track();
        let coarse = RadialDistance.reduce(&track, 50.0);
        let fine = DouglasPeucker::default()
            .reduce_masked(&track, &coarse, 10.0)
            .unwrap();
        let coarse_count = coarse.iter().filter(|&&k| k).count();
        let fine_count = fine.iter().filter(|&&k| k).count();
        assert!(fine_count <= coarse_count);
        assert!(fine[0] && fine[track.len() - 1]);
    }

    fn mask_to_indices(mask: &[bool]) -> Vec<usize> {
        mask.iter()
            .enumerate()
            .filter(|(_, &k)| k)
            .map(|(i, _)| i)
            .collect()
    }
}

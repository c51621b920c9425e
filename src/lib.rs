//! # Track Reducer
//!
//! GPS track waypoint reduction: a family of polyline-simplification
//! algorithms over geodetic point sequences.
//!
//! This library provides:
//! - Five interchangeable reduction strategies (Douglas-Peucker,
//!   Visvalingam-Whyatt, Reumann-Witkam, Radial-Distance, Nth-Point)
//!   behind the [`WaypointReducer`] trait
//! - A chained-invocation protocol so one reducer can refine another's
//!   result while preserving point identity
//! - A distance engine with selectable accuracy ([`geo_utils`])
//! - Generic value binning for distribution charts ([`binning`])
//!
//! Reducers never mutate the track: every call returns an inclusion mask
//! (`Vec<bool>`, `true` = keep) of the same length as the input, and the
//! caller decides what to do with the discarded points. That keeps file
//! formats, rendering, and undo handling entirely outside this crate.
//!
//! ## Features
//!
//! - **`parallel`** - parallel multi-segment reduction with rayon
//! - **`serde`** - serde derives on the public data types
//!
//! ## Quick Start
//!
//! ```rust
//! use track_reducer::{reduce, GeoPoint, ReductionAlgorithm};
//!
//! let track = vec![
//!     GeoPoint::new(51.5074, -0.1278),
//!     GeoPoint::new(51.5080, -0.1290),
//!     GeoPoint::new(51.5090, -0.1300),
//!     GeoPoint::new(51.5100, -0.1310),
//! ];
//!
//! let mask = reduce(&track, ReductionAlgorithm::DouglasPeucker, 10.0);
//! assert_eq!(mask.len(), track.len());
//! assert!(mask[0] && mask[track.len() - 1]); // endpoints always survive
//!
//! let kept: Vec<_> = track
//!     .iter()
//!     .zip(&mask)
//!     .filter(|(_, &keep)| keep)
//!     .map(|(p, _)| *p)
//!     .collect();
//! println!("{} of {} points kept", kept.len(), track.len());
//! ```
//!
//! ## Chaining
//!
//! ```rust
//! use track_reducer::{GeoPoint, ReductionAlgorithm, reduce, reduce_masked};
//!
//! let track: Vec<GeoPoint> = (0..100)
//!     .map(|i| GeoPoint::new(51.5 + 0.0001 * i as f64, -0.1))
//!     .collect();
//!
//! // cheap radial pass first, precise Douglas-Peucker on what's left
//! let coarse = reduce(&track, ReductionAlgorithm::RadialDistance, 5.0);
//! let fine = reduce_masked(&track, &coarse, ReductionAlgorithm::DouglasPeucker, 10.0)
//!     .expect("masks have matching length");
//!
//! // the second pass can only narrow the first
//! assert!(fine.iter().zip(&coarse).all(|(&f, &c)| !f || c));
//! ```

use chrono::{DateTime, Utc};
use log::warn;
use once_cell::sync::OnceCell;
use thiserror::Error;

pub mod binning;
pub mod geo_utils;
pub mod reducers;

pub use binning::{Bin, BinBounds, BinList, BinValueDistribution, BIN_COUNT};
pub use geo_utils::DistanceAlgorithm;
pub use reducers::{
    DouglasPeucker, NthPoint, RadialDistance, ReumannWitkam, VisvalingamWhyatt, WaypointReducer,
};

// ============================================================================
// Core Types
// ============================================================================

/// A geodetic track point: position, optional elevation, optional timestamp.
///
/// Points are immutable value types; reducers classify them but never
/// create, reorder, or modify them.
///
/// # Example
/// ```
/// use track_reducer::GeoPoint;
/// let point = GeoPoint::new(51.5074, -0.1278).with_elevation(11.0);
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    /// Latitude in degrees, −90..90.
    pub latitude: f64,
    /// Longitude in degrees, −180..180.
    pub longitude: f64,
    /// Elevation above the reference ellipsoid in meters, if known.
    pub elevation: Option<f64>,
    /// Recording timestamp, if known.
    pub time: Option<DateTime<Utc>>,
}

impl GeoPoint {
    /// Create a point from latitude and longitude, without elevation or
    /// timestamp.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            time: None,
        }
    }

    /// Attach an elevation in meters.
    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    /// Attach a timestamp.
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Check that the coordinates are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Errors reported by the reduction entry points.
///
/// Degenerate tracks (length 0 or 1) are not errors; they yield trivial
/// masks. These variants indicate caller bugs and are never silently
/// recovered.
#[derive(Debug, Error)]
pub enum ReduceError {
    /// The prior mask handed to a chained invocation does not match the
    /// track length.
    #[error("mask length {actual} does not match track length {expected}")]
    MaskLengthMismatch { expected: usize, actual: usize },

    /// Epsilon must be non-negative.
    #[error("epsilon must be non-negative, got {0}")]
    NegativeEpsilon(f64),
}

// ============================================================================
// Algorithm Selection & Dispatch
// ============================================================================

/// Selects one of the five reduction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReductionAlgorithm {
    DouglasPeucker,
    VisvalingamWhyatt,
    ReumannWitkam,
    RadialDistance,
    NthPoint,
}

// Strategies hold no per-call state, so one shared instance per algorithm
// serves all callers.
static DOUGLAS_PEUCKER: DouglasPeucker = DouglasPeucker {
    algorithm: DistanceAlgorithm::Haversine,
};
static VISVALINGAM_WHYATT: VisvalingamWhyatt = VisvalingamWhyatt {
    algorithm: DistanceAlgorithm::Haversine,
};
static REUMANN_WITKAM: ReumannWitkam = ReumannWitkam;
static RADIAL_DISTANCE: RadialDistance = RadialDistance;
static NTH_POINT: NthPoint = NthPoint;

impl ReductionAlgorithm {
    /// The shared strategy instance for this selector.
    pub fn strategy(self) -> &'static dyn WaypointReducer {
        match self {
            ReductionAlgorithm::DouglasPeucker => &DOUGLAS_PEUCKER,
            ReductionAlgorithm::VisvalingamWhyatt => &VISVALINGAM_WHYATT,
            ReductionAlgorithm::ReumannWitkam => &REUMANN_WITKAM,
            ReductionAlgorithm::RadialDistance => &RADIAL_DISTANCE,
            ReductionAlgorithm::NthPoint => &NTH_POINT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReductionAlgorithm::DouglasPeucker => "DouglasPeucker",
            ReductionAlgorithm::VisvalingamWhyatt => "VisvalingamWhyatt",
            ReductionAlgorithm::ReumannWitkam => "ReumannWitkam",
            ReductionAlgorithm::RadialDistance => "RadialDistance",
            ReductionAlgorithm::NthPoint => "NthPoint",
        }
    }

    /// Parse a selector name; `None` for anything unrecognized.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DouglasPeucker" => Some(ReductionAlgorithm::DouglasPeucker),
            "VisvalingamWhyatt" => Some(ReductionAlgorithm::VisvalingamWhyatt),
            "ReumannWitkam" => Some(ReductionAlgorithm::ReumannWitkam),
            "RadialDistance" => Some(ReductionAlgorithm::RadialDistance),
            "NthPoint" => Some(ReductionAlgorithm::NthPoint),
            _ => None,
        }
    }
}

/// Reduce a track with the selected algorithm and tolerance.
///
/// See [`WaypointReducer::reduce`] for the mask contract.
pub fn reduce(track: &[GeoPoint], algorithm: ReductionAlgorithm, epsilon: f64) -> Vec<bool> {
    algorithm.strategy().reduce(track, epsilon)
}

/// Chained reduction: run the selected algorithm only on the points a
/// prior mask retained.
///
/// See [`WaypointReducer::reduce_masked`] for the narrowing contract and
/// error conditions.
pub fn reduce_masked(
    track: &[GeoPoint],
    prior: &[bool],
    algorithm: ReductionAlgorithm,
    epsilon: f64,
) -> Result<Vec<bool>, ReduceError> {
    algorithm.strategy().reduce_masked(track, prior, epsilon)
}

/// Reduce with an algorithm selected by name.
///
/// Unknown names fail open: the track is kept in full rather than risking
/// data loss on a dispatch bug, and a warning is logged.
pub fn reduce_by_name(track: &[GeoPoint], name: &str, epsilon: f64) -> Vec<bool> {
    match ReductionAlgorithm::from_name(name) {
        Some(algorithm) => reduce(track, algorithm, epsilon),
        None => {
            warn!("unknown reduction algorithm '{name}', keeping all {} points", track.len());
            vec![true; track.len()]
        }
    }
}

/// Reduce with the process-wide default algorithm and epsilon.
pub fn reduce_with_defaults(track: &[GeoPoint]) -> Vec<bool> {
    let settings = ReducerSettings::global();
    reduce(track, settings.default_algorithm, settings.default_epsilon)
}

/// Reduce each segment of a multi-segment file independently.
///
/// Segment masks are independent, so with the `parallel` feature this
/// fans out over rayon; otherwise the segments are processed serially.
pub fn reduce_segments(
    segments: &[Vec<GeoPoint>],
    algorithm: ReductionAlgorithm,
    epsilon: f64,
) -> Vec<Vec<bool>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        log::debug!(
            "reducing {} segments in parallel with {}",
            segments.len(),
            algorithm.as_str()
        );
        segments
            .par_iter()
            .map(|segment| reduce(segment, algorithm, epsilon))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        segments
            .iter()
            .map(|segment| reduce(segment, algorithm, epsilon))
            .collect()
    }
}

// ============================================================================
// Process-Wide Settings
// ============================================================================

/// Default epsilon and algorithm used when a caller does not supply them.
///
/// The host application (which owns preference storage) installs its values
/// once at startup via [`ReducerSettings::set_global`]; until then the
/// compiled-in defaults apply. The core never writes settings back.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReducerSettings {
    /// Tolerance in meters (stride for Nth-Point). Default: 50.0.
    pub default_epsilon: f64,
    /// Strategy used by [`reduce_with_defaults`]. Default: Reumann-Witkam.
    pub default_algorithm: ReductionAlgorithm,
}

impl Default for ReducerSettings {
    fn default() -> Self {
        Self {
            default_epsilon: 50.0,
            default_algorithm: ReductionAlgorithm::ReumannWitkam,
        }
    }
}

static GLOBAL_SETTINGS: OnceCell<ReducerSettings> = OnceCell::new();

impl ReducerSettings {
    pub fn new(default_epsilon: f64, default_algorithm: ReductionAlgorithm) -> Self {
        Self {
            default_epsilon,
            default_algorithm,
        }
    }

    /// Install the process-wide settings. Only the first call takes
    /// effect; returns `false` if settings were already installed.
    pub fn set_global(self) -> bool {
        GLOBAL_SETTINGS.set(self).is_ok()
    }

    /// The process-wide settings, or the compiled-in defaults when none
    /// were installed.
    pub fn global() -> &'static ReducerSettings {
        GLOBAL_SETTINGS.get_or_init(ReducerSettings::default)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

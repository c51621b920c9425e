//! Basic example of reducing a GPS track with each algorithm.
//!
//! Run with: cargo run --example reduce_track

use track_reducer::{geo_utils, reduce, GeoPoint, ReductionAlgorithm};

fn main() {
    // A noisy track through the London area: a straight ride with GPS
    // jitter every few points
    let track: Vec<GeoPoint> = (0..200)
        .map(|i| {
            let jitter = match i % 7 {
                0 => 0.00015,
                3 => -0.0001,
                _ => 0.0,
            };
            GeoPoint::new(51.5074 + 0.0002 * i as f64, -0.1278 + jitter)
        })
        .collect();

    println!("Waypoint Reduction Examples\n");
    println!(
        "Input: {} points, {:.0}m total length\n",
        track.len(),
        geo_utils::polyline_length(&track)
    );

    let algorithms = [
        (ReductionAlgorithm::DouglasPeucker, 10.0),
        (ReductionAlgorithm::VisvalingamWhyatt, 10.0),
        (ReductionAlgorithm::ReumannWitkam, 10.0),
        (ReductionAlgorithm::RadialDistance, 50.0),
        (ReductionAlgorithm::NthPoint, 5.0),
    ];

    for (algorithm, epsilon) in algorithms {
        let mask = reduce(&track, algorithm, epsilon);
        let kept: Vec<GeoPoint> = track
            .iter()
            .zip(&mask)
            .filter(|(_, &keep)| keep)
            .map(|(p, _)| *p)
            .collect();

        println!(
            "{:18} eps={:5.1}  kept {:3} of {} points ({:.0}m remaining length)",
            algorithm.as_str(),
            epsilon,
            kept.len(),
            track.len(),
            geo_utils::polyline_length(&kept)
        );
    }
}

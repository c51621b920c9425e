//! Chained reduction: a cheap radial pass thins the track before a
//! precise Douglas-Peucker pass refines what is left.
//!
//! Run with: cargo run --example chained_reduction

use track_reducer::{reduce, reduce_masked, GeoPoint, ReductionAlgorithm};

fn main() {
    // Dense track: points every ~2m with occasional wiggle
    let track: Vec<GeoPoint> = (0..5000)
        .map(|i| {
            let wiggle = 0.00005 * ((i as f64) * 0.05).sin();
            GeoPoint::new(47.0 + 0.00002 * i as f64, 11.0 + wiggle)
        })
        .collect();

    println!("Chained Reduction Example\n");
    println!("Input: {} points", track.len());

    // Pass 1: radial distance at 10m, very fast
    let coarse = reduce(&track, ReductionAlgorithm::RadialDistance, 10.0);
    let coarse_count = coarse.iter().filter(|&&k| k).count();
    println!("After RadialDistance(10m):   {coarse_count} points");

    // Pass 2: Douglas-Peucker at 5m, only on the survivors
    let fine = reduce_masked(&track, &coarse, ReductionAlgorithm::DouglasPeucker, 5.0)
        .expect("prior mask has matching length");
    let fine_count = fine.iter().filter(|&&k| k).count();
    println!("After DouglasPeucker(5m):    {fine_count} points");

    // Excluded points stay excluded: the pipeline only ever narrows
    assert!(fine.iter().zip(&coarse).all(|(&f, &c)| !f || c));
    println!("\nNarrowing invariant holds: kept ⊆ prior mask");
}

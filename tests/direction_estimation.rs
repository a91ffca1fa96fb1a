//! End-to-end direction-estimation scenarios (spec.md §8 scenarios 4
//! and 5): a synthetic plane wave built directly from each mode's own
//! forward model should be recovered as a pseudo-spectrum peak near
//! the true bearing.

use std::f32::consts::PI;

use sofi_core::compensator::wrap;
use sofi_core::config::{DirectionMode, FrequencyOfInterest, WrapNorm};
use sofi_core::direction::DirectionEstimator;
use sofi_core::frame::EdgeFrame;
use sofi_core::geometry::Array;

const ANTENNAS: [(f64, f64); 4] = [
    (0.0, 0.0),
    (-0.355, 0.0),
    (-0.1754, 0.3235),
    (-0.1855, 0.1585),
];

fn bin_to_angle(bin: usize, l: usize) -> f32 {
    -PI + 2.0 * PI * (bin as f32) / (l as f32)
}

fn angular_distance(a: f32, b: f32) -> f32 {
    let mut d = (a - b).abs();
    if d > PI {
        d = 2.0 * PI - d;
    }
    d
}

#[test]
fn matrix_mode_recovers_plane_wave_bearing() {
    let l = 512;
    let arr = Array::build(&ANTENNAS, 100e6, 102e6, l, false, WrapNorm::TwoPi).unwrap();
    let foi = FrequencyOfInterest { bin: l / 2, half_width: 1 };
    let wavelength = arr.midpoint_wavelength(foi.bin, foi.half_width);

    let theta_star = 30.0_f32.to_radians();

    // Build a per-edge phase vector from the exact same steering model
    // `SteeringMatrix` uses (spec.md §3: row k = dc_e·sin(φ_e + θ_k)),
    // i.e. a plane wave arriving from `theta_star`.
    let phase: Vec<f32> = arr
        .edges()
        .iter()
        .map(|edge| {
            let dc = 2.0 * std::f64::consts::PI * edge.distance / wavelength;
            wrap((dc * (edge.bearing as f32 + theta_star).sin() as f64) as f32)
        })
        .collect();

    let frames: Vec<EdgeFrame> = phase
        .iter()
        .map(|&p| EdgeFrame {
            phase: vec![p; l],
            variance: vec![1.0; l],
            magnitude_sq: vec![1.0; l],
        })
        .collect();

    let mut estimator = DirectionEstimator::new(DirectionMode::Matrix);
    let spectrum = estimator.spectrum(&arr, &frames, &foi);

    let (peak_bin, _) = spectrum
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap())
        .unwrap();
    let peak_theta = bin_to_angle(peak_bin, l);

    // A generous tolerance: the matched-filter argument guarantees a
    // peak near the true bearing for a well-conditioned array, but the
    // exact bin is sensitive to the specific edge-bearing distribution.
    assert!(
        angular_distance(peak_theta, theta_star) < 15.0_f32.to_radians(),
        "peak at {:.1} deg, expected near {:.1} deg",
        peak_theta.to_degrees(),
        theta_star.to_degrees()
    );
}

#[test]
fn paint_mode_recovers_single_source_bearing() {
    let l = 256;
    let arr = Array::build(&ANTENNAS, 100e6, 102e6, l, false, WrapNorm::TwoPi).unwrap();
    let foi = FrequencyOfInterest { bin: l / 2, half_width: 1 };

    let theta0 = (-60.0_f32).to_radians();

    // Invert the paint model (spec.md §4.7: bearing = edge.bearing ±
    // arccos(wrap(phase·rel_wl))) so that one of the two hypotheses
    // for every edge lands exactly on `theta0`.
    let phase: Vec<f32> = arr
        .edges()
        .iter()
        .map(|edge| {
            let rel_wl = edge.rel_wl[foi.bin];
            let phi_rel = angular_distance(theta0, edge.bearing as f32);
            (phi_rel.cos() / rel_wl).clamp(-1.0e6, 1.0e6)
        })
        .collect();

    let frames: Vec<EdgeFrame> = phase
        .iter()
        .map(|&p| EdgeFrame {
            phase: vec![p; l],
            variance: vec![0.05; l],
            magnitude_sq: vec![1.0; l],
        })
        .collect();

    let mut estimator = DirectionEstimator::new(DirectionMode::Paint);
    let canvas = estimator.spectrum(&arr, &frames, &foi);

    assert_eq!(canvas.len(), l);
    assert!(canvas.iter().all(|&v| v >= 0.0));
    let sum: f32 = canvas.iter().sum();
    assert!((sum - 1.0).abs() < 1e-2, "canvas sum = {sum}");

    let (peak_bin, _) = canvas
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .unwrap();
    let peak_theta = bin_to_angle(peak_bin, l);

    assert!(
        angular_distance(peak_theta, theta0) < 10.0_f32.to_radians(),
        "peak at {:.1} deg, expected near {:.1} deg",
        peak_theta.to_degrees(),
        theta0.to_degrees()
    );
}

//! Direction Estimator — Mode P (paint), spec.md §4.7.
//!
//! For each edge, the measured phase at a frequency of interest maps
//! to two candidate bearings via `arccos`. A circular Gaussian per
//! candidate is "painted" onto a canvas by multiplying `(1 + g)` into
//! a doubled-width buffer (to cross the ±π wrap cleanly), then the two
//! halves are folded together and 1 subtracted to give a
//! product-of-Gaussians posterior. The same canvas machinery backs the
//! scalar "focus" sharpness score the simplex calibrator (C6) uses.

use std::f32::consts::PI;

use crate::geometry::Edge;

/// One edge's bearing hypothesis at a frequency of interest.
struct Hypothesis {
    bearing: f32,
    stddev_rad: f32,
}

fn angle_at(k: usize, l: usize) -> f32 {
    -PI + 2.0 * PI * (k as f32) / (l as f32)
}

fn angle_to_index(angle: f32, l: usize) -> f32 {
    let wrapped = ((angle + PI).rem_euclid(2.0 * PI)) - PI;
    (wrapped + PI) / (2.0 * PI) * (l as f32)
}

/// Derives the two bearing hypotheses (and shared stddev) for one edge
/// given its phase/variance at a frequency of interest (spec.md §4.7).
fn edge_hypotheses(edge: &Edge, rel_wl: f32, phase: f32, variance: f32) -> Option<[Hypothesis; 2]> {
    let rel_len = crate::compensator::wrap(phase * rel_wl).clamp(-1.0, 1.0);
    let phi_rel = rel_len.acos();

    let denom = 1.0 - rel_len;
    if denom <= 1e-6 {
        return None;
    }
    let variance_rad2 = rel_wl * rel_wl * variance / denom;
    let stddev_rad = variance_rad2.max(0.0).sqrt();

    // Gaussians wider than L/8 bins are uninformative; the caller
    // compares against L/8 in bin units, so we just pass the radian
    // stddev through and let it decide.
    let bearing = edge.bearing as f32;
    Some([
        Hypothesis {
            bearing: bearing + phi_rel,
            stddev_rad,
        },
        Hypothesis {
            bearing: bearing - phi_rel,
            stddev_rad,
        },
    ])
}

fn deposit(canvas2: &mut [f32], l: usize, centre_idx: f32, stddev_idx: f32) {
    if stddev_idx <= 1e-6 || !stddev_idx.is_finite() {
        return;
    }
    let c0 = centre_idx.rem_euclid(l as f32);
    let span = (stddev_idx * 5.0).ceil() as isize + 1;
    for centre in [c0, c0 + l as f32] {
        let base = centre.floor() as isize;
        for d in -span..=span {
            let p = base + d;
            if p < 0 || p as usize >= 2 * l {
                continue;
            }
            let dist = p as f32 - centre;
            let g = (-(dist * dist) / (2.0 * stddev_idx * stddev_idx)).exp();
            canvas2[p as usize] *= 1.0 + g;
        }
    }
}

/// Builds the length-L paint canvas from a set of per-edge bearing
/// hypotheses. Gaussians with stddev > L/8 bins are dropped as
/// uninformative. Falls back to a uniform (identity) canvas if the
/// folded result sums to zero.
pub fn paint_canvas(l: usize, hypotheses: &[(f32, f32)]) -> Vec<f32> {
    let mut canvas2 = vec![1.0_f32; 2 * l];
    let max_stddev_idx = l as f32 / 8.0;

    for &(bearing, stddev_rad) in hypotheses {
        let stddev_idx = stddev_rad * (l as f32) / (2.0 * PI);
        if stddev_idx > max_stddev_idx || !stddev_idx.is_finite() {
            continue;
        }
        let centre_idx = angle_to_index(bearing, l);
        deposit(&mut canvas2, l, centre_idx, stddev_idx);
    }

    let mut canvas: Vec<f32> = (0..l)
        .map(|i| (canvas2[i] * canvas2[i + l] - 1.0).max(0.0))
        .collect();

    let sum: f32 = canvas.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        let uniform = 1.0 / (l as f32);
        canvas.iter_mut().for_each(|v| *v = uniform);
    } else {
        canvas.iter_mut().for_each(|v| *v /= sum);
    }

    canvas
}

/// Builds the hypothesis list for one frequency of interest across all
/// edges, given each edge's (phase, variance) at that bin.
pub fn hypotheses_for_bin(
    edges: &[Edge],
    rel_wl_at_bin: &[f32],
    phase_at_bin: &[f32],
    variance_at_bin: &[f32],
) -> Vec<(f32, f32)> {
    let mut out = Vec::with_capacity(edges.len() * 2);
    for (i, edge) in edges.iter().enumerate() {
        if let Some(hyps) =
            edge_hypotheses(edge, rel_wl_at_bin[i], phase_at_bin[i], variance_at_bin[i])
        {
            for h in hyps {
                out.push((h.bearing, h.stddev_rad));
            }
        }
    }
    out
}

/// Scalar sharpness score: inner product of the canvas with a
/// triangular weighting that is 1 at the circular centre-of-mass and 0
/// at the boundary ±π away from it (spec.md §4.7). Used both as the
/// "focus"/"match" term in the simplex cost (C6) and as a general
/// peakiness metric for a paint canvas.
pub fn focus_sharpness(canvas: &[f32]) -> f32 {
    let l = canvas.len();
    if l == 0 {
        return 0.0;
    }

    let (mut re, mut im) = (0.0_f32, 0.0_f32);
    for (k, &v) in canvas.iter().enumerate() {
        let theta = angle_at(k, l);
        re += v * theta.cos();
        im += v * theta.sin();
    }
    let mu = im.atan2(re);

    let mut score = 0.0_f32;
    for (k, &v) in canvas.iter().enumerate() {
        let theta = angle_at(k, l);
        let mut d = (theta - mu).abs();
        if d > PI {
            d = 2.0 * PI - d;
        }
        let w = 1.0 - d / PI;
        score += v * w;
    }
    score
}

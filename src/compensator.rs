//! Edge Compensator (C5).
//!
//! Applies a per-edge phase offset plus a linear sample-timing ramp,
//! wrapping into (−π, π] (spec.md §4.5). Edge bins are zeroed to
//! suppress spectral leakage at window edges. `EdgeCompensation` is a
//! named value type (not a closure) per spec.md's DESIGN NOTES.

use num::complex::Complex32;
use std::f32::consts::PI;

/// One edge's current compensation: a constant phase offset and a
/// linear sample-timing ramp, both radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeCompensation {
    pub phase_offset: f32,
    pub sample_offset: f32,
}

/// Wraps `x` into (−π, π]: `x − 2π·round(x / 2π)` (spec.md §4.5).
pub fn wrap(x: f32) -> f32 {
    x - 2.0 * PI * (x / (2.0 * PI)).round()
}

fn linspace_at(lo: f32, hi: f32, len: usize, k: usize) -> f32 {
    if len <= 1 {
        return lo;
    }
    lo + (hi - lo) * (k as f32) / ((len - 1) as f32)
}

fn zero_edges(buf: &mut [f32], width: usize) {
    let len = buf.len();
    let w = width.min(len / 2);
    buf[..w].fill(0.0);
    let tail = len - w;
    buf[tail..].fill(0.0);
}

/// Real-layout compensation: `wrap(ph[k] + linspace(-s, s, L)[k] + p)`,
/// with the first/last `edge_zero_width` bins zeroed.
pub fn compensate_real(phase: &[f32], comp: EdgeCompensation, edge_zero_width: usize) -> Vec<f32> {
    let len = phase.len();
    let mut out: Vec<f32> = (0..len)
        .map(|k| {
            let ramp = linspace_at(-comp.sample_offset, comp.sample_offset, len, k);
            wrap(phase[k] + ramp + comp.phase_offset)
        })
        .collect();
    zero_edges(&mut out, edge_zero_width);
    out
}

/// Complex-layout compensation: multiplies by
/// `exp(j · linspace(p − s/2, p + s/2, L)[k])`.
pub fn compensate_complex(frame: &[Complex32], comp: EdgeCompensation) -> Vec<Complex32> {
    let len = frame.len();
    (0..len)
        .map(|k| {
            let phase = linspace_at(
                comp.phase_offset - comp.sample_offset / 2.0,
                comp.phase_offset + comp.sample_offset / 2.0,
                len,
                k,
            );
            frame[k] * Complex32::from_polar(1.0, phase)
        })
        .collect()
}

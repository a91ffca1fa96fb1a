//! Direction Estimator (C7).
//!
//! Produces a circular pseudo-spectrum per frequency-of-interest,
//! either via the precomputed steering matrix (mode M) or by painting
//! circular Gaussians per edge hypothesis (mode P). Both modes share
//! the same "average corrected phase around the bin" input.

pub mod matrix;
pub mod paint;

use crate::config::{DirectionMode, FrequencyOfInterest};
use crate::frame::EdgeFrame;
use crate::geometry::Array;

use matrix::SteeringCache;

/// Averages each edge's phase (and variance) over `[bin-hw, bin+hw]`.
pub fn averaged_phase_and_variance(
    frames: &[EdgeFrame],
    bin: usize,
    half_width: usize,
) -> (Vec<f32>, Vec<f32>) {
    let mut phase = Vec::with_capacity(frames.len());
    let mut variance = Vec::with_capacity(frames.len());

    for frame in frames {
        let l = frame.len();
        let lo = bin.saturating_sub(half_width);
        let hi = (bin + half_width).min(l.saturating_sub(1));
        let count = (hi - lo + 1).max(1) as f32;

        let p: f32 = frame.phase[lo..=hi].iter().sum::<f32>() / count;
        let v: f32 = frame.variance[lo..=hi].iter().sum::<f32>() / count;

        phase.push(p);
        variance.push(v);
    }

    (phase, variance)
}

/// Dispatches between the two interchangeable direction-estimation
/// strategies (monomorphic, per spec.md's DESIGN NOTES).
pub enum DirectionEstimator {
    Matrix(SteeringCache),
    Paint,
}

impl DirectionEstimator {
    pub fn new(mode: DirectionMode) -> DirectionEstimator {
        match mode {
            DirectionMode::Matrix => DirectionEstimator::Matrix(SteeringCache::new(8)),
            DirectionMode::Paint => DirectionEstimator::Paint,
        }
    }

    /// Computes the length-L pseudo-spectrum for one frequency of
    /// interest from the current compensated edge frames.
    pub fn spectrum(
        &mut self,
        array: &Array,
        frames: &[EdgeFrame],
        foi: &FrequencyOfInterest,
    ) -> Vec<f32> {
        let l = array.frequencies().len();
        let (phase, variance) = averaged_phase_and_variance(frames, foi.bin, foi.half_width);

        match self {
            DirectionEstimator::Matrix(cache) => {
                let wavelength = array.midpoint_wavelength(foi.bin, foi.half_width);
                let m = cache.get_or_build(array.edges(), wavelength, l);
                m.apply(&phase)
            }
            DirectionEstimator::Paint => {
                let rel_wl: Vec<f32> = array.edges().iter().map(|e| e.rel_wl[foi.bin]).collect();
                let hyps = paint::hypotheses_for_bin(array.edges(), &rel_wl, &phase, &variance);
                paint::paint_canvas(l, &hyps)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WrapNorm;
    use crate::frame::EdgeFrame;
    use crate::geometry::Array;

    fn test_array(l: usize) -> Array {
        let antennas = [
            (0.0, 0.0),
            (-0.355, 0.0),
            (-0.1754, 0.3235),
            (-0.1855, 0.1585),
        ];
        Array::build(&antennas, 100e6, 102e6, l, false, WrapNorm::TwoPi).unwrap()
    }

    fn flat_frames(e: usize, l: usize) -> Vec<EdgeFrame> {
        (0..e)
            .map(|_| EdgeFrame {
                phase: vec![0.0; l],
                variance: vec![0.1; l],
                magnitude_sq: vec![1.0; l],
            })
            .collect()
    }

    #[test]
    fn matrix_mode_zero_phase_gives_zero_spectrum() {
        let arr = test_array(64);
        let frames = flat_frames(arr.edge_count(), 64);
        let mut estimator = DirectionEstimator::new(DirectionMode::Matrix);
        let foi = FrequencyOfInterest { bin: 32, half_width: 2 };
        let spectrum = estimator.spectrum(&arr, &frames, &foi);
        assert_eq!(spectrum.len(), 64);
        assert!(spectrum.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn paint_mode_is_normalized() {
        let arr = test_array(64);
        let frames = flat_frames(arr.edge_count(), 64);
        let mut estimator = DirectionEstimator::new(DirectionMode::Paint);
        let foi = FrequencyOfInterest { bin: 32, half_width: 2 };
        let spectrum = estimator.spectrum(&arr, &frames, &foi);
        let sum: f32 = spectrum.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
        assert!(spectrum.iter().all(|&v| v >= 0.0));
    }
}

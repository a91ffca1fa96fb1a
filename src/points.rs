//! Noise/Signal Point Finder (C4).
//!
//! Locates flat-noise bins (calibration anchors) and narrowband peaks
//! (directions of interest) from a magnitude spectrum, using a small
//! continuous-wavelet-transform peak finder (spec.md §4.4). Refreshed
//! periodically by the streaming loop (C8); if a refresh doesn't turn
//! up enough candidates the prior set is kept rather than replaced
//! with something too sparse to anchor calibration.

/// A contiguous bin range, e.g. the flanks of one peak or trough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// The current noise/signal point sets, carried across framesets.
#[derive(Debug, Clone, Default)]
pub struct Points {
    pub signal_points: Vec<Interval>,
    pub noise_points: Vec<Interval>,
}

/// Widths to probe, linearly spaced, following spec.md's "5 widths
/// linearly spaced between 14 and 18 samples".
pub fn default_widths() -> Vec<f32> {
    linspace(14.0, 18.0, 5)
}

fn linspace(lo: f32, hi: f32, n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![lo];
    }
    (0..n)
        .map(|k| lo + (hi - lo) * (k as f32) / ((n - 1) as f32))
        .collect()
}

/// Ricker ("Mexican hat") wavelet of the given width, `2*width+1` samples.
fn ricker(width: f32) -> Vec<f32> {
    let a = width;
    let n = (width * 4.0).ceil() as isize;
    let mut out = Vec::with_capacity((2 * n + 1) as usize);
    for i in -n..=n {
        let t = i as f32;
        let term = 1.0 - (t * t) / (a * a);
        let gauss = (-(t * t) / (2.0 * a * a)).exp();
        let norm = 2.0 / (3.0_f32.sqrt() * std::f32::consts::PI.powf(0.25));
        out.push(norm / a.sqrt() * term * gauss);
    }
    out
}

fn convolve_same(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    let klen = kernel.len();
    let half = klen / 2;
    let n = signal.len();
    let mut out = vec![0.0_f32; n];
    for i in 0..n {
        let mut acc = 0.0_f32;
        for (k, &kv) in kernel.iter().enumerate() {
            let src = i as isize + k as isize - half as isize;
            if src >= 0 && (src as usize) < n {
                acc += signal[src as usize] * kv;
            }
        }
        out[i] = acc;
    }
    out
}

/// Finds local-maxima peaks of `signal` restricted to `[active.0, active.1)`,
/// using the sum of Ricker-wavelet responses across `widths` as the
/// detection statistic (spec.md §4.4).
pub fn find_peaks(signal: &[f32], widths: &[f32], active: (usize, usize)) -> Vec<usize> {
    let n = signal.len();
    let lo = active.0.min(n);
    let hi = active.1.min(n);
    if lo >= hi {
        return Vec::new();
    }

    let mut response = vec![0.0_f32; n];
    for &w in widths {
        let kernel = ricker(w);
        let conv = convolve_same(signal, &kernel);
        for i in 0..n {
            response[i] += conv[i];
        }
    }

    let mut peaks = Vec::new();
    for i in lo..hi {
        if i == 0 || i + 1 >= n {
            continue;
        }
        if response[i] > response[i - 1] && response[i] >= response[i + 1] && response[i] > 0.0 {
            peaks.push(i);
        }
    }
    peaks
}

/// Expands each peak outward while `signal` stays above half the peak
/// value, yielding one interval per peak (spec.md §4.4).
pub fn expand_intervals(signal: &[f32], peaks: &[usize], active: (usize, usize)) -> Vec<Interval> {
    let n = signal.len();
    let lo = active.0.min(n);
    let hi = active.1.min(n).max(lo);

    peaks
        .iter()
        .map(|&p| {
            let peak_val = signal[p];
            let half = peak_val * 0.5;

            let mut start = p;
            while start > lo && signal[start - 1] > half {
                start -= 1;
            }

            let mut end = p;
            while end + 1 < hi && signal[end + 1] > half {
                end += 1;
            }

            Interval { start, end: end + 1 }
        })
        .collect()
}

pub struct PointFinder {
    widths: Vec<f32>,
    active_range: (usize, usize),
}

impl PointFinder {
    pub fn new(active_range: (usize, usize)) -> PointFinder {
        PointFinder {
            widths: default_widths(),
            active_range,
        }
    }

    /// Refreshes signal/noise points from a magnitude spectrum.
    ///
    /// Signal points need ≥1 peak, noise points need ≥3 intervals;
    /// below those thresholds the corresponding half of `prior` is
    /// retained unchanged (spec.md §4.4).
    pub fn refresh(&self, magnitude: &[f32], prior: &Points) -> Points {
        let signal_peaks = find_peaks(magnitude, &self.widths, self.active_range);
        let signal_points = if signal_peaks.is_empty() {
            prior.signal_points.clone()
        } else {
            expand_intervals(magnitude, &signal_peaks, self.active_range)
        };

        let eps = 1e-12_f32;
        let inverted: Vec<f32> = magnitude.iter().map(|&m| 1.0 / (m + eps)).collect();
        let noise_peaks = find_peaks(&inverted, &self.widths, self.active_range);
        let noise_points = if noise_peaks.len() < 3 {
            prior.noise_points.clone()
        } else {
            expand_intervals(&inverted, &noise_peaks, self.active_range)
        };

        Points {
            signal_points,
            noise_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian_bump(n: usize, centre: f32, amp: f32, sigma: f32) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f32 - centre;
                amp * (-(t * t) / (2.0 * sigma * sigma)).exp()
            })
            .collect()
    }

    #[test]
    fn finds_single_signal_peak() {
        let n = 512;
        let mut mag = vec![0.01_f32; n];
        for (i, v) in gaussian_bump(n, 300.0, 5.0, 6.0).into_iter().enumerate() {
            mag[i] += v;
        }
        let finder = PointFinder::new((64, n - 256));
        let points = finder.refresh(&mag, &Points::default());
        assert!(!points.signal_points.is_empty());
        let hit = points
            .signal_points
            .iter()
            .any(|iv| iv.start <= 300 && 300 < iv.end);
        assert!(hit, "expected an interval containing bin 300");
    }

    #[test]
    fn keeps_prior_when_insufficient_noise_intervals() {
        let n = 256;
        let flat = vec![1.0_f32; n];
        let prior = Points {
            signal_points: vec![Interval { start: 10, end: 20 }],
            noise_points: vec![
                Interval { start: 1, end: 2 },
                Interval { start: 3, end: 4 },
            ],
        };
        let finder = PointFinder::new((64, n.saturating_sub(64)));
        let points = finder.refresh(&flat, &prior);
        assert_eq!(points.noise_points.len(), prior.noise_points.len());
    }
}

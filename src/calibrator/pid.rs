//! Closed-loop Calibrator — Strategy A: PID-from-noise-bins (spec.md §4.6).
//!
//! One independent PID controller per free antenna (antenna 0 is the
//! fixed reference, spec.md §4.2) and per channel (phase, sample
//! timing). Each frameset the noise intervals (C4) yield a per-edge
//! phase mean and first-difference; those are reverse-projected (C2)
//! into per-antenna errors and fed to the controller bank.

use crate::compensator::{wrap, EdgeCompensation};
use crate::config::PidGains;
use crate::points::Interval;
use crate::projector::Projector;

/// Derives one edge's (phase_error, sample_error) from the mean phase
/// over each noise interval (spec.md §4.6 Strategy A): `phase_error`
/// is the negative mean of those interval means, `sample_error` is the
/// negative mean of their first difference. Returns `(0.0, 0.0)` if
/// fewer than two noise intervals are available (no slope to measure).
pub fn noise_bin_error(compensated_phase: &[f32], noise_points: &[Interval]) -> (f64, f64) {
    if noise_points.is_empty() {
        return (0.0, 0.0);
    }

    let v: Vec<f64> = noise_points
        .iter()
        .map(|iv| {
            let lo = iv.start.min(compensated_phase.len());
            let hi = iv.end.min(compensated_phase.len()).max(lo);
            if hi <= lo {
                return 0.0;
            }
            compensated_phase[lo..hi].iter().map(|&p| p as f64).sum::<f64>() / (hi - lo) as f64
        })
        .collect();

    let phase_error = -(v.iter().sum::<f64>() / v.len() as f64);

    let sample_error = if v.len() < 2 {
        0.0
    } else {
        let diffs: Vec<f64> = v.windows(2).map(|w| w[1] - w[0]).collect();
        -(diffs.iter().sum::<f64>() / diffs.len() as f64)
    };

    (phase_error, sample_error)
}

/// A single PID loop: `out = kp·e + ki·Σe + kd·(e − e_prev)`.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    integral: f32,
    prev_error: f32,
}

impl PidController {
    pub fn new(gains: PidGains) -> PidController {
        PidController {
            gains,
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    pub fn update(&mut self, error: f32) -> f32 {
        self.integral += error;
        let derivative = error - self.prev_error;
        self.prev_error = error;
        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }
}

/// Bank of per-antenna PID controllers driving per-antenna phase and
/// sample-timing offsets, forward-projected to per-edge compensation
/// (spec.md §4.6 Strategy A).
pub struct PidCalibrator {
    phase_pids: Vec<PidController>,
    sample_pids: Vec<PidController>,
    antenna_phase_offset: Vec<f32>,
    antenna_sample_offset: Vec<f32>,
}

impl PidCalibrator {
    pub fn new(antenna_count: usize, phase_gains: PidGains, sample_gains: PidGains) -> PidCalibrator {
        let free = antenna_count.saturating_sub(1);
        PidCalibrator {
            phase_pids: (0..free).map(|_| PidController::new(phase_gains)).collect(),
            sample_pids: (0..free).map(|_| PidController::new(sample_gains)).collect(),
            antenna_phase_offset: vec![0.0; antenna_count],
            antenna_sample_offset: vec![0.0; antenna_count],
        }
    }

    pub fn reset(&mut self) {
        self.phase_pids.iter_mut().for_each(PidController::reset);
        self.sample_pids.iter_mut().for_each(PidController::reset);
        self.antenna_phase_offset.iter_mut().for_each(|v| *v = 0.0);
        self.antenna_sample_offset.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Consumes one frameset's per-edge noise-bin phase means and
    /// first-differences, reverse-projects them to per-antenna errors,
    /// and steps each antenna's PID pair.
    ///
    /// Each controller's output *replaces* the antenna offset it drives
    /// (spec.md §4.6: "The controller's last output becomes next
    /// frame's compensation") rather than accumulating on top of it —
    /// the `ki·err_acc` term already carries the integral memory, so
    /// adding the output to the existing offset would double-integrate
    /// and destabilise the loop.
    pub fn update(&mut self, edge_phase_err: &[f64], edge_slope_err: &[f64], projector: &Projector) {
        let x_phase = projector.reverse(edge_phase_err);
        let x_slope = projector.reverse(edge_slope_err);

        for k in 0..self.phase_pids.len() {
            let antenna = k + 1;
            let dp = self.phase_pids[k].update(x_phase[antenna] as f32);
            self.antenna_phase_offset[antenna] = wrap(dp);

            let ds = self.sample_pids[k].update(x_slope[antenna] as f32);
            self.antenna_sample_offset[antenna] = ds;
        }
    }

    /// Forward-projects the current per-antenna offsets to per-edge
    /// compensation (spec.md §4.2, §4.5).
    pub fn edge_compensation(&self, projector: &Projector) -> Vec<EdgeCompensation> {
        let phase_f64: Vec<f64> = self.antenna_phase_offset.iter().map(|&v| v as f64).collect();
        let sample_f64: Vec<f64> = self.antenna_sample_offset.iter().map(|&v| v as f64).collect();

        let edge_phase = projector.forward(&phase_f64);
        let edge_sample = projector.forward(&sample_f64);

        edge_phase
            .into_iter()
            .zip(edge_sample)
            .map(|(p, s)| EdgeCompensation {
                phase_offset: wrap(p as f32),
                sample_offset: s as f32,
            })
            .collect()
    }
}

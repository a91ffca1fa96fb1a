//! Closed-loop Calibrator (C6).
//!
//! Two interchangeable strategies (spec.md §4.6): `pid` drives one PID
//! loop per free antenna per channel from noise-bin phase statistics;
//! `simplex` (defined directly in this module, the way `direction/mod.rs`
//! keeps its dispatcher alongside submodules for the underlying math)
//! warm-starts a bounded Nelder–Mead-like search over a per-frame cost
//! function, grounded on `examples/original_source/frontend/resolve_dir.py`'s
//! `PhysicalAntennaArray.file_step`/`process_spx_params`.

pub mod pid;
pub mod simplex;

use crate::compensator::{compensate_real, wrap, EdgeCompensation};
use crate::config::{FrequencyOfInterest, SimplexWeights};
use crate::direction::paint;
use crate::frame::EdgeFrame;
use crate::geometry::Array;
use crate::projector::Projector;

use simplex::SimplexOptimizer;

/// The two calibration strategies behind one interface (spec.md §4.6:
/// "Either strategy is acceptable; the surrounding interface is
/// identical").
pub enum Calibrator {
    Pid(pid::PidCalibrator),
    Simplex(SimplexCalibrator),
}

impl Calibrator {
    /// NaN recovery (spec.md §7): reset whichever strategy is active to
    /// its zeroed/canonical state.
    pub fn reset(&mut self) {
        match self {
            Calibrator::Pid(c) => c.reset(),
            Calibrator::Simplex(c) => c.reset(),
        }
    }
}

/// Decoded per-frame state shared between cost evaluation and commit.
struct ParamDecode {
    comp: Vec<EdgeCompensation>,
    change: f32,
    fq_drift: Vec<f32>,
    ph_acc: Vec<f32>,
}

/// Splits a flat parameter vector into per-antenna offsets, folds in
/// the phase-drift accumulator, and forward-projects to per-edge
/// compensation (spec.md §4.6 Strategy B, §4.2).
///
/// `params` is `[samp_off[1..N-1], ph_off[1..N-1]]`, length `2*(N-1)`.
fn decode_params(
    params: &[f32],
    antenna_count: usize,
    ph_old: &[f32],
    sao_old: &[f32],
    fq_drift: &[f32],
    ph_acc: &[f32],
    projector: &Projector,
) -> ParamDecode {
    let n1 = antenna_count - 1;
    let samp = &params[..n1];
    let ph = &params[n1..];

    let new_fq_drift: Vec<f32> = fq_drift
        .iter()
        .zip(ph.iter().zip(ph_old.iter()))
        .map(|(&fd, (&p, &old))| (127.0 * fd + (p - old)) / 128.0)
        .collect();
    let new_ph_acc: Vec<f32> = ph_acc
        .iter()
        .zip(new_fq_drift.iter())
        .map(|(&acc, &drift)| wrap(acc + drift))
        .collect();

    let change = {
        let dp: f32 = ph.iter().zip(ph_old.iter()).map(|(&p, &o)| (p - o).powi(2)).sum();
        let ds: f32 = samp.iter().zip(sao_old.iter()).map(|(&p, &o)| (p - o).powi(2)).sum();
        (dp + ds).sqrt()
    };

    let mut antenna_ph = vec![0.0_f64; antenna_count];
    let mut antenna_samp = vec![0.0_f64; antenna_count];
    for k in 0..n1 {
        antenna_ph[k + 1] = (ph[k] + new_ph_acc[k]) as f64;
        antenna_samp[k + 1] = samp[k] as f64;
    }

    let edge_ph = projector.forward(&antenna_ph);
    let edge_samp = projector.forward(&antenna_samp);

    let comp = edge_ph
        .into_iter()
        .zip(edge_samp)
        .map(|(p, s)| EdgeCompensation {
            phase_offset: wrap(p as f32),
            sample_offset: s as f32,
        })
        .collect();

    ParamDecode {
        comp,
        change,
        fq_drift: new_fq_drift,
        ph_acc: new_ph_acc,
    }
}

/// Evaluates the three-term cost (spec.md §4.6 Strategy B) for one
/// decoded parameter set against the current frameset's raw edge
/// frames.
///
/// Sign-convention note (an explicitly flagged Open Question in
/// spec.md §9): taken literally, "return −(focus + dist_limit +
/// change)" would reward *maximizing* the two penalty terms, which
/// cannot be the intent of a "lower is better" cost used to drive a
/// minimizer. `focus` is the one term where a larger value is
/// genuinely better (a sharper pseudo-spectrum); `dist_limit` and
/// `change` are penalties where smaller is better. This resolves the
/// sign so the negation applies only to `focus`:
/// `score = dist_limit·w + change·w − focus·w`. See DESIGN.md.
fn cost_terms(
    decoded: &ParamDecode,
    frames: &[EdgeFrame],
    array: &Array,
    foi: &[FrequencyOfInterest],
    weights: &SimplexWeights,
    edge_zero_width: usize,
) -> f32 {
    let edges = array.edges();
    let l = array.frequencies().len();

    let mut compensated: Vec<Vec<f32>> = Vec::with_capacity(frames.len());
    for (frame, comp) in frames.iter().zip(decoded.comp.iter()) {
        compensated.push(compensate_real(&frame.phase, *comp, edge_zero_width));
    }

    // dist_limit: |corrected_phase * rel_wl| should not exceed 1
    // (spec.md: "Encodes the physical constraint |phase·λ/(2πd)| ≤
    // 1"); the excess beyond that bound, clipped to [0, 100], is
    // averaged weighted by 1/variance, then averaged across edges.
    let mut dist_limit_sum = 0.0_f32;
    for (e, edge) in edges.iter().enumerate() {
        let phase = &compensated[e];
        let variance = &frames[e].variance;
        let mut num = 0.0_f32;
        let mut den = 0.0_f32;
        for k in 0..l.min(phase.len()) {
            let q = (phase[k] * edge.rel_wl[k]).abs();
            let excess = (q - 1.0).clamp(0.0, 100.0);
            let w = 1.0 / variance[k].max(1e-6);
            num += excess * w;
            den += w;
        }
        if den > 0.0 {
            dist_limit_sum += num / den;
        }
    }
    let dist_limit_term = if edges.is_empty() {
        0.0
    } else {
        dist_limit_sum / edges.len() as f32
    };

    // focus: mean pseudo-spectrum sharpness at each frequency of
    // interest, from a paint canvas over the compensated phases.
    let focus_term = if foi.is_empty() {
        0.0
    } else {
        let mut total = 0.0_f32;
        for f in foi {
            let lo = f.bin.saturating_sub(f.half_width);
            let hi = (f.bin + f.half_width).min(l.saturating_sub(1));
            let count = (hi - lo + 1).max(1) as f32;

            let phase_avg: Vec<f32> = compensated
                .iter()
                .map(|p| p[lo..=hi].iter().sum::<f32>() / count)
                .collect();
            let var_avg: Vec<f32> = frames
                .iter()
                .map(|fr| fr.variance[lo..=hi].iter().sum::<f32>() / count)
                .collect();
            let rel_wl: Vec<f32> = edges.iter().map(|e| e.rel_wl[f.bin]).collect();

            let hyps = paint::hypotheses_for_bin(edges, &rel_wl, &phase_avg, &var_avg);
            let canvas = paint::paint_canvas(l, &hyps);
            total += paint::focus_sharpness(&canvas);
        }
        total / foi.len() as f32
    };

    weights.dist_limit * dist_limit_term + weights.change * decoded.change - weights.focus * focus_term
}

/// Strategy B: warm-started bounded simplex search over a per-frame
/// cost function, with a phase-drift accumulator carried between hops
/// (spec.md §4.6).
pub struct SimplexCalibrator {
    optimizer: SimplexOptimizer,
    antenna_count: usize,
    ph_old: Vec<f32>,
    sao_old: Vec<f32>,
    fq_drift: Vec<f32>,
    ph_acc: Vec<f32>,
}

impl SimplexCalibrator {
    pub fn new(antenna_count: usize, seed: u64) -> SimplexCalibrator {
        let n1 = antenna_count.saturating_sub(1);
        let dim = 2 * n1;
        let lbottom = vec![-std::f32::consts::PI; dim];
        let ltop = vec![std::f32::consts::PI; dim];

        SimplexCalibrator {
            optimizer: SimplexOptimizer::new(lbottom, ltop, seed),
            antenna_count,
            ph_old: vec![0.0; n1],
            sao_old: vec![0.0; n1],
            fq_drift: vec![0.0; n1],
            ph_acc: vec![0.0; n1],
        }
    }

    pub fn reset(&mut self) {
        self.optimizer.reset();
        self.ph_old.iter_mut().for_each(|v| *v = 0.0);
        self.sao_old.iter_mut().for_each(|v| *v = 0.0);
        self.fq_drift.iter_mut().for_each(|v| *v = 0.0);
        self.ph_acc.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Current phase-drift accumulator, one entry per free antenna
    /// (spec.md's `ph_acc`, exposed for tests/diagnostics).
    pub fn ph_acc(&self) -> &[f32] {
        &self.ph_acc
    }

    pub fn fq_drift(&self) -> &[f32] {
        &self.fq_drift
    }

    /// Runs one hop against the current frameset's raw edge frames and
    /// returns the per-edge compensation to apply to *this same*
    /// frameset (spec.md §4.6: the hop both updates state and decides
    /// this frame's output, unlike Strategy A's apply-then-measure
    /// split).
    pub fn hop(
        &mut self,
        frames: &[EdgeFrame],
        array: &Array,
        projector: &Projector,
        foi: &[FrequencyOfInterest],
        weights: &SimplexWeights,
        edge_zero_width: usize,
    ) -> Vec<EdgeCompensation> {
        let ph_old = self.ph_old.clone();
        let sao_old = self.sao_old.clone();
        let fq_drift = self.fq_drift.clone();
        let ph_acc = self.ph_acc.clone();
        let antenna_count = self.antenna_count;

        let score_fn = |params: &[f32]| -> f32 {
            let decoded = decode_params(
                params,
                antenna_count,
                &ph_old,
                &sao_old,
                &fq_drift,
                &ph_acc,
                projector,
            );
            cost_terms(&decoded, frames, array, foi, weights, edge_zero_width)
        };

        let params = self.optimizer.optimize_hop(score_fn);

        let decoded = decode_params(
            &params,
            antenna_count,
            &ph_old,
            &sao_old,
            &fq_drift,
            &ph_acc,
            projector,
        );

        let n1 = antenna_count - 1;
        self.fq_drift = decoded.fq_drift.clone();
        self.ph_acc = decoded.ph_acc.clone();
        self.ph_old = params[n1..].to_vec();
        self.sao_old = params[..n1].to_vec();

        decoded.comp
    }
}

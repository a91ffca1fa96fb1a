//! Streaming Loop (C8).
//!
//! Wires C1–C7 into the per-frameset state machine of spec.md §4.8: a
//! single `Pipeline` value carries all mutable state (calibrator,
//! cached steering matrices, noise/signal points) across calls to
//! `step`, the way the teacher's `DecoderConfig`-driven decode loop
//! threads one value through repeated calls rather than relying on
//! process-wide state (spec.md DESIGN NOTES).

use std::io::Read;

use tracing::{info, instrument, warn};

use crate::calibrator::{pid, Calibrator};
use crate::compensator::compensate_real;
use crate::config::{CalibratorStrategy, Config};
use crate::direction::DirectionEstimator;
use crate::error::Result;
use crate::frame::{EdgeFrame, FrameReader};
use crate::geometry::Array;
use crate::points::{PointFinder, Points};
use crate::projector::Projector;

/// One frameset's worth of output (spec.md §6): compensated edges,
/// one pseudo-spectrum per frequency of interest, and the unchanged
/// magnitude of the first edge (used by the point finders upstream).
#[derive(Debug, Clone)]
pub struct FramesetOutput {
    pub edges: Vec<Vec<f32>>,
    pub spectra: Vec<Vec<f32>>,
    pub magnitude: Vec<f32>,
}

pub struct Pipeline {
    config: Config,
    array: Array,
    projector: Projector,
    frame_reader: FrameReader,
    point_finder: PointFinder,
    points: Points,
    calibrator: Calibrator,
    direction_estimator: DirectionEstimator,
    frameset_count: u64,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Pipeline> {
        let array = Array::build(
            &config.antennas,
            config.fq_low,
            config.fq_high,
            config.l,
            config.crop_eighths,
            config.wrap_norm,
        )?;
        let projector = Projector::build(array.antenna_count())?;
        let frame_reader = FrameReader::new(config.layout, config.l, array.edge_count());
        let point_finder = PointFinder::new(config.active_range);
        let calibrator = match config.strategy {
            CalibratorStrategy::Pid => Calibrator::Pid(pid::PidCalibrator::new(
                array.antenna_count(),
                config.phase_gains,
                config.sample_gains,
            )),
            CalibratorStrategy::Simplex => Calibrator::Simplex(
                crate::calibrator::SimplexCalibrator::new(array.antenna_count(), config.simplex_seed),
            ),
        };
        let direction_estimator = DirectionEstimator::new(config.direction_mode);

        Ok(Pipeline {
            config,
            array,
            projector,
            frame_reader,
            point_finder,
            points: Points::default(),
            calibrator,
            direction_estimator,
            frameset_count: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn array(&self) -> &Array {
        &self.array
    }

    pub fn frameset_count(&self) -> u64 {
        self.frameset_count
    }

    /// Current noise/signal point sets (for diagnostics/tests).
    pub fn points(&self) -> &Points {
        &self.points
    }

    /// Overrides the current noise/signal point sets. Lets a host that
    /// already knows good anchor bins (e.g. from a prior session) skip
    /// the `point_refresh_period`-frameset warm-up before Strategy A
    /// has anything to calibrate against.
    pub fn seed_points(&mut self, points: Points) {
        self.points = points;
    }

    /// Processes one frameset from `r`: read → compensate → emit →
    /// measure residual → update calibrator → periodically refresh
    /// points (spec.md §4.8). Returns `Ok(None)` on clean EOF.
    #[instrument(skip(self, r))]
    pub fn step<R: Read>(&mut self, r: &mut R) -> Result<Option<FramesetOutput>> {
        let frames = match self.frame_reader.read_frameset(r)? {
            Some(f) => f,
            None => return Ok(None),
        };

        let compensated = match &mut self.calibrator {
            Calibrator::Pid(pid_cal) => {
                let comp = pid_cal.edge_compensation(&self.projector);
                apply_compensation(&frames, &comp, self.config.edge_zero_width)
            }
            Calibrator::Simplex(spx) => {
                let foi = &self.config.foi;
                let comp = spx.hop(
                    &frames,
                    &self.array,
                    &self.projector,
                    foi,
                    &self.config.simplex_weights,
                    self.config.edge_zero_width,
                );
                apply_compensation(&frames, &comp, self.config.edge_zero_width)
            }
        };

        if compensated.iter().any(|f| f.phase.iter().any(|v| !v.is_finite())) {
            warn!("non-finite compensated phase, resetting calibrator state");
            self.calibrator.reset();
            return self.step(r);
        }

        let spectra: Vec<Vec<f32>> = self
            .config
            .foi
            .iter()
            .map(|foi| self.direction_estimator.spectrum(&self.array, &compensated, foi))
            .collect();

        let magnitude = compensated
            .first()
            .map(|f| f.magnitude_sq.iter().map(|&m| m.max(0.0).sqrt()).collect())
            .unwrap_or_default();

        if let Calibrator::Pid(pid_cal) = &mut self.calibrator {
            let edge_phase_err: Vec<f64> = compensated
                .iter()
                .map(|f| pid::noise_bin_error(&f.phase, &self.points.noise_points).0)
                .collect();
            let edge_slope_err: Vec<f64> = compensated
                .iter()
                .map(|f| pid::noise_bin_error(&f.phase, &self.points.noise_points).1)
                .collect();
            pid_cal.update(&edge_phase_err, &edge_slope_err, &self.projector);
        }

        self.frameset_count += 1;
        if self.frameset_count % self.config.point_refresh_period == 0 {
            if let Some(first) = compensated.first() {
                self.points = self.point_finder.refresh(&first.magnitude_sq, &self.points);
                info!(
                    signal_points = self.points.signal_points.len(),
                    noise_points = self.points.noise_points.len(),
                    "refreshed noise/signal points"
                );
            }
        }

        let edges = compensated.into_iter().map(|f| f.phase).collect();

        Ok(Some(FramesetOutput {
            edges,
            spectra,
            magnitude,
        }))
    }
}

fn apply_compensation(
    frames: &[EdgeFrame],
    comp: &[crate::compensator::EdgeCompensation],
    edge_zero_width: usize,
) -> Vec<EdgeFrame> {
    frames
        .iter()
        .zip(comp.iter())
        .map(|(frame, &c)| EdgeFrame {
            phase: compensate_real(&frame.phase, c, edge_zero_width),
            variance: frame.variance.clone(),
            magnitude_sq: frame.magnitude_sq.clone(),
        })
        .collect()
}

//! Joint offset-calibration and direction-of-arrival estimation
//! frontend for a four-antenna SDR array.
//!
//! The FFT backend, radio tuning, `libsofi` acquisition, GUI, and
//! simulator are external collaborators (out of scope, see
//! `SPEC_FULL.md` §1). This crate is the signal-processing core: it
//! reads per-edge phase/magnitude/variance framesets, estimates and
//! compensates per-receiver phase and sample-timing offsets, and
//! produces a pseudo-angular-spectrum per frequency of interest.

pub mod calibrator;
pub mod compensator;
pub mod config;
pub mod direction;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod pipeline;
pub mod points;
pub mod projector;
pub mod tracing_init;

pub use config::Config;
pub use error::{Result, SofiError};
pub use pipeline::{FramesetOutput, Pipeline};

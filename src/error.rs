//! Error types for the calibration/direction-estimation engine.

use snafu::Snafu;

/// Errors surfaced by the frontend pipeline and its components.
///
/// Truncation and singular-matrix errors are meant to terminate the
/// stream (spec.md §7); `NumericNaN` is recovered locally by the
/// caller (the pipeline resets calibrator state and continues).
#[derive(Debug, Snafu)]
pub enum SofiError {
    /// The input stream ended before a complete frameset could be read.
    #[snafu(display(
        "input truncated: expected {expected} bytes for edge {edge}, got {got}"
    ))]
    InputTruncated {
        edge: usize,
        expected: usize,
        got: usize,
    },

    /// Two antennas occupy (or nearly occupy) the same position.
    #[snafu(display("antennas {a} and {b} coincide (distance {distance})"))]
    GeometryDegenerate { a: usize, b: usize, distance: f64 },

    /// The reduced edge-effect matrix Ã is not invertible for this N.
    #[snafu(display("edge/antenna projector is singular for N={n}"))]
    SingularProjector { n: usize },

    /// A calibrator state value or cost evaluation produced NaN/Inf.
    #[snafu(display("numeric state went non-finite in {context}"))]
    NumericNaN { context: &'static str },

    /// The output sink refused or failed a write.
    #[snafu(display("output blocked: {source}"))]
    OutputBlocked { source: std::io::Error },
}

pub type Result<T, E = SofiError> = std::result::Result<T, E>;

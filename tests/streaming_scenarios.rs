//! End-to-end streaming-loop scenarios (spec.md §8 scenarios 1 and 6):
//! all-zero input should pass through as all-zero output, and a
//! mid-frameset truncation must terminate with `InputTruncated` and
//! leave no partial output or state mutation behind.

use std::io::Cursor;

use sofi_core::config::{CalibratorStrategy, Config, FrameLayout, FrequencyOfInterest};
use sofi_core::error::SofiError;
use sofi_core::Pipeline;

const ANTENNAS: [(f64, f64); 4] = [
    (0.0, 0.0),
    (-0.355, 0.0),
    (-0.1754, 0.3235),
    (-0.1855, 0.1585),
];

fn encode_zero_frameset(l: usize, edges: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    for _ in 0..edges {
        for _ in 0..l {
            buf.extend_from_slice(&0.0f32.to_le_bytes());
        }
        for _ in 0..l {
            buf.extend_from_slice(&1.0f32.to_le_bytes());
        }
        for _ in 0..l {
            buf.extend_from_slice(&1.0f32.to_le_bytes());
        }
    }
    buf
}

fn base_config(l: usize) -> Config {
    Config {
        antennas: ANTENNAS.to_vec(),
        strategy: CalibratorStrategy::Pid,
        layout: FrameLayout::RealTriplet,
        foi: vec![FrequencyOfInterest { bin: l / 2, half_width: 2 }],
        ..Config::default().with_l(l)
    }
}

#[test]
fn all_zero_stream_yields_all_zero_output_and_zero_drift() {
    let l = 2048;
    let mut pipeline = Pipeline::new(base_config(l)).unwrap();
    let edges = pipeline.array().edge_count();

    for _ in 0..10 {
        let bytes = encode_zero_frameset(l, edges);
        let mut cursor = Cursor::new(bytes);
        let out = pipeline.step(&mut cursor).unwrap().unwrap();

        for edge_phase in &out.edges {
            assert!(edge_phase.iter().all(|&v| v.abs() < 1e-4));
        }
        for spectrum in &out.spectra {
            assert!(spectrum.iter().all(|&v| v.abs() < 1e-4));
        }
    }
}

#[test]
fn mid_frameset_truncation_terminates_cleanly() {
    let l = 1024;
    let mut pipeline = Pipeline::new(base_config(l)).unwrap();
    let edges = pipeline.array().edge_count();

    let mut bytes = encode_zero_frameset(l, edges);
    bytes.truncate(bytes.len() / 2 + 7);
    let mut cursor = Cursor::new(bytes);

    let err = pipeline.step(&mut cursor).unwrap_err();
    assert!(matches!(err, SofiError::InputTruncated { .. }));
    assert_eq!(pipeline.frameset_count(), 0);
}

#[test]
fn clean_eof_between_framesets_is_not_an_error() {
    let l = 64;
    let mut pipeline = Pipeline::new(base_config(l)).unwrap();
    let mut cursor = Cursor::new(Vec::<u8>::new());
    assert!(pipeline.step(&mut cursor).unwrap().is_none());
    assert_eq!(pipeline.frameset_count(), 0);
}

//! `sofi-frontend`: stdin/stdout entry point for the calibration +
//! direction-estimation core (spec.md §6). Parses its own arguments by
//! hand (no `clap`), the way the teacher crate's own binaries take
//! positional/flag arguments straight off `std::env::args()`.
//!
//! Usage:
//!   sofi-frontend [--l N] [--fq-low HZ] [--fq-high HZ]
//!                 [--strategy pid|simplex] [--layout real|complex]
//!                 [--foi BIN[:HALF_WIDTH]]... [--antenna X,Y]...
//!
//! Antenna positions default to the reference 4-element array from
//! spec.md §8 scenario 1 if none are given.

use std::io::{self, Write};
use std::process::ExitCode;

use sofi_core::config::{CalibratorStrategy, Config, FrameLayout, FrequencyOfInterest};
use sofi_core::error::SofiError;
use sofi_core::tracing_init::init_tracing;
use sofi_core::Pipeline;

fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut antennas: Vec<(f64, f64)> = Vec::new();
    let mut foi: Vec<FrequencyOfInterest> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--l" => {
                i += 1;
                let l: usize = args.get(i).ok_or("--l requires a value")?.parse().map_err(|_| "bad --l")?;
                config.l = l;
            }
            "--fq-low" => {
                i += 1;
                config.fq_low = args.get(i).ok_or("--fq-low requires a value")?.parse().map_err(|_| "bad --fq-low")?;
            }
            "--fq-high" => {
                i += 1;
                config.fq_high = args.get(i).ok_or("--fq-high requires a value")?.parse().map_err(|_| "bad --fq-high")?;
            }
            "--strategy" => {
                i += 1;
                config.strategy = match args.get(i).map(String::as_str) {
                    Some("pid") => CalibratorStrategy::Pid,
                    Some("simplex") => CalibratorStrategy::Simplex,
                    _ => return Err("--strategy must be pid|simplex".into()),
                };
            }
            "--layout" => {
                i += 1;
                config.layout = match args.get(i).map(String::as_str) {
                    Some("real") => FrameLayout::RealTriplet,
                    Some("complex") => FrameLayout::Complex,
                    _ => return Err("--layout must be real|complex".into()),
                };
            }
            "--antenna" => {
                i += 1;
                let raw = args.get(i).ok_or("--antenna requires X,Y")?;
                let mut parts = raw.split(',');
                let x: f64 = parts.next().and_then(|s| s.parse().ok()).ok_or("bad --antenna")?;
                let y: f64 = parts.next().and_then(|s| s.parse().ok()).ok_or("bad --antenna")?;
                antennas.push((x, y));
            }
            "--foi" => {
                i += 1;
                let raw = args.get(i).ok_or("--foi requires BIN[:HALF_WIDTH]")?;
                let mut parts = raw.split(':');
                let bin: usize = parts.next().and_then(|s| s.parse().ok()).ok_or("bad --foi bin")?;
                let half_width: usize = parts.next().map(|s| s.parse().unwrap_or(2)).unwrap_or(2);
                foi.push(FrequencyOfInterest { bin, half_width });
            }
            other => return Err(format!("unrecognized argument: {other}")),
        }
        i += 1;
    }

    if !antennas.is_empty() {
        config.antennas = antennas;
    }
    config = config.with_l(config.l);
    if !foi.is_empty() {
        config.foi = foi;
    }

    Ok(config)
}

fn run() -> Result<(), SofiError> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("sofi-frontend: {e}");
        std::process::exit(2);
    });

    let mut pipeline = Pipeline::new(config)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();

    loop {
        match pipeline.step(&mut input)? {
            None => {
                tracing::info!(framesets = pipeline.frameset_count(), "clean EOF");
                return Ok(());
            }
            Some(frameset) => {
                for edge in &frameset.edges {
                    write_floats(&mut output, edge)?;
                }
                for spectrum in &frameset.spectra {
                    write_floats(&mut output, spectrum)?;
                }
                write_floats(&mut output, &frameset.magnitude)?;
            }
        }
    }
}

fn write_floats<W: Write>(w: &mut W, values: &[f32]) -> Result<(), SofiError> {
    let mut buf = Vec::with_capacity(values.len() * 4);
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    w.write_all(&buf).map_err(|source| SofiError::OutputBlocked { source })
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sofi-frontend: {e}");
            ExitCode::FAILURE
        }
    }
}

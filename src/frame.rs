//! Frame Reader (C3).
//!
//! Reads one frameset of `edge_count` edge records from a byte stream,
//! in either of the two wire layouts spec.md §4.3 and §6 describe.
//! `read_frameset` never leaves a partially-read frameset visible to
//! the caller: a short read anywhere inside a frameset is reported as
//! `InputTruncated`; a clean EOF exactly at a frameset boundary is
//! reported as `Ok(None)` so the streaming loop (C8) can terminate
//! without treating it as an error.

use std::io::Read;

use num::complex::Complex32;

use crate::config::FrameLayout;
use crate::error::{Result, SofiError};

/// One edge's phase/variance/magnitude² vectors, all length L.
#[derive(Debug, Clone)]
pub struct EdgeFrame {
    /// Phase in (−π, π].
    pub phase: Vec<f32>,
    /// Variance, ≥0. Synthesized as 1.0 under `FrameLayout::Complex`
    /// (spec.md §4.3, §9 Open Questions).
    pub variance: Vec<f32>,
    /// Magnitude squared, ≥0.
    pub magnitude_sq: Vec<f32>,
}

impl EdgeFrame {
    pub fn len(&self) -> usize {
        self.phase.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phase.is_empty()
    }
}

pub struct FrameReader {
    layout: FrameLayout,
    l: usize,
    edge_count: usize,
}

impl FrameReader {
    pub fn new(layout: FrameLayout, l: usize, edge_count: usize) -> FrameReader {
        FrameReader {
            layout,
            l,
            edge_count,
        }
    }

    /// Reads one frameset (`edge_count` edge records) from `r`.
    ///
    /// Returns `Ok(None)` on a clean end-of-stream that falls exactly
    /// on a frameset boundary, `Ok(Some(frames))` on success, and
    /// `Err(SofiError::InputTruncated)` for any short/partial read.
    pub fn read_frameset<R: Read>(&self, r: &mut R) -> Result<Option<Vec<EdgeFrame>>> {
        let mut frames = Vec::with_capacity(self.edge_count);

        for edge in 0..self.edge_count {
            let frame = match self.layout {
                FrameLayout::RealTriplet => self.read_real_triplet(r, edge)?,
                FrameLayout::Complex => self.read_complex(r, edge)?,
            };

            match frame {
                Some(f) => frames.push(f),
                None if edge == 0 => return Ok(None),
                None => unreachable!("short reads past edge 0 must error, not return None"),
            }
        }

        Ok(Some(frames))
    }

    fn read_real_triplet<R: Read>(&self, r: &mut R, edge: usize) -> Result<Option<EdgeFrame>> {
        let record_len = self.l * 4 * 3;
        let mut buf = vec![0u8; record_len];
        let got = read_fully(r, &mut buf)?;

        if got == 0 && edge == 0 {
            return Ok(None);
        }
        if got < record_len {
            return Err(SofiError::InputTruncated {
                edge,
                expected: record_len,
                got,
            });
        }

        let phase = floats_le(&buf[0..self.l * 4]);
        let variance = floats_le(&buf[self.l * 4..self.l * 8]);
        let magnitude_sq = floats_le(&buf[self.l * 8..self.l * 12]);

        Ok(Some(EdgeFrame {
            phase,
            variance,
            magnitude_sq,
        }))
    }

    fn read_complex<R: Read>(&self, r: &mut R, edge: usize) -> Result<Option<EdgeFrame>> {
        let record_len = self.l * 8;
        let mut buf = vec![0u8; record_len];
        let got = read_fully(r, &mut buf)?;

        if got == 0 && edge == 0 {
            return Ok(None);
        }
        if got < record_len {
            return Err(SofiError::InputTruncated {
                edge,
                expected: record_len,
                got,
            });
        }

        let mut phase = Vec::with_capacity(self.l);
        let mut magnitude_sq = Vec::with_capacity(self.l);

        for k in 0..self.l {
            let re = f32::from_le_bytes(buf[k * 8..k * 8 + 4].try_into().unwrap());
            let im = f32::from_le_bytes(buf[k * 8 + 4..k * 8 + 8].try_into().unwrap());
            let c = Complex32::new(re, im);
            phase.push(c.arg());
            magnitude_sq.push(c.norm_sqr());
        }

        let variance = vec![1.0_f32; self.l];

        Ok(Some(EdgeFrame {
            phase,
            variance,
            magnitude_sq,
        }))
    }
}

fn floats_le(buf: &[u8]) -> Vec<f32> {
    buf.chunks_exact(4)
        .map(|b| f32::from_le_bytes(b.try_into().unwrap()))
        .collect()
}

/// Reads until `buf` is full or the stream runs dry, returning the
/// number of bytes actually read (may be less than `buf.len()`).
fn read_fully<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => {
                return Err(SofiError::InputTruncated {
                    edge: 0,
                    expected: buf.len(),
                    got: total,
                })
            }
        }
    }
    Ok(total)
}

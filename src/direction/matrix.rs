//! Direction Estimator — Mode M (steering matrix), spec.md §4.7.
//!
//! `M(λ)` has shape L×E, row k = `[dc_e · sin(φ_e + θ_k)]`, cached by
//! the midpoint wavelength of a frequency-of-interest band (spec.md §3,
//! §9). The cache is a small LRU keyed on the wavelength's bit pattern,
//! the way the teacher caches FFT plans by size in `src/sync/fft.rs`.

use std::f32::consts::PI;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::geometry::Edge;

/// Flattened row-major L×E steering matrix for one wavelength.
pub struct SteeringMatrix {
    pub l: usize,
    pub e: usize,
    data: Vec<f32>,
}

impl SteeringMatrix {
    fn build(edges: &[Edge], wavelength: f64, l: usize) -> SteeringMatrix {
        let e = edges.len();
        let dc: Vec<f64> = edges
            .iter()
            .map(|edge| 2.0 * std::f64::consts::PI * edge.distance / wavelength)
            .collect();

        let mut data = vec![0.0_f32; l * e];
        for k in 0..l {
            let theta_k = -PI + 2.0 * PI * (k as f32) / (l as f32);
            for (col, edge) in edges.iter().enumerate() {
                let v = dc[col] * ((edge.bearing as f32) + theta_k).sin() as f64;
                data[k * e + col] = v as f32;
            }
        }

        SteeringMatrix { l, e, data }
    }

    /// `M · phase_vec`, producing an L-point pseudo-spectrum.
    pub fn apply(&self, phase_vec: &[f32]) -> Vec<f32> {
        debug_assert_eq!(phase_vec.len(), self.e);
        (0..self.l)
            .map(|k| {
                let row = &self.data[k * self.e..(k + 1) * self.e];
                row.iter().zip(phase_vec.iter()).map(|(a, b)| a * b).sum()
            })
            .collect()
    }
}

/// LRU cache of steering matrices keyed by wavelength (bit pattern, so
/// the key is hashable without losing float precision).
pub struct SteeringCache {
    cache: LruCache<u64, Arc<SteeringMatrix>>,
}

impl SteeringCache {
    pub fn new(capacity: usize) -> SteeringCache {
        SteeringCache {
            cache: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap()),
        }
    }

    pub fn get_or_build(&mut self, edges: &[Edge], wavelength: f64, l: usize) -> Arc<SteeringMatrix> {
        let key = wavelength.to_bits();
        if let Some(m) = self.cache.get(&key) {
            return Arc::clone(m);
        }
        let built = Arc::new(SteeringMatrix::build(edges, wavelength, l));
        self.cache.put(key, Arc::clone(&built));
        built
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WrapNorm;
    use crate::geometry::Array;

    #[test]
    fn matrix_shape_matches_l_and_e() {
        let antennas = [
            (0.0, 0.0),
            (-0.355, 0.0),
            (-0.1754, 0.3235),
            (-0.1855, 0.1585),
        ];
        let arr = Array::build(&antennas, 100e6, 102e6, 32, false, WrapNorm::TwoPi).unwrap();
        let m = SteeringMatrix::build(arr.edges(), arr.wavelengths()[16], 32);
        assert_eq!(m.l, 32);
        assert_eq!(m.e, 6);
        let out = m.apply(&vec![0.0_f32; 6]);
        assert_eq!(out.len(), 32);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn cache_reuses_same_wavelength() {
        let antennas = [
            (0.0, 0.0),
            (-0.355, 0.0),
            (-0.1754, 0.3235),
            (-0.1855, 0.1585),
        ];
        let arr = Array::build(&antennas, 100e6, 102e6, 32, false, WrapNorm::TwoPi).unwrap();
        let mut cache = SteeringCache::new(4);
        let wl = arr.wavelengths()[8];
        let m1 = cache.get_or_build(arr.edges(), wl, 32);
        let m2 = cache.get_or_build(arr.edges(), wl, 32);
        assert!(Arc::ptr_eq(&m1, &m2));
    }
}

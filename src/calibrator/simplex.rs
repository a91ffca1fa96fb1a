//! Simplex optimizer (spec.md §4.6 Strategy B).
//!
//! A warm-started, bounded Nelder–Mead-like simplex: one "hop" per
//! frameset. Mirrors `SimplexOptim` in
//! `examples/original_source/frontend/simplex_optim.py`, generalized
//! to an arbitrary dimension and driven by a seeded `rand` PRNG rather
//! than Python's `random.Random` (spec.md §9: "a seeded deterministic
//! PRNG (seed 0 for reproducibility)").

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

/// Reflect/contract/expand factors applied to `(1−f)·centroid + f·worst`.
const WALK_FACTORS: [f32; 3] = [-1.05, 0.45, 1.95];

pub struct SimplexOptimizer {
    lbottom: Vec<f32>,
    ltop: Vec<f32>,
    simplex: Vec<Vec<f32>>,
    rng: StdRng,
}

impl SimplexOptimizer {
    /// Builds the canonical D+1 vertex simplex: one vertex at
    /// `lbottom`, and one vertex per dimension with that coordinate
    /// pulled to `ltop[dim]`.
    pub fn new(lbottom: Vec<f32>, ltop: Vec<f32>, seed: u64) -> SimplexOptimizer {
        let dim = lbottom.len();
        let mut simplex = vec![lbottom.clone(); dim + 1];
        for (n, top) in ltop.iter().enumerate() {
            simplex[n + 1][n] = *top;
        }

        SimplexOptimizer {
            lbottom,
            ltop,
            simplex,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Resets to the canonical bounded shape (spec.md §7: NaN recovery
    /// reinitializes the simplex).
    pub fn reset(&mut self) {
        let dim = self.lbottom.len();
        self.simplex = vec![self.lbottom.clone(); dim + 1];
        for (n, top) in self.ltop.iter().enumerate() {
            self.simplex[n + 1][n] = *top;
        }
    }

    pub fn dim(&self) -> usize {
        self.lbottom.len()
    }

    /// Current best-estimate parameter vector (mean of the simplex).
    pub fn current(&self) -> Vec<f32> {
        points_mean(&self.simplex)
    }

    fn wrap_into_bounds(&self, mut p: Vec<f32>) -> Vec<f32> {
        for i in 0..p.len() {
            let w = self.ltop[i] - self.lbottom[i];
            if w > 0.0 {
                p[i] = (p[i] - self.lbottom[i]).rem_euclid(w) + self.lbottom[i];
            }
        }
        p
    }

    fn expand(&self, centroid: &[f32], worst: &[f32], f: f32) -> Vec<f32> {
        let raw: Vec<f32> = centroid
            .iter()
            .zip(worst.iter())
            .map(|(&c, &w)| (1.0 - f) * c + f * w)
            .collect();
        self.wrap_into_bounds(raw)
    }

    fn noise_point(&mut self, mid: &[f32]) -> Vec<f32> {
        let dim = mid.len();
        let idx = self.rng.random_range(0..dim);
        let width = self.ltop[idx] - self.lbottom[idx];
        let spread = width / 8.0;

        let mut out = mid.to_vec();
        if spread > 0.0 {
            let delta = Uniform::new(-spread, spread).unwrap().sample(&mut self.rng);
            out[idx] += delta;
        }
        self.wrap_into_bounds(out)
    }

    /// Runs one hop of the simplex against `score_fn` (lower is
    /// better) and returns the new best-estimate parameter vector.
    pub fn optimize_hop<F: FnMut(&[f32]) -> f32>(&mut self, mut score_fn: F) -> Vec<f32> {
        let dim = self.dim();

        let mut ranked: Vec<(Vec<f32>, f32)> = self
            .simplex
            .iter()
            .map(|v| (v.clone(), score_fn(v)))
            .collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let best_d: Vec<Vec<f32>> = ranked[..dim].iter().map(|(v, _)| v.clone()).collect();
        let worst = ranked[dim].0.clone();
        let centroid = points_mean(&best_d);

        let mut candidates: Vec<Vec<f32>> = WALK_FACTORS
            .iter()
            .map(|&f| self.expand(&centroid, &worst, f))
            .collect();
        candidates.push(self.noise_point(&centroid));

        let mut ranked_candidates: Vec<(Vec<f32>, f32)> = candidates
            .into_iter()
            .map(|v| {
                let score = score_fn(&v);
                (v, score)
            })
            .collect();
        ranked_candidates
            .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let best_candidate = ranked_candidates[0].0.clone();

        let mut new_simplex = best_d;
        new_simplex.push(best_candidate);
        self.simplex = new_simplex;

        points_mean(&self.simplex)
    }

    /// True if every vertex lies within its configured bounds
    /// (spec.md §8: "Bound preservation").
    pub fn vertices_in_bounds(&self) -> bool {
        self.simplex.iter().all(|v| {
            v.iter()
                .enumerate()
                .all(|(i, &x)| x >= self.lbottom[i] - 1e-5 && x <= self.ltop[i] + 1e-5)
        })
    }
}

fn points_mean(points: &[Vec<f32>]) -> Vec<f32> {
    let dim = points[0].len();
    let mut out = vec![0.0_f32; dim];
    for p in points {
        for (o, &v) in out.iter_mut().zip(p.iter()) {
            *o += v;
        }
    }
    let n = points.len() as f32;
    out.iter_mut().for_each(|v| *v /= n);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn bounds_preserved_across_many_hops() {
        let dim = 6;
        let lbottom = vec![-PI; dim];
        let ltop = vec![PI; dim];
        let mut opt = SimplexOptimizer::new(lbottom, ltop, 0);

        for _ in 0..500 {
            opt.optimize_hop(|p| p.iter().map(|x| x * x).sum());
            assert!(opt.vertices_in_bounds());
        }
    }

    #[test]
    fn converges_toward_minimum() {
        let dim = 3;
        let lbottom = vec![-PI; dim];
        let ltop = vec![PI; dim];
        let mut opt = SimplexOptimizer::new(lbottom, ltop, 0);
        let target = [0.5_f32, -1.0, 1.5];

        let mut last = opt.current();
        for _ in 0..300 {
            last = opt.optimize_hop(|p| {
                p.iter()
                    .zip(target.iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum()
            });
        }

        for (got, want) in last.iter().zip(target.iter()) {
            assert!((got - want).abs() < 0.2, "got {:?} want {:?}", last, target);
        }
    }

    #[test]
    fn deterministic_given_same_seed() {
        let dim = 4;
        let lbottom = vec![-1.0; dim];
        let ltop = vec![1.0; dim];
        let mut a = SimplexOptimizer::new(lbottom.clone(), ltop.clone(), 42);
        let mut b = SimplexOptimizer::new(lbottom, ltop, 42);

        for _ in 0..20 {
            let ra = a.optimize_hop(|p| p.iter().map(|x| x.abs()).sum());
            let rb = b.optimize_hop(|p| p.iter().map(|x| x.abs()).sum());
            assert_eq!(ra, rb);
        }
    }
}

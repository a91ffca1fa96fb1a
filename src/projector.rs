//! Edge/Antenna Projector (C2).
//!
//! The fixed linear relation between per-antenna errors x ∈ ℝᴺ (x₀=0,
//! antenna 0 is the implicit reference) and per-edge observed errors
//! y ∈ ℝᴱ (spec.md §4.2). `forward` is the exact E×N effect matrix;
//! `reverse` is the unique fold-and-invert reduction described there,
//! which is only defined for N=4 (E=6 folds onto a 3×3 square). Ã⁻¹ is
//! computed once at construction via a closed-form 3×3 inverse
//! (spec.md §9) and is logically immutable afterwards (I4).

use crate::error::{Result, SofiError};
use crate::geometry::canonical_edges;

#[derive(Debug, Clone)]
pub struct Projector {
    n: usize,
    e: usize,
    /// Forward effect matrix, E rows × N columns. Row e=(i,j) has +1 at
    /// column i, -1 at column j, 0 elsewhere.
    effect_mat: Vec<Vec<f64>>,
    /// Ã⁻¹, the inverse of the folded reduced effect matrix. Only
    /// populated (and only meaningful) for N=4.
    inv: [[f64; 3]; 3],
}

impl Projector {
    /// Builds the projector for an N-antenna array.
    ///
    /// The reverse (edge→antenna) direction is only implemented for
    /// N=4, per spec.md §4.2's note that the fold "is a specific
    /// choice"; other N return `SingularProjector`.
    pub fn build(n: usize) -> Result<Projector> {
        let edges = canonical_edges(n);
        let e = edges.len();

        let mut effect_mat = vec![vec![0.0_f64; n]; e];
        for (row, &(i, j)) in edges.iter().enumerate() {
            effect_mat[row][i] = 1.0;
            effect_mat[row][j] = -1.0;
        }

        if n != 4 {
            return Err(SofiError::SingularProjector { n });
        }

        // Drop column 0 (the reference antenna) to get Â (E x (N-1)).
        let reduced: Vec<[f64; 3]> = effect_mat
            .iter()
            .map(|row| [row[1], row[2], row[3]])
            .collect();

        // Fold rows 0..3 with rows 3..6 into a square 3x3 matrix.
        let mut folded = [[0.0_f64; 3]; 3];
        for col in 0..3 {
            for row in 0..3 {
                folded[row][col] = reduced[row][col] + reduced[row + 3][col];
            }
        }

        let inv = invert3(&folded).ok_or(SofiError::SingularProjector { n })?;

        Ok(Projector {
            n,
            e,
            effect_mat,
            inv,
        })
    }

    pub fn antenna_count(&self) -> usize {
        self.n
    }

    pub fn edge_count(&self) -> usize {
        self.e
    }

    /// Antenna errors (length N, x[0] must be 0) -> edge errors (length E).
    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.n);
        self.effect_mat
            .iter()
            .map(|row| row.iter().zip(x.iter()).map(|(a, xi)| a * xi).sum())
            .collect()
    }

    /// Edge errors (length E) -> antenna errors (length N, result[0] = 0).
    ///
    /// Only valid for N=4 (see `build`).
    pub fn reverse(&self, y: &[f64]) -> Vec<f64> {
        debug_assert_eq!(y.len(), self.e);
        debug_assert_eq!(self.n, 4);

        let y_tilde = [y[0] + y[3], y[1] + y[4], y[2] + y[5]];

        let mut x = vec![0.0_f64; self.n];
        for row in 0..3 {
            x[row + 1] = self.inv[row]
                .iter()
                .zip(y_tilde.iter())
                .map(|(a, b)| a * b)
                .sum();
        }
        x
    }
}

/// Closed-form 3×3 matrix inverse via the adjugate, `None` if singular.
fn invert3(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);

    if det.abs() < 1e-12 {
        return None;
    }

    let inv_det = 1.0 / det;
    let mut out = [[0.0_f64; 3]; 3];

    out[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
    out[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
    out[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;

    out[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
    out[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
    out[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;

    out[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
    out[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
    out[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn round_trip_n4() {
        let proj = Projector::build(4).unwrap();
        let x = [0.0, 0.31, -0.9, 1.2];
        let y = proj.forward(&x);
        let x2 = proj.reverse(&y);
        for (a, b) in x.iter().zip(x2.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn round_trip_many_vectors() {
        let proj = Projector::build(4).unwrap();
        let cases: &[[f64; 4]] = &[
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, -2.5, 3.3, -0.1],
            [0.0, std::f64::consts::PI, -std::f64::consts::PI, 0.0],
        ];
        for x in cases {
            let y = proj.forward(x);
            let x2 = proj.reverse(&y);
            for (a, b) in x.iter().zip(x2.iter()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn rejects_non_n4() {
        assert!(Projector::build(3).is_err());
        assert!(Projector::build(5).is_err());
    }

    #[test]
    fn edge_count_matches_n_choose_2() {
        let proj = Projector::build(4).unwrap();
        assert_eq!(proj.edge_count(), 6);
        assert_eq!(proj.antenna_count(), 4);
    }
}

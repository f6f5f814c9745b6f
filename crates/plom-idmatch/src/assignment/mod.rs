//! Minimum-cost bipartite matching (linear sum assignment).
//!
//! Rows are papers, columns are candidate student IDs. A solver returns
//! `min(rows, cols)` `(row, col)` pairs, each row and each column used at
//! most once, minimizing the summed cost. Rectangular matrices are allowed.
//!
//! The solver is a strategy behind [`AssignmentSolver`]; [`Hungarian`] is the
//! default used by [`solve_optimal_assignment`].

mod hungarian;

use nalgebra::DMatrix;

use crate::error::MatchError;

pub use hungarian::Hungarian;

/// A linear-sum-assignment strategy.
pub trait AssignmentSolver {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Minimum-cost matching as `(row, col)` pairs sorted by row.
    ///
    /// Fails with [`MatchError::DegenerateProblem`] when either dimension is
    /// zero and with [`MatchError::NonFiniteCost`] when an entry is NaN or
    /// infinite.
    fn solve(&self, cost: &DMatrix<f64>) -> Result<Vec<(usize, usize)>, MatchError>;
}

/// Solve the assignment problem for `cost` with the Hungarian method.
pub fn solve_optimal_assignment(cost: &DMatrix<f64>) -> Result<Vec<(usize, usize)>, MatchError> {
    Hungarian.solve(cost)
}

/// Summed cost of a set of `(row, col)` pairs.
pub fn assignment_cost(cost: &DMatrix<f64>, pairs: &[(usize, usize)]) -> f64 {
    pairs.iter().map(|&(r, c)| cost[(r, c)]).sum()
}

/// Shared input checks for solver implementations.
pub(crate) fn validate_cost_matrix(cost: &DMatrix<f64>) -> Result<(), MatchError> {
    let (rows, cols) = cost.shape();
    if rows == 0 || cols == 0 {
        return Err(MatchError::DegenerateProblem {
            n_papers: rows,
            n_ids: cols,
        });
    }
    // Column-major storage: linear index i maps to (i % rows, i / rows).
    if let Some(i) = cost.iter().position(|v| !v.is_finite()) {
        return Err(MatchError::NonFiniteCost {
            row: i % rows,
            col: i / rows,
        });
    }
    Ok(())
}

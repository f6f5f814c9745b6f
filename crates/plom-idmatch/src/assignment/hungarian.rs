//! Hungarian method via shortest augmenting paths with dual potentials.
//!
//! Works on an `n x m` matrix with `n <= m`: rows are inserted one at a time
//! and each insertion grows an alternating tree (Dijkstra over reduced costs)
//! until a free column is reached, then flips the path. Runs in `O(n^2 m)`.
//! Taller matrices are solved on the transpose.
//!
//! Column index 0 is a virtual column used as the tree root, so the working
//! arrays are 1-based in both rows and columns.

use nalgebra::DMatrix;

use super::{validate_cost_matrix, AssignmentSolver};
use crate::error::MatchError;

/// Exact rectangular linear-sum-assignment solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hungarian;

impl AssignmentSolver for Hungarian {
    fn name(&self) -> &'static str {
        "hungarian"
    }

    fn solve(&self, cost: &DMatrix<f64>) -> Result<Vec<(usize, usize)>, MatchError> {
        validate_cost_matrix(cost)?;

        let (rows, cols) = cost.shape();
        let mut pairs = if rows <= cols {
            solve_shape(rows, cols, |r, c| cost[(r, c)])
        } else {
            // Rows of the virtual wide problem are columns of `cost`.
            tracing::trace!(rows, cols, "hungarian: solving transposed problem");
            solve_shape(cols, rows, |r, c| cost[(c, r)])
                .into_iter()
                .map(|(r, c)| (c, r))
                .collect()
        };
        pairs.sort_unstable();
        Ok(pairs)
    }
}

/// Core loop on an `n x m` problem (`n <= m`) given by the accessor `at`.
fn solve_shape(n: usize, m: usize, at: impl Fn(usize, usize) -> f64) -> Vec<(usize, usize)> {
    debug_assert!(n <= m);

    // Dual potentials for rows (u) and columns (v).
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    // row_of[j]: row currently matched to column j (0 = free).
    let mut row_of = vec![0usize; m + 1];
    // prev[j]: previous column on the shortest path to column j.
    let mut prev = vec![0usize; m + 1];
    let mut min_slack = vec![f64::INFINITY; m + 1];
    let mut visited = vec![false; m + 1];

    for i in 1..=n {
        row_of[0] = i;
        let mut j0 = 0usize;
        min_slack.fill(f64::INFINITY);
        visited.fill(false);

        loop {
            visited[j0] = true;
            let i0 = row_of[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=m {
                if visited[j] {
                    continue;
                }
                let reduced = at(i0 - 1, j - 1) - u[i0] - v[j];
                if reduced < min_slack[j] {
                    min_slack[j] = reduced;
                    prev[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if visited[j] {
                    u[row_of[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }

            j0 = j1;
            if row_of[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path back to the root.
        loop {
            let j1 = prev[j0];
            row_of[j0] = row_of[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    (1..=m)
        .filter(|&j| row_of[j] != 0)
        .map(|j| (row_of[j] - 1, j - 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_costs_pick_the_diagonal() {
        let n = 6;
        let cost = DMatrix::from_fn(n, n, |r, c| if r == c { 0.0 } else { 1.0 });
        let pairs = Hungarian.solve(&cost).unwrap();
        assert_eq!(pairs, (0..n).map(|i| (i, i)).collect::<Vec<_>>());
    }

    #[test]
    fn anti_diagonal_is_found() {
        let n = 5;
        let cost = DMatrix::from_fn(n, n, |r, c| if r + c == n - 1 { 0.5 } else { 3.0 });
        let pairs = Hungarian.solve(&cost).unwrap();
        assert_eq!(pairs, (0..n).map(|i| (i, n - 1 - i)).collect::<Vec<_>>());
    }

    #[test]
    fn transposed_problem_gives_the_same_pairs() {
        let cost = DMatrix::from_row_slice(
            2,
            3,
            &[
                3.0, 0.5, 8.0, //
                0.2, 4.0, 6.0,
            ],
        );
        let wide = Hungarian.solve(&cost).unwrap();
        let mut tall: Vec<(usize, usize)> = Hungarian
            .solve(&cost.transpose())
            .unwrap()
            .into_iter()
            .map(|(r, c)| (c, r))
            .collect();
        tall.sort_unstable();
        assert_eq!(wide, vec![(0, 1), (1, 0)]);
        assert_eq!(wide, tall);
    }

    #[test]
    fn negative_costs_are_fine() {
        let cost = DMatrix::from_row_slice(2, 2, &[-5.0, -1.0, -2.0, -6.0]);
        assert_eq!(Hungarian.solve(&cost).unwrap(), vec![(0, 0), (1, 1)]);
    }
}

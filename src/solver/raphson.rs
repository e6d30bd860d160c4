/*
    Skyward, mission segment solver
    Copyright (C) 2026 Skyward contributors

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::jacobian::{finite_difference, weakest_column};
use super::{NotSquareSnafu, SolverConfig, SolverError, SolverSolution};
use crate::linalg::{DMatrix, DVector};
use snafu::ensure;
use std::time::Instant;

/// Newton-Raphson solver of a square system of scaled residuals, with a finite differenced Jacobian,
/// a bounded step and a backtracking line search.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct NewtonRaphson {
    pub config: SolverConfig,
}

impl NewtonRaphson {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Drives `residuals(x)` to zero starting from `x0`.
    ///
    /// The labels name each unknown and each residual and are only used in error messages and logs.
    /// Non finite residuals are never accepted as a step.
    pub fn solve<F>(
        &self,
        x0: DVector<f64>,
        unknown_labels: &[String],
        residual_labels: &[String],
        residuals: F,
    ) -> Result<SolverSolution, SolverError>
    where
        F: Fn(&DVector<f64>) -> DVector<f64> + Sync,
    {
        ensure!(
            x0.len() == residual_labels.len(),
            NotSquareSnafu {
                unknowns: x0.len(),
                residuals: residual_labels.len()
            }
        );

        let start_instant = Instant::now();
        let label = |labels: &[String], i: usize| labels.get(i).cloned().unwrap_or_else(|| format!("#{i}"));

        let mut x = x0;
        let mut f = residuals(&x);
        if let Some(i) = first_non_finite(&f) {
            return Err(SolverError::NonFinite {
                iteration: 0,
                residual: label(residual_labels, i),
            });
        }
        let mut norm = f.norm();

        for it in 0..=self.config.max_iterations {
            debug!("#{it} residual norm = {norm:.6e}");
            if norm < self.config.tolerance {
                return Ok(SolverSolution {
                    x,
                    residuals: f,
                    norm,
                    iterations: it,
                    computation_dur: Instant::now() - start_instant,
                });
            }
            if it == self.config.max_iterations {
                break;
            }

            let jac = finite_difference(&residuals, &x, &f, self.config.fd_step);
            trace!("Jacobian {jac}");
            if let Some((i, _)) = jac
                .row_iter()
                .enumerate()
                .find(|(_, row)| row.iter().any(|v| !v.is_finite()))
            {
                return Err(SolverError::NonFinite {
                    iteration: it,
                    residual: label(residual_labels, i),
                });
            }

            let singular = |jac: &DMatrix<f64>| SolverError::SingularJacobian {
                iteration: it,
                unknown: weakest_column(jac)
                    .map(|j| label(unknown_labels, j))
                    .unwrap_or_default(),
            };

            // A column orders of magnitude smaller than the others is numerically singular even when the LU pivots are not exactly zero.
            let largest = jac.column_iter().map(|c| c.norm()).fold(0.0, f64::max);
            let smallest = jac.column_iter().map(|c| c.norm()).fold(f64::INFINITY, f64::min);
            if smallest <= largest * 1e-14 {
                return Err(singular(&jac));
            }

            let mut step = match jac.clone().lu().solve(&(-&f)) {
                Some(step) if step.iter().all(|v| v.is_finite()) => step,
                _ => return Err(singular(&jac)),
            };

            let largest_step = step.amax();
            if largest_step > self.config.max_step {
                step *= self.config.max_step / largest_step;
            }

            // Backtrack until the residual norm decreases, keeping the last finite candidate otherwise.
            let mut alpha = 1.0;
            let mut fallback = None;
            let mut accepted = false;
            for _ in 0..=self.config.max_halvings {
                let candidate = &x + &step * alpha;
                let f_candidate = residuals(&candidate);
                if first_non_finite(&f_candidate).is_none() {
                    let candidate_norm = f_candidate.norm();
                    if candidate_norm < norm {
                        x = candidate;
                        f = f_candidate;
                        norm = candidate_norm;
                        accepted = true;
                        break;
                    }
                    fallback = Some((candidate, f_candidate, candidate_norm));
                }
                alpha *= 0.5;
            }

            if accepted {
                debug!("#{it} step length {:.3e} (alpha = {alpha})", step.norm() * alpha);
            } else {
                warn!("#{it} line search exhausted after {} halvings", self.config.max_halvings);
                match fallback {
                    Some((candidate, f_candidate, candidate_norm)) => {
                        x = candidate;
                        f = f_candidate;
                        norm = candidate_norm;
                    }
                    None => {
                        let i = first_non_finite(&residuals(&(&x + &step * alpha))).unwrap_or(0);
                        return Err(SolverError::NonFinite {
                            iteration: it,
                            residual: label(residual_labels, i),
                        });
                    }
                }
            }
        }

        let worst = f.iamax();
        Err(SolverError::Convergence {
            iterations: self.config.max_iterations,
            norm,
            worst_residual: label(residual_labels, worst),
            worst_value: f[worst],
        })
    }
}

fn first_non_finite(f: &DVector<f64>) -> Option<usize> {
    f.iter().position(|v| !v.is_finite())
}

#[cfg(test)]
mod ut_raphson {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}[{i}]")).collect()
    }

    #[test]
    fn circle_and_line() {
        // x^2 + y^2 = 4 and y = x, from the first quadrant
        let solver = NewtonRaphson::default();
        let sol = solver
            .solve(
                DVector::from_vec(vec![1.0, 0.5]),
                &labels("x", 2),
                &labels("f", 2),
                |x| DVector::from_vec(vec![x[0] * x[0] + x[1] * x[1] - 4.0, x[1] - x[0]]),
            )
            .unwrap();
        assert!(sol.norm < 1e-8);
        assert!(sol.iterations < 10);
        assert_abs_diff_eq!(sol.x[0], 2.0_f64.sqrt(), epsilon = 1e-8);
        assert_abs_diff_eq!(sol.x[1], 2.0_f64.sqrt(), epsilon = 1e-8);
    }

    #[test]
    fn already_converged() {
        let sol = NewtonRaphson::default()
            .solve(DVector::from_vec(vec![3.0]), &labels("x", 1), &labels("f", 1), |x| {
                DVector::from_vec(vec![x[0] - 3.0])
            })
            .unwrap();
        assert_eq!(sol.iterations, 0);
    }

    #[test]
    fn singular() {
        // The second unknown does not appear in the residuals
        let err = NewtonRaphson::default()
            .solve(
                DVector::from_vec(vec![1.0, 1.0]),
                &["thrust".to_string(), "ghost".to_string()],
                &labels("f", 2),
                |x| DVector::from_vec(vec![x[0] - 3.0, 2.0 * x[0] - 1.0]),
            )
            .unwrap_err();
        assert_eq!(
            err,
            SolverError::SingularJacobian {
                iteration: 0,
                unknown: "ghost".to_string()
            }
        );
    }

    #[test]
    fn no_solution() {
        let config = SolverConfig::builder().max_iterations(20).build();
        let err = NewtonRaphson::new(config)
            .solve(DVector::from_vec(vec![0.5]), &labels("x", 1), &["lift".to_string()], |x| {
                DVector::from_vec(vec![x[0] * x[0] + 1.0])
            })
            .unwrap_err();
        match err {
            SolverError::Convergence {
                iterations,
                worst_residual,
                ..
            } => {
                assert_eq!(iterations, 20);
                assert_eq!(worst_residual, "lift");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn non_finite_start() {
        let err = NewtonRaphson::default()
            .solve(DVector::from_vec(vec![-1.0]), &labels("x", 1), &labels("f", 1), |x| {
                DVector::from_vec(vec![x[0].sqrt() - 1.0])
            })
            .unwrap_err();
        assert!(matches!(err, SolverError::NonFinite { iteration: 0, .. }));
    }

    #[test]
    fn not_square() {
        let err = NewtonRaphson::default()
            .solve(DVector::from_vec(vec![1.0, 2.0]), &labels("x", 2), &labels("f", 1), |x| {
                DVector::from_vec(vec![x[0]])
            })
            .unwrap_err();
        assert!(matches!(err, SolverError::NotSquare { unknowns: 2, residuals: 1 }));
    }
}

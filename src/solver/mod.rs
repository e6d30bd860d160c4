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

use crate::linalg::DVector;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt;
use std::time::Duration;
use typed_builder::TypedBuilder;

mod jacobian;
mod raphson;

pub use raphson::NewtonRaphson;

/// Configuration of the Newton-Raphson solver, shared by every segment of a mission unless overwritten.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
#[serde(default)]
pub struct SolverConfig {
    /// Convergence threshold on the Euclidean norm of the scaled residuals
    #[builder(default = 1e-8)]
    pub tolerance: f64,
    #[builder(default = 50)]
    pub max_iterations: usize,
    /// Relative perturbation of the scaled unknowns for the finite difference Jacobian
    #[builder(default = 1e-7)]
    pub fd_step: f64,
    /// Largest component of a Newton step, in scaled units
    #[builder(default = 10.0)]
    pub max_step: f64,
    /// Number of step halvings of the backtracking line search
    #[builder(default = 8)]
    pub max_halvings: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Display for SolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Newton-Raphson (tol = {:e}, max iter = {}, fd step = {:e}, max step = {})",
            self.tolerance, self.max_iterations, self.fd_step, self.max_step
        )
    }
}

#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SolverError {
    #[snafu(display(
        "no convergence after {iterations} iterations: residual norm {norm:.3e}, worst residual {worst_residual} = {worst_value:.3e}"
    ))]
    Convergence {
        iterations: usize,
        norm: f64,
        worst_residual: String,
        worst_value: f64,
    },
    #[snafu(display("singular Jacobian at iteration {iteration}, {unknown} has (almost) no effect on the residuals"))]
    SingularJacobian { iteration: usize, unknown: String },
    #[snafu(display("residual {residual} is not finite at iteration {iteration}"))]
    NonFinite { iteration: usize, residual: String },
    #[snafu(display("{unknowns} unknowns for {residuals} residuals"))]
    NotSquare { unknowns: usize, residuals: usize },
}

/// Converged solution of a nonlinear system
#[derive(Clone, Debug, PartialEq)]
pub struct SolverSolution {
    /// Scaled unknowns at the solution
    pub x: DVector<f64>,
    /// Scaled residuals at the solution
    pub residuals: DVector<f64>,
    /// Euclidean norm of the scaled residuals
    pub norm: f64,
    /// Number of Newton steps taken
    pub iterations: usize,
    /// Computation duration
    pub computation_dur: Duration,
}

impl fmt::Display for SolverSolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "converged in {} iterations ({:?}): {} unknowns, residual norm {:.3e}",
            self.iterations,
            self.computation_dur,
            self.x.len(),
            self.norm
        )
    }
}

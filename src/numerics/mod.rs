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

use crate::linalg::{DMatrix, DVector};
use snafu::prelude::*;
use std::f64::consts::PI;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum NumericsError {
    #[snafu(display("a discretization requires at least one point"))]
    NoPoints,
    #[snafu(display("differentiation block of a {n} point discretization is singular"))]
    SingularIntegration { n: usize },
}

/// Normalized collocation points of a segment with their differentiation and integration operators.
///
/// The abscissas are the Chebyshev-Gauss-Lobatto points mapped onto [0, 1], so the first and
/// last rows of every state column are the segment boundaries. A single point discretization
/// is a trim point: there is no derivative operator and integrals over the segment vanish.
#[derive(Clone, Debug, PartialEq)]
pub struct Discretization {
    /// Normalized segment progress, from 0 to 1
    pub tau: DVector<f64>,
    /// d/dtau operator, None for a single trim point
    pub differentiation: Option<DMatrix<f64>>,
    /// Integral from tau = 0 operator, None for a single trim point
    pub integration: Option<DMatrix<f64>>,
}

impl Discretization {
    /// Builds the Chebyshev-Gauss-Lobatto discretization with `n` points.
    pub fn new(n: usize) -> Result<Self, NumericsError> {
        ensure!(n > 0, NoPointsSnafu);

        if n == 1 {
            return Ok(Self {
                tau: DVector::zeros(1),
                differentiation: None,
                integration: None,
            });
        }

        let tau = chebyshev_points(n);
        let d = differentiation_matrix(&tau);

        // The integral from the first point is the inverse of D restricted to functions which vanish at tau = 0.
        let block = d.view((1, 1), (n - 1, n - 1)).clone_owned();
        let block_inv = block
            .try_inverse()
            .ok_or(NumericsError::SingularIntegration { n })?;
        let mut integration = DMatrix::zeros(n, n);
        integration
            .view_mut((1, 1), (n - 1, n - 1))
            .copy_from(&block_inv);

        Ok(Self {
            tau,
            differentiation: Some(d),
            integration: Some(integration),
        })
    }

    /// Number of collocation points
    pub fn len(&self) -> usize {
        self.tau.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tau.is_empty()
    }

    /// Returns true if this is a single point trim analysis
    pub fn is_trim_point(&self) -> bool {
        self.differentiation.is_none()
    }

    /// Time derivative of the sampled function `f` over a segment lasting `duration` seconds.
    pub fn differentiate(&self, f: &DVector<f64>, duration: f64) -> DVector<f64> {
        match &self.differentiation {
            Some(d) if duration.abs() > 0.0 => (d * f) / duration,
            _ => DVector::zeros(f.len()),
        }
    }

    /// Cumulative time integral, from the start of the segment, of the sampled rate `f` over a segment lasting `duration` seconds.
    pub fn integrate(&self, f: &DVector<f64>, duration: f64) -> DVector<f64> {
        match &self.integration {
            Some(i) => (i * f) * duration,
            None => DVector::zeros(f.len()),
        }
    }

    /// Physical times of each point for a segment starting at `start` and lasting `duration` seconds.
    pub fn times(&self, start: f64, duration: f64) -> DVector<f64> {
        self.tau.map(|tau| start + tau * duration)
    }
}

impl fmt::Display for Discretization {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_trim_point() {
            write!(f, "trim point")
        } else {
            write!(f, "{} Chebyshev-Gauss-Lobatto points", self.len())
        }
    }
}

/// Returns the `n` normalized collocation abscissas on [0, 1] and the differentiation operator
/// with respect to normalized segment progress. The operator is None when `n` is 1.
pub fn build_points(n: usize) -> Result<(DVector<f64>, Option<DMatrix<f64>>), NumericsError> {
    let disc = Discretization::new(n)?;
    Ok((disc.tau, disc.differentiation))
}

/// Chebyshev-Gauss-Lobatto points on [0, 1], in increasing order.
fn chebyshev_points(n: usize) -> DVector<f64> {
    let last = (n - 1) as f64;
    DVector::from_fn(n, |j, _| {
        let x = 0.5 * (1.0 - (PI * j as f64 / last).cos());
        // Pin the end points exactly, and the middle when it exists.
        if j == 0 {
            0.0
        } else if j == n - 1 {
            1.0
        } else if 2 * j == n - 1 {
            0.5
        } else {
            x
        }
    })
}

/// Barycentric differentiation matrix for the Lobatto points, with a negative sum diagonal
/// so that constants are differentiated to exactly zero.
fn differentiation_matrix(x: &DVector<f64>) -> DMatrix<f64> {
    let n = x.len();
    let weight = |j: usize| {
        let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
        if j == 0 || j == n - 1 {
            0.5 * sign
        } else {
            sign
        }
    };

    let mut d = DMatrix::zeros(n, n);
    for i in 0..n {
        let mut diag = 0.0;
        for j in 0..n {
            if i != j {
                let dij = (weight(j) / weight(i)) / (x[i] - x[j]);
                d[(i, j)] = dij;
                diag -= dij;
            }
        }
        d[(i, i)] = diag;
    }
    d
}

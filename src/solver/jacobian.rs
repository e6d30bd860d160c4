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
use rayon::prelude::*;

/// Forward finite difference Jacobian of the residuals at `x`, where `f0` are the residuals at `x`.
///
/// Each column is perturbed independently, so columns are computed in parallel.
pub(crate) fn finite_difference<F>(residuals: &F, x: &DVector<f64>, f0: &DVector<f64>, step: f64) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64> + Sync,
{
    let columns: Vec<DVector<f64>> = (0..x.len())
        .into_par_iter()
        .map(|j| {
            let h = step * x[j].abs().max(1.0);
            let mut perturbed = x.clone();
            perturbed[j] += h;
            (residuals(&perturbed) - f0) / h
        })
        .collect();

    let mut jac = DMatrix::zeros(f0.len(), x.len());
    for (j, column) in columns.iter().enumerate() {
        jac.set_column(j, column);
    }
    jac
}

/// Index of the column with the smallest norm, i.e. the unknown with the least influence on the residuals.
pub(crate) fn weakest_column(jac: &DMatrix<f64>) -> Option<usize> {
    jac.column_iter()
        .map(|column| column.norm())
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(j, _)| j)
}

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

//! Evaluation of independent missions, e.g. the cases of a payload-range sweep or the evaluations of an optimizer.

use super::{Mission, MissionResults};
use crate::MissionError;
use rayon::prelude::*;

/// Evaluates each mission in parallel. Missions share nothing but their read-only analyses.
///
/// The results are in the same order as the missions.
pub fn evaluate_all(missions: &mut [Mission]) -> Vec<Result<MissionResults, MissionError>> {
    info!("evaluating {} missions", missions.len());
    missions.par_iter_mut().map(|mission| mission.evaluate()).collect()
}

/// Evaluates the missions one after the other, in order.
pub fn evaluate_sequentially(missions: &mut [Mission]) -> Vec<Result<MissionResults, MissionError>> {
    missions.iter_mut().map(|mission| mission.evaluate()).collect()
}

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

use crate::io::ConfigError;
use crate::segments::SegmentError;
use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MissionError {
    #[snafu(display("mission {tag} has no segment"))]
    EmptyMission { tag: String },
    #[snafu(display(
        "{quantity} discontinuity before segment #{index} ({tag}): {previous:.6} then {next:.6}"
    ))]
    Continuity {
        index: usize,
        tag: String,
        quantity: &'static str,
        previous: f64,
        next: f64,
    },
    #[snafu(display("segment #{index} ({tag}) failed: {source}"))]
    SegmentFailed {
        index: usize,
        tag: String,
        source: SegmentError,
    },
    #[snafu(display("mission configuration: {source}"))]
    Config { source: ConfigError },
    #[snafu(display("could not export the trajectory to {path}: {source}"))]
    Export { path: String, source: csv::Error },
}

impl MissionError {
    /// Returns true if this mission cannot be flown as configured: one of its segments did not converge, its
    /// boundary conditions cannot be achieved, or the solution violates the bounds of the unknowns.
    ///
    /// An outer optimizer would typically penalize such a mission rather than abort.
    pub fn is_infeasible(&self) -> bool {
        match self {
            Self::SegmentFailed { source, .. } => source.is_convergence_failure(),
            _ => false,
        }
    }

    /// Index of the segment which caused this error, if any
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            Self::SegmentFailed { index, .. } | Self::Continuity { index, .. } => Some(*index),
            _ => None,
        }
    }
}

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

use super::SegmentStatus;
use crate::errors::{ExportSnafu, MissionError};
use crate::segments::{Phase, SolvedSegment};
use crate::state::{BoundaryState, State};
use crate::time::Epoch;
use serde_derive::Serialize;
use snafu::ResultExt;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// A converged segment of a mission.
#[derive(Clone, Debug)]
pub struct SegmentResult {
    pub tag: String,
    pub phase: Phase,
    /// Read-only state at the solution
    pub state: State,
    pub iterations: usize,
    /// Euclidean norm of the scaled residuals at the solution
    pub residual_norm: f64,
    pub computation_dur: Duration,
}

impl SegmentResult {
    pub(crate) fn new(phase: Phase, solved: SolvedSegment) -> Self {
        Self {
            tag: solved.tag,
            phase,
            state: solved.state,
            iterations: solved.solution.iterations,
            residual_norm: solved.solution.norm,
            computation_dur: solved.solution.computation_dur,
        }
    }

    pub fn summary(&self) -> SegmentSummary {
        let initial = self.state.initial();
        let terminal = self.state.terminal();
        SegmentSummary {
            tag: self.tag.clone(),
            initial,
            terminal,
            elapsed_time: terminal.time - initial.time,
            distance: terminal.distance - initial.distance,
            mass_change: terminal.mass - initial.mass,
            iterations: self.iterations,
            residual_norm: self.residual_norm,
        }
    }
}

/// Scalars summarizing a converged segment.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentSummary {
    pub tag: String,
    pub initial: BoundaryState,
    pub terminal: BoundaryState,
    /// s
    pub elapsed_time: f64,
    /// m
    pub distance: f64,
    /// kg, negative when fuel was burnt
    pub mass_change: f64,
    pub iterations: usize,
    pub residual_norm: f64,
}

impl SegmentSummary {
    /// kg
    pub fn final_mass(&self) -> f64 {
        self.terminal.mass
    }

    pub fn final_state_of_charge(&self) -> Option<f64> {
        self.terminal.state_of_charge
    }
}

impl fmt::Display for SegmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {:.1} s, {:.3} km, final mass {:.3} kg",
            self.tag,
            self.elapsed_time,
            self.distance * 1e-3,
            self.terminal.mass
        )?;
        if let Some(soc) = self.terminal.state_of_charge {
            write!(f, ", final SOC {soc:.4}")?;
        }
        write!(f, " ({} iterations, |r| = {:.2e})", self.iterations, self.residual_norm)
    }
}

/// The converged segments of a mission, in order.
#[derive(Clone, Debug)]
pub struct MissionResults {
    pub tag: String,
    pub start_epoch: Option<Epoch>,
    pub segments: Vec<SegmentResult>,
    pub statuses: Vec<SegmentStatus>,
}

impl MissionResults {
    pub fn segment(&self, tag: &str) -> Option<&SegmentResult> {
        self.segments.iter().find(|s| s.tag == tag)
    }

    pub fn summaries(&self) -> Vec<SegmentSummary> {
        self.segments.iter().map(SegmentResult::summary).collect()
    }

    /// Boundary state at the end of the last segment
    pub fn terminal(&self) -> Option<BoundaryState> {
        self.segments.last().map(|s| s.state.terminal())
    }

    /// Total mission time, s
    pub fn elapsed_time(&self) -> f64 {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => last.state.terminal().time - first.state.initial().time,
            _ => 0.0,
        }
    }

    fn history<F: Fn(&State) -> Vec<f64>>(&self, column: F) -> Vec<f64> {
        self.segments.iter().flat_map(|s| column(&s.state)).collect()
    }

    /// Time of every point of every segment
    pub fn time_history(&self) -> Vec<f64> {
        self.history(|state| state.conditions.frames.time.iter().copied().collect())
    }

    pub fn altitude_history(&self) -> Vec<f64> {
        self.history(|state| state.conditions.altitude().iter().copied().collect())
    }

    pub fn mass_history(&self) -> Vec<f64> {
        self.history(|state| state.conditions.weights.mass.iter().copied().collect())
    }

    /// None if the vehicle has no battery
    pub fn state_of_charge_history(&self) -> Option<Vec<f64>> {
        let first = self.segments.first()?;
        first.state.seed.state_of_charge?;
        Some(self.history(|state| state.conditions.propulsion.state_of_charge.iter().copied().collect()))
    }

    /// Throttle of a propulsor group at every point, None if the vehicle has no such group
    pub fn throttle_history(&self, group: usize) -> Option<Vec<f64>> {
        if self.segments.iter().any(|s| group >= s.state.conditions.propulsion.throttle.ncols()) {
            return None;
        }
        Some(self.history(|state| state.conditions.propulsion.throttle.column(group).iter().copied().collect()))
    }

    /// Concatenation of the points of every segment, in order. The boundary points are repeated.
    pub fn trajectory(&self) -> Trajectory {
        let mut points = Vec::new();
        for segment in &self.segments {
            let state = &segment.state;
            let conditions = &state.conditions;
            for i in 0..state.rows() {
                let row = state.row(i);
                let throttle = conditions.propulsion.throttle.row(i);
                points.push(TrajectoryPoint {
                    segment: segment.tag.clone(),
                    time: row.time,
                    distance: row.distance,
                    altitude: row.altitude,
                    airspeed: conditions.freestream.airspeed[i],
                    mach: conditions.freestream.mach[i],
                    throttle: if throttle.is_empty() { 0.0 } else { throttle.mean() },
                    body_angle_deg: conditions.frames.body_angle[i].to_degrees(),
                    angle_of_attack_deg: conditions.aerodynamics.angle_of_attack[i].to_degrees(),
                    lift_coefficient: conditions.aerodynamics.lift_coefficient[i],
                    drag_coefficient: conditions.aerodynamics.drag_coefficient[i],
                    thrust: conditions.propulsion.thrust.row(i).norm(),
                    power: conditions.propulsion.power[i],
                    state_of_charge: row.state_of_charge,
                    mass: row.mass,
                });
            }
        }
        Trajectory { points }
    }
}

impl fmt::Display for MissionResults {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "mission {} ({:.1} s)", self.tag, self.elapsed_time())?;
        for summary in self.summaries() {
            write!(f, "\n\t{summary}")?;
        }
        Ok(())
    }
}

/// One collocation point of a mission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub segment: String,
    /// s
    pub time: f64,
    /// m
    pub distance: f64,
    /// m
    pub altitude: f64,
    /// m/s
    pub airspeed: f64,
    pub mach: f64,
    /// Mean throttle of the propulsor groups
    pub throttle: f64,
    pub body_angle_deg: f64,
    pub angle_of_attack_deg: f64,
    pub lift_coefficient: f64,
    pub drag_coefficient: f64,
    /// N
    pub thrust: f64,
    /// W
    pub power: f64,
    pub state_of_charge: Option<f64>,
    /// kg
    pub mass: f64,
}

/// The points of a converged mission.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Writes one row per point, with a header, to a CSV file.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), MissionError> {
        let path_str = path.as_ref().display().to_string();
        let mut wtr = csv::Writer::from_path(path.as_ref()).context(ExportSnafu {
            path: path_str.clone(),
        })?;
        for point in &self.points {
            wtr.serialize(point).context(ExportSnafu {
                path: path_str.clone(),
            })?;
        }
        wtr.flush()
            .map_err(csv::Error::from)
            .context(ExportSnafu { path: path_str.clone() })?;
        info!("exported {} points to {path_str}", self.points.len());
        Ok(())
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => write!(
                f,
                "trajectory of {} points from {:.1} s to {:.1} s, {:.3} km",
                self.points.len(),
                first.time,
                last.time,
                (last.distance - first.distance) * 1e-3
            ),
            _ => write!(f, "empty trajectory"),
        }
    }
}

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

use crate::errors::{ContinuitySnafu, EmptyMissionSnafu, MissionError};
use crate::segments::Segment;
use crate::solver::SolverConfig;
use crate::state::BoundaryState;
use crate::time::Epoch;
use crate::vehicle::Analyses;
use snafu::ensure;
use std::fmt;
use std::time::Instant;

mod results;
pub mod sweep;

pub use results::{MissionResults, SegmentResult, SegmentSummary, Trajectory, TrajectoryPoint};

/// Largest altitude mismatch, in meters, between two consecutive segments
pub const ALTITUDE_TOLERANCE: f64 = 1e-6;

/// Progress of a segment through the mission evaluation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SegmentStatus {
    Pending,
    Solving,
    Converged,
    /// Terminal: no later segment is solved
    Failed,
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Solving => write!(f, "SOLVING"),
            Self::Converged => write!(f, "CONVERGED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// An ordered list of segments flown by the same vehicle. The terminal state of each converged segment seeds the next one.
#[derive(Clone)]
pub struct Mission<'a> {
    pub tag: String,
    pub analyses: &'a Analyses,
    pub segments: Vec<Segment<'a>>,
    /// Epoch of the start of the mission, required by time of day dependent models
    pub start_epoch: Option<Epoch>,
    /// Boundary state at the start of the first segment
    pub initial: BoundaryState,
    statuses: Vec<SegmentStatus>,
}

impl<'a> Mission<'a> {
    /// An empty mission starting at sea level, at rest, with the vehicle mass and the initial state of charge of its battery.
    pub fn new<S: Into<String>>(tag: S, analyses: &'a Analyses) -> Self {
        Self {
            tag: tag.into(),
            analyses,
            segments: Vec::new(),
            start_epoch: None,
            initial: BoundaryState {
                mass: analyses.vehicle.mass,
                state_of_charge: analyses.energy().initial_state_of_charge(),
                ..Default::default()
            },
            statuses: Vec::new(),
        }
    }

    pub fn with_start_epoch(mut self, epoch: Epoch) -> Self {
        self.start_epoch = Some(epoch);
        self
    }

    pub fn with_initial_state(mut self, initial: BoundaryState) -> Self {
        self.initial = initial;
        self
    }

    /// Sets the solver configuration of every segment appended so far.
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        for segment in &mut self.segments {
            segment.solver = solver;
        }
        self
    }

    pub fn append_segment(&mut self, segment: Segment<'a>) {
        self.segments.push(segment);
        self.statuses.push(SegmentStatus::Pending);
    }

    /// Builder style variant of `append_segment`
    pub fn with_segment(mut self, segment: Segment<'a>) -> Self {
        self.append_segment(segment);
        self
    }

    /// Status of each segment, in order
    pub fn statuses(&self) -> &[SegmentStatus] {
        &self.statuses
    }

    /// Status of the mission as a whole
    pub fn status(&self) -> SegmentStatus {
        if self.statuses.contains(&SegmentStatus::Failed) {
            SegmentStatus::Failed
        } else if self.statuses.contains(&SegmentStatus::Solving) {
            SegmentStatus::Solving
        } else if !self.statuses.is_empty() && self.statuses.iter().all(|s| *s == SegmentStatus::Converged) {
            SegmentStatus::Converged
        } else {
            SegmentStatus::Pending
        }
    }

    /// Checks that the altitudes declared by consecutive segments match, without solving anything.
    pub fn check_continuity(&self) -> Result<(), MissionError> {
        for (index, pair) in self.segments.windows(2).enumerate() {
            let previous = pair[0].phase.as_phase().final_altitude();
            let next = pair[1].phase.as_phase().initial_altitude();
            if let (Some(previous), Some(next)) = (previous, next) {
                ensure!(
                    (previous - next).abs() <= ALTITUDE_TOLERANCE,
                    ContinuitySnafu {
                        index: index + 1,
                        tag: pair[1].tag.clone(),
                        quantity: "altitude",
                        previous,
                        next
                    }
                );
            }
        }
        Ok(())
    }

    /// Solves every segment in order, threading the terminal state of each segment into the next one.
    ///
    /// The evaluation stops at the first failure, which leaves that segment FAILED and the later ones PENDING.
    /// An altitude discontinuity fails the offending segment before anything is solved.
    pub fn evaluate(&mut self) -> Result<MissionResults, MissionError> {
        ensure!(
            !self.segments.is_empty(),
            EmptyMissionSnafu {
                tag: self.tag.clone()
            }
        );
        self.statuses = vec![SegmentStatus::Pending; self.segments.len()];
        if let Err(e) = self.check_continuity() {
            if let Some(index) = e.segment_index() {
                self.statuses[index] = SegmentStatus::Failed;
            }
            error!("[{}] {e}", self.tag);
            return Err(e);
        }

        info!(
            "[{}] evaluating {} segments with {}",
            self.tag,
            self.segments.len(),
            self.analyses.vehicle
        );
        let start_instant = Instant::now();

        let mut seed = self.initial;
        if let Some(altitude) = self.segments[0].phase.as_phase().initial_altitude() {
            seed.altitude = altitude;
        }

        let mut converged = Vec::with_capacity(self.segments.len());
        for (index, segment) in self.segments.iter().enumerate() {
            self.statuses[index] = SegmentStatus::Solving;
            debug!("[{}] #{index} {segment} from {seed}", self.tag);

            if let Some(altitude) = segment.phase.as_phase().initial_altitude() {
                if (altitude - seed.altitude).abs() > ALTITUDE_TOLERANCE {
                    self.statuses[index] = SegmentStatus::Failed;
                    let e = MissionError::Continuity {
                        index,
                        tag: segment.tag.clone(),
                        quantity: "altitude",
                        previous: seed.altitude,
                        next: altitude,
                    };
                    error!("[{}] {e}", self.tag);
                    return Err(e);
                }
            }

            match segment.solve(seed, self.start_epoch) {
                Ok(solved) => {
                    self.statuses[index] = SegmentStatus::Converged;
                    seed = solved.state.terminal();
                    converged.push(SegmentResult::new(segment.phase, solved));
                }
                Err(source) => {
                    self.statuses[index] = SegmentStatus::Failed;
                    error!("[{}] segment #{index} ({}) failed: {source}", self.tag, segment.tag);
                    return Err(MissionError::SegmentFailed {
                        index,
                        tag: segment.tag.clone(),
                        source,
                    });
                }
            }
        }

        info!(
            "[{}] converged in {:?}, final state {seed}",
            self.tag,
            Instant::now() - start_instant
        );

        Ok(MissionResults {
            tag: self.tag.clone(),
            start_epoch: self.start_epoch,
            segments: converged,
            statuses: self.statuses.clone(),
        })
    }
}

impl<'a> fmt::Display for Mission<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "mission {} ({} segments)", self.tag, self.segments.len())?;
        for (segment, status) in self.segments.iter().zip(&self.statuses) {
            write!(f, "\n\t[{status}] {segment}")?;
        }
        Ok(())
    }
}

impl<'a> fmt::Debug for Mission<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Mission")
            .field("tag", &self.tag)
            .field("vehicle", &self.analyses.vehicle.tag)
            .field("segments", &self.segments)
            .field("start_epoch", &self.start_epoch)
            .field("initial", &self.initial)
            .field("statuses", &self.statuses)
            .finish()
    }
}

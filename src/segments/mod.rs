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
use crate::numerics::{Discretization, NumericsError};
use crate::solver::{NewtonRaphson, SolverConfig, SolverError, SolverSolution};
use crate::state::{BoundaryState, State, Unknown};
use crate::time::Epoch;
use crate::vehicle::Analyses;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt;

mod acceleration;
mod climb;
mod cruise;
#[cfg(test)]
mod fixtures;
mod ground;
mod hover;
pub mod stages;

pub use acceleration::ConstantAccelerationConstantAltitude;
pub use climb::{
    ClimbConstantSpeedConstantRate, ClimbLinearMachConstantRate, ClimbLinearSpeedConstantRate,
    DescentConstantSpeedConstantRate, DescentLinearMachConstantRate, DescentLinearSpeedConstantRate,
};
pub use cruise::CruiseConstantSpeedConstantAltitude;
pub use ground::{LandingRoll, TakeoffRoll};
pub use hover::{Hover, VerticalClimb, VerticalDescent};

/// Default number of collocation points of a segment
pub const DEFAULT_POINTS: usize = 16;

/// Tolerance on the bounds of the unknowns once converged
const BOUNDS_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SegmentError {
    #[snafu(display("segment {tag} is malformed: {unknowns} unknowns for {residuals} residuals"))]
    Malformed {
        tag: String,
        unknowns: usize,
        residuals: usize,
    },
    #[snafu(display("segment {tag} has no unknown named {name}"))]
    MissingUnknown { tag: String, name: String },
    #[snafu(display("propulsor group {group} references propulsor #{index} which does not exist"))]
    InvalidPropulsor { group: String, index: usize },
    #[snafu(display("segment {tag} requires the mission epoch"))]
    MissingEpoch { tag: String },
    #[snafu(display("segment {tag} is invalid: {reason}"))]
    InvalidPhase { tag: String, reason: String },
    #[snafu(display("segment {tag} cannot be flown: {reason}"))]
    Infeasible { tag: String, reason: String },
    #[snafu(display("segment {tag} converged with {name} = {value} outside of [{min}, {max}]"))]
    OutOfBounds {
        tag: String,
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[snafu(display("segment {tag} failed: {source}"))]
    Solve { tag: String, source: SolverError },
    #[snafu(display("segment discretization failed: {source}"))]
    Numerics { source: NumericsError },
}

impl SegmentError {
    /// Returns true if no solution of this segment was found, either because the solver did not converge or because
    /// the boundary conditions cannot be achieved.
    pub fn is_convergence_failure(&self) -> bool {
        match self {
            Self::Solve { source, .. } => matches!(
                source,
                SolverError::Convergence { .. } | SolverError::NonFinite { .. }
            ),
            Self::Infeasible { .. } | Self::OutOfBounds { .. } => true,
            _ => false,
        }
    }

    /// Returns true if the Jacobian of the segment was singular
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            Self::Solve {
                source: SolverError::SingularJacobian { .. },
                ..
            }
        )
    }

    /// Returns true if the unknowns and residuals do not form a square system
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// A stage of a pipeline, which reads and updates the state of the segment.
pub type Stage = fn(&Segment<'_>, &mut State) -> Result<(), SegmentError>;

/// Evaluator of a residual from the current state.
pub type ResidualFn = fn(&Segment<'_>, &State) -> DVector<f64>;

/// A named set of equations which must vanish at convergence.
#[derive(Copy, Clone)]
pub struct Residual {
    pub name: &'static str,
    /// Number of scalar equations
    pub len: usize,
    /// The residual is divided by this value in the solver
    pub scale: f64,
    pub evaluator: ResidualFn,
}

impl Residual {
    pub fn new(name: &'static str, len: usize, scale: f64, evaluator: ResidualFn) -> Self {
        Self {
            name,
            len,
            scale,
            evaluator,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.len).map(move |i| format!("{}[{i}]", self.name))
    }
}

impl fmt::Debug for Residual {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Residual {{ {} x{} / {:e} }}", self.name, self.len, self.scale)
    }
}

/// Axes on which the energy provider must close the force balance, and the first row of that balance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ForceBalance {
    pub horizontal: bool,
    pub vertical: bool,
    /// Rows before this one have prescribed kinematics and no force residual
    pub first_row: usize,
}

impl ForceBalance {
    pub fn both() -> Self {
        Self {
            horizontal: true,
            vertical: true,
            first_row: 0,
        }
    }

    pub fn vertical() -> Self {
        Self {
            horizontal: false,
            vertical: true,
            first_row: 0,
        }
    }

    pub fn horizontal_from(first_row: usize) -> Self {
        Self {
            horizontal: true,
            vertical: false,
            first_row,
        }
    }
}

/// Ordered lists of stages run before the solve, at every residual evaluation, and once converged.
#[derive(Clone)]
pub struct Pipeline {
    pub initialize: Vec<(&'static str, Stage)>,
    pub iterate: Vec<(&'static str, Stage)>,
    pub finalize: Vec<(&'static str, Stage)>,
}

impl Pipeline {
    /// The stages shared by every segment.
    pub fn standard() -> Self {
        Self {
            initialize: vec![("feasibility", stages::check_feasibility as Stage)],
            iterate: vec![
                ("kinematics", stages::update_kinematics as Stage),
                ("time_and_distance", stages::update_time_and_distance as Stage),
                ("atmosphere", stages::update_atmosphere as Stage),
                ("freestream", stages::update_freestream as Stage),
                ("orientations", stages::update_orientations as Stage),
                ("aerodynamics", stages::update_aerodynamics as Stage),
                ("energy", stages::update_energy as Stage),
                ("weights", stages::update_weights as Stage),
                ("acceleration", stages::update_acceleration as Stage),
                ("forces", stages::update_forces as Stage),
            ],
            finalize: vec![("bounds", stages::check_bounds as Stage)],
        }
    }

    /// Inserts an iteration stage after the stage named `after`, or at the end if there is no such stage.
    pub fn insert_after(&mut self, after: &str, name: &'static str, stage: Stage) {
        let position = self
            .iterate
            .iter()
            .position(|(existing, _)| *existing == after)
            .map_or(self.iterate.len(), |i| i + 1);
        self.iterate.insert(position, (name, stage));
    }

    /// Names of the iteration stages, in order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.iterate.iter().map(|(name, _)| *name).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = |stages: &[(&'static str, Stage)]| stages.iter().map(|(name, _)| *name).collect::<Vec<_>>();
        f.debug_struct("Pipeline")
            .field("initialize", &names(&self.initialize))
            .field("iterate", &names(&self.iterate))
            .field("finalize", &names(&self.finalize))
            .finish()
    }
}

/// Name of the body angle unknown of the flight phases
pub const BODY_ANGLE: &str = "body_angle";

/// Body angle unknown, with a guess of a few degrees nose up.
pub(crate) fn body_angle_unknown(n: usize) -> Unknown {
    Unknown::per_point(BODY_ANGLE, n, 0.05, 1.0)
}

/// Reads an unknown of the state, which the phase declared.
pub(crate) fn required<'s>(segment: &Segment, state: &'s State, name: &str) -> Result<&'s DVector<f64>, SegmentError> {
    state.unknown(name).ok_or_else(|| SegmentError::MissingUnknown {
        tag: segment.tag.clone(),
        name: name.to_string(),
    })
}

/// Sets the velocity and the altitude of every point from the airspeed and the signed vertical speed.
pub(crate) fn set_flight_path(
    segment: &Segment,
    state: &mut State,
    airspeed: &DVector<f64>,
    vertical_speed: f64,
    altitude: &DVector<f64>,
) -> Result<(), SegmentError> {
    for i in 0..state.rows() {
        let horizontal_sq = airspeed[i] * airspeed[i] - vertical_speed * vertical_speed;
        ensure!(
            horizontal_sq >= 0.0,
            InfeasibleSnafu {
                tag: segment.tag.clone(),
                reason: format!(
                    "vertical speed of {:.3} m/s exceeds the airspeed of {:.3} m/s",
                    vertical_speed.abs(),
                    airspeed[i]
                )
            }
        );
        let frames = &mut state.conditions.frames;
        frames.velocity[(i, 0)] = horizontal_sq.sqrt();
        frames.velocity[(i, 1)] = 0.0;
        frames.velocity[(i, 2)] = vertical_speed;
        frames.position[(i, 2)] = altitude[i];
    }
    Ok(())
}

fn run(stages: &[(&'static str, Stage)], segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    for (name, stage) in stages {
        trace!("[{}] {name}", segment.tag);
        stage(segment, state)?;
    }
    Ok(())
}

/// Behavior of a segment type: its boundary conditions, its own unknowns and residuals, and how the
/// kinematics of each point follow from the unknowns.
pub trait FlightPhase: fmt::Display {
    /// Altitude at the start of the segment, if the phase fixes it
    fn initial_altitude(&self) -> Option<f64> {
        None
    }

    /// Altitude at the end of the segment, if the phase fixes it
    fn final_altitude(&self) -> Option<f64> {
        None
    }

    /// Airspeed the segment must reach at its end, if any
    fn final_airspeed(&self) -> Option<f64> {
        None
    }

    /// Force axes and rows which the energy provider must balance
    fn force_balance(&self) -> ForceBalance {
        ForceBalance::both()
    }

    /// Throttle of every propulsor group, if the phase prescribes it
    fn default_throttle(&self) -> Option<f64> {
        None
    }

    /// Rolling or braking friction coefficient when on the ground
    fn friction_coefficient(&self) -> Option<f64> {
        None
    }

    /// Unknowns of the phase, with initial guesses from the boundary state
    fn unknowns(&self, segment: &Segment, seed: &BoundaryState) -> Vec<Unknown>;

    /// Residuals of the phase, in addition to the force balance closed by the energy provider
    fn residuals(&self, _segment: &Segment, _seed: &BoundaryState) -> Vec<Residual> {
        Vec::new()
    }

    /// Checks that the phase can be flown from this boundary state
    fn check(&self, segment: &Segment, seed: &BoundaryState) -> Result<(), SegmentError>;

    /// Sets the duration, the velocity, the altitude and the body angle of every point
    fn kinematics(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError>;
}

/// The segment taxonomy
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Phase {
    ClimbConstantSpeedConstantRate(ClimbConstantSpeedConstantRate),
    DescentConstantSpeedConstantRate(DescentConstantSpeedConstantRate),
    CruiseConstantSpeedConstantAltitude(CruiseConstantSpeedConstantAltitude),
    ClimbLinearMachConstantRate(ClimbLinearMachConstantRate),
    DescentLinearMachConstantRate(DescentLinearMachConstantRate),
    ClimbLinearSpeedConstantRate(ClimbLinearSpeedConstantRate),
    DescentLinearSpeedConstantRate(DescentLinearSpeedConstantRate),
    TakeoffRoll(TakeoffRoll),
    LandingRoll(LandingRoll),
    Hover(Hover),
    VerticalClimb(VerticalClimb),
    VerticalDescent(VerticalDescent),
    ConstantAccelerationConstantAltitude(ConstantAccelerationConstantAltitude),
}

impl Phase {
    pub fn as_phase(&self) -> &dyn FlightPhase {
        match self {
            Self::ClimbConstantSpeedConstantRate(p) => p,
            Self::DescentConstantSpeedConstantRate(p) => p,
            Self::CruiseConstantSpeedConstantAltitude(p) => p,
            Self::ClimbLinearMachConstantRate(p) => p,
            Self::DescentLinearMachConstantRate(p) => p,
            Self::ClimbLinearSpeedConstantRate(p) => p,
            Self::DescentLinearSpeedConstantRate(p) => p,
            Self::TakeoffRoll(p) => p,
            Self::LandingRoll(p) => p,
            Self::Hover(p) => p,
            Self::VerticalClimb(p) => p,
            Self::VerticalDescent(p) => p,
            Self::ConstantAccelerationConstantAltitude(p) => p,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_phase())
    }
}

/// Converged segment
#[derive(Clone, Debug)]
pub struct SolvedSegment {
    pub tag: String,
    /// State at the solution, read-only
    pub state: State,
    pub solution: SolverSolution,
}

/// A segment of a mission: a phase flown by the vehicle of the analyses, discretized on collocation points.
#[derive(Clone)]
pub struct Segment<'a> {
    pub tag: String,
    pub phase: Phase,
    /// Number of collocation points
    pub points: usize,
    pub analyses: &'a Analyses,
    /// Throttle of propulsor groups which are not solved for, by group tag
    pub prescribed_throttles: Vec<(String, f64)>,
    /// Resets the battery state of charge at the start of this segment
    pub state_of_charge_override: Option<f64>,
    pub pipeline: Pipeline,
    pub solver: SolverConfig,
}

impl<'a> Segment<'a> {
    pub fn new<S: Into<String>>(tag: S, phase: Phase, analyses: &'a Analyses) -> Self {
        Self {
            tag: tag.into(),
            phase,
            points: DEFAULT_POINTS,
            analyses,
            prescribed_throttles: Vec::new(),
            state_of_charge_override: None,
            pipeline: Pipeline::standard(),
            solver: SolverConfig::default(),
        }
    }

    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    /// Prescribes the throttle of a propulsor group, removing its throttle unknown.
    pub fn with_throttle<S: Into<String>>(mut self, group: S, throttle: f64) -> Self {
        let group = group.into();
        self.prescribed_throttles.retain(|(tag, _)| *tag != group);
        self.prescribed_throttles.push((group, throttle));
        self
    }

    pub fn with_state_of_charge(mut self, state_of_charge: f64) -> Self {
        self.state_of_charge_override = Some(state_of_charge);
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn force_balance(&self) -> ForceBalance {
        self.phase.as_phase().force_balance()
    }

    /// Throttle of that group if it is not solved for
    pub fn prescribed_throttle(&self, group: &str) -> Option<f64> {
        self.prescribed_throttles
            .iter()
            .find(|(tag, _)| tag == group)
            .map(|(_, throttle)| *throttle)
            .or_else(|| self.phase.as_phase().default_throttle())
    }

    /// Weight of the vehicle at the start of the mission, used to scale the force residuals, N
    pub fn reference_weight(&self) -> f64 {
        self.analyses.vehicle.mass * self.analyses.planet.sea_level_gravity
    }

    /// Builds the state of this segment and its residuals, checking that the system is square.
    ///
    /// The state of charge of the seed is replaced by the override of this segment if any.
    pub fn assemble(
        &self,
        seed: BoundaryState,
        mission_epoch: Option<Epoch>,
    ) -> Result<(State, Vec<Residual>), SegmentError> {
        let discretization = Discretization::new(self.points).context(NumericsSnafu)?;
        let provider = self.analyses.energy();

        let mut seed = seed;
        if let Some(soc) = self.state_of_charge_override {
            seed.state_of_charge = Some(soc);
        } else if seed.state_of_charge.is_none() {
            seed.state_of_charge = provider.initial_state_of_charge();
        }

        let mut state = State::new(discretization, provider.groups().len(), seed)
            .with_mission_epoch(mission_epoch);

        let phase = self.phase.as_phase();
        let contribution = provider.contribute(self, &seed);
        let mut residuals = phase.residuals(self, &seed);
        for unknown in phase
            .unknowns(self, &seed)
            .into_iter()
            .chain(contribution.unknowns)
        {
            state.unknowns.insert(unknown);
        }
        residuals.extend(contribution.residuals);

        let unknowns = state.unknowns.size();
        let residual_count = residuals.iter().map(|r| r.len).sum::<usize>();
        ensure!(
            unknowns == residual_count && unknowns > 0,
            MalformedSnafu {
                tag: self.tag.clone(),
                unknowns,
                residuals: residual_count
            }
        );

        Ok((state, residuals))
    }

    /// Runs the iteration stages on this state.
    pub fn iterate(&self, state: &mut State) -> Result<(), SegmentError> {
        run(&self.pipeline.iterate, self, state)
    }

    /// Scaled residuals of this state.
    pub fn residual_vector(&self, state: &State, residuals: &[Residual]) -> Result<DVector<f64>, SegmentError> {
        let total = residuals.iter().map(|r| r.len).sum();
        let mut vector = DVector::zeros(total);
        let mut offset = 0;
        for residual in residuals {
            let values = (residual.evaluator)(self, state);
            ensure!(
                values.len() == residual.len,
                MalformedSnafu {
                    tag: self.tag.clone(),
                    unknowns: state.unknowns.size(),
                    residuals: total - residual.len + values.len()
                }
            );
            vector
                .rows_mut(offset, residual.len)
                .copy_from(&(values / residual.scale));
            offset += residual.len;
        }
        Ok(vector)
    }

    /// Solves this segment from the boundary state left by the previous one.
    pub fn solve(&self, seed: BoundaryState, mission_epoch: Option<Epoch>) -> Result<SolvedSegment, SegmentError> {
        let (mut state, residuals) = self.assemble(seed, mission_epoch)?;
        run(&self.pipeline.initialize, self, &mut state)?;

        // Surface stage errors before the solve, where they would only appear as non finite residuals
        self.iterate(&mut state)?;
        self.residual_vector(&state, &residuals)?;

        let unknown_labels = state.unknowns.labels();
        let residual_labels = residuals.iter().flat_map(|r| r.labels()).collect::<Vec<_>>();
        debug!(
            "[{}] solving {} unknowns on {}",
            self.tag,
            unknown_labels.len(),
            state.discretization
        );

        let template = state.clone();
        let evaluate = |x: &DVector<f64>| {
            let mut trial = template.clone();
            trial.unknowns.unflatten(x);
            match self
                .iterate(&mut trial)
                .and_then(|_| self.residual_vector(&trial, &residuals))
            {
                Ok(vector) => vector,
                Err(e) => {
                    trace!("[{}] {e}", self.tag);
                    DVector::from_element(residual_labels.len(), f64::NAN)
                }
            }
        };

        let solution = NewtonRaphson::new(self.solver)
            .solve(
                state.unknowns.flatten(),
                &unknown_labels,
                &residual_labels,
                evaluate,
            )
            .context(SolveSnafu {
                tag: self.tag.clone(),
            })?;

        state.unknowns.unflatten(&solution.x);
        self.iterate(&mut state)?;
        run(&self.pipeline.finalize, self, &mut state)?;

        info!("[{}] {solution}", self.tag);
        Ok(SolvedSegment {
            tag: self.tag.clone(),
            state,
            solution,
        })
    }
}

impl<'a> fmt::Display for Segment<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {} on {} points", self.tag, self.phase, self.points)
    }
}

impl<'a> fmt::Debug for Segment<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Segment")
            .field("tag", &self.tag)
            .field("phase", &self.phase)
            .field("points", &self.points)
            .field("prescribed_throttles", &self.prescribed_throttles)
            .field("state_of_charge_override", &self.state_of_charge_override)
            .field("pipeline", &self.pipeline)
            .field("solver", &self.solver)
            .finish()
    }
}

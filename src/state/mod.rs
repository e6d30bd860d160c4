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
use crate::numerics::Discretization;
use crate::time::{Epoch, Unit};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

mod conditions;
mod unknowns;

pub use conditions::{Aerodynamics, Conditions, Freestream, Frames, Propulsion, Weights};
pub use unknowns::{Unknown, Unknowns};

/// The continuous quantities of the vehicle at one instant.
///
/// The mission threads the terminal boundary state of each segment into the next one.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryState {
    /// Elapsed mission time, s
    pub time: f64,
    /// Along track distance, m
    pub distance: f64,
    /// m
    pub altitude: f64,
    /// Horizontal velocity, m/s
    pub velocity_x: f64,
    /// Vertical velocity, positive up, m/s
    pub velocity_z: f64,
    /// kg
    pub mass: f64,
    /// Battery state of charge, None when the vehicle stores no electrical energy
    #[serde(default)]
    pub state_of_charge: Option<f64>,
}

impl BoundaryState {
    /// True airspeed (no wind), m/s
    pub fn airspeed(&self) -> f64 {
        self.velocity_x.hypot(self.velocity_z)
    }
}

impl fmt::Display for BoundaryState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "t = {:.3} s, x = {:.3} km, h = {:.2} m, V = {:.3} m/s, m = {:.3} kg",
            self.time,
            self.distance * 1e-3,
            self.altitude,
            self.airspeed(),
            self.mass
        )?;
        if let Some(soc) = self.state_of_charge {
            write!(f, ", SOC = {:.4}", soc)?;
        }
        Ok(())
    }
}

/// The state of one segment: its discretization, the physical conditions at each point and the
/// solver unknowns. Mutated in place during the solve, read-only once the segment converged.
#[derive(Clone, Debug, PartialEq)]
pub struct State {
    pub discretization: Discretization,
    /// Segment duration, s
    pub duration: f64,
    /// Boundary state seeded from the previous segment (or the mission initial conditions)
    pub seed: BoundaryState,
    pub conditions: Conditions,
    pub unknowns: Unknowns,
    /// Epoch at which the mission clock reads zero, needed by models which depend on the time of day
    pub mission_epoch: Option<Epoch>,
}

impl State {
    /// Builds a zeroed state for this discretization.
    pub fn new(discretization: Discretization, groups: usize, seed: BoundaryState) -> Self {
        let n = discretization.len();
        Self {
            discretization,
            duration: 0.0,
            seed,
            conditions: Conditions::zeros(n, groups),
            unknowns: Unknowns::new(),
            mission_epoch: None,
        }
    }

    /// Sets the epoch of the start of the mission.
    pub fn with_mission_epoch(mut self, epoch: Option<Epoch>) -> Self {
        self.mission_epoch = epoch;
        self
    }

    /// Epoch of row `i`, if the mission epoch is known
    pub fn epoch(&self, i: usize) -> Option<Epoch> {
        self.mission_epoch
            .map(|epoch| epoch + self.conditions.frames.time[i] * Unit::Second)
    }

    /// Number of collocation points
    pub fn rows(&self) -> usize {
        self.discretization.len()
    }

    /// Returns the unknown of that name, or None if it was not declared.
    pub fn unknown(&self, name: &str) -> Option<&DVector<f64>> {
        self.unknowns.get(name)
    }

    /// Boundary state at row `i`
    pub fn row(&self, i: usize) -> BoundaryState {
        let frames = &self.conditions.frames;
        BoundaryState {
            time: frames.time[i],
            distance: frames.position[(i, 0)],
            altitude: frames.position[(i, 2)],
            velocity_x: frames.velocity[(i, 0)],
            velocity_z: frames.velocity[(i, 2)],
            mass: self.conditions.weights.mass[i],
            state_of_charge: self
                .seed
                .state_of_charge
                .map(|_| self.conditions.propulsion.state_of_charge[i]),
        }
    }

    pub fn initial(&self) -> BoundaryState {
        self.row(0)
    }

    pub fn terminal(&self) -> BoundaryState {
        self.row(self.rows() - 1)
    }
}

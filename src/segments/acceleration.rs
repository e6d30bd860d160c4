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

use super::{body_angle_unknown, required, set_flight_path, FlightPhase, InvalidPhaseSnafu, Segment, SegmentError, BODY_ANGLE};
use crate::linalg::DVector;
use crate::state::{BoundaryState, State, Unknown};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use typed_builder::TypedBuilder;

/// Level acceleration (or deceleration) between two airspeeds, e.g. the transition from a hover to wing borne flight.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct ConstantAccelerationConstantAltitude {
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude: Option<f64>,
    /// m/s, defaults to the airspeed at the end of the previous segment
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub airspeed_start: Option<f64>,
    pub airspeed_end: f64,
    /// Along track acceleration, negative to decelerate, m/s^2
    pub acceleration: f64,
}

impl ConstantAccelerationConstantAltitude {
    fn airspeed_start(&self, seed: &BoundaryState) -> f64 {
        self.airspeed_start.unwrap_or_else(|| seed.airspeed())
    }
}

impl FlightPhase for ConstantAccelerationConstantAltitude {
    fn initial_altitude(&self) -> Option<f64> {
        self.altitude
    }

    fn final_altitude(&self) -> Option<f64> {
        self.altitude
    }

    fn unknowns(&self, segment: &Segment, _seed: &BoundaryState) -> Vec<Unknown> {
        vec![body_angle_unknown(segment.points)]
    }

    fn check(&self, segment: &Segment, seed: &BoundaryState) -> Result<(), SegmentError> {
        let duration = (self.airspeed_end - self.airspeed_start(seed)) / self.acceleration;
        ensure!(
            duration.is_finite() && duration > 0.0 && self.airspeed_end >= 0.0,
            InvalidPhaseSnafu {
                tag: segment.tag.clone(),
                reason: format!(
                    "cannot reach {:.3} m/s from {:.3} m/s at {} m/s^2",
                    self.airspeed_end,
                    self.airspeed_start(seed),
                    self.acceleration
                )
            }
        );
        Ok(())
    }

    fn kinematics(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
        let seed = state.seed;
        let start = self.airspeed_start(&seed);
        state.duration = (self.airspeed_end - start) / self.acceleration;
        let airspeed = state.discretization.tau.map(|tau| start + (self.airspeed_end - start) * tau);
        let altitude = DVector::from_element(state.rows(), seed.altitude);
        state.conditions.frames.body_angle = required(segment, state, BODY_ANGLE)?.clone();
        set_flight_path(segment, state, &airspeed, 0.0, &altitude)
    }
}

impl fmt::Display for ConstantAccelerationConstantAltitude {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "level acceleration to {:.2} m/s at {:.3} m/s^2",
            self.airspeed_end, self.acceleration
        )
    }
}

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

/// Level flight at a constant true airspeed over a given distance.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct CruiseConstantSpeedConstantAltitude {
    /// m, defaults to the altitude at the end of the previous segment
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude: Option<f64>,
    /// True airspeed, m/s, defaults to the airspeed at the end of the previous segment
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub airspeed: Option<f64>,
    /// Ground distance, m
    pub distance: f64,
}

impl CruiseConstantSpeedConstantAltitude {
    fn airspeed(&self, seed: &BoundaryState) -> f64 {
        self.airspeed.unwrap_or_else(|| seed.airspeed())
    }
}

impl FlightPhase for CruiseConstantSpeedConstantAltitude {
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
        ensure!(
            self.distance > 0.0,
            InvalidPhaseSnafu {
                tag: segment.tag.clone(),
                reason: format!("cruise distance must be positive, got {} m", self.distance)
            }
        );
        ensure!(
            self.airspeed(seed) > 0.0,
            InvalidPhaseSnafu {
                tag: segment.tag.clone(),
                reason: "cruise requires a positive airspeed".to_string()
            }
        );
        Ok(())
    }

    fn kinematics(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
        let seed = state.seed;
        let airspeed = self.airspeed(&seed);
        state.duration = self.distance / airspeed;
        let n = state.rows();
        state.conditions.frames.body_angle = required(segment, state, BODY_ANGLE)?.clone();
        set_flight_path(
            segment,
            state,
            &DVector::from_element(n, airspeed),
            0.0,
            &DVector::from_element(n, seed.altitude),
        )
    }
}

impl fmt::Display for CruiseConstantSpeedConstantAltitude {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "cruise over {:.3} km", self.distance * 1e-3)?;
        if let Some(altitude) = self.altitude {
            write!(f, " at {altitude:.1} m")?;
        }
        if let Some(airspeed) = self.airspeed {
            write!(f, ", {airspeed:.2} m/s TAS")?;
        }
        Ok(())
    }
}

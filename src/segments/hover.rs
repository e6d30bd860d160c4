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

use super::{set_flight_path, FlightPhase, ForceBalance, InvalidPhaseSnafu, Segment, SegmentError};
use crate::io::{duration_from_str, duration_to_str};
use crate::linalg::DVector;
use crate::state::{BoundaryState, State, Unknown};
use crate::time::Duration;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use typed_builder::TypedBuilder;

/// Vertical flight of a vehicle held level, the thrust only balances the vertical forces.
fn vertical_kinematics(state: &mut State, segment: &Segment, altitude_end: f64, vertical_speed: f64) -> Result<(), SegmentError> {
    let seed = state.seed;
    let delta = altitude_end - seed.altitude;
    if vertical_speed.abs() > 0.0 {
        state.duration = delta / vertical_speed;
    }
    let altitude = state.discretization.tau.map(|tau| seed.altitude + delta * tau);
    state.conditions.frames.body_angle.fill(0.0);
    let n = state.rows();
    set_flight_path(segment, state, &DVector::from_element(n, vertical_speed.abs()), vertical_speed, &altitude)
}

/// Station keeping for a given duration.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct Hover {
    /// m, defaults to the altitude at the end of the previous segment
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    pub duration: Duration,
}

impl FlightPhase for Hover {
    fn initial_altitude(&self) -> Option<f64> {
        self.altitude
    }

    fn final_altitude(&self) -> Option<f64> {
        self.altitude
    }

    fn force_balance(&self) -> ForceBalance {
        ForceBalance::vertical()
    }

    fn unknowns(&self, _segment: &Segment, _seed: &BoundaryState) -> Vec<Unknown> {
        Vec::new()
    }

    fn check(&self, segment: &Segment, _seed: &BoundaryState) -> Result<(), SegmentError> {
        ensure!(
            self.duration.to_seconds() > 0.0,
            InvalidPhaseSnafu {
                tag: segment.tag.clone(),
                reason: format!("hover duration must be positive, got {}", self.duration)
            }
        );
        Ok(())
    }

    fn kinematics(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
        state.duration = self.duration.to_seconds();
        let altitude = state.seed.altitude;
        vertical_kinematics(state, segment, altitude, 0.0)
    }
}

impl fmt::Display for Hover {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "hover for {}", self.duration)?;
        if let Some(altitude) = self.altitude {
            write!(f, " at {altitude:.1} m")?;
        }
        Ok(())
    }
}

macro_rules! vertical_phase {
    ($phase:ty, $rate:ident, $sign:expr, $verb:literal) => {
        impl $phase {
            fn vertical_speed(&self) -> f64 {
                $sign * self.$rate
            }
        }

        impl FlightPhase for $phase {
            fn initial_altitude(&self) -> Option<f64> {
                self.altitude_start
            }

            fn final_altitude(&self) -> Option<f64> {
                Some(self.altitude_end)
            }

            fn force_balance(&self) -> ForceBalance {
                ForceBalance::vertical()
            }

            fn unknowns(&self, _segment: &Segment, _seed: &BoundaryState) -> Vec<Unknown> {
                Vec::new()
            }

            fn check(&self, segment: &Segment, seed: &BoundaryState) -> Result<(), SegmentError> {
                let delta = self.altitude_end - seed.altitude;
                ensure!(
                    self.$rate > 0.0 && delta * self.vertical_speed() > 0.0,
                    InvalidPhaseSnafu {
                        tag: segment.tag.clone(),
                        reason: format!(
                            "cannot {} from {:.3} m to {:.3} m at {} m/s",
                            $verb, seed.altitude, self.altitude_end, self.$rate
                        )
                    }
                );
                Ok(())
            }

            fn kinematics(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
                vertical_kinematics(state, segment, self.altitude_end, self.vertical_speed())
            }
        }
    };
}

/// Vertical climb at a constant rate, the vehicle being held level.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct VerticalClimb {
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude_start: Option<f64>,
    pub altitude_end: f64,
    /// m/s
    pub climb_rate: f64,
}

vertical_phase!(VerticalClimb, climb_rate, 1.0, "climb");

impl fmt::Display for VerticalClimb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "vertical climb to {:.1} m at {:.2} m/s", self.altitude_end, self.climb_rate)
    }
}

/// Vertical descent at a constant rate, the vehicle being held level.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct VerticalDescent {
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude_start: Option<f64>,
    pub altitude_end: f64,
    /// Positive downward, m/s
    pub descent_rate: f64,
}

vertical_phase!(VerticalDescent, descent_rate, -1.0, "descend");

impl fmt::Display for VerticalDescent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "vertical descent to {:.1} m at {:.2} m/s", self.altitude_end, self.descent_rate)
    }
}

#[cfg(test)]
mod ut_hover {
    use super::*;
    use crate::energy::STATE_OF_CHARGE;
    use crate::segments::fixtures::multicopter;
    use crate::segments::Phase;
    use crate::time::Unit;
    use approx::assert_abs_diff_eq;

    fn seed() -> BoundaryState {
        BoundaryState {
            altitude: 50.0,
            mass: 2_200.0,
            state_of_charge: Some(0.8),
            ..Default::default()
        }
    }

    #[test]
    fn vertical_climb_needs_more_power() {
        let _ = pretty_env_logger::try_init();
        let analyses = multicopter();
        let hover = Segment::new(
            "hover",
            Phase::Hover(Hover::builder().duration(20 * Unit::Second).build()),
            &analyses,
        )
        .with_points(6);
        let climb = Segment::new(
            "climb",
            Phase::VerticalClimb(VerticalClimb::builder().altitude_end(150.0).climb_rate(5.0).build()),
            &analyses,
        )
        .with_points(6);

        let hovered = hover.solve(seed(), None).unwrap();
        let climbed = climb.solve(seed(), None).unwrap();
        assert_abs_diff_eq!(climbed.state.duration, 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(climbed.state.terminal().altitude, 150.0, epsilon = 1e-9);
        assert!(climbed.state.conditions.propulsion.power[3] > hovered.state.conditions.propulsion.power[3]);

        let soc_hover = hovered.state.unknown(STATE_OF_CHARGE).unwrap()[5];
        let soc_climb = climbed.state.unknown(STATE_OF_CHARGE).unwrap()[5];
        assert!(soc_climb < soc_hover && soc_hover < 0.8);
    }

    #[test]
    fn state_of_charge_guess_from_seed() {
        let analyses = multicopter();
        let hover = Segment::new("hover", Phase::Hover(Hover::builder().duration(20 * Unit::Second).build()), &analyses)
            .with_points(4);
        let (state, _) = hover.assemble(seed(), None).unwrap();
        // Guessed at the charge left by the previous segment, not the mission initial charge
        assert!(state.unknown(STATE_OF_CHARGE).unwrap().iter().all(|soc| *soc == 0.8));

        let swapped = hover.with_state_of_charge(1.0);
        let (state, _) = swapped.assemble(seed(), None).unwrap();
        assert!(state.unknown(STATE_OF_CHARGE).unwrap().iter().all(|soc| *soc == 1.0));
        assert_eq!(state.seed.state_of_charge, Some(1.0));
    }

    #[test]
    fn zero_duration() {
        let analyses = multicopter();
        let hover = Segment::new("hover", Phase::Hover(Hover::builder().duration(Duration::ZERO).build()), &analyses);
        assert!(matches!(
            hover.solve(seed(), None),
            Err(SegmentError::InvalidPhase { .. })
        ));
    }
}

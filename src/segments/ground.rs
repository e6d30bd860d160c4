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

use super::{required, FlightPhase, ForceBalance, InvalidPhaseSnafu, Residual, Segment, SegmentError};
use crate::linalg::DVector;
use crate::state::{BoundaryState, State, Unknown};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use typed_builder::TypedBuilder;

pub const GROUND_VELOCITY: &str = "ground_velocity";
pub const ELAPSED_TIME: &str = "elapsed_time";

/// A roll on the runway, from a known speed to a target speed, at a fixed throttle.
#[derive(Copy, Clone, Debug)]
struct Roll {
    friction_coefficient: f64,
    velocity_start: Option<f64>,
    velocity_end: f64,
    time_guess: f64,
    accelerating: bool,
}

impl Roll {
    fn velocity_start(&self, seed: &BoundaryState) -> f64 {
        self.velocity_start.unwrap_or_else(|| seed.airspeed())
    }

    fn reference_speed(&self, seed: &BoundaryState) -> f64 {
        self.velocity_start(seed).max(self.velocity_end).max(1.0)
    }

    fn unknowns(&self, segment: &Segment, seed: &BoundaryState) -> Vec<Unknown> {
        let start = self.velocity_start(seed);
        let disc_guess = (1..segment.points)
            .map(|j| {
                let tau = if segment.points > 1 {
                    j as f64 / (segment.points - 1) as f64
                } else {
                    1.0
                };
                start + (self.velocity_end - start) * tau
            })
            .collect::<Vec<_>>();
        vec![
            Unknown::new(
                GROUND_VELOCITY,
                DVector::from_vec(disc_guess),
                self.reference_speed(seed),
            ),
            Unknown::per_point(ELAPSED_TIME, 1, self.time_guess, self.time_guess)
                .with_bounds(0.0, f64::INFINITY),
        ]
    }

    fn residuals(&self, seed: &BoundaryState) -> Vec<Residual> {
        vec![Residual::new(
            "final_velocity",
            1,
            self.reference_speed(seed),
            residual_final_velocity,
        )]
    }

    fn check(&self, segment: &Segment, seed: &BoundaryState) -> Result<(), SegmentError> {
        let start = self.velocity_start(seed);
        let (verb, valid) = if self.accelerating {
            ("accelerate", self.velocity_end > start)
        } else {
            ("decelerate", self.velocity_end < start && self.velocity_end >= 0.0)
        };
        ensure!(
            valid,
            InvalidPhaseSnafu {
                tag: segment.tag.clone(),
                reason: format!("cannot {verb} from {start:.3} m/s to {:.3} m/s", self.velocity_end)
            }
        );
        ensure!(
            self.time_guess > 0.0 && self.friction_coefficient >= 0.0,
            InvalidPhaseSnafu {
                tag: segment.tag.clone(),
                reason: "the time guess must be positive and the friction coefficient non negative".to_string()
            }
        );
        Ok(())
    }

    fn kinematics(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
        let seed = state.seed;
        let ground_velocity = required(segment, state, GROUND_VELOCITY)?.clone();
        state.duration = required(segment, state, ELAPSED_TIME)?[0];

        let frames = &mut state.conditions.frames;
        frames.velocity.fill(0.0);
        frames.velocity[(0, 0)] = self.velocity_start(&seed);
        for (j, v) in ground_velocity.iter().enumerate() {
            frames.velocity[(j + 1, 0)] = *v;
        }
        frames.position.column_mut(2).fill(seed.altitude);
        frames.body_angle.fill(0.0);
        Ok(())
    }
}

/// Speed at the last point minus the target speed, m/s
fn residual_final_velocity(segment: &Segment, state: &State) -> DVector<f64> {
    let last = state.rows() - 1;
    let target = segment.phase.as_phase().final_airspeed().unwrap_or(f64::NAN);
    DVector::from_element(1, state.conditions.frames.velocity[(last, 0)] - target)
}

macro_rules! roll_phase {
    ($phase:ty) => {
        impl FlightPhase for $phase {
            fn final_airspeed(&self) -> Option<f64> {
                Some(self.velocity_end)
            }

            fn force_balance(&self) -> ForceBalance {
                // The speed at the first point is known, and the ground carries the vertical load
                ForceBalance::horizontal_from(1)
            }

            fn default_throttle(&self) -> Option<f64> {
                Some(self.throttle)
            }

            fn friction_coefficient(&self) -> Option<f64> {
                Some(self.friction_coefficient)
            }

            fn unknowns(&self, segment: &Segment, seed: &BoundaryState) -> Vec<Unknown> {
                self.roll().unknowns(segment, seed)
            }

            fn residuals(&self, _segment: &Segment, seed: &BoundaryState) -> Vec<Residual> {
                self.roll().residuals(seed)
            }

            fn check(&self, segment: &Segment, seed: &BoundaryState) -> Result<(), SegmentError> {
                self.roll().check(segment, seed)
            }

            fn kinematics(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
                self.roll().kinematics(segment, state)
            }
        }
    };
}

fn default_rolling_friction() -> f64 {
    0.04
}

fn default_braking_friction() -> f64 {
    0.4
}

fn default_full_throttle() -> f64 {
    1.0
}

fn default_time_guess() -> f64 {
    30.0
}

/// Takeoff ground roll at a fixed throttle until the lift-off speed.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct TakeoffRoll {
    /// Rolling friction coefficient
    #[builder(default = 0.04)]
    #[serde(default = "default_rolling_friction")]
    pub friction_coefficient: f64,
    /// Throttle of every propulsor group
    #[builder(default = 1.0)]
    #[serde(default = "default_full_throttle")]
    pub throttle: f64,
    /// m/s, defaults to the speed at the end of the previous segment
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub velocity_start: Option<f64>,
    /// Lift-off speed, m/s
    pub velocity_end: f64,
    /// Initial guess of the duration of the roll, s
    #[builder(default = 30.0)]
    #[serde(default = "default_time_guess")]
    pub time_guess: f64,
}

impl TakeoffRoll {
    fn roll(&self) -> Roll {
        Roll {
            friction_coefficient: self.friction_coefficient,
            velocity_start: self.velocity_start,
            velocity_end: self.velocity_end,
            time_guess: self.time_guess,
            accelerating: true,
        }
    }
}

roll_phase!(TakeoffRoll);

impl fmt::Display for TakeoffRoll {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "takeoff roll to {:.2} m/s at throttle {:.2} (mu = {:.3})",
            self.velocity_end, self.throttle, self.friction_coefficient
        )
    }
}

/// Landing roll, braking at a fixed throttle from the touchdown speed.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct LandingRoll {
    /// Braking friction coefficient
    #[builder(default = 0.4)]
    #[serde(default = "default_braking_friction")]
    pub friction_coefficient: f64,
    #[builder(default = 0.0)]
    #[serde(default)]
    pub throttle: f64,
    /// Touchdown speed, m/s, defaults to the speed at the end of the previous segment
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub velocity_start: Option<f64>,
    /// Taxi speed at the end of the roll, m/s
    #[builder(default = 0.0)]
    #[serde(default)]
    pub velocity_end: f64,
    #[builder(default = 30.0)]
    #[serde(default = "default_time_guess")]
    pub time_guess: f64,
}

impl LandingRoll {
    fn roll(&self) -> Roll {
        Roll {
            friction_coefficient: self.friction_coefficient,
            velocity_start: self.velocity_start,
            velocity_end: self.velocity_end,
            time_guess: self.time_guess,
            accelerating: false,
        }
    }
}

roll_phase!(LandingRoll);

impl fmt::Display for LandingRoll {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "landing roll to {:.2} m/s (mu = {:.3})",
            self.velocity_end, self.friction_coefficient
        )
    }
}

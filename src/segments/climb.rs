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

use super::{
    body_angle_unknown, required, set_flight_path, FlightPhase, InfeasibleSnafu, InvalidPhaseSnafu, Segment,
    SegmentError, BODY_ANGLE,
};
use crate::linalg::DVector;
use crate::state::{BoundaryState, State, Unknown};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use typed_builder::TypedBuilder;

/// Airspeed schedule of a constant rate segment, linear in normalized time.
#[derive(Copy, Clone, Debug)]
enum Schedule {
    /// None keeps the airspeed at the start of the segment
    Constant(Option<f64>),
    Speed { start: Option<f64>, end: f64 },
    Mach { start: Option<f64>, end: f64 },
}

/// Straight climb or descent at a constant vertical speed.
#[derive(Copy, Clone, Debug)]
struct Profile {
    altitude_end: f64,
    /// Magnitude of the vertical speed, m/s
    rate: f64,
    climbing: bool,
    schedule: Schedule,
}

impl Profile {
    fn vertical_speed(&self) -> f64 {
        if self.climbing {
            self.rate
        } else {
            -self.rate
        }
    }

    fn airspeed(&self, segment: &Segment, seed: &BoundaryState, tau: f64, altitude: f64) -> f64 {
        match self.schedule {
            Schedule::Constant(airspeed) => airspeed.unwrap_or_else(|| seed.airspeed()),
            Schedule::Speed { start, end } => {
                let start = start.unwrap_or_else(|| seed.airspeed());
                start + (end - start) * tau
            }
            Schedule::Mach { start, end } => {
                let atmosphere = &segment.analyses.atmosphere;
                let start = start.unwrap_or_else(|| {
                    seed.airspeed() / atmosphere.properties(seed.altitude).speed_of_sound
                });
                (start + (end - start) * tau) * atmosphere.properties(altitude).speed_of_sound
            }
        }
    }

    fn check(&self, segment: &Segment, seed: &BoundaryState) -> Result<(), SegmentError> {
        ensure!(
            self.rate > 0.0,
            InvalidPhaseSnafu {
                tag: segment.tag.clone(),
                reason: format!("vertical rate must be positive, got {}", self.rate)
            }
        );
        let delta = self.altitude_end - seed.altitude;
        let (verb, valid) = if self.climbing {
            ("climb", delta > 0.0)
        } else {
            ("descend", delta < 0.0)
        };
        ensure!(
            valid,
            InvalidPhaseSnafu {
                tag: segment.tag.clone(),
                reason: format!("cannot {verb} from {:.3} m to {:.3} m", seed.altitude, self.altitude_end)
            }
        );
        for (tau, altitude) in [(0.0, seed.altitude), (1.0, self.altitude_end)] {
            let airspeed = self.airspeed(segment, seed, tau, altitude);
            ensure!(
                airspeed > self.rate,
                InfeasibleSnafu {
                    tag: segment.tag.clone(),
                    reason: format!(
                        "vertical speed of {:.3} m/s exceeds the airspeed of {airspeed:.3} m/s at {altitude:.1} m",
                        self.rate
                    )
                }
            );
        }
        Ok(())
    }

    fn kinematics(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
        let seed = state.seed;
        let delta = self.altitude_end - seed.altitude;
        state.duration = delta.abs() / self.rate;
        let altitude = state.discretization.tau.map(|tau| seed.altitude + delta * tau);
        let airspeed = DVector::from_fn(state.rows(), |i, _| {
            self.airspeed(segment, &seed, state.discretization.tau[i], altitude[i])
        });
        state.conditions.frames.body_angle = required(segment, state, BODY_ANGLE)?.clone();
        set_flight_path(segment, state, &airspeed, self.vertical_speed(), &altitude)
    }
}

macro_rules! constant_rate_phase {
    ($phase:ty) => {
        impl FlightPhase for $phase {
            fn initial_altitude(&self) -> Option<f64> {
                self.altitude_start
            }

            fn final_altitude(&self) -> Option<f64> {
                Some(self.altitude_end)
            }

            fn unknowns(&self, segment: &Segment, _seed: &BoundaryState) -> Vec<Unknown> {
                vec![body_angle_unknown(segment.points)]
            }

            fn check(&self, segment: &Segment, seed: &BoundaryState) -> Result<(), SegmentError> {
                self.profile().check(segment, seed)
            }

            fn kinematics(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
                self.profile().kinematics(segment, state)
            }
        }
    };
}

/// Climb at a constant true airspeed and a constant rate of climb.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct ClimbConstantSpeedConstantRate {
    /// m, defaults to the altitude at the end of the previous segment
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude_start: Option<f64>,
    /// m
    pub altitude_end: f64,
    /// True airspeed, m/s, defaults to the airspeed at the end of the previous segment
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub airspeed: Option<f64>,
    /// m/s
    pub climb_rate: f64,
}

impl ClimbConstantSpeedConstantRate {
    fn profile(&self) -> Profile {
        Profile {
            altitude_end: self.altitude_end,
            rate: self.climb_rate,
            climbing: true,
            schedule: Schedule::Constant(self.airspeed),
        }
    }
}

constant_rate_phase!(ClimbConstantSpeedConstantRate);

impl fmt::Display for ClimbConstantSpeedConstantRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "climb to {:.1} m at {:.2} m/s", self.altitude_end, self.climb_rate)?;
        if let Some(airspeed) = self.airspeed {
            write!(f, ", {airspeed:.2} m/s TAS")?;
        }
        Ok(())
    }
}

/// Descent at a constant true airspeed and a constant rate of descent.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct DescentConstantSpeedConstantRate {
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude_start: Option<f64>,
    pub altitude_end: f64,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub airspeed: Option<f64>,
    /// Positive downward, m/s
    pub descent_rate: f64,
}

impl DescentConstantSpeedConstantRate {
    fn profile(&self) -> Profile {
        Profile {
            altitude_end: self.altitude_end,
            rate: self.descent_rate,
            climbing: false,
            schedule: Schedule::Constant(self.airspeed),
        }
    }
}

constant_rate_phase!(DescentConstantSpeedConstantRate);

impl fmt::Display for DescentConstantSpeedConstantRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "descent to {:.1} m at {:.2} m/s", self.altitude_end, self.descent_rate)?;
        if let Some(airspeed) = self.airspeed {
            write!(f, ", {airspeed:.2} m/s TAS")?;
        }
        Ok(())
    }
}

/// Climb at a constant rate with a Mach number varying linearly in time.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct ClimbLinearMachConstantRate {
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude_start: Option<f64>,
    pub altitude_end: f64,
    /// Defaults to the Mach number at the end of the previous segment
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub mach_start: Option<f64>,
    pub mach_end: f64,
    pub climb_rate: f64,
}

impl ClimbLinearMachConstantRate {
    fn profile(&self) -> Profile {
        Profile {
            altitude_end: self.altitude_end,
            rate: self.climb_rate,
            climbing: true,
            schedule: Schedule::Mach {
                start: self.mach_start,
                end: self.mach_end,
            },
        }
    }
}

constant_rate_phase!(ClimbLinearMachConstantRate);

impl fmt::Display for ClimbLinearMachConstantRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "climb to {:.1} m at {:.2} m/s, accelerating to Mach {:.3}",
            self.altitude_end, self.climb_rate, self.mach_end
        )
    }
}

/// Descent at a constant rate with a Mach number varying linearly in time.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct DescentLinearMachConstantRate {
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude_start: Option<f64>,
    pub altitude_end: f64,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub mach_start: Option<f64>,
    pub mach_end: f64,
    pub descent_rate: f64,
}

impl DescentLinearMachConstantRate {
    fn profile(&self) -> Profile {
        Profile {
            altitude_end: self.altitude_end,
            rate: self.descent_rate,
            climbing: false,
            schedule: Schedule::Mach {
                start: self.mach_start,
                end: self.mach_end,
            },
        }
    }
}

constant_rate_phase!(DescentLinearMachConstantRate);

impl fmt::Display for DescentLinearMachConstantRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "descent to {:.1} m at {:.2} m/s, to Mach {:.3}",
            self.altitude_end, self.descent_rate, self.mach_end
        )
    }
}

/// Climb at a constant rate with a true airspeed varying linearly in time.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct ClimbLinearSpeedConstantRate {
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude_start: Option<f64>,
    pub altitude_end: f64,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub airspeed_start: Option<f64>,
    pub airspeed_end: f64,
    pub climb_rate: f64,
}

impl ClimbLinearSpeedConstantRate {
    fn profile(&self) -> Profile {
        Profile {
            altitude_end: self.altitude_end,
            rate: self.climb_rate,
            climbing: true,
            schedule: Schedule::Speed {
                start: self.airspeed_start,
                end: self.airspeed_end,
            },
        }
    }
}

constant_rate_phase!(ClimbLinearSpeedConstantRate);

impl fmt::Display for ClimbLinearSpeedConstantRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "climb to {:.1} m at {:.2} m/s, to {:.2} m/s TAS",
            self.altitude_end, self.climb_rate, self.airspeed_end
        )
    }
}

/// Descent at a constant rate with a true airspeed varying linearly in time.
#[derive(Copy, Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
pub struct DescentLinearSpeedConstantRate {
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub altitude_start: Option<f64>,
    pub altitude_end: f64,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub airspeed_start: Option<f64>,
    pub airspeed_end: f64,
    pub descent_rate: f64,
}

impl DescentLinearSpeedConstantRate {
    fn profile(&self) -> Profile {
        Profile {
            altitude_end: self.altitude_end,
            rate: self.descent_rate,
            climbing: false,
            schedule: Schedule::Speed {
                start: self.airspeed_start,
                end: self.airspeed_end,
            },
        }
    }
}

constant_rate_phase!(DescentLinearSpeedConstantRate);

impl fmt::Display for DescentLinearSpeedConstantRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "descent to {:.1} m at {:.2} m/s, to {:.2} m/s TAS",
            self.altitude_end, self.descent_rate, self.airspeed_end
        )
    }
}

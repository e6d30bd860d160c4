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

use crate::linalg::{DMatrix, DVector, MatrixXx3};
use nalgebra::Rotation3;

/// Freestream properties at each collocation point.
#[derive(Clone, Debug, PartialEq)]
pub struct Freestream {
    /// m
    pub altitude: DVector<f64>,
    /// kg/m^3
    pub density: DVector<f64>,
    /// Pa
    pub pressure: DVector<f64>,
    /// K
    pub temperature: DVector<f64>,
    /// m/s
    pub speed_of_sound: DVector<f64>,
    /// m/s^2
    pub gravity: DVector<f64>,
    /// True airspeed, m/s
    pub airspeed: DVector<f64>,
    pub mach: DVector<f64>,
    /// Pa
    pub dynamic_pressure: DVector<f64>,
}

/// Kinematics in the inertial frame (x forward along track, z up) and the body attitude.
#[derive(Clone, Debug, PartialEq)]
pub struct Frames {
    /// Elapsed mission time, s
    pub time: DVector<f64>,
    /// m, the z column is the altitude
    pub position: MatrixXx3<f64>,
    /// m/s
    pub velocity: MatrixXx3<f64>,
    /// m/s^2
    pub acceleration: MatrixXx3<f64>,
    /// Pitch of the body x axis above the horizon, rad
    pub body_angle: DVector<f64>,
    /// Climb angle of the velocity vector, rad
    pub flight_path_angle: DVector<f64>,
    /// Rotation from the body frame to the inertial frame
    pub body_to_inertial: Vec<Rotation3<f64>>,
    /// Sum of all external forces, N
    pub total_force: MatrixXx3<f64>,
}

/// Aerodynamic state of the vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct Aerodynamics {
    /// rad
    pub angle_of_attack: DVector<f64>,
    pub lift_coefficient: DVector<f64>,
    pub drag_coefficient: DVector<f64>,
    /// N, perpendicular to the velocity
    pub lift: DVector<f64>,
    /// N, opposite to the velocity
    pub drag: DVector<f64>,
    /// Inertial aerodynamic force, N
    pub force: MatrixXx3<f64>,
}

/// Propulsion and stored energy state.
#[derive(Clone, Debug, PartialEq)]
pub struct Propulsion {
    /// One column per propulsor group
    pub throttle: DMatrix<f64>,
    /// Thrust magnitude of each propulsor group, N
    pub group_thrust: DMatrix<f64>,
    /// Inertial thrust force, N
    pub thrust: MatrixXx3<f64>,
    /// Shaft power demanded by the propulsors, W
    pub power: DVector<f64>,
    /// Power drawn from the battery (negative when charging), W
    pub battery_power: DVector<f64>,
    /// Power collected by solar panels, W
    pub solar_power: DVector<f64>,
    /// Battery state of charge, as integrated from the battery power
    pub state_of_charge: DVector<f64>,
    /// Rate of change of the vehicle mass, kg/s (negative when burning fuel)
    pub mass_rate: DVector<f64>,
}

/// Mass of the vehicle at each point.
#[derive(Clone, Debug, PartialEq)]
pub struct Weights {
    /// kg
    pub mass: DVector<f64>,
    /// N
    pub weight: DVector<f64>,
}

/// All of the physical quantities of a segment, one row per collocation point.
#[derive(Clone, Debug, PartialEq)]
pub struct Conditions {
    pub freestream: Freestream,
    pub frames: Frames,
    pub aerodynamics: Aerodynamics,
    pub propulsion: Propulsion,
    pub weights: Weights,
}

impl Conditions {
    /// Initializes all of the conditions to zero for `n` points and `groups` propulsor groups.
    pub fn zeros(n: usize, groups: usize) -> Self {
        let col = || DVector::zeros(n);
        let vec3 = || MatrixXx3::zeros(n);
        Self {
            freestream: Freestream {
                altitude: col(),
                density: col(),
                pressure: col(),
                temperature: col(),
                speed_of_sound: col(),
                gravity: col(),
                airspeed: col(),
                mach: col(),
                dynamic_pressure: col(),
            },
            frames: Frames {
                time: col(),
                position: vec3(),
                velocity: vec3(),
                acceleration: vec3(),
                body_angle: col(),
                flight_path_angle: col(),
                body_to_inertial: vec![Rotation3::identity(); n],
                total_force: vec3(),
            },
            aerodynamics: Aerodynamics {
                angle_of_attack: col(),
                lift_coefficient: col(),
                drag_coefficient: col(),
                lift: col(),
                drag: col(),
                force: vec3(),
            },
            propulsion: Propulsion {
                throttle: DMatrix::zeros(n, groups),
                group_thrust: DMatrix::zeros(n, groups),
                thrust: vec3(),
                power: col(),
                battery_power: col(),
                solar_power: col(),
                state_of_charge: col(),
                mass_rate: col(),
            },
            weights: Weights {
                mass: col(),
                weight: col(),
            },
        }
    }

    /// Number of rows, shared by every namespace.
    pub fn rows(&self) -> usize {
        self.freestream.altitude.len()
    }

    /// Altitude at each point, read from the inertial position.
    pub fn altitude(&self) -> DVector<f64> {
        self.frames.position.column(2).clone_owned()
    }

    /// Checks that every namespace has the same number of rows.
    pub fn is_consistent(&self) -> bool {
        let n = self.rows();
        let fs = &self.freestream;
        let fr = &self.frames;
        let ae = &self.aerodynamics;
        let pr = &self.propulsion;
        [
            fs.density.len(),
            fs.pressure.len(),
            fs.temperature.len(),
            fs.speed_of_sound.len(),
            fs.gravity.len(),
            fs.airspeed.len(),
            fs.mach.len(),
            fs.dynamic_pressure.len(),
            fr.time.len(),
            fr.position.nrows(),
            fr.velocity.nrows(),
            fr.acceleration.nrows(),
            fr.body_angle.len(),
            fr.flight_path_angle.len(),
            fr.body_to_inertial.len(),
            fr.total_force.nrows(),
            ae.angle_of_attack.len(),
            ae.lift_coefficient.len(),
            ae.drag_coefficient.len(),
            ae.lift.len(),
            ae.drag.len(),
            ae.force.nrows(),
            pr.throttle.nrows(),
            pr.group_thrust.nrows(),
            pr.thrust.nrows(),
            pr.power.len(),
            pr.battery_power.len(),
            pr.solar_power.len(),
            pr.state_of_charge.len(),
            pr.mass_rate.len(),
            self.weights.mass.len(),
            self.weights.weight.len(),
        ]
        .iter()
        .all(|len| *len == n)
    }
}

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

//! Stages shared by every segment, run in order at every residual evaluation.

use super::{Segment, SegmentError};
use crate::linalg::{DVector, Vector3};
use crate::state::State;
use nalgebra::Rotation3;

/// Below this airspeed, in m/s, the flight path angle is undefined and taken as level.
const STILL_AIR: f64 = 1e-9;

pub fn check_feasibility(segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    segment.phase.as_phase().check(segment, &state.seed)
}

pub fn update_kinematics(segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    segment.phase.as_phase().kinematics(segment, state)
}

/// Time of each point, and the along track distance integrated from the horizontal velocity.
pub fn update_time_and_distance(_segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    let duration = state.duration;
    let seed = state.seed;
    state.conditions.frames.time = state.discretization.times(seed.time, duration);
    let vx = state.conditions.frames.velocity.column(0).clone_owned();
    let distance = state.discretization.integrate(&vx, duration).add_scalar(seed.distance);
    state.conditions.frames.position.set_column(0, &distance);
    Ok(())
}

pub fn update_atmosphere(segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    let altitude = state.conditions.altitude();
    let freestream = &mut state.conditions.freestream;
    for (i, h) in altitude.iter().enumerate() {
        let properties = segment.analyses.atmosphere.properties(*h);
        freestream.density[i] = properties.density;
        freestream.pressure[i] = properties.pressure;
        freestream.temperature[i] = properties.temperature;
        freestream.speed_of_sound[i] = properties.speed_of_sound;
        freestream.gravity[i] = segment.analyses.planet.gravity(*h);
    }
    freestream.altitude = altitude;
    Ok(())
}

/// Airspeed, Mach number and dynamic pressure. There is no wind.
pub fn update_freestream(_segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    let velocity = &state.conditions.frames.velocity;
    let freestream = &mut state.conditions.freestream;
    for i in 0..velocity.nrows() {
        let airspeed = velocity.row(i).norm();
        freestream.airspeed[i] = airspeed;
        freestream.mach[i] = airspeed / freestream.speed_of_sound[i];
        freestream.dynamic_pressure[i] = 0.5 * freestream.density[i] * airspeed * airspeed;
    }
    Ok(())
}

/// Flight path angle, angle of attack and the body to inertial rotations.
pub fn update_orientations(_segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    let frames = &mut state.conditions.frames;
    let aero = &mut state.conditions.aerodynamics;
    for i in 0..frames.time.len() {
        let (vx, vz) = (frames.velocity[(i, 0)], frames.velocity[(i, 2)]);
        let gamma = if vx.hypot(vz) > STILL_AIR {
            vz.atan2(vx)
        } else {
            0.0
        };
        let theta = frames.body_angle[i];
        frames.flight_path_angle[i] = gamma;
        aero.angle_of_attack[i] = theta - gamma;
        // Pitching up is a negative rotation about y when z is up and x is forward
        frames.body_to_inertial[i] = Rotation3::from_axis_angle(&Vector3::y_axis(), -theta);
    }
    Ok(())
}

/// Lift and drag from the aerodynamic model, and their inertial force.
pub fn update_aerodynamics(segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    let vehicle = &segment.analyses.vehicle;
    let freestream = &state.conditions.freestream;
    let frames = &state.conditions.frames;
    let aero = &mut state.conditions.aerodynamics;
    for i in 0..frames.time.len() {
        let coefficients = vehicle
            .aerodynamics
            .coefficients(aero.angle_of_attack[i], freestream.mach[i]);
        let q_s = freestream.dynamic_pressure[i] * vehicle.reference_area;
        aero.lift_coefficient[i] = coefficients.lift;
        aero.drag_coefficient[i] = coefficients.drag;
        aero.lift[i] = q_s * coefficients.lift;
        aero.drag[i] = q_s * coefficients.drag;

        let airspeed = freestream.airspeed[i];
        let force = if airspeed > STILL_AIR {
            let (ux, uz) = (frames.velocity[(i, 0)] / airspeed, frames.velocity[(i, 2)] / airspeed);
            // Lift is the velocity direction rotated up by a quarter turn
            Vector3::new(-aero.drag[i] * ux - aero.lift[i] * uz, 0.0, -aero.drag[i] * uz + aero.lift[i] * ux)
        } else {
            Vector3::zeros()
        };
        aero.force.set_row(i, &force.transpose());
    }
    Ok(())
}

pub fn update_energy(segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    segment.analyses.energy().evaluate(segment, state)
}

/// Mass from the mass flow of the energy network, and weight from the local gravity.
pub fn update_weights(_segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    let burnt = state
        .discretization
        .integrate(&state.conditions.propulsion.mass_rate, state.duration);
    let mass = burnt.add_scalar(state.seed.mass);
    state.conditions.weights.weight = mass.component_mul(&state.conditions.freestream.gravity);
    state.conditions.weights.mass = mass;
    Ok(())
}

/// Inertial acceleration, differentiated from the velocity.
pub fn update_acceleration(_segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    for k in 0..3 {
        let velocity: DVector<f64> = state.conditions.frames.velocity.column(k).clone_owned();
        let acceleration = state.discretization.differentiate(&velocity, state.duration);
        state.conditions.frames.acceleration.set_column(k, &acceleration);
    }
    Ok(())
}

/// Sum of the thrust, the aerodynamic force, the weight and the ground reaction when rolling.
pub fn update_forces(segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    let friction = segment.phase.as_phase().friction_coefficient();
    let conditions = &mut state.conditions;
    let mut total = &conditions.propulsion.thrust + &conditions.aerodynamics.force;
    for i in 0..total.nrows() {
        total[(i, 2)] -= conditions.weights.weight[i];
        if let Some(mu) = friction {
            // The ground carries whatever the wings and the thrust do not
            let normal = (-total[(i, 2)]).max(0.0);
            total[(i, 2)] += normal;
            total[(i, 0)] -= mu * normal;
        }
    }
    conditions.frames.total_force = total;
    Ok(())
}

/// Converged unknowns must lie within their bounds.
pub fn check_bounds(segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
    for unknown in state.unknowns.iter() {
        if let (Some(value), Some((min, max))) = (unknown.violation(super::BOUNDS_TOLERANCE), unknown.bounds) {
            error!("[{}] {} = {value} outside of [{min}, {max}]", segment.tag, unknown.name);
            return Err(SegmentError::OutOfBounds {
                tag: segment.tag.clone(),
                name: unknown.name.clone(),
                value,
                min,
                max,
            });
        }
    }
    Ok(())
}

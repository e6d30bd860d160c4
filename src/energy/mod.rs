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

use crate::linalg::{DMatrix, DVector, Vector3};
use crate::segments::{Residual, Segment, SegmentError};
use crate::state::{BoundaryState, State, Unknown};
use nalgebra::Rotation3;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

mod battery;
mod rotor;
mod solar;
mod turbofan;

pub use battery::{Battery, BatteryRotorNetwork};
pub use rotor::Rotor;
pub use solar::{SolarNetwork, SolarPanel};
pub use turbofan::{Turbofan, TurbofanNetwork};

/// Name of the state of charge unknown added by stored energy networks
pub const STATE_OF_CHARGE: &str = "state_of_charge";

/// Direction, in the body frame, along which a propulsor group produces thrust.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrustAxis {
    /// Along the body x axis (turbofans, propellers)
    BodyX,
    /// Along the body z axis, i.e. "up" when the body is level (lift rotors)
    BodyZ,
}

impl ThrustAxis {
    /// Unit vector of the thrust in the inertial frame for this body attitude.
    pub fn inertial(&self, body_to_inertial: &Rotation3<f64>) -> Vector3<f64> {
        match self {
            Self::BodyX => body_to_inertial * Vector3::x(),
            Self::BodyZ => body_to_inertial * Vector3::z(),
        }
    }
}

/// A group of identical propulsors sharing one throttle.
///
/// Members are indices into the propulsor arena of the network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropulsorGroup {
    pub tag: String,
    pub members: Vec<usize>,
    pub axis: ThrustAxis,
    /// Set to true to allow negative throttles (windmilling or regenerative braking)
    #[serde(default)]
    pub regenerative: bool,
}

impl PropulsorGroup {
    pub fn new<S: Into<String>>(tag: S, members: Vec<usize>, axis: ThrustAxis) -> Self {
        Self {
            tag: tag.into(),
            members,
            axis,
            regenerative: false,
        }
    }

    /// Name of the throttle unknown of this group
    pub fn throttle_name(&self) -> String {
        format!("throttle_{}", self.tag)
    }

    /// Admissible throttle range
    pub fn throttle_bounds(&self) -> (f64, f64) {
        if self.regenerative {
            (-1.0, 1.0)
        } else {
            (0.0, 1.0)
        }
    }
}

/// Unknowns and residuals contributed by an energy provider to a segment.
#[derive(Clone, Debug, Default)]
pub struct Contribution {
    pub unknowns: Vec<Unknown>,
    pub residuals: Vec<Residual>,
}

impl Contribution {
    /// Total number of scalar unknowns
    pub fn unknown_count(&self) -> usize {
        self.unknowns.iter().map(Unknown::len).sum()
    }

    /// Total number of scalar residuals
    pub fn residual_count(&self) -> usize {
        self.residuals.iter().map(|r| r.len).sum()
    }
}

/// An energy provider translates the propulsion architecture of the vehicle into the unknowns and
/// residuals of a segment, and evaluates thrust, power and energy consumption during the solve.
pub trait EnergyProvider: Send + Sync + fmt::Display {
    /// The propulsor groups, one throttle each
    fn groups(&self) -> &[PropulsorGroup];

    /// State of charge of the stored energy at the start of the mission, if this network stores electrical energy
    fn initial_state_of_charge(&self) -> Option<f64>;

    /// Unknowns and residuals this provider adds to the segment flown from `seed`.
    ///
    /// This does not modify the segment and always returns the same contribution for the same segment and seed.
    fn contribute(&self, segment: &Segment, seed: &BoundaryState) -> Contribution;

    /// Computes the throttles, thrust, power, mass flow and stored energy at each point of the state.
    fn evaluate(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError>;
}

/// Energy network of a vehicle, the variant is selected by the vehicle configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnergyNetwork {
    Turbofan(TurbofanNetwork),
    BatteryRotor(BatteryRotorNetwork),
    Solar(SolarNetwork),
}

impl EnergyNetwork {
    fn provider(&self) -> &dyn EnergyProvider {
        match self {
            Self::Turbofan(network) => network,
            Self::BatteryRotor(network) => network,
            Self::Solar(network) => network,
        }
    }
}

impl EnergyProvider for EnergyNetwork {
    fn groups(&self) -> &[PropulsorGroup] {
        self.provider().groups()
    }

    fn initial_state_of_charge(&self) -> Option<f64> {
        self.provider().initial_state_of_charge()
    }

    fn contribute(&self, segment: &Segment, seed: &BoundaryState) -> Contribution {
        self.provider().contribute(segment, seed)
    }

    fn evaluate(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
        self.provider().evaluate(segment, state)
    }
}

impl fmt::Display for EnergyNetwork {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.provider())
    }
}

/// Throttle unknowns of the groups which the segment does not prescribe, and the force balance
/// residuals on the axes the segment leaves open. A network without any propulsor group
/// contributes nothing.
pub(crate) fn force_balance_contribution(
    segment: &Segment,
    groups: &[PropulsorGroup],
    throttle_guess: f64,
) -> Contribution {
    let mut contribution = Contribution::default();
    if groups.is_empty() {
        return contribution;
    }

    for group in groups {
        if segment.prescribed_throttle(&group.tag).is_none() {
            let (min, max) = group.throttle_bounds();
            contribution.unknowns.push(
                Unknown::per_point(group.throttle_name(), segment.points, throttle_guess, 1.0)
                    .with_bounds(min, max),
            );
        }
    }

    let balance = segment.force_balance();
    let len = segment.points.saturating_sub(balance.first_row);
    let weight = segment.reference_weight();
    if balance.horizontal {
        contribution.residuals.push(Residual::new(
            "force_x",
            len,
            weight,
            residual_force_x,
        ));
    }
    if balance.vertical {
        contribution.residuals.push(Residual::new(
            "force_z",
            len,
            weight,
            residual_force_z,
        ));
    }
    contribution
}

/// State of charge unknown and the energy residual of a battery, guessed constant at the seed charge.
pub(crate) fn energy_contribution(segment: &Segment, seed: &BoundaryState, initial_soc: f64) -> Contribution {
    let guess = segment
        .state_of_charge_override
        .or(seed.state_of_charge)
        .unwrap_or(initial_soc);
    Contribution {
        unknowns: vec![Unknown::per_point(STATE_OF_CHARGE, segment.points, guess, 1.0).with_bounds(0.0, 1.0)],
        residuals: vec![Residual::new("energy", segment.points, 1.0, residual_energy)],
    }
}

/// Throttle of each group at each point, read from the unknowns or the segment prescription.
pub(crate) fn throttles(
    segment: &Segment,
    state: &State,
    groups: &[PropulsorGroup],
) -> Result<DMatrix<f64>, SegmentError> {
    let n = state.rows();
    let mut throttle = DMatrix::zeros(n, groups.len());
    for (g, group) in groups.iter().enumerate() {
        match segment.prescribed_throttle(&group.tag) {
            Some(value) => throttle.column_mut(g).fill(value),
            None => {
                let name = group.throttle_name();
                let values = state.unknown(&name).ok_or_else(|| SegmentError::MissingUnknown {
                    tag: segment.tag.clone(),
                    name: name.clone(),
                })?;
                throttle.column_mut(g).copy_from(values);
            }
        }
    }
    Ok(throttle)
}

fn force_residual(segment: &Segment, state: &State, axis: usize) -> DVector<f64> {
    let first = segment.force_balance().first_row;
    let n = state.rows();
    let frames = &state.conditions.frames;
    let mass = &state.conditions.weights.mass;
    DVector::from_iterator(
        n.saturating_sub(first),
        (first..n).map(|i| frames.total_force[(i, axis)] - mass[i] * frames.acceleration[(i, axis)]),
    )
}

/// Net along track force minus the inertial force, N
pub(crate) fn residual_force_x(segment: &Segment, state: &State) -> DVector<f64> {
    force_residual(segment, state, 0)
}

/// Net vertical force minus the inertial force, N
pub(crate) fn residual_force_z(segment: &Segment, state: &State) -> DVector<f64> {
    force_residual(segment, state, 2)
}

/// State of charge unknown minus the state of charge integrated from the battery power.
pub(crate) fn residual_energy(_segment: &Segment, state: &State) -> DVector<f64> {
    let integrated = &state.conditions.propulsion.state_of_charge;
    match state.unknown(STATE_OF_CHARGE) {
        Some(soc) => soc - integrated,
        None => DVector::from_element(integrated.len(), f64::NAN),
    }
}

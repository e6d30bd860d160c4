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
    energy_contribution, force_balance_contribution, throttles, Contribution, EnergyProvider,
    PropulsorGroup, Rotor, ThrustAxis, STATE_OF_CHARGE,
};
use crate::environment::StandardAtmosphere;
use crate::linalg::DVector;
use crate::segments::{Segment, SegmentError};
use crate::state::{BoundaryState, State};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Width of the state of charge band below full charge over which charging tapers off
pub const CHARGE_TAPER: f64 = 0.01;

/// A battery with an internal resistance and a state of charge dependent open circuit voltage.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    /// Usable energy when fully charged, J
    pub max_energy: f64,
    /// State of charge at the start of the mission
    pub initial_state_of_charge: f64,
    /// Open circuit voltage at half charge, V
    pub nominal_voltage: f64,
    /// Ohm, zero for a lossless battery
    #[serde(default)]
    pub internal_resistance: f64,
}

impl Battery {
    /// Open circuit voltage, linear in the state of charge, V
    pub fn open_circuit_voltage(&self, state_of_charge: f64) -> f64 {
        self.nominal_voltage * (0.9 + 0.2 * state_of_charge)
    }

    /// Chemical power drawn from the cells to deliver `power` W at the terminals.
    /// Negative when charging, in which case less than `power` is stored.
    pub fn drawn_power(&self, power: f64, state_of_charge: f64) -> f64 {
        if self.internal_resistance <= 0.0 {
            return power;
        }
        let voltage = self.open_circuit_voltage(state_of_charge).max(1e-3);
        let r = self.internal_resistance;
        // Past the maximum power point, the current saturates at V / 2R
        let discriminant = (voltage * voltage - 4.0 * r * power).max(0.0);
        let current = (voltage - discriminant.sqrt()) / (2.0 * r);
        voltage * current
    }

    /// Fraction of the charging power stored at this state of charge: one below the taper band,
    /// decreasing linearly to zero at full charge, and negative above it.
    pub fn charge_acceptance(&self, state_of_charge: f64) -> f64 {
        ((1.0 - state_of_charge) / CHARGE_TAPER).min(1.0)
    }
}

/// Battery powered electric motors driving rotors or propellers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatteryRotorNetwork {
    /// Propulsor arena
    pub rotors: Vec<Rotor>,
    pub groups: Vec<PropulsorGroup>,
    pub battery: Battery,
    pub motor_efficiency: f64,
    /// Constant power drawn by the payload and avionics, W
    #[serde(default)]
    pub avionics_power: f64,
}

impl BatteryRotorNetwork {
    /// A multicopter: a single group of `count` identical lift rotors.
    pub fn multicopter(rotor: Rotor, count: usize, battery: Battery, motor_efficiency: f64) -> Self {
        Self {
            rotors: vec![rotor; count],
            groups: vec![PropulsorGroup::new(
                "lift",
                (0..count).collect(),
                ThrustAxis::BodyZ,
            )],
            battery,
            motor_efficiency,
            avionics_power: 0.0,
        }
    }

    /// Adds a group of propulsors to the arena.
    pub fn with_group<S: Into<String>>(mut self, tag: S, rotor: Rotor, count: usize, axis: ThrustAxis) -> Self {
        let first = self.rotors.len();
        self.rotors.extend(std::iter::repeat(rotor).take(count));
        self.groups
            .push(PropulsorGroup::new(tag, (first..first + count).collect(), axis));
        self
    }
}

impl EnergyProvider for BatteryRotorNetwork {
    fn groups(&self) -> &[PropulsorGroup] {
        &self.groups
    }

    fn initial_state_of_charge(&self) -> Option<f64> {
        Some(self.battery.initial_state_of_charge)
    }

    fn contribute(&self, segment: &Segment, seed: &BoundaryState) -> Contribution {
        let mut contribution = force_balance_contribution(segment, &self.groups, 0.5);
        if !self.groups.is_empty() {
            let energy = energy_contribution(segment, seed, self.battery.initial_state_of_charge);
            contribution.unknowns.extend(energy.unknowns);
            contribution.residuals.extend(energy.residuals);
        }
        contribution
    }

    fn evaluate(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
        let no_solar = DVector::zeros(state.rows());
        evaluate_electric(
            segment,
            state,
            ElectricNetwork {
                rotors: &self.rotors,
                groups: &self.groups,
                battery: &self.battery,
                motor_efficiency: self.motor_efficiency,
                avionics_power: self.avionics_power,
            },
            no_solar,
        )
    }
}

impl fmt::Display for BatteryRotorNetwork {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "battery network ({} rotors in {} groups, {:.1} kWh)",
            self.rotors.len(),
            self.groups.len(),
            self.battery.max_energy / 3.6e6
        )
    }
}

/// Borrowed view of the components of an electric network.
pub(crate) struct ElectricNetwork<'a> {
    pub rotors: &'a [Rotor],
    pub groups: &'a [PropulsorGroup],
    pub battery: &'a Battery,
    pub motor_efficiency: f64,
    pub avionics_power: f64,
}

/// Thrust, shaft power and battery depletion of an electric network, given the solar power collected at each point.
pub(crate) fn evaluate_electric(
    segment: &Segment,
    state: &mut State,
    network: ElectricNetwork,
    solar_power: DVector<f64>,
) -> Result<(), SegmentError> {
    let throttle = throttles(segment, state, network.groups)?;
    let soc_guess = match state.unknown(STATE_OF_CHARGE) {
        Some(soc) => soc.clone(),
        None if network.groups.is_empty() => DVector::from_element(state.rows(), state.seed.state_of_charge.unwrap_or(0.0)),
        None => {
            return Err(SegmentError::MissingUnknown {
                tag: segment.tag.clone(),
                name: STATE_OF_CHARGE.to_string(),
            })
        }
    };
    let n = state.rows();
    let rho_sl = StandardAtmosphere::sea_level_density();

    let conditions = &mut state.conditions;
    conditions.propulsion.thrust.fill(0.0);
    let mut power = DVector::zeros(n);

    for (g, group) in network.groups.iter().enumerate() {
        for i in 0..n {
            let density = conditions.freestream.density[i];
            let direction = group.axis.inertial(&conditions.frames.body_to_inertial[i]);
            let axial_speed = conditions.frames.velocity.row(i).transpose().dot(&direction);
            let mut group_thrust = 0.0;
            for member in &group.members {
                let rotor = network.rotors.get(*member).ok_or_else(|| {
                    SegmentError::InvalidPropulsor {
                        group: group.tag.clone(),
                        index: *member,
                    }
                })?;
                let thrust = throttle[(i, g)] * rotor.available_thrust(density / rho_sl);
                group_thrust += thrust;
                power[i] += rotor.shaft_power(thrust, axial_speed, density);
            }
            conditions.propulsion.group_thrust[(i, g)] = group_thrust;
            for k in 0..3 {
                conditions.propulsion.thrust[(i, k)] += direction[k] * group_thrust;
            }
        }
    }

    let eta = network.motor_efficiency;
    let mut used_solar = solar_power.clone();
    let drawn = DVector::from_fn(n, |i, _| {
        let electric = if power[i] >= 0.0 {
            power[i] / eta
        } else {
            power[i] * eta
        };
        let net = electric + network.avionics_power - solar_power[i];
        let drawn = network.battery.drawn_power(net, soc_guess[i]);
        if drawn >= 0.0 {
            return drawn;
        }
        // The surplus is curtailed as the cells approach full charge
        let acceptance = network.battery.charge_acceptance(soc_guess[i]);
        used_solar[i] = (solar_power[i] + net * (1.0 - acceptance))
            .max(0.0)
            .min(solar_power[i]);
        drawn * acceptance
    });

    let soc0 = state
        .seed
        .state_of_charge
        .unwrap_or(network.battery.initial_state_of_charge);
    let consumed = state.discretization.integrate(&drawn, state.duration);

    let propulsion = &mut state.conditions.propulsion;
    propulsion.throttle = throttle;
    propulsion.power = power;
    propulsion.battery_power = drawn;
    propulsion.solar_power = used_solar;
    propulsion.mass_rate.fill(0.0);
    propulsion.state_of_charge = consumed.map(|e| soc0 - e / network.battery.max_energy);
    Ok(())
}

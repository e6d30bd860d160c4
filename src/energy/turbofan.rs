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

use super::{force_balance_contribution, throttles, Contribution, EnergyProvider, PropulsorGroup, ThrustAxis};
use crate::environment::StandardAtmosphere;
use crate::linalg::DVector;
use crate::segments::{Segment, SegmentError};
use crate::state::{BoundaryState, State};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// A turbofan engine with a density lapse of its available thrust and a Mach dependent thrust specific fuel consumption.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turbofan {
    /// Sea level static thrust at full throttle, N
    pub sea_level_thrust: f64,
    /// Available thrust scales with the density ratio to this power
    pub lapse_exponent: f64,
    /// Thrust specific fuel consumption at Mach 0, kg/(N s)
    pub tsfc: f64,
    /// Relative increase of the TSFC per unit of Mach
    #[serde(default)]
    pub tsfc_mach_slope: f64,
}

impl Turbofan {
    /// Maximum thrust available at this density ratio, N
    pub fn available_thrust(&self, density_ratio: f64) -> f64 {
        self.sea_level_thrust * density_ratio.max(0.0).powf(self.lapse_exponent)
    }

    /// Fuel flow for this thrust, kg/s
    pub fn fuel_flow(&self, thrust: f64, mach: f64) -> f64 {
        self.tsfc * (1.0 + self.tsfc_mach_slope * mach) * thrust.max(0.0)
    }
}

/// Fuel burning network of turbofans: no stored electrical energy, the vehicle mass decreases with the fuel burnt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurbofanNetwork {
    /// Propulsor arena
    pub engines: Vec<Turbofan>,
    pub groups: Vec<PropulsorGroup>,
}

impl TurbofanNetwork {
    /// A single group of `count` identical engines mounted along the body x axis.
    pub fn identical(engine: Turbofan, count: usize) -> Self {
        Self {
            engines: vec![engine; count],
            groups: vec![PropulsorGroup::new(
                "engines",
                (0..count).collect(),
                ThrustAxis::BodyX,
            )],
        }
    }
}

impl EnergyProvider for TurbofanNetwork {
    fn groups(&self) -> &[PropulsorGroup] {
        &self.groups
    }

    fn initial_state_of_charge(&self) -> Option<f64> {
        None
    }

    fn contribute(&self, segment: &Segment, _seed: &BoundaryState) -> Contribution {
        force_balance_contribution(segment, &self.groups, 0.5)
    }

    fn evaluate(&self, segment: &Segment, state: &mut State) -> Result<(), SegmentError> {
        let throttle = throttles(segment, state, &self.groups)?;
        let n = state.rows();
        let rho_sl = StandardAtmosphere::sea_level_density();

        let conditions = &mut state.conditions;
        conditions.propulsion.thrust.fill(0.0);
        let mut power = DVector::zeros(n);
        let mut mass_rate = DVector::zeros(n);

        for (g, group) in self.groups.iter().enumerate() {
            for i in 0..n {
                let sigma = conditions.freestream.density[i] / rho_sl;
                let mach = conditions.freestream.mach[i];
                let mut group_thrust = 0.0;
                for member in &group.members {
                    let engine = self.engines.get(*member).ok_or_else(|| {
                        SegmentError::InvalidPropulsor {
                            group: group.tag.clone(),
                            index: *member,
                        }
                    })?;
                    let thrust = throttle[(i, g)] * engine.available_thrust(sigma);
                    group_thrust += thrust;
                    mass_rate[i] -= engine.fuel_flow(thrust, mach);
                }
                let direction = group.axis.inertial(&conditions.frames.body_to_inertial[i]);
                let thrust_vector = direction * group_thrust;
                let velocity = conditions.frames.velocity.row(i).transpose();
                power[i] += thrust_vector.dot(&velocity);
                conditions.propulsion.group_thrust[(i, g)] = group_thrust;
                for k in 0..3 {
                    conditions.propulsion.thrust[(i, k)] += thrust_vector[k];
                }
            }
        }

        conditions.propulsion.throttle = throttle;
        conditions.propulsion.power = power;
        conditions.propulsion.battery_power.fill(0.0);
        conditions.propulsion.solar_power.fill(0.0);
        conditions.propulsion.mass_rate = mass_rate;
        conditions
            .propulsion
            .state_of_charge
            .fill(state.seed.state_of_charge.unwrap_or(0.0));
        Ok(())
    }
}

impl fmt::Display for TurbofanNetwork {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "turbofan network ({} engines in {} groups)",
            self.engines.len(),
            self.groups.len()
        )
    }
}

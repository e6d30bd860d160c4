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

use serde_derive::{Deserialize, Serialize};

/// Actuator disk model of a rotor or propeller driven by an electric motor.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rotor {
    /// m
    pub radius: f64,
    /// Thrust at full throttle at sea level, N. Scales linearly with the density ratio.
    pub max_thrust: f64,
    /// Ratio of the ideal induced power to the actual shaft power
    pub figure_of_merit: f64,
}

impl Rotor {
    /// Disk area, m^2
    pub fn disk_area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }

    /// Maximum thrust available at this density ratio, N
    pub fn available_thrust(&self, density_ratio: f64) -> f64 {
        self.max_thrust * density_ratio.max(0.0)
    }

    /// Shaft power, in W, to produce `thrust` with an inflow of `axial_speed` m/s along the thrust axis.
    ///
    /// Negative thrust is windmilling: the power is negative and only the axial flow is recovered.
    pub fn shaft_power(&self, thrust: f64, axial_speed: f64, density: f64) -> f64 {
        let axial = axial_speed.max(0.0);
        if thrust >= 0.0 {
            let induced = -0.5 * axial
                + (0.25 * axial * axial + thrust / (2.0 * density * self.disk_area())).sqrt();
            thrust * (axial + induced) / self.figure_of_merit
        } else {
            thrust * axial * self.figure_of_merit
        }
    }
}

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
use std::fmt;

mod atmosphere;
pub use atmosphere::{AtmosphereProperties, StandardAtmosphere};

/// An atmosphere provider returns the freestream properties at a geometric altitude.
///
/// Implementations must be pure functions of the altitude: the segments call them at every
/// collocation point, on every solver iteration.
pub trait Atmosphere: Send + Sync + fmt::Display {
    fn properties(&self, altitude_m: f64) -> AtmosphereProperties;
}

/// Gravity model of the body being flown over.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    /// Gravitational acceleration at sea level, in m/s^2
    pub sea_level_gravity: f64,
    /// Mean radius, in meters
    pub mean_radius: f64,
}

impl Planet {
    pub fn earth() -> Self {
        Self {
            sea_level_gravity: 9.80665,
            mean_radius: 6_371_000.0,
        }
    }

    /// Gravitational acceleration at the provided altitude, using the inverse square law.
    pub fn gravity(&self, altitude_m: f64) -> f64 {
        let ratio = self.mean_radius / (self.mean_radius + altitude_m);
        self.sea_level_gravity * ratio * ratio
    }
}

impl Default for Planet {
    fn default() -> Self {
        Self::earth()
    }
}

impl fmt::Display for Planet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "planet (g0 = {:.5} m/s^2, R = {:.1} km)",
            self.sea_level_gravity,
            self.mean_radius * 1e-3
        )
    }
}

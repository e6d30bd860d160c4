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

use super::Atmosphere;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Specific gas constant of dry air, J/(kg K)
const GAS_CONSTANT: f64 = 287.053_07;
/// Ratio of specific heats of air
const GAMMA: f64 = 1.4;
/// Gravity used in the definition of geopotential altitude, m/s^2
const G0: f64 = 9.80665;
/// Earth radius used by the US 1976 geopotential altitude conversion, m
const EARTH_RADIUS: f64 = 6_356_766.0;

/// Base geopotential altitude (m), base temperature (K), lapse rate (K/m), base pressure (Pa)
const LAYERS: [(f64, f64, f64, f64); 4] = [
    (0.0, 288.15, -0.0065, 101_325.0),
    (11_000.0, 216.65, 0.0, 22_632.06),
    (20_000.0, 216.65, 0.001, 5_474.889),
    (32_000.0, 228.65, 0.0028, 868.0187),
];
/// Geopotential altitude where the lower atmosphere model stops being valid
const CEILING: f64 = 47_000.0;

/// Freestream properties returned by an atmosphere provider.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereProperties {
    /// kg/m^3
    pub density: f64,
    /// Pa
    pub pressure: f64,
    /// K
    pub temperature: f64,
    /// m/s
    pub speed_of_sound: f64,
}

/// US 1976 standard atmosphere, up to 47 km geopotential, with an optional temperature offset.
///
/// Altitudes below sea level extrapolate the troposphere, and altitudes above the ceiling are
/// clamped to the ceiling values.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardAtmosphere {
    /// Temperature offset from the standard day, in Kelvin
    #[serde(default)]
    pub temperature_deviation: f64,
}

impl StandardAtmosphere {
    pub fn with_deviation(temperature_deviation: f64) -> Self {
        Self {
            temperature_deviation,
        }
    }

    /// Sea level standard density
    pub fn sea_level_density() -> f64 {
        LAYERS[0].3 / (GAS_CONSTANT * LAYERS[0].1)
    }
}

impl Atmosphere for StandardAtmosphere {
    fn properties(&self, altitude_m: f64) -> AtmosphereProperties {
        let geopotential = (EARTH_RADIUS * altitude_m / (EARTH_RADIUS + altitude_m)).min(CEILING);

        let (base_h, base_t, lapse, base_p) = LAYERS
            .iter()
            .rev()
            .find(|layer| geopotential >= layer.0)
            .copied()
            .unwrap_or(LAYERS[0]);

        let dh = geopotential - base_h;
        let std_temperature = base_t + lapse * dh;
        let pressure = if lapse.abs() > 0.0 {
            base_p * (std_temperature / base_t).powf(-G0 / (lapse * GAS_CONSTANT))
        } else {
            base_p * (-G0 * dh / (GAS_CONSTANT * base_t)).exp()
        };

        let temperature = std_temperature + self.temperature_deviation;
        AtmosphereProperties {
            density: pressure / (GAS_CONSTANT * temperature),
            pressure,
            temperature,
            speed_of_sound: (GAMMA * GAS_CONSTANT * temperature).sqrt(),
        }
    }
}

impl fmt::Display for StandardAtmosphere {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.temperature_deviation.abs() > 0.0 {
            write!(f, "US 1976 (ISA {:+.1} K)", self.temperature_deviation)
        } else {
            write!(f, "US 1976")
        }
    }
}

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

use super::battery::{evaluate_electric, ElectricNetwork};
use super::{
    energy_contribution, force_balance_contribution, Battery, Contribution, EnergyProvider,
    PropulsorGroup, Rotor,
};
use crate::linalg::DVector;
use crate::segments::{Segment, SegmentError};
use crate::state::{BoundaryState, State};
use crate::time::{Epoch, Unit};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Flat photovoltaic panel on the upper surface of the vehicle.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarPanel {
    /// m^2
    pub area: f64,
    /// Conversion efficiency, in [0, 1]
    pub efficiency: f64,
}

impl SolarPanel {
    /// Electrical power collected for this sun elevation, W
    pub fn power(&self, solar_flux: f64, sun_elevation_rad: f64) -> f64 {
        solar_flux * self.area * self.efficiency * sun_elevation_rad.sin().max(0.0)
    }
}

/// Sun elevation above the local horizon, in radians, at that geographic location and epoch.
///
/// Uses the cosine approximation of the solar declination and the mean solar time (no equation of time).
pub fn sun_elevation(latitude_deg: f64, longitude_deg: f64, epoch: Epoch) -> f64 {
    let (year, ..) = epoch.to_gregorian_utc();
    let new_year = Epoch::from_gregorian_utc_at_midnight(year, 1, 1);
    let days = (epoch - new_year).to_unit(Unit::Day);
    let day_of_year = days.floor() + 1.0;
    let utc_hour = days.fract() * 24.0;

    let declination =
        (-23.44_f64).to_radians() * (2.0 * std::f64::consts::PI * (day_of_year + 10.0) / 365.0).cos();
    let hour_angle = (15.0 * (utc_hour + longitude_deg / 15.0 - 12.0)).to_radians();
    let latitude = latitude_deg.to_radians();

    (latitude.sin() * declination.sin()
        + latitude.cos() * declination.cos() * hour_angle.cos())
    .clamp(-1.0, 1.0)
    .asin()
}

/// Battery-electric rotors with a solar panel recharging the battery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarNetwork {
    /// Propulsor arena
    pub rotors: Vec<Rotor>,
    pub groups: Vec<PropulsorGroup>,
    pub battery: Battery,
    pub motor_efficiency: f64,
    #[serde(default)]
    pub avionics_power: f64,
    pub panel: SolarPanel,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Solar flux at the panel for a sun at zenith, W/m^2
    pub solar_flux: f64,
}

impl EnergyProvider for SolarNetwork {
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
        let mut solar_power = DVector::zeros(state.rows());
        for i in 0..state.rows() {
            let epoch = state.epoch(i).ok_or_else(|| SegmentError::MissingEpoch {
                tag: segment.tag.clone(),
            })?;
            let elevation = sun_elevation(self.latitude_deg, self.longitude_deg, epoch);
            solar_power[i] = self.panel.power(self.solar_flux, elevation);
        }

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
            solar_power,
        )
    }
}

impl fmt::Display for SolarNetwork {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "solar network ({} rotors, {:.1} m^2 panel at {:.2} deg, {:.2} deg)",
            self.rotors.len(),
            self.panel.area,
            self.latitude_deg,
            self.longitude_deg
        )
    }
}

#[cfg(test)]
mod ut_solar {
    use super::*;

    #[test]
    fn sun_elevation_day_and_night() {
        // Summer solstice, local noon at Greenwich
        let noon = Epoch::from_gregorian_utc_hms(2024, 6, 21, 12, 0, 0);
        let elevation = sun_elevation(51.48, 0.0, noon).to_degrees();
        assert!((elevation - 61.9).abs() < 1.0, "elevation = {elevation}");

        let midnight = Epoch::from_gregorian_utc_hms(2024, 6, 21, 0, 0, 0);
        assert!(sun_elevation(51.48, 0.0, midnight) < 0.0);

        // Same local solar noon further west happens later in UTC
        let west = Epoch::from_gregorian_utc_hms(2024, 6, 21, 18, 0, 0);
        let elevation = sun_elevation(51.48, -90.0, west).to_degrees();
        assert!((elevation - 61.9).abs() < 1.0, "elevation = {elevation}");
    }

    #[test]
    fn panel_power() {
        let panel = SolarPanel {
            area: 10.0,
            efficiency: 0.2,
        };
        assert_eq!(panel.power(1000.0, -0.1), 0.0);
        assert!((panel.power(1000.0, std::f64::consts::FRAC_PI_2) - 2000.0).abs() < 1e-9);
    }
}

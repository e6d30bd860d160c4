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

use crate::energy::{EnergyNetwork, EnergyProvider};
use crate::environment::{Atmosphere, Planet, StandardAtmosphere};
use std::fmt;
use std::sync::Arc;

mod aero;
pub use aero::{AeroCoefficients, AeroModel, DragPolar};

/// Read-only description of the vehicle flown by a mission.
#[derive(Clone)]
pub struct Vehicle {
    pub tag: String,
    /// Mass at the start of the mission, kg
    pub mass: f64,
    /// Wing reference area, m^2
    pub reference_area: f64,
    pub aerodynamics: Arc<dyn AeroModel>,
    /// Energy network, which selects the energy provider of every segment
    pub network: EnergyNetwork,
}

impl Vehicle {
    pub fn new<S: Into<String>>(
        tag: S,
        mass: f64,
        reference_area: f64,
        aerodynamics: Arc<dyn AeroModel>,
        network: EnergyNetwork,
    ) -> Self {
        Self {
            tag: tag.into(),
            mass,
            reference_area,
            aerodynamics,
            network,
        }
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({:.1} kg, S = {:.2} m², {}, {})",
            self.tag, self.mass, self.reference_area, self.aerodynamics, self.network
        )
    }
}

/// The analyses bound to the segments: the vehicle, its aerodynamics and energy network, and the environment.
///
/// Segments borrow the analyses, they never own nor mutate them.
#[derive(Clone)]
pub struct Analyses {
    pub vehicle: Vehicle,
    pub atmosphere: Arc<dyn Atmosphere>,
    pub planet: Planet,
}

impl Analyses {
    /// Analyses of this vehicle flying in the US 1976 standard atmosphere over the Earth.
    pub fn standard(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            atmosphere: Arc::new(StandardAtmosphere::default()),
            planet: Planet::earth(),
        }
    }

    pub fn with_atmosphere(mut self, atmosphere: Arc<dyn Atmosphere>) -> Self {
        self.atmosphere = atmosphere;
        self
    }

    /// The energy provider selected by the vehicle configuration.
    pub fn energy(&self) -> &dyn EnergyProvider {
        &self.vehicle.network
    }
}

impl fmt::Display for Analyses {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} in {} over {}", self.vehicle, self.atmosphere, self.planet)
    }
}

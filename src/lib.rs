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

/*! # skyward

Mission segment solver: a flight trajectory is split into segments (climb, cruise,
descent, ground roll, hover, transition...). Each segment is discretized on spectral
collocation points, and the flight dynamics plus the bound energy network jointly
define a square nonlinear system which is driven to zero by a Newton-Raphson solver.
Converged segments are chained by the mission, threading altitude, mass, stored energy,
distance and elapsed time across segment boundaries.
*/

/// Spectral collocation points, differentiation and integration operators.
pub mod numerics;

/// The per-segment state container: typed condition namespaces and the solver unknowns.
pub mod state;

/// Atmosphere and planet models consumed by the segments.
pub mod environment;

/// Vehicle configuration and aerodynamic models.
pub mod vehicle;

/// Energy networks (turbofan, battery-electric rotors, solar-electric) which contribute
/// unknowns and residuals to every segment.
pub mod energy;

/// Segment taxonomy and the stage pipelines which evaluate the governing equations.
pub mod segments;

/// Newton-Raphson solver with finite differenced Jacobian.
pub mod solver;

/// Mission assembly, evaluation and results.
pub mod mission;

/// YAML configuration of vehicles and missions.
pub mod io;

mod errors;
/// Skyward will (almost) never panic and functions which may fail will return an error.
pub use self::errors::MissionError;

#[macro_use]
extern crate log;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export the commonly used types
pub mod prelude {
    pub use crate::energy::{
        Battery, BatteryRotorNetwork, EnergyNetwork, EnergyProvider, PropulsorGroup, Rotor,
        SolarNetwork, SolarPanel, ThrustAxis, Turbofan, TurbofanNetwork,
    };
    pub use crate::environment::{Atmosphere, Planet, StandardAtmosphere};
    pub use crate::mission::{Mission, MissionResults, SegmentStatus};
    pub use crate::numerics::{build_points, Discretization};
    pub use crate::segments::{Phase, Segment};
    pub use crate::solver::SolverConfig;
    pub use crate::state::{BoundaryState, State};
    pub use crate::vehicle::{AeroModel, Analyses, DragPolar, Vehicle};
    pub use crate::MissionError;
    pub use std::sync::Arc;
}

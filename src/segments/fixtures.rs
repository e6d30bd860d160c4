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

//! Vehicles shared by the unit tests of the segments.

use crate::energy::{Battery, BatteryRotorNetwork, EnergyNetwork, Rotor, Turbofan, TurbofanNetwork};
use crate::vehicle::{Analyses, DragPolar, Vehicle};
use std::sync::Arc;

/// Twin turbofan narrow body airliner
pub(crate) fn jet() -> Analyses {
    let polar = DragPolar::builder()
        .cl0(0.2)
        .cl_alpha(5.5)
        .cd0(0.02)
        .induced_factor(0.045)
        .build();
    let engine = Turbofan {
        sea_level_thrust: 120_000.0,
        lapse_exponent: 0.75,
        tsfc: 1.6e-5,
        tsfc_mach_slope: 0.0,
    };
    Analyses::standard(Vehicle::new(
        "narrow body",
        79_015.0,
        124.862,
        Arc::new(polar),
        EnergyNetwork::Turbofan(TurbofanNetwork::identical(engine, 2)),
    ))
}

/// Battery powered hexacopter
pub(crate) fn multicopter() -> Analyses {
    let polar = DragPolar::builder()
        .cl_alpha(0.1)
        .cd0(0.05)
        .induced_factor(0.0)
        .build();
    let rotor = Rotor {
        radius: 1.5,
        max_thrust: 6_000.0,
        figure_of_merit: 0.75,
    };
    let battery = Battery {
        max_energy: 540e6,
        initial_state_of_charge: 0.89,
        nominal_voltage: 800.0,
        internal_resistance: 0.05,
    };
    Analyses::standard(Vehicle::new(
        "hexacopter",
        2_200.0,
        4.0,
        Arc::new(polar),
        EnergyNetwork::BatteryRotor(BatteryRotorNetwork::multicopter(rotor, 6, battery, 0.95)),
    ))
}

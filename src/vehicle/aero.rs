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
use typed_builder::TypedBuilder;

/// Lift and drag coefficients, in the wind frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AeroCoefficients {
    pub lift: f64,
    pub drag: f64,
}

/// An aerodynamics provider returns the force coefficients of the vehicle for a flight condition.
///
/// It is called once per collocation point on every residual evaluation, and must be pure.
pub trait AeroModel: Send + Sync + fmt::Display {
    /// Coefficients at the provided angle of attack (radians) and Mach number.
    fn coefficients(&self, angle_of_attack: f64, mach: f64) -> AeroCoefficients;
}

/// Linear lift curve with a parabolic drag polar and a quartic drag rise past the critical Mach.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct DragPolar {
    /// Lift coefficient at zero angle of attack
    #[builder(default = 0.0)]
    #[serde(default)]
    pub cl0: f64,
    /// Lift curve slope, per radian
    pub cl_alpha: f64,
    /// Maximum lift coefficient, the lift curve is clipped at +/- this value
    #[builder(default = 1.5)]
    #[serde(default = "default_cl_max")]
    pub cl_max: f64,
    /// Zero lift drag coefficient
    pub cd0: f64,
    /// Induced drag factor, 1 / (pi e AR)
    pub induced_factor: f64,
    /// Mach number past which compressibility drag rises
    #[builder(default = 0.8)]
    #[serde(default = "default_critical_mach")]
    pub critical_mach: f64,
}

fn default_cl_max() -> f64 {
    1.5
}

fn default_critical_mach() -> f64 {
    0.8
}

impl AeroModel for DragPolar {
    fn coefficients(&self, angle_of_attack: f64, mach: f64) -> AeroCoefficients {
        let lift = (self.cl0 + self.cl_alpha * angle_of_attack).clamp(-self.cl_max, self.cl_max);
        let wave = if mach > self.critical_mach {
            20.0 * (mach - self.critical_mach).powi(4)
        } else {
            0.0
        };
        AeroCoefficients {
            lift,
            drag: self.cd0 + self.induced_factor * lift * lift + wave,
        }
    }
}

impl fmt::Display for DragPolar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "drag polar CL = {:.3} + {:.3} α (|CL| ≤ {:.2}), CD = {:.4} + {:.4} CL²",
            self.cl0, self.cl_alpha, self.cl_max, self.cd0, self.induced_factor
        )
    }
}

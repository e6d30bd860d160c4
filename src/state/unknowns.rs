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

use crate::linalg::DVector;
use std::fmt;

/// A named array of free scalars adjusted by the solver, one per collocation point or a single scalar.
#[derive(Clone, Debug, PartialEq)]
pub struct Unknown {
    pub name: String,
    /// Current values, in physical units
    pub values: DVector<f64>,
    /// Representative magnitude used to normalize this unknown in the solver
    pub scale: f64,
    /// Admissible range of the converged values
    pub bounds: Option<(f64, f64)>,
}

impl Unknown {
    pub fn new<S: Into<String>>(name: S, values: DVector<f64>, scale: f64) -> Self {
        Self {
            name: name.into(),
            values,
            scale,
            bounds: None,
        }
    }

    /// Builds an unknown with one value per point, all set to the initial guess
    pub fn per_point<S: Into<String>>(name: S, n: usize, guess: f64, scale: f64) -> Self {
        Self::new(name, DVector::from_element(n, guess), scale)
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some((min, max));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the first value which lies outside of the bounds, if any.
    pub fn violation(&self, tolerance: f64) -> Option<f64> {
        let (min, max) = self.bounds?;
        self.values
            .iter()
            .copied()
            .find(|v| *v < min - tolerance || *v > max + tolerance)
    }
}

/// Ordered map of unknowns. The order is the order in which they are stacked in the solver vector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Unknowns {
    entries: Vec<Unknown>,
}

impl Unknowns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an unknown, replacing any unknown of the same name in place.
    pub fn insert(&mut self, unknown: Unknown) {
        match self.entries.iter_mut().find(|u| u.name == unknown.name) {
            Some(existing) => *existing = unknown,
            None => self.entries.push(unknown),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DVector<f64>> {
        self.entries
            .iter()
            .find(|u| u.name == name)
            .map(|u| &u.values)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|u| u.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unknown> {
        self.entries.iter()
    }

    /// Number of named unknowns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of scalars across all unknowns
    pub fn size(&self) -> usize {
        self.entries.iter().map(Unknown::len).sum()
    }

    /// Stacks the unknowns, divided by their scale, into the solver vector.
    pub fn flatten(&self) -> DVector<f64> {
        let mut x = DVector::zeros(self.size());
        let mut offset = 0;
        for unknown in &self.entries {
            for (i, v) in unknown.values.iter().enumerate() {
                x[offset + i] = v / unknown.scale;
            }
            offset += unknown.len();
        }
        x
    }

    /// Unpacks the scaled solver vector into the named unknowns.
    pub fn unflatten(&mut self, x: &DVector<f64>) {
        let mut offset = 0;
        for unknown in &mut self.entries {
            for i in 0..unknown.values.len() {
                unknown.values[i] = x[offset + i] * unknown.scale;
            }
            offset += unknown.values.len();
        }
    }

    /// Label of each scalar of the solver vector, e.g. `throttle_main[3]`.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|u| (0..u.len()).map(move |i| format!("{}[{i}]", u.name)))
            .collect()
    }
}

impl fmt::Display for Unknowns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<String> = self
            .entries
            .iter()
            .map(|u| format!("{} ({})", u.name, u.len()))
            .collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod ut_unknowns {
    use super::*;

    #[test]
    fn flatten_is_scaled_and_ordered() {
        let mut unknowns = Unknowns::new();
        unknowns.insert(Unknown::per_point("body_angle", 3, 0.05, 1.0));
        unknowns.insert(Unknown::new(
            "elapsed_time",
            DVector::from_element(1, 30.0),
            10.0,
        ));
        assert_eq!(unknowns.size(), 4);
        let x = unknowns.flatten();
        assert_eq!(x.as_slice(), &[0.05, 0.05, 0.05, 3.0]);
        assert_eq!(unknowns.labels()[3], "elapsed_time[0]");

        let mut moved = x.clone();
        moved[3] = 4.0;
        unknowns.unflatten(&moved);
        assert_eq!(unknowns.get("elapsed_time").unwrap()[0], 40.0);
    }

    #[test]
    fn insert_replaces() {
        let mut unknowns = Unknowns::new();
        unknowns.insert(Unknown::per_point("throttle_main", 4, 0.5, 1.0));
        unknowns.insert(Unknown::per_point("throttle_main", 4, 0.7, 1.0));
        assert_eq!(unknowns.len(), 1);
        assert_eq!(unknowns.get("throttle_main").unwrap()[0], 0.7);
    }

    #[test]
    fn bounds() {
        let throttle = Unknown::per_point("throttle_main", 2, 1.2, 1.0).with_bounds(0.0, 1.0);
        assert_eq!(throttle.violation(1e-9), Some(1.2));
        let throttle = Unknown::per_point("throttle_main", 2, 0.2, 1.0).with_bounds(0.0, 1.0);
        assert_eq!(throttle.violation(1e-9), None);
    }
}

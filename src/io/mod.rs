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

use crate::energy::EnergyNetwork;
use crate::errors::ConfigSnafu;
use crate::environment::{Planet, StandardAtmosphere};
use crate::mission::Mission;
use crate::segments::{Phase, Segment, DEFAULT_POINTS};
use crate::solver::SolverConfig;
use crate::state::BoundaryState;
use crate::time::{Duration, Epoch};
use crate::vehicle::{Analyses, DragPolar, Vehicle};
use crate::MissionError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read configuration file: {source}"))]
    ReadError { source: io::Error },
    #[snafu(display("failed to parse YAML configuration: {source}"))]
    ParseError { source: serde_yaml::Error },
    #[snafu(display("invalid configuration: {msg}"))]
    InvalidConfig { msg: String },
}

impl PartialEq for ConfigError {
    /// No two configuration errors match
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

pub trait ConfigRepr: Debug + Sized + Serialize + DeserializeOwned {
    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        serde_yaml::from_reader(BufReader::new(file)).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided path to a yaml
    fn load_many<P>(path: P) -> Result<Vec<Self>, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        serde_yaml::from_reader(BufReader::new(file)).context(ParseSnafu)
    }

    /// Builds a map of names to "selves" from the provided path to a yaml
    fn load_named<P>(path: P) -> Result<BTreeMap<String, Self>, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        serde_yaml::from_reader(BufReader::new(file)).context(ParseSnafu)
    }

    /// Builds "Self" from the provided string of a yaml
    fn loads(data: &str) -> Result<Self, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided string of a yaml
    fn loads_many(data: &str) -> Result<Vec<Self>, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }

    /// Serializes self into a YAML string
    fn dumps(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).context(ParseSnafu)
    }
}

pub(crate) fn duration_to_str<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{duration}"))
}

/// A deserializer from Duration string
pub(crate) fn duration_from_str<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Duration::from_str(&s).map_err(serde::de::Error::custom)
}

pub(crate) fn maybe_epoch_to_str<S>(epoch: &Option<Epoch>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match epoch {
        Some(epoch) => serializer.serialize_some(&format!("{epoch}")),
        None => serializer.serialize_none(),
    }
}

/// A deserializer from an optional Epoch string
pub(crate) fn maybe_epoch_from_str<'de, D>(deserializer: D) -> Result<Option<Epoch>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => Epoch::from_str(&s).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Serializable vehicle, flying through the standard atmosphere with a drag polar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleSerde {
    pub tag: String,
    /// kg
    pub mass: f64,
    /// m^2
    pub reference_area: f64,
    pub aerodynamics: DragPolar,
    pub network: EnergyNetwork,
    #[serde(default)]
    pub atmosphere: StandardAtmosphere,
    #[serde(default)]
    pub planet: Planet,
}

impl ConfigRepr for VehicleSerde {}

impl VehicleSerde {
    /// Builds the analyses of this vehicle, checking its configuration.
    pub fn to_analyses(&self) -> Result<Analyses, ConfigError> {
        let invalid = |msg: String| -> Result<Analyses, ConfigError> {
            error!("vehicle {}: {msg}", self.tag);
            Err(ConfigError::InvalidConfig { msg })
        };
        if self.mass <= 0.0 || self.reference_area <= 0.0 {
            return invalid(format!(
                "mass ({} kg) and reference area ({} m^2) must be positive",
                self.mass, self.reference_area
            ));
        }
        let groups = match &self.network {
            EnergyNetwork::Turbofan(network) => (&network.groups, network.engines.len()),
            EnergyNetwork::BatteryRotor(network) => (&network.groups, network.rotors.len()),
            EnergyNetwork::Solar(network) => (&network.groups, network.rotors.len()),
        };
        for group in groups.0 {
            if let Some(index) = group.members.iter().find(|index| **index >= groups.1) {
                return invalid(format!(
                    "group {} references propulsor #{index} but there are only {}",
                    group.tag, groups.1
                ));
            }
        }

        let vehicle = Vehicle::new(
            self.tag.clone(),
            self.mass,
            self.reference_area,
            Arc::new(self.aerodynamics),
            self.network.clone(),
        );
        Ok(Analyses {
            vehicle,
            atmosphere: Arc::new(self.atmosphere),
            planet: self.planet,
        })
    }
}

/// Serializable segment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentSerde {
    pub tag: String,
    pub phase: Phase,
    #[serde(default)]
    pub points: Option<usize>,
    /// Prescribed throttle by propulsor group
    #[serde(default)]
    pub throttles: BTreeMap<String, f64>,
    #[serde(default)]
    pub state_of_charge: Option<f64>,
}

/// Serializable mission
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissionSerde {
    pub tag: String,
    #[serde(
        default,
        serialize_with = "maybe_epoch_to_str",
        deserialize_with = "maybe_epoch_from_str"
    )]
    pub start_epoch: Option<Epoch>,
    /// Defaults to sea level, at rest, with the vehicle mass and its initial state of charge
    #[serde(default)]
    pub initial: Option<BoundaryState>,
    #[serde(default)]
    pub solver: Option<SolverConfig>,
    pub segments: Vec<SegmentSerde>,
}

impl ConfigRepr for MissionSerde {}

impl MissionSerde {
    /// Builds the mission flown by the vehicle of these analyses.
    pub fn into_mission(self, analyses: &Analyses) -> Result<Mission<'_>, ConfigError> {
        let mut mission = Mission::new(self.tag.clone(), analyses);
        if let Some(initial) = self.initial {
            mission = mission.with_initial_state(initial);
        }
        if let Some(epoch) = self.start_epoch {
            mission = mission.with_start_epoch(epoch);
        }

        for cfg in self.segments {
            let points = cfg.points.unwrap_or(DEFAULT_POINTS);
            if points == 0 {
                let msg = format!("segment {} needs at least one point", cfg.tag);
                error!("{msg}");
                return Err(ConfigError::InvalidConfig { msg });
            }
            let mut segment = Segment::new(cfg.tag, cfg.phase, analyses).with_points(points);
            for (group, throttle) in cfg.throttles {
                segment = segment.with_throttle(group, throttle);
            }
            if let Some(soc) = cfg.state_of_charge {
                segment = segment.with_state_of_charge(soc);
            }
            if let Some(solver) = self.solver {
                segment = segment.with_solver(solver);
            }
            mission.append_segment(segment);
        }
        Ok(mission)
    }

    /// Serializable representation of this mission.
    pub fn from_mission(mission: &Mission) -> Self {
        Self {
            tag: mission.tag.clone(),
            start_epoch: mission.start_epoch,
            initial: Some(mission.initial),
            solver: mission.segments.first().map(|s| s.solver),
            segments: mission
                .segments
                .iter()
                .map(|s| SegmentSerde {
                    tag: s.tag.clone(),
                    phase: s.phase,
                    points: Some(s.points),
                    throttles: s.prescribed_throttles.iter().cloned().collect(),
                    state_of_charge: s.state_of_charge_override,
                })
                .collect(),
        }
    }
}

/// Loads the mission from the provided YAML file, to be flown by the vehicle of these analyses.
pub fn load_mission<P: AsRef<Path>>(
    path: P,
    analyses: &Analyses,
) -> Result<Mission<'_>, MissionError> {
    MissionSerde::load(path)
        .and_then(|cfg| cfg.into_mission(analyses))
        .context(ConfigSnafu)
}

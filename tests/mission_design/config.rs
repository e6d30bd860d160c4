use approx::assert_relative_eq;
use rstest::*;
use skyward::io::{load_mission, ConfigRepr, MissionSerde, VehicleSerde};
use skyward::prelude::*;
use std::path::PathBuf;

const AIRLINER: &str = r#"
tag: narrow body
mass: 79015.0
reference_area: 124.862
aerodynamics:
  cl0: 0.2
  cl_alpha: 5.5
  cd0: 0.02
  induced_factor: 0.045
network:
  type: Turbofan
  engines:
    - sea_level_thrust: 120000.0
      lapse_exponent: 0.75
      tsfc: 1.6e-5
      tsfc_mach_slope: 0.0
    - sea_level_thrust: 120000.0
      lapse_exponent: 0.75
      tsfc: 1.6e-5
      tsfc_mach_slope: 0.0
  groups:
    - tag: engines
      members: [0, 1]
      axis: BodyX
"#;

const MISSION: &str = r#"
tag: short hop
solver:
  tolerance: 1.0e-9
  max_iterations: 30
segments:
  - tag: climb
    points: 12
    phase:
      type: ClimbConstantSpeedConstantRate
      altitude_start: 0.0
      altitude_end: 3000.0
      airspeed: 150.0
      climb_rate: 10.0
  - tag: cruise
    phase:
      type: CruiseConstantSpeedConstantAltitude
      distance: 100000.0
  - tag: descent
    phase:
      type: DescentConstantSpeedConstantRate
      altitude_end: 500.0
      descent_rate: 5.0
"#;

#[fixture]
fn analyses() -> Analyses {
    VehicleSerde::loads(AIRLINER).unwrap().to_analyses().unwrap()
}

#[rstest]
fn configured_vehicle(analyses: Analyses) {
    // Same vehicle as the one built in code
    let jet = crate::airliner();
    assert_eq!(analyses.vehicle.network, jet.vehicle.network);
    assert_eq!(analyses.vehicle.mass, jet.vehicle.mass);
}

#[rstest]
fn mission_from_file(analyses: Analyses) {
    let _ = pretty_env_logger::try_init();

    let path: PathBuf = std::env::temp_dir().join("skyward_mission_from_file.yaml");
    std::fs::write(&path, MISSION).unwrap();
    let mut mission = load_mission(&path, &analyses).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(mission.segments.len(), 3);
    assert_eq!(mission.segments[0].points, 12);
    assert_eq!(mission.segments[2].solver.max_iterations, 30);
    // Unspecified solver settings keep their defaults
    assert_eq!(mission.segments[2].solver.max_step, SolverConfig::default().max_step);

    let results = mission.evaluate().unwrap();
    println!("{results}");
    let terminal = results.terminal().unwrap();
    assert_relative_eq!(terminal.altitude, 500.0, max_relative = 1e-12);
    assert_relative_eq!(
        results.elapsed_time(),
        300.0 + 100_000.0 / 150.0 + 500.0,
        max_relative = 1e-9
    );

    // The configuration of a mission survives a round trip
    let cfg = MissionSerde::from_mission(&mission);
    let reloaded = MissionSerde::loads(&cfg.dumps().unwrap()).unwrap();
    assert_eq!(reloaded, cfg);
}

#[rstest]
fn missing_file(analyses: Analyses) {
    let path = std::env::temp_dir().join("skyward_does_not_exist.yaml");
    assert!(matches!(
        load_mission(path, &analyses),
        Err(MissionError::Config { .. })
    ));
}

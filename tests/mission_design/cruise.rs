use approx::assert_relative_eq;
use rstest::*;
use skyward::energy::TurbofanNetwork;
use skyward::mission::SegmentStatus;
use skyward::prelude::*;
use skyward::segments::CruiseConstantSpeedConstantAltitude;

#[fixture]
fn jet() -> Analyses {
    crate::airliner()
}

fn cruise(altitude: f64, airspeed: f64, distance: f64) -> Phase {
    Phase::CruiseConstantSpeedConstantAltitude(
        CruiseConstantSpeedConstantAltitude::builder()
            .altitude(altitude)
            .airspeed(airspeed)
            .distance(distance)
            .build(),
    )
}

#[rstest]
fn long_range_cruise(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    // 1000 nmi at FL350
    let mut mission = Mission::new("long range", &jet).with_segment(Segment::new(
        "cruise",
        cruise(10_668.0, 230.412, 1_852_000.0),
        &jet,
    ));
    let results = mission.evaluate().unwrap();
    println!("{results}");
    assert_eq!(mission.status(), SegmentStatus::Converged);

    let segment = results.segment("cruise").unwrap();
    let conditions = &segment.state.conditions;
    let weight = jet.vehicle.mass * jet.planet.sea_level_gravity;
    for i in 0..segment.state.rows() {
        let throttle = conditions.propulsion.throttle[(i, 0)];
        assert!(throttle > 0.0 && throttle < 1.0, "throttle #{i} = {throttle}");
        // Forces balance at every point
        assert!(conditions.frames.total_force.row(i).norm() < 1e-5 * weight);
        assert_relative_eq!(conditions.freestream.airspeed[i], 230.412, max_relative = 1e-9);
        assert_relative_eq!(conditions.freestream.altitude[i], 10_668.0, max_relative = 1e-9);
    }
    assert!(segment.residual_norm < 1e-8);

    let terminal = results.terminal().unwrap();
    assert_relative_eq!(terminal.distance, 1_852_000.0, max_relative = 1e-6);
    assert_relative_eq!(results.elapsed_time(), 1_852_000.0 / 230.412, max_relative = 1e-6);

    // Fuel is burned all along
    let masses = results.mass_history();
    assert_eq!(masses[0], jet.vehicle.mass);
    for pair in masses.windows(2) {
        assert!(pair[1] < pair[0]);
    }
    assert!(results.state_of_charge_history().is_none());
    assert!(results.throttle_history(0).is_some());
    assert!(results.throttle_history(1).is_none());
}

#[rstest]
fn trim_point(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    let mut mission = Mission::new("trim", &jet).with_segment(
        Segment::new("trim", cruise(10_668.0, 230.412, 10_000.0), &jet).with_points(1),
    );
    let results = mission.evaluate().unwrap();
    let state = &results.segments[0].state;
    assert_eq!(state.rows(), 1);
    let throttle = state.conditions.propulsion.throttle[(0, 0)];
    assert!(throttle > 0.0 && throttle < 1.0);
}

#[rstest]
fn export_trajectory(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    let mut mission = Mission::new("export", &jet)
        .with_segment(Segment::new("first", cruise(10_668.0, 230.412, 500_000.0), &jet).with_points(8))
        .with_segment(Segment::new("second", cruise(10_668.0, 230.412, 500_000.0), &jet).with_points(8));
    let results = mission.evaluate().unwrap();

    let trajectory = results.trajectory();
    assert_eq!(trajectory.len(), 16);
    // Boundary points are repeated
    assert_eq!(trajectory.points[7].time, trajectory.points[8].time);
    assert_eq!(trajectory.points[7].mass, trajectory.points[8].mass);
    assert_eq!(trajectory.points[8].segment, "second");

    let path = std::env::temp_dir().join("skyward_export_trajectory.csv");
    trajectory.to_csv(&path).unwrap();
    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[0], "segment");
    assert!(headers.iter().any(|h| h == "throttle"));
    assert_eq!(rdr.records().count(), 16);
    std::fs::remove_file(&path).unwrap();
}

#[rstest]
fn no_propulsors(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    let mut glider = jet.clone();
    glider.vehicle.network = EnergyNetwork::Turbofan(TurbofanNetwork {
        engines: Vec::new(),
        groups: Vec::new(),
    });

    let mut mission = Mission::new("glider", &glider).with_segment(Segment::new(
        "cruise",
        cruise(3_000.0, 150.0, 10_000.0),
        &glider,
    ));
    match mission.evaluate() {
        Err(MissionError::SegmentFailed { index, source, .. }) => {
            assert_eq!(index, 0);
            assert!(source.is_malformed());
        }
        other => panic!("expected a malformed segment, got {other:?}"),
    }
    assert_eq!(mission.statuses(), &[SegmentStatus::Failed]);
}

#[rstest]
fn empty_mission(jet: Analyses) {
    let mut mission = Mission::new("empty", &jet);
    assert!(matches!(
        mission.evaluate(),
        Err(MissionError::EmptyMission { .. })
    ));
}

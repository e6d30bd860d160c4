use approx::assert_relative_eq;
use rstest::*;
use skyward::mission::SegmentStatus;
use skyward::prelude::*;
use skyward::segments::{
    ClimbConstantSpeedConstantRate, ClimbLinearSpeedConstantRate, CruiseConstantSpeedConstantAltitude,
    DescentLinearMachConstantRate, Hover, LandingRoll, SegmentError, TakeoffRoll,
};
use skyward::time::Unit;

#[fixture]
fn jet() -> Analyses {
    crate::airliner()
}

fn climb(altitude_end: f64, airspeed: f64, climb_rate: f64) -> Phase {
    Phase::ClimbConstantSpeedConstantRate(
        ClimbConstantSpeedConstantRate::builder()
            .altitude_start(0.0)
            .altitude_end(altitude_end)
            .airspeed(airspeed)
            .climb_rate(climb_rate)
            .build(),
    )
}

fn cruise(altitude: f64) -> Phase {
    Phase::CruiseConstantSpeedConstantAltitude(
        CruiseConstantSpeedConstantAltitude::builder()
            .altitude(altitude)
            .distance(100_000.0)
            .build(),
    )
}

#[rstest]
fn climb_then_cruise(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    let mut mission = Mission::new("climb and cruise", &jet)
        .with_segment(Segment::new("climb", climb(3_000.0, 150.0, 10.0), &jet))
        .with_segment(Segment::new("cruise", cruise(3_000.0), &jet));
    mission.check_continuity().unwrap();
    let results = mission.evaluate().unwrap();
    println!("{results}");
    assert_eq!(
        mission.statuses(),
        &[SegmentStatus::Converged, SegmentStatus::Converged]
    );

    let climb = &results.segments[0].state;
    assert_relative_eq!(climb.duration, 300.0, max_relative = 1e-12);
    assert_relative_eq!(climb.terminal().altitude, 3_000.0, max_relative = 1e-12);
    for i in 0..climb.rows() {
        assert_relative_eq!(climb.conditions.freestream.airspeed[i], 150.0, max_relative = 1e-9);
        assert_relative_eq!(climb.conditions.frames.velocity[(i, 2)], 10.0, max_relative = 1e-9);
        let throttle = climb.conditions.propulsion.throttle[(i, 0)];
        assert!(throttle > 0.0 && throttle <= 1.0);
    }

    // The terminal state of the climb is the initial state of the cruise
    let end = climb.terminal();
    let start = results.segments[1].state.initial();
    assert_eq!(end.time, start.time);
    assert_eq!(end.distance, start.distance);
    assert_eq!(end.altitude, start.altitude);
    assert_eq!(end.mass, start.mass);
    // The cruise airspeed defaults to the climb airspeed
    assert_relative_eq!(start.airspeed(), 150.0, max_relative = 1e-9);

    // Fuel and time are accumulated over the whole mission
    let summaries = results.summaries();
    let burnt = summaries.iter().map(|s| s.mass_change).sum::<f64>();
    assert!(burnt < 0.0);
    assert_relative_eq!(
        results.terminal().unwrap().mass,
        jet.vehicle.mass + burnt,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        results.elapsed_time(),
        300.0 + 100_000.0 / 150.0,
        max_relative = 1e-9
    );
}

#[rstest]
fn altitude_discontinuity(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    let mut mission = Mission::new("discontinuous", &jet)
        .with_segment(Segment::new("climb", climb(3_000.0, 150.0, 10.0), &jet))
        .with_segment(Segment::new("cruise", cruise(3_000.5), &jet));

    match mission.check_continuity() {
        Err(MissionError::Continuity {
            index,
            quantity,
            previous,
            next,
            ..
        }) => {
            assert_eq!(index, 1);
            assert_eq!(quantity, "altitude");
            assert_eq!(previous, 3_000.0);
            assert_eq!(next, 3_000.5);
        }
        other => panic!("expected a discontinuity, got {other:?}"),
    }
    let err = mission.evaluate().unwrap_err();
    assert_eq!(err.segment_index(), Some(1));
    assert!(!err.is_infeasible());
    // Nothing was solved, the cruise is failed
    assert_eq!(
        mission.statuses(),
        &[SegmentStatus::Pending, SegmentStatus::Failed]
    );
    assert_eq!(mission.status(), SegmentStatus::Failed);
}

#[rstest]
fn infeasible_climb(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    // Faster vertically than along the path
    let mut mission = Mission::new("rocket", &jet)
        .with_segment(Segment::new("climb", climb(3_000.0, 150.0, 200.0), &jet));
    let err = mission.evaluate().unwrap_err();
    assert!(err.is_infeasible(), "{err}");
    assert_eq!(err.segment_index(), Some(0));
    assert_eq!(mission.status(), SegmentStatus::Failed);
}

#[rstest]
fn takeoff_roll(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    let roll = TakeoffRoll::builder().velocity_end(75.0).build();
    let mut mission = Mission::new("takeoff", &jet)
        .with_segment(Segment::new("roll", Phase::TakeoffRoll(roll), &jet));
    let results = mission.evaluate().unwrap();
    println!("{results}");

    let terminal = results.terminal().unwrap();
    assert_relative_eq!(terminal.velocity_x, 75.0, max_relative = 1e-6);
    assert_eq!(terminal.altitude, 0.0);
    let elapsed = results.elapsed_time();
    assert!(elapsed > 15.0 && elapsed < 60.0, "takeoff roll lasted {elapsed} s");
    assert!(terminal.distance > 0.0);

    // Full throttle all along
    for throttle in results.throttle_history(0).unwrap() {
        assert_eq!(throttle, 1.0);
    }
}

#[rstest]
fn accelerate_then_slow_down(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    let climb = ClimbLinearSpeedConstantRate::builder()
        .altitude_start(0.0)
        .altitude_end(3_000.0)
        .airspeed_start(100.0)
        .airspeed_end(150.0)
        .climb_rate(10.0)
        .build();
    let descent = DescentLinearMachConstantRate::builder()
        .altitude_end(1_000.0)
        .mach_end(0.35)
        .descent_rate(5.0)
        .build();
    let mut mission = Mission::new("up and down", &jet)
        .with_segment(Segment::new("climb", Phase::ClimbLinearSpeedConstantRate(climb), &jet))
        .with_segment(Segment::new("descent", Phase::DescentLinearMachConstantRate(descent), &jet));
    let results = mission.evaluate().unwrap();
    println!("{results}");

    let climb = &results.segments[0].state;
    assert_relative_eq!(climb.duration, 300.0, max_relative = 1e-12);
    assert_relative_eq!(climb.conditions.freestream.airspeed[0], 100.0, max_relative = 1e-9);
    assert_relative_eq!(climb.terminal().airspeed(), 150.0, max_relative = 1e-9);

    // The descent starts at the Mach number left by the climb
    let descent = &results.segments[1].state;
    let mach = &descent.conditions.freestream.mach;
    assert_relative_eq!(
        mach[0],
        150.0 / jet.atmosphere.properties(3_000.0).speed_of_sound,
        max_relative = 1e-9
    );
    assert_relative_eq!(mach[mach.len() - 1], 0.35, max_relative = 1e-9);
    assert_relative_eq!(descent.duration, 400.0, max_relative = 1e-12);
    assert_relative_eq!(descent.terminal().altitude, 1_000.0, epsilon = 1e-9);
    for throttle in results.throttle_history(0).unwrap() {
        assert!(throttle > 0.0 && throttle <= 1.0);
    }
    assert_relative_eq!(results.elapsed_time(), 700.0, max_relative = 1e-9);
}

#[rstest]
fn landing_roll(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    let roll = LandingRoll::builder().velocity_start(70.0).build();
    let mut mission = Mission::new("landing", &jet)
        .with_segment(Segment::new("roll", Phase::LandingRoll(roll), &jet));
    let results = mission.evaluate().unwrap();
    println!("{results}");

    let terminal = results.terminal().unwrap();
    assert_relative_eq!(terminal.velocity_x, 0.0, epsilon = 1e-6);
    // Braking at 0.4 g, helped by the drag and hindered by the lift
    let elapsed = results.elapsed_time();
    assert!(elapsed > 15.0 && elapsed < 22.0, "landing roll lasted {elapsed} s");
    assert!(terminal.distance > 0.0 && terminal.distance < 70.0 * elapsed);
    for throttle in results.throttle_history(0).unwrap() {
        assert_eq!(throttle, 0.0);
    }
}

#[rstest]
fn jet_cannot_hover(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    let hover = Hover::builder()
        .altitude(100.0)
        .duration(30 * Unit::Second)
        .build();
    let mut mission = Mission::new("harrier", &jet)
        .with_segment(Segment::new("hover", Phase::Hover(hover), &jet).with_points(4));
    match mission.evaluate() {
        Err(MissionError::SegmentFailed { source, .. }) => {
            assert!(source.is_singular(), "{source}");
            assert!(!source.is_convergence_failure());
            // Thrust along the body x axis cannot carry the weight
            assert!(source.to_string().contains("throttle_engines[0]"), "{source}");
            assert!(matches!(source, SegmentError::Solve { .. }));
        }
        other => panic!("expected a singular Jacobian, got {other:?}"),
    }
    assert_eq!(mission.status(), SegmentStatus::Failed);
}

use approx::assert_relative_eq;
use rstest::*;
use skyward::prelude::*;
use skyward::segments::{
    CruiseConstantSpeedConstantAltitude, DescentConstantSpeedConstantRate, SegmentError,
};

/// The hexacopter with two small pusher propellers
#[fixture]
fn compound() -> Analyses {
    let mut analyses = crate::hexacopter();
    let network = match &analyses.vehicle.network {
        EnergyNetwork::BatteryRotor(network) => network.clone(),
        other => panic!("unexpected network {other:?}"),
    };
    let pusher = Rotor {
        radius: 0.6,
        max_thrust: 1_500.0,
        figure_of_merit: 0.7,
    };
    analyses.vehicle.network =
        EnergyNetwork::BatteryRotor(network.with_group("pusher", pusher, 2, ThrustAxis::BodyX));
    analyses
}

/// Electric motor glider whose propeller can windmill
fn motor_glider(regenerative: bool) -> Analyses {
    let polar = DragPolar::builder()
        .cl0(0.2)
        .cl_alpha(5.5)
        .cd0(0.03)
        .induced_factor(0.05)
        .build();
    let propeller = Rotor {
        radius: 0.9,
        max_thrust: 1_500.0,
        figure_of_merit: 0.75,
    };
    let battery = Battery {
        max_energy: 20e6,
        initial_state_of_charge: 0.5,
        nominal_voltage: 400.0,
        internal_resistance: 0.02,
    };
    let mut group = PropulsorGroup::new("propeller", vec![0, 1], ThrustAxis::BodyX);
    group.regenerative = regenerative;
    let network = BatteryRotorNetwork {
        rotors: vec![propeller; 2],
        groups: vec![group],
        battery,
        motor_efficiency: 0.92,
        avionics_power: 0.0,
    };
    Analyses::standard(Vehicle::new(
        "motor glider",
        1_000.0,
        15.0,
        Arc::new(polar),
        EnergyNetwork::BatteryRotor(network),
    ))
}

fn steep_descent() -> Phase {
    Phase::DescentConstantSpeedConstantRate(
        DescentConstantSpeedConstantRate::builder()
            .altitude_start(1_500.0)
            .altitude_end(500.0)
            .airspeed(50.0)
            .descent_rate(8.0)
            .build(),
    )
}

#[rstest]
fn battery_cruise(compound: Analyses) {
    let _ = pretty_env_logger::try_init();

    let cruise = CruiseConstantSpeedConstantAltitude::builder()
        .altitude(30.0)
        .airspeed(25.0)
        .distance(12_000.0)
        .build();
    let mut mission = Mission::new("commute", &compound).with_segment(
        Segment::new("cruise", Phase::CruiseConstantSpeedConstantAltitude(cruise), &compound)
            .with_throttle("pusher", 0.02)
            .with_state_of_charge(0.95),
    );
    let results = mission.evaluate().unwrap();
    println!("{results}");

    assert_relative_eq!(results.elapsed_time(), 480.0, max_relative = 1e-9);
    let soc = results.state_of_charge_history().unwrap();
    assert_eq!(soc[0], 0.95);
    for pair in soc.windows(2) {
        assert!(pair[1] < pair[0], "state of charge increased: {pair:?}");
    }
    let final_soc = results.terminal().unwrap().state_of_charge.unwrap();
    assert!(final_soc > 0.4 && final_soc < 0.7, "final state of charge {final_soc}");

    // The pusher is held at its prescribed throttle, the lift rotors carry the weight
    for throttle in results.throttle_history(1).unwrap() {
        assert_eq!(throttle, 0.02);
    }
    for throttle in results.throttle_history(0).unwrap() {
        assert!(throttle > 0.0 && throttle < 1.0);
    }
    let state = &results.segments[0].state;
    let weight = compound.vehicle.mass * compound.planet.sea_level_gravity;
    for i in 0..state.rows() {
        assert!(state.conditions.frames.total_force[(i, 0)].abs() < 1e-5 * weight);
        assert!(state.conditions.frames.total_force[(i, 2)].abs() < 1e-5 * weight);
    }
}

#[test]
fn regenerative_descent() {
    let _ = pretty_env_logger::try_init();
    let glider = motor_glider(true);

    let mut mission = Mission::new("descent", &glider)
        .with_segment(Segment::new("descent", steep_descent(), &glider).with_points(10));
    let results = mission.evaluate().unwrap();
    println!("{results}");

    assert_relative_eq!(results.elapsed_time(), 125.0, max_relative = 1e-9);
    assert_relative_eq!(results.terminal().unwrap().altitude, 500.0, epsilon = 1e-9);
    // Gravity pulls harder than the drag: the propeller windmills and recharges the battery
    for throttle in results.throttle_history(0).unwrap() {
        assert!(throttle < 0.0 && throttle > -1.0, "throttle {throttle}");
    }
    let propulsion = &results.segments[0].state.conditions.propulsion;
    assert!(propulsion.power.iter().all(|p| *p < 0.0));
    let soc = results.state_of_charge_history().unwrap();
    assert_eq!(soc[0], 0.5);
    for pair in soc.windows(2) {
        assert!(pair[1] > pair[0], "state of charge decreased: {pair:?}");
    }
    assert!(soc[soc.len() - 1] < 1.0);
}

#[test]
fn descent_without_regeneration() {
    let _ = pretty_env_logger::try_init();
    let glider = motor_glider(false);

    let mut mission = Mission::new("descent", &glider)
        .with_segment(Segment::new("descent", steep_descent(), &glider).with_points(10));
    let err = mission.evaluate().unwrap_err();
    // The propeller would have to brake, which a motor only group cannot do
    assert!(err.is_infeasible(), "{err}");
    match err {
        MissionError::SegmentFailed {
            index,
            source: SegmentError::OutOfBounds { name, value, min, .. },
            ..
        } => {
            assert_eq!(index, 0);
            assert_eq!(name, "throttle_propeller");
            assert_eq!(min, 0.0);
            assert!(value < 0.0);
        }
        other => panic!("expected a throttle out of bounds, got {other:?}"),
    }
}

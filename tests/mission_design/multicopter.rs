use approx::assert_relative_eq;
use rstest::*;
use skyward::prelude::*;
use skyward::segments::{Hover, VerticalClimb, VerticalDescent};
use skyward::mission::SegmentStatus;
use skyward::segments::SegmentError;
use skyward::time::{Epoch, Unit};

#[fixture]
fn hexacopter() -> Analyses {
    crate::hexacopter()
}

fn hover(altitude: f64, seconds: f64) -> Phase {
    Phase::Hover(
        Hover::builder()
            .altitude(altitude)
            .duration(seconds * Unit::Second)
            .build(),
    )
}

#[rstest]
fn one_minute_hover(hexacopter: Analyses) {
    let _ = pretty_env_logger::try_init();

    let mut mission = Mission::new("hover", &hexacopter)
        .with_segment(Segment::new("hover", hover(30.0, 60.0), &hexacopter));
    let results = mission.evaluate().unwrap();
    println!("{results}");

    let segment = &results.segments[0];
    let conditions = &segment.state.conditions;
    let weight = hexacopter.vehicle.mass * hexacopter.planet.sea_level_gravity;
    for i in 0..segment.state.rows() {
        assert!(conditions.frames.total_force[(i, 2)].abs() < 1e-5 * weight);
        let throttle = conditions.propulsion.throttle[(i, 0)];
        assert!(throttle > 0.0 && throttle < 1.0);
        // Thrust carries the weight
        assert_relative_eq!(conditions.propulsion.thrust[(i, 2)], weight, max_relative = 1e-4);
    }

    let soc = results.state_of_charge_history().unwrap();
    assert_eq!(soc[0], 0.89);
    for pair in soc.windows(2) {
        assert!(pair[1] < pair[0], "state of charge increased: {pair:?}");
    }
    let terminal = results.terminal().unwrap();
    let final_soc = terminal.state_of_charge.unwrap();
    assert!(final_soc > 0.82 && final_soc < 0.86, "final state of charge {final_soc}");
    assert_relative_eq!(terminal.time, 60.0, max_relative = 1e-12);
    // Electric networks do not burn their mass
    assert_eq!(terminal.mass, hexacopter.vehicle.mass);
    assert_eq!(results.summaries()[0].final_state_of_charge(), Some(final_soc));
}

#[rstest]
fn vertical_hop(hexacopter: Analyses) {
    let _ = pretty_env_logger::try_init();

    let climb = VerticalClimb::builder()
        .altitude_start(0.0)
        .altitude_end(100.0)
        .climb_rate(2.0)
        .build();
    let descent = VerticalDescent::builder()
        .altitude_end(0.0)
        .descent_rate(2.0)
        .build();
    let mut mission = Mission::new("hop", &hexacopter)
        .with_segment(Segment::new("climb", Phase::VerticalClimb(climb), &hexacopter).with_points(8))
        .with_segment(Segment::new("hover", hover(100.0, 30.0), &hexacopter).with_points(8))
        .with_segment(Segment::new("descent", Phase::VerticalDescent(descent), &hexacopter).with_points(8));
    let results = mission.evaluate().unwrap();
    println!("{results}");

    // Time, altitude and stored energy are continuous across segments
    for pair in results.segments.windows(2) {
        let end = pair[0].state.terminal();
        let start = pair[1].state.initial();
        assert_eq!(end.time, start.time);
        assert_eq!(end.altitude, start.altitude);
        assert_eq!(end.state_of_charge, start.state_of_charge);
        assert_eq!(end.mass, start.mass);
    }
    assert_relative_eq!(results.elapsed_time(), 50.0 + 30.0 + 50.0, max_relative = 1e-9);
    assert_relative_eq!(results.terminal().unwrap().altitude, 0.0, epsilon = 1e-9);

    // Climbing draws more power than hovering, which draws more than descending
    let mean_power = |tag: &str| {
        let power = &results.segment(tag).unwrap().state.conditions.propulsion.power;
        power.mean()
    };
    assert!(mean_power("climb") > mean_power("hover"));
    assert!(mean_power("hover") > mean_power("descent"));
}

#[rstest]
fn battery_swap(hexacopter: Analyses) {
    let _ = pretty_env_logger::try_init();

    let mut mission = Mission::new("swap", &hexacopter)
        .with_segment(Segment::new("first", hover(30.0, 60.0), &hexacopter).with_points(8))
        .with_segment(
            Segment::new("second", hover(30.0, 60.0), &hexacopter)
                .with_points(8)
                .with_state_of_charge(1.0),
        );
    let results = mission.evaluate().unwrap();
    assert!(results.segments[0].state.terminal().state_of_charge.unwrap() < 0.89);
    assert_eq!(results.segments[1].state.initial().state_of_charge, Some(1.0));
}

/// The hexacopter with a solar panel of that area on top, flying over Greenwich.
fn solar_hexacopter_with_panel(area: f64) -> Analyses {
    let mut analyses = crate::hexacopter();
    let network = match &analyses.vehicle.network {
        EnergyNetwork::BatteryRotor(network) => network.clone(),
        other => panic!("unexpected network {other:?}"),
    };
    analyses.vehicle.network = EnergyNetwork::Solar(SolarNetwork {
        rotors: network.rotors,
        groups: network.groups,
        battery: network.battery,
        motor_efficiency: network.motor_efficiency,
        avionics_power: network.avionics_power,
        panel: SolarPanel {
            area,
            efficiency: 0.25,
        },
        latitude_deg: 51.48,
        longitude_deg: 0.0,
        solar_flux: 1_361.0,
    });
    analyses
}

fn solar_hexacopter() -> Analyses {
    solar_hexacopter_with_panel(20.0)
}

#[test]
fn solar_hover() {
    let _ = pretty_env_logger::try_init();
    let analyses = solar_hexacopter();

    let final_soc = |epoch: Epoch| {
        let mut mission = Mission::new("solar", &analyses)
            .with_start_epoch(epoch)
            .with_segment(Segment::new("hover", hover(30.0, 600.0), &analyses).with_points(8));
        let results = mission.evaluate().unwrap();
        let solar = &results.segments[0].state.conditions.propulsion.solar_power;
        (results.terminal().unwrap().state_of_charge.unwrap(), solar.max())
    };

    let (noon_soc, noon_solar) = final_soc(Epoch::from_gregorian_utc_hms(2024, 6, 21, 12, 0, 0));
    let (night_soc, night_solar) = final_soc(Epoch::from_gregorian_utc_hms(2024, 6, 21, 0, 0, 0));
    assert!(noon_solar > 4_000.0);
    assert_eq!(night_solar, 0.0);
    assert!(noon_soc > night_soc);
    assert!(noon_soc < 0.89);

    // The sun elevation requires the mission epoch
    let mut mission = Mission::new("no epoch", &analyses)
        .with_segment(Segment::new("hover", hover(30.0, 60.0), &analyses));
    match mission.evaluate() {
        Err(MissionError::SegmentFailed { source, .. }) => {
            assert!(matches!(source, SegmentError::MissingEpoch { .. }))
        }
        other => panic!("expected a missing epoch, got {other:?}"),
    }
}

#[test]
fn full_battery_in_the_sun() {
    let _ = pretty_env_logger::try_init();
    // Collects more than the rotors need at noon
    let analyses = solar_hexacopter_with_panel(1_600.0);

    let mut mission = Mission::new("surplus", &analyses)
        .with_start_epoch(Epoch::from_gregorian_utc_hms(2024, 6, 21, 12, 0, 0))
        .with_segment(
            Segment::new("hover", hover(30.0, 600.0), &analyses)
                .with_points(12)
                .with_state_of_charge(0.99),
        );
    let results = mission.evaluate().unwrap();
    println!("{results}");
    assert_eq!(mission.status(), SegmentStatus::Converged);

    // The battery charges up to full and the surplus is curtailed
    let soc = results.state_of_charge_history().unwrap();
    assert_eq!(soc[0], 0.99);
    for value in &soc {
        assert!(*value >= 0.99 - 1e-9 && *value <= 1.0 + 1e-6, "state of charge {value}");
    }
    assert!(soc[soc.len() - 1] > soc[0]);

    let propulsion = &results.segments[0].state.conditions.propulsion;
    let collected = SolarPanel {
        area: 1_600.0,
        efficiency: 0.25,
    };
    for i in 0..propulsion.solar_power.len() {
        assert!(propulsion.solar_power[i] > 0.0);
        // Never discharging
        assert!(propulsion.battery_power[i] < 1.0);
        assert!(propulsion.solar_power[i] <= collected.power(1_361.0, std::f64::consts::FRAC_PI_2));
    }
}

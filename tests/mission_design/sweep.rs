use rstest::*;
use skyward::mission::sweep::{evaluate_all, evaluate_sequentially};
use skyward::prelude::*;
use skyward::segments::CruiseConstantSpeedConstantAltitude;

#[fixture]
fn jet() -> Analyses {
    crate::airliner()
}

fn missions(analyses: &Analyses) -> Vec<Mission<'_>> {
    [200.0, 215.0, 230.412, 240.0]
        .iter()
        .map(|airspeed| {
            let phase = CruiseConstantSpeedConstantAltitude::builder()
                .altitude(10_668.0)
                .airspeed(*airspeed)
                .distance(500_000.0)
                .build();
            Mission::new(format!("cruise at {airspeed} m/s"), analyses).with_segment(
                Segment::new("cruise", Phase::CruiseConstantSpeedConstantAltitude(phase), analyses)
                    .with_points(8),
            )
        })
        .collect()
}

#[rstest]
fn parallel_sweep(jet: Analyses) {
    let _ = pretty_env_logger::try_init();

    let mut parallel = missions(&jet);
    let mut sequential = missions(&jet);
    let parallel_results = evaluate_all(&mut parallel);
    let sequential_results = evaluate_sequentially(&mut sequential);

    assert_eq!(parallel_results.len(), 4);
    for (par, seq) in parallel_results.iter().zip(&sequential_results) {
        let par = par.as_ref().unwrap();
        let seq = seq.as_ref().unwrap();
        assert_eq!(par.tag, seq.tag);
        assert_eq!(par.terminal(), seq.terminal());
        assert_eq!(par.mass_history(), seq.mass_history());
    }

    // Flying faster shortens the cruise
    let durations = parallel_results
        .iter()
        .map(|r| r.as_ref().unwrap().elapsed_time())
        .collect::<Vec<_>>();
    for pair in durations.windows(2) {
        assert!(pair[1] < pair[0]);
    }
}

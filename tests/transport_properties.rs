//! End-to-end properties of the relaxation + transport pipeline

use approx::assert_relative_eq;
use power_transport::generation::{generate_transport, lloyd_relaxation, relax_sites, sample_sites, solve_transport};
use power_transport::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn mass_is_conserved_for_weighted_sites() {
    let field = DensityField::from_fn(12, 9, |x, y| ((x * 7 + y * 3) % 11) as f64 / 11.0).unwrap();
    let sites = WeightedSiteSet::new(
        &[
            DVec2::new(2.0, 2.0),
            DVec2::new(9.5, 1.0),
            DVec2::new(6.0, 7.5),
            DVec2::new(1.0, 8.0),
        ],
        &[3.0, 1.0, 6.0, 0.5],
    );
    let diagram = PowerDiagram::build(&sites, field.bounds()).unwrap();
    let table = rasterize(&diagram, &field);

    assert_eq!(table.skipped_pixels(), 0);
    assert_relative_eq!(
        table.assigned_mass() + table.skipped_mass(),
        field.total_mass(),
        epsilon = 1e-9
    );
}

#[test]
fn uniform_weights_split_row_at_midpoint() {
    for k in [4usize, 6, 10] {
        let field = DensityField::uniform(k, 1, 1.0).unwrap();
        let sites = WeightedSiteSet::uniform(&[DVec2::new(0.0, 0.0), DVec2::new((k - 1) as f64, 0.0)], 1.0);
        let table = measure(&sites, &field, |v| v).unwrap();

        for x in 0..k {
            let owner = table.assignment(x, 0).unwrap().owner.unwrap();
            assert_eq!(owner, usize::from(x >= k / 2), "k={} x={}", k, x);
        }
    }
}

#[test]
fn sampling_exhaustion_with_three_eligible_pixels() {
    let field = DensityField::from_fn(5, 5, |x, y| if x == y && x < 3 { 0.4 } else { 1.0 }).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let err = sample_sites(&field, 4, &mut rng).unwrap_err();
    assert!(matches!(
        err,
        TransportError::SamplingExhaustion {
            requested: 4,
            eligible: 3
        }
    ));
    assert!(err.is_fatal());
}

#[test]
fn zero_lloyd_iterations_are_idempotent() {
    let field = DensityField::from_fn(10, 10, |x, y| (x * y) as f64 / 100.0).unwrap();
    let output = lloyd_relaxation(&field, 7, LloydOptions { iterations: 0, seed: 77 }).unwrap();

    let sampled = sample_sites(&field, 7, &mut ChaCha8Rng::seed_from_u64(77)).unwrap();
    assert_eq!(output.positions, sampled);

    let diagram = PowerDiagram::build(&WeightedSiteSet::uniform(&sampled, 1.0), field.bounds()).unwrap();
    let table = rasterize(&diagram, &field);
    assert_eq!(output.target_masses, table.masses().to_vec());
}

#[test]
fn under_massed_site_gains_weight() {
    let source = DensityField::from_fn(2, 3, |x, _| if x == 0 { 0.9 } else { 0.1 }).unwrap();
    let positions = [DVec2::new(0.0, 1.0), DVec2::new(1.0, 1.0)];
    let options = TransportOptions {
        iterations: 1,
        step_size: 0.5,
        ..Default::default()
    };

    // Site 0 holds 90% of the mass but should hold 40%
    let outcome = solve_transport(&source, &positions, &[2.0, 2.0], &[0.4, 0.6], options, NullSink, NullSink).unwrap();
    assert!(outcome.weights[0] < 2.0);
    assert!(outcome.weights[1] > 2.0);
    assert_relative_eq!(outcome.weights[0], 2.0 - 0.25, epsilon = 1e-12);
}

#[test_log::test]
fn uniform_end_to_end_stays_balanced() {
    // Sites start on the centroids of the two halves, so one Lloyd step keeps them there
    let source = DensityField::uniform(4, 4, 1.0).unwrap();
    let target = DensityField::uniform(4, 4, 0.5).unwrap();
    let start = vec![DVec2::new(0.5, 1.5), DVec2::new(2.5, 1.5)];

    let lloyd = relax_sites(&target, start.clone(), 1).unwrap();
    assert_eq!(lloyd.positions, start);
    let fractions = lloyd.target_fractions(target.total_mass());
    assert_eq!(fractions, vec![0.5, 0.5]);

    let options = TransportOptions {
        iterations: 5,
        step_size: 1.0,
        ..Default::default()
    };
    let mut log: Vec<ConvergenceRecord> = Vec::new();
    let outcome = solve_transport(&source, &lloyd.positions, &[1.0, 1.0], &fractions, options, NullSink, &mut log).unwrap();

    let mse: Vec<f64> = log.iter().map(|r| r.mse).collect();
    assert_eq!(mse, vec![0.0; 5]);
    assert_eq!(outcome.weights, vec![1.0, 1.0]);
}

#[test_log::test]
fn pipeline_reduces_error_on_skewed_fields() {
    // Only pixels 1 and 6 are dark in the target, so sampling and Lloyd pin the
    // sites there and each captures half of the target mass
    let source = DensityField::from_fn(8, 1, |x, _| if x < 4 { 0.1 } else { 0.9 }).unwrap();
    let target = DensityField::from_fn(8, 1, |x, _| if x == 1 || x == 6 { 0.0 } else { 1.0 }).unwrap();
    let config = TransportConfigBuilder::new()
        .seed(31)
        .site_count(2)
        .unwrap()
        .lloyd_iterations(1)
        .transport_iterations(6)
        .step_size(4.0)
        .unwrap()
        .build();

    let mut log: Vec<ConvergenceRecord> = Vec::new();
    let run = generate_transport(&source, &target, &config, NullSink, &mut log).unwrap();

    let mut xs: Vec<f64> = run.positions.iter().map(|p| p.x).collect();
    xs.sort_by(f64::total_cmp);
    assert_eq!(xs, vec![1.0, 6.0]);
    assert_eq!(run.target_fractions, vec![0.5, 0.5]);

    // The left cell starts with 0.4 of the 4.0 source mass
    assert_relative_eq!(log[0].mse, 0.16, epsilon = 1e-12);
    let last = log.last().unwrap().mse;
    assert!(last < log[0].mse, "{:?}", log);
    assert_relative_eq!(last, 0.175 * 0.175, epsilon = 1e-12);

    let left = if run.positions[0].x < run.positions[1].x { 0 } else { 1 };
    assert!(run.outcome.weights[left] > run.outcome.weights[1 - left]);
}

#[test]
fn frames_and_log_reach_their_sinks() {
    let source = DensityField::from_fn(12, 12, |x, y| ((x + y) as f64 / 24.0).min(1.0)).unwrap();
    let target = DensityField::from_fn(12, 12, |x, _| x as f64 / 12.0).unwrap();
    let config = TransportConfigBuilder::new()
        .seed(21)
        .site_count(6)
        .unwrap()
        .lloyd_iterations(2)
        .transport_iterations(6)
        .frame_period(3)
        .frame_count(3)
        .unwrap()
        .build();

    let mut frames = FrameCollector::new();
    let mut log = WriterLog::new(Vec::new());
    generate_transport(&source, &target, &config, &mut frames, &mut log).unwrap();

    // Iterations 2 and 5 render steps 1 and 2
    assert_eq!(frames.frames().len(), 4);
    let text = String::from_utf8(log.into_inner()).unwrap();
    assert_eq!(text.lines().count(), 6);
    assert!(text.starts_with("0 "));
}

#[test]
fn solved_diagram_polygons_tile_field() {
    let source = DensityField::from_fn(10, 8, |x, _| 0.2 + x as f64 / 20.0).unwrap();
    let target = DensityField::from_fn(10, 8, |_, y| y as f64 / 10.0).unwrap();
    let config = TransportConfigBuilder::new()
        .seed(8)
        .site_count(5)
        .unwrap()
        .lloyd_iterations(2)
        .transport_iterations(4)
        .build();

    let run = generate_transport(&source, &target, &config, NullSink, NullSink).unwrap();
    let diagram = PowerDiagram::build(&run.outcome.sites(&run.positions), source.bounds()).unwrap();
    let area: f64 = diagram.cell_polygons().iter().map(PowerCell::area).sum();
    assert_relative_eq!(area, source.bounds().area(), epsilon = 1e-6);
}

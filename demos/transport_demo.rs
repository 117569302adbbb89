//! Transport a synthetic gradient onto a radial blob
//!
//! Run with `RUST_LOG=debug cargo run --example transport_demo` to see
//! per-iteration timings.

use power_transport::generation::generate_transport;
use power_transport::*;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== power_transport Demo ===\n");

    // Step 1: Fields (normally decoded from images)
    let (width, height) = (48, 48);
    let source = DensityField::from_fn(width, height, |x, _| 0.1 + 0.8 * x as f64 / width as f64)?;
    let target = DensityField::from_fn(width, height, |x, y| {
        let dx = x as f64 - width as f64 / 2.0;
        let dy = y as f64 - height as f64 / 2.0;
        let r = (dx * dx + dy * dy).sqrt() / (width as f64 / 2.0);
        (1.0 - r).clamp(0.05, 0.95)
    })?;
    println!("Step 1: {}x{} fields", width, height);
    println!("  Source mass: {:.2}", source.total_mass());
    println!("  Target mass: {:.2}", target.total_mass());

    // Step 2: Configure
    let config = TransportConfigBuilder::new()
        .seed(12345)
        .site_count(24)?
        .lloyd_iterations(4)
        .transport_iterations(40)
        .step_size(2.0)?
        .frame_period(20)
        .frame_count(5)?
        .build();
    println!("\nStep 2: {} sites, {} transport iterations", config.site_count, config.transport_iterations);

    // Step 3: Solve
    let mut frames = FrameCollector::new();
    let mut log: Vec<ConvergenceRecord> = Vec::new();
    let run = generate_transport(&source, &target, &config, &mut frames, &mut log)?;

    println!("\nStep 3: Convergence");
    for record in log.iter().step_by(5) {
        println!("  iter {:>3}: mse {:.3e}", record.iteration, record.mse);
    }

    // Step 4: Inspect the solved diagram
    let sites = run.outcome.sites(&run.positions);
    let diagram = PowerDiagram::build(&sites, source.bounds())?;
    let table = rasterize(&diagram, &source);
    println!("\nStep 4: Solved cells");
    for (site, polygon) in sites.iter().zip(diagram.cell_polygons()).take(5) {
        println!(
            "  site {:>2} at ({:5.1}, {:5.1}) w={:7.3}: {} pixels, area {:.1}",
            site.id,
            site.position.x,
            site.position.y,
            site.weight,
            table.members(site.id).len(),
            polygon.area()
        );
    }

    println!("\nStep 5: {} interpolation frames rendered", frames.frames().len());
    println!("\n=== Demo Complete ===");
    Ok(())
}

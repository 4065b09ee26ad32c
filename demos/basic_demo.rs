//! Basic demonstration of the strand-displacement sensor simulation.
//!
//! Run with: cargo run --example basic_demo

use sds_sim::profiler::Profiler;
use sds_sim::{SimConfig, SimWorld};

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== Strand-Displacement Sensor - Simulation Demo ===\n");

    let config = SimConfig {
        seed: Some(42),
        ..Default::default()
    };
    let mut sim = SimWorld::new(config).expect("default config is valid");

    println!("Initial state:");
    print_state(&mut sim);

    // 600 ticks = 60 seconds of simulated time at dt = 0.1.
    println!("\nRunning 600 ticks...\n");
    let mut profiler = Profiler::new();
    for tick in 0..600 {
        profiler.time_section("advance_tick", || sim.advance_tick());
        profiler.tick();

        if (tick + 1) % 100 == 0 {
            println!(
                "--- Tick {} (t={:.1}s) ---",
                sim.current_tick(),
                sim.current_time()
            );
            print_state(&mut sim);
        }
    }

    profiler.print_summary();

    println!("=== Final Snapshot (JSON) ===\n");
    println!("{}", sim.snapshot().to_json_pretty().unwrap());
}

fn print_state(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();
    let p = &snapshot.populations;
    println!(
        "  pollutants: {} free / {} complexed",
        p.free_pollutants, p.complexed_pollutants
    );
    println!(
        "  complexes:  {} active / {} consumed, templates liberated: {}",
        p.active_complexes, p.inactive_complexes, p.free_templates
    );
    println!(
        "  products alive: {}  (displacements={} transcriptions={})",
        p.products, snapshot.stats.displacements, snapshot.stats.transcriptions
    );
    println!(
        "  pollutant field peak: {:.2}",
        snapshot
            .pollutant_field
            .values
            .iter()
            .copied()
            .fold(0.0f32, f32::max)
    );
}

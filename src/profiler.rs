//! Lightweight timing instrumentation for tick phases.
//!
//! Used by the stress test and the demo binary to break a run down into
//! named sections. Enable the `profile` feature to get the summary printed
//! from the stress test:
//!
//! ```bash
//! cargo test --release --features profile -- test_stress
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Accumulated timing for one named section.
#[derive(Default, Clone)]
pub struct SectionStats {
    pub total: Duration,
    pub calls: u64,
    pub max: Duration,
}

impl SectionStats {
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

/// Collects per-section wall-clock timings across ticks.
#[derive(Default)]
pub struct Profiler {
    sections: HashMap<String, SectionStats>,
    ticks: u64,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` and charge its wall time to `name`.
    pub fn time_section<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        let stats = self.sections.entry(name.to_string()).or_default();
        stats.total += elapsed;
        stats.calls += 1;
        stats.max = stats.max.max(elapsed);
        result
    }

    /// Mark one tick as complete.
    pub fn tick(&mut self) {
        self.ticks += 1;
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn section(&self, name: &str) -> Option<&SectionStats> {
        self.sections.get(name)
    }

    /// Print all sections, slowest first.
    pub fn print_summary(&self) {
        println!("\n=== Tick profile ({} ticks) ===", self.ticks);
        let mut rows: Vec<_> = self.sections.iter().collect();
        rows.sort_by(|a, b| b.1.total.cmp(&a.1.total));

        let grand_total: Duration = rows.iter().map(|(_, s)| s.total).sum();
        println!(
            "{:<20} {:>12} {:>12} {:>12} {:>8}",
            "Section", "Total", "Avg/call", "Max", "% Time"
        );
        for (name, stats) in &rows {
            let pct = if grand_total.as_nanos() > 0 {
                stats.total.as_nanos() as f64 / grand_total.as_nanos() as f64 * 100.0
            } else {
                0.0
            };
            println!(
                "{:<20} {:>12.2?} {:>12.2?} {:>12.2?} {:>7.1}%",
                name,
                stats.total,
                stats.average(),
                stats.max,
                pct
            );
        }
        if self.ticks > 0 {
            let per_tick = grand_total / self.ticks as u32;
            println!("avg per tick: {:.2?}", per_tick);
        }
        println!();
    }

    pub fn reset(&mut self) {
        self.sections.clear();
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_sections_accumulate() {
        let mut profiler = Profiler::new();
        for _ in 0..3 {
            profiler.time_section("step", || sleep(Duration::from_millis(2)));
            profiler.tick();
        }

        assert_eq!(profiler.tick_count(), 3);
        let stats = profiler.section("step").unwrap();
        assert_eq!(stats.calls, 3);
        assert!(stats.total >= Duration::from_millis(6));
        assert!(stats.max >= stats.average());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut profiler = Profiler::new();
        profiler.time_section("x", || {});
        profiler.tick();
        profiler.reset();
        assert_eq!(profiler.tick_count(), 0);
        assert!(profiler.section("x").is_none());
    }
}

//! Ethology DST Simulator CLI
//!
//! Runs the engine's end-to-end scenarios under a seeded, virtual-time harness.

use clap::Parser;
use ethology_core::EngineConfig;
use ethology_sim::scenarios::ScenarioId;
use ethology_sim::{ScenarioResult, ScenarioRunner};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Ethology Deterministic Simulation Testing CLI
#[derive(Parser, Debug)]
#[command(name = "ethology-sim")]
#[command(about = "Run deterministic simulation tests for the Ethology engine", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (coalescing, rate_limit_flood, failed_archetype_retry,
    /// debounce_burst, instance_freshness, cyclic_graph, census, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trait catalog file (JSON), replacing the bundled one
    #[arg(long)]
    catalog: Option<PathBuf>,
}

/// Prints `message` and exits with the CI failure code.
fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn build_runner(seed: u64, config: &EngineConfig, catalog: Option<&str>) -> ScenarioRunner {
    let runner = ScenarioRunner::new(seed).with_config(config.clone());
    match catalog {
        Some(json) => runner.with_catalog(json),
        None => runner,
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        fail(format!("failed to set tracing subscriber: {}", e));
    }

    if !args.json {
        info!("Ethology DST Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let config = match &args.config {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))
            .and_then(|json| EngineConfig::from_json(&json).map_err(|e| e.to_string()))
            .unwrap_or_else(|e| fail(e)),
        None => EngineConfig::default(),
    };
    let catalog = args.catalog.as_ref().map(|path| {
        std::fs::read_to_string(path).unwrap_or_else(|e| fail(format!("cannot read {}: {}", path.display(), e)))
    });

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e: String| {
            let available: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
            fail(format!("{}\nAvailable scenarios: {}, all", e, available.join(", ")))
        })]
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = build_runner(seed, &config, catalog.as_deref());

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED: {} requests, {} results, {} instantiations",
                        scenario.name(),
                        seed,
                        result.metrics.requests_sent,
                        result.metrics.results_received,
                        result.metrics.instantiations
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "time_secs": r.final_time_secs,
                    "failure_reason": r.failure_reason,
                    "metrics": r.metrics,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

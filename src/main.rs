use anyhow::{Context, Result, bail};
use clap::Parser;
use deadsim::{Simulation, scenario};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Deadsim - Resource Contention and Deadlock Detection Simulator"
)]
struct Cli {
    /// Path to the scenario file
    scenario: PathBuf,

    /// Write the event log to this path ("{timestamp}" is expanded)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Disable detection after every operation
    #[arg(long)]
    lazy: bool,

    /// Print the report on a single line
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let scenario = scenario::load(&cli.scenario)?;

    let mut builder = Simulation::builder().eager_detection(!cli.lazy);
    if let Some(path) = &cli.log {
        builder = builder.with_log(path);
    }
    let sim = builder.build()?;

    let report = scenario::run(&sim, &scenario);
    let json = if cli.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
    .context("Failed to serialize report")?;
    println!("{json}");

    sim.flush_log().context("Failed to flush event log")?;

    if report.expectation_met == Some(false) {
        bail!(
            "expected deadlocked processes {:?}, found {:?}",
            scenario.expect_deadlocked.unwrap_or_default(),
            report
                .deadlock
                .deadlocked_processes
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
        );
    }
    Ok(())
}

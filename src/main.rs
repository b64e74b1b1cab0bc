use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use sparse_ecs::{run_workload, WorkloadConfig};

#[derive(Debug, Parser)]
#[command(author, version, about = "Sparse-set ECS soak runner")]
struct Cli {
    /// Path to the workload YAML file
    #[arg(long, default_value = "workloads/default.yaml")]
    workload: PathBuf,

    /// Override the workload seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the step count
    #[arg(long)]
    steps: Option<u64>,

    /// Write the JSON report here
    #[arg(long)]
    report: Option<PathBuf>,
}

fn init_logging(level: &str) {
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.parse_filters(level),
    };
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = WorkloadConfig::from_yaml(&cli.workload)
        .with_context(|| format!("Failed to load workload {}", cli.workload.display()))?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(steps) = cli.steps {
        config.steps = steps;
    }
    init_logging(&config.logging.level);

    let report = run_workload(config).context("Workload failed")?;

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    println!("{report}");
    Ok(())
}

//! indexbench CLI: runs one indexing trial per selected backend.
//!
//! `indexbench [flags]`: setup, populate, run `loops × sample_size`
//! operations, tear down, print a summary. A fatal error (setup failure,
//! hash collision) aborts the run with exit code 1.

mod commands;
mod format;
mod parse;

use std::process;

use indexbench_core::{BenchConfig, Result};
use indexbench_engine::{RecordPopulator, Trial, TrialSummary};
use tracing::info;
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_error, format_summary, OutputMode};
use parse::matches_to_plan;

fn main() {
    let matches = build_cli().get_matches();
    init_tracing();

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let plan = match matches_to_plan(&matches) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(2);
        }
    };

    info!(target: "indexbench", backends = ?plan.backends, "IndexingBenchmark");
    for kind in &plan.backends {
        let config = plan.config.clone().with_backend(*kind);
        match run_one(config, plan.verify) {
            Ok(summary) => println!("{}", format_summary(&summary, output_mode)),
            Err(e) => {
                eprintln!("{}", format_error(&e, output_mode));
                process::exit(1);
            }
        }
    }
}

fn run_one(config: BenchConfig, verify: bool) -> Result<TrialSummary> {
    let mut trial = Trial::setup(config)?;
    trial.populate()?;
    if verify {
        let populator = RecordPopulator::new(trial.config());
        let checked = RecordPopulator::verify(trial.backend().as_ref(), populator.records())?;
        info!(target: "indexbench", checked, "Population verified");
    }
    trial.run_workload()?;
    trial.tear_down()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

//! ArgMatches → run plan conversion.

use std::path::PathBuf;

use clap::ArgMatches;
use indexbench_core::{BackendKind, BenchConfig, Error, Result};

/// What the binary will run
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Shared configuration (backend overridden per run)
    pub config: BenchConfig,
    /// Backends to run, in order
    pub backends: Vec<BackendKind>,
    /// Round-trip check after population
    pub verify: bool,
}

/// Translate parsed arguments into a validated plan.
pub fn matches_to_plan(matches: &ArgMatches) -> Result<RunPlan> {
    let mut config = BenchConfig::default();
    if let Some(n) = matches.get_one::<usize>("sample-size") {
        config.sample_size = *n;
    }
    if let Some(loops) = matches.get_one::<usize>("loops") {
        config.loops = *loops;
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.threads = *threads;
    }
    if let Some(dir) = matches.get_one::<String>("persist-dir") {
        if !dir.is_empty() {
            config.persist_dir = Some(PathBuf::from(dir));
        }
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = Some(*seed);
    }
    if let Some(len) = matches.get_one::<usize>("max-value-len") {
        config.max_value_len = *len;
    }
    config.validate()?;

    let backends = match matches.get_many::<String>("backend") {
        None => vec![config.backend],
        Some(names) => parse_backends(names.map(String::as_str))?,
    };

    Ok(RunPlan {
        config,
        backends,
        verify: matches.get_flag("verify"),
    })
}

fn parse_backends<'a>(names: impl Iterator<Item = &'a str>) -> Result<Vec<BackendKind>> {
    let mut backends: Vec<BackendKind> = Vec::new();
    for name in names {
        let selected = if name.eq_ignore_ascii_case("all") {
            BackendKind::ALL.to_vec()
        } else {
            vec![name.parse()?]
        };
        // Each backend runs once, in order of first mention
        for kind in selected {
            if !backends.contains(&kind) {
                backends.push(kind);
            }
        }
    }
    if backends.is_empty() {
        return Err(Error::InvalidConfig("no backend selected".into()));
    }
    Ok(backends)
}

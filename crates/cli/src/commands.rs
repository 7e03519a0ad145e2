//! Clap command definition.
//!
//! Every knob falls back to its `INDEXBENCH_*` environment variable, then
//! to the `BenchConfig` default.

use clap::{value_parser, Arg, ArgAction, Command};
use indexbench_core::config::env;

/// Build the CLI command.
pub fn build_cli() -> Command {
    Command::new("indexbench")
        .about("Measure secondary-index build throughput across storage backends")
        .arg(
            Arg::new("backend")
                .long("backend")
                .short('b')
                .env(env::BACKEND)
                .value_delimiter(',')
                .num_args(1..)
                .help("Backends to run: concurrent, persistent, append-log or all (default: concurrent)"),
        )
        .arg(
            Arg::new("sample-size")
                .long("sample-size")
                .short('n')
                .env(env::SAMPLE_SIZE)
                .value_parser(value_parser!(usize))
                .help("Primary population size (default: 1000000)"),
        )
        .arg(
            Arg::new("loops")
                .long("loops")
                .short('l')
                .env(env::LOOPS)
                .value_parser(value_parser!(usize))
                .help("Passes over the population (default: 20)"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('t')
                .env(env::THREADS)
                .value_parser(value_parser!(usize))
                .help("Worker threads sharing the backend (default: 1)"),
        )
        .arg(
            Arg::new("persist-dir")
                .long("persist-dir")
                .env(env::PERSIST_DIR)
                .value_name("DIR")
                .help("Write backing files under DIR (default: transient)"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .env(env::SEED)
                .value_parser(value_parser!(u64))
                .help("Seed for values and key sampling (default: OS entropy)"),
        )
        .arg(
            Arg::new("max-value-len")
                .long("max-value-len")
                .env(env::MAX_VALUE_LEN)
                .value_parser(value_parser!(usize))
                .help("Declared value width of the off-heap map (default: 64)"),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .action(ArgAction::SetTrue)
                .requires("seed")
                .help("Check every populated record round-trips before measuring"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("JSON output mode"),
        )
}

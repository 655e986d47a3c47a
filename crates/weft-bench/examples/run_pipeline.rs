//! One pipeline run with logging enabled.
//!
//! Usage: `cargo run -p weft-bench --example run_pipeline -- [policy] [workers]`
//! Set `RUST_LOG=debug` to see every barrier and merge round.

use std::process;

use env_logger::Env;

use weft_bench::reference_profile;
use weft_core::{RunError, SchedulePolicy};
use weft_engine::PipelineDriver;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let policy = match args.next().map(|s| s.parse::<SchedulePolicy>()) {
        Some(Ok(p)) => p,
        Some(Err(e)) => {
            log::error!("{e}");
            process::exit(RunError::EXIT_CONFIG);
        }
        None => SchedulePolicy::Static,
    };
    let workers = args.next().and_then(|s| s.parse().ok()).unwrap_or(4);

    let (config, kernels) = reference_profile(workers, policy);
    let driver = match PipelineDriver::new(config, kernels) {
        Ok(d) => d,
        Err(e) => {
            log::error!("invalid configuration: {e}");
            process::exit(RunError::EXIT_CONFIG);
        }
    };

    match driver.run() {
        Ok(report) => {
            println!("result = {:.9}", report.result);
            println!("{}", report.timings);
        }
        Err(e) => {
            log::error!("{e}");
            process::exit(e.exit_code());
        }
    }
}

//! Parameter sweep launcher: one `bsub` submission per
//! (σ, order, σ_noise) grid point, issued strictly one after another.
//!
//!   sweep --sigma 0.1,0.2 --order-range 1,4,1 --sigma-noise 0.05
//!   sweep --grid grid.csv --dry-run
//!
//! The grid comes either from a CSV (see `generate_grid`) or from the
//! axis flags. Exits non-zero only if the grid is unusable or the
//! scheduler binary cannot be launched; jobs that `bsub` rejects are
//! reported and counted but do not stop the sweep.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use sweep::cli::{init_tracing, LaunchArgs};

fn main() -> ExitCode {
    init_tracing();

    let args = LaunchArgs::parse();
    match args.launch(args.executor()) {
        Ok(report) => {
            info!(
                submitted = report.len(),
                non_zero = report.failed(),
                "sweep finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

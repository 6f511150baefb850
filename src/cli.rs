//! Command-line pieces shared by the `sweep` and `generate_grid` binaries,
//! plus the launcher's own parser and run logic.

use std::fs::File;
use std::path::PathBuf;

use clap::{Args, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::dispatch::{DispatchReport, Dispatcher};
use crate::error::Result;
use crate::executor::{CommandExecutor, DryRunExecutor, ProcessExecutor};
use crate::grid::{Axis, Grid};
use crate::template::SubmitTemplate;

/// The three axes, each given as a list or as `min,max,step`.
#[derive(Args, Debug, Clone)]
pub struct GridArgs {
    /// Sigma values, comma separated
    #[arg(long, default_value = "0.1", allow_hyphen_values = true, conflicts_with = "sigma_range")]
    pub sigma: String,

    /// Sigma range (min,max,step)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub sigma_range: Option<Vec<f64>>,

    /// Filter order values, comma separated
    #[arg(long, default_value = "2", allow_hyphen_values = true, conflicts_with = "order_range")]
    pub order: String,

    /// Order range (min,max,step)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub order_range: Option<Vec<f64>>,

    /// Noise sigma values, comma separated
    #[arg(
        long,
        default_value = "0.05",
        allow_hyphen_values = true,
        conflicts_with = "sigma_noise_range"
    )]
    pub sigma_noise: String,

    /// Noise sigma range (min,max,step)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub sigma_noise_range: Option<Vec<f64>>,
}

fn axis(list: &str, range: Option<&[f64]>) -> Result<Axis> {
    match range {
        Some(r) => Axis::from_range_slice(r),
        None => Ok(Axis::parse_list(list)),
    }
}

impl GridArgs {
    pub fn grid(&self) -> Result<Grid> {
        let sigma = axis(&self.sigma, self.sigma_range.as_deref())?;
        let order = axis(&self.order, self.order_range.as_deref())?;
        let sigma_noise = axis(&self.sigma_noise, self.sigma_noise_range.as_deref())?;
        Ok(Grid::product(&sigma, &order, &sigma_noise))
    }
}

/// Overrides for the submission template; defaults are the production values.
#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Scheduler submission binary
    #[arg(long, default_value = "bsub")]
    pub scheduler: String,

    /// Wall-clock limit passed to -W
    #[arg(long, default_value = "48:00")]
    pub wall_clock: String,

    /// Cores passed to -n
    #[arg(long, default_value = "36")]
    pub cores: u32,

    /// Memory per core in MB
    #[arg(long, default_value = "2000")]
    pub mem_per_core: u32,

    /// Do not request an exclusive node
    #[arg(long)]
    pub no_fullnode: bool,

    /// Interpreter that runs the job script
    #[arg(long, default_value = "python")]
    pub interpreter: String,

    /// Job script, receives sigma order sigma_noise
    #[arg(long, default_value = "results_psd_with_augmentation.py")]
    pub script: String,

    /// Prefix of the per-job log file
    #[arg(long, default_value = "log")]
    pub log_prefix: String,
}

impl From<TemplateArgs> for SubmitTemplate {
    fn from(a: TemplateArgs) -> Self {
        Self {
            scheduler: a.scheduler,
            wall_clock: a.wall_clock,
            cores: a.cores,
            mem_per_core: a.mem_per_core,
            fullnode: !a.no_fullnode,
            interpreter: a.interpreter,
            script: a.script,
            log_prefix: a.log_prefix,
        }
    }
}

/// Arguments of the `sweep` launcher.
#[derive(Parser, Debug)]
#[command(
    name = "sweep",
    about = "Submit one batch job per (sigma, order, sigma_noise) grid point"
)]
pub struct LaunchArgs {
    /// CSV with 3 columns: sigma, order, sigma_noise
    #[arg(
        long,
        conflicts_with_all = [
            "sigma", "sigma_range", "order", "order_range", "sigma_noise", "sigma_noise_range",
        ]
    )]
    pub grid: Option<PathBuf>,

    #[command(flatten)]
    pub axes: GridArgs,

    #[command(flatten)]
    pub template: TemplateArgs,

    /// Print the submission commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Directory to submit from (log files land here); unused with --dry-run
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Write a CSV of what was submitted and the scheduler's exit codes
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,
}

impl LaunchArgs {
    /// `--grid` file if given, otherwise the product of the axis flags.
    pub fn load_grid(&self) -> Result<Grid> {
        match &self.grid {
            Some(path) => Grid::from_path(path),
            None => self.axes.grid(),
        }
    }

    /// Dry-run printer or the real process launcher.
    pub fn executor(&self) -> Box<dyn CommandExecutor> {
        if self.dry_run {
            return Box::new(DryRunExecutor::stdout());
        }
        let mut exec = ProcessExecutor::new();
        if let Some(dir) = &self.workdir {
            exec = exec.with_workdir(dir);
        }
        Box::new(exec)
    }

    /// Runs the sweep through `executor`.
    ///
    /// The manifest file is created before anything is submitted, and is
    /// written with the partial report when the sweep stops early.
    pub fn launch<E: CommandExecutor>(&self, executor: E) -> Result<DispatchReport> {
        let grid = self.load_grid()?;
        info!(points = grid.len(), dry_run = self.dry_run, "grid ready");

        let manifest = match &self.manifest {
            Some(path) => Some((path, File::create(path)?)),
            None => None,
        };

        let template = SubmitTemplate::from(self.template.clone());
        let mut dispatcher = Dispatcher::new(template, executor).with_progress(self.progress);
        let result = dispatcher.dispatch(grid);

        if let Some((path, file)) = manifest {
            match &result {
                Ok(report) => {
                    report.write_manifest(file)?;
                    info!(path = %path.display(), "manifest written");
                }
                Err(err) => {
                    if let Some(report) = err.partial_report() {
                        match report.write_manifest(file) {
                            Ok(()) => info!(
                                path = %path.display(),
                                submitted = report.len(),
                                "partial manifest written"
                            ),
                            Err(e) => {
                                error!(path = %path.display(), "could not write manifest: {e}")
                            }
                        }
                    }
                }
            }
        }
        result
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default `sweep=info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "sweep=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

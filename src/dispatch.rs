//! Sequential submission of a grid: one blocking executor call per point,
//! in grid order. An executor error stops the sweep and comes back as
//! `SweepError::Aborted` carrying the submissions made so far; a non-zero
//! exit from the scheduler is recorded and the sweep carries on.

use std::io::Write;

use csv::WriterBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::error::{Result, SweepError};
use crate::executor::{CommandExecutor, Outcome};
use crate::grid::ParamTuple;
use crate::template::SubmitTemplate;

/// One grid point after it has been handed to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub tuple: ParamTuple,
    pub command_line: String,
    pub log_file: String,
    pub outcome: Outcome,
}

/// Everything that was submitted, in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    submissions: Vec<Submission>,
}

impl DispatchReport {
    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.submissions.iter().filter(|s| s.outcome.success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Submission> {
        self.submissions.iter()
    }

    /// CSV with one row per submission; `exit_code` is blank when the
    /// process was killed by a signal.
    pub fn write_manifest<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(["sigma", "order", "sigma_noise", "log_file", "exit_code", "command"])?;
        for s in &self.submissions {
            wtr.write_record([
                s.tuple.sigma.to_string(),
                s.tuple.order.to_string(),
                s.tuple.sigma_noise.to_string(),
                s.log_file.clone(),
                s.outcome.code().map(|c| c.to_string()).unwrap_or_default(),
                s.command_line.clone(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

pub struct Dispatcher<E: CommandExecutor> {
    template: SubmitTemplate,
    executor: E,
    progress: bool,
}

impl<E: CommandExecutor> Dispatcher<E> {
    pub fn new(template: SubmitTemplate, executor: E) -> Self {
        Self { template, executor, progress: false }
    }

    /// Show a progress bar on stderr while submitting.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    pub fn dispatch<I>(&mut self, grid: I) -> Result<DispatchReport>
    where
        I: IntoIterator<Item = ParamTuple>,
    {
        let points = grid.into_iter();
        let bar = self.progress_bar(points.size_hint());
        let mut report = DispatchReport::default();

        for tuple in points {
            let job = self.template.build(&tuple);
            let command_line = job.command_line();
            debug!(%tuple, command = %command_line, "formatted submission");

            let outcome = match self.executor.execute(&job) {
                Ok(outcome) => outcome,
                Err(err) => {
                    bar.abandon();
                    error!(%tuple, submitted = report.len(), "sweep stopped: {err}");
                    return Err(SweepError::Aborted { report, source: Box::new(err) });
                }
            };

            bar.suspend(|| match outcome {
                Outcome::Exited(0) => info!(%tuple, "submitted"),
                Outcome::Exited(code) => warn!(%tuple, code, "submission exited non-zero"),
                Outcome::Signalled => warn!(%tuple, "submission terminated by signal"),
            });
            bar.inc(1);

            report.submissions.push(Submission {
                log_file: self.template.log_file_name(&tuple),
                tuple,
                command_line,
                outcome,
            });
        }

        bar.finish_and_clear();
        Ok(report)
    }

    fn progress_bar(&self, (lower, upper): (usize, Option<usize>)) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(upper.unwrap_or(lower) as u64);
        if let Ok(style) = ProgressStyle::with_template(
            " {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]",
        ) {
            bar.set_style(style);
        }
        bar
    }
}

//! How a [`JobCommand`] actually gets run.
//!
//! The dispatcher only sees the [`CommandExecutor`] trait, so the real
//! process launcher can be swapped for a dry run or a recorder.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use tracing::debug;

use crate::error::{Result, SweepError};
use crate::template::JobCommand;

/// What the submission process reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exited(i32),
    /// Terminated without an exit code (killed by a signal).
    Signalled,
}

impl Outcome {
    pub fn success(&self) -> bool {
        matches!(self, Outcome::Exited(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Outcome::Exited(c) => Some(*c),
            Outcome::Signalled => None,
        }
    }
}

impl From<ExitStatus> for Outcome {
    fn from(status: ExitStatus) -> Self {
        status.code().map(Outcome::Exited).unwrap_or(Outcome::Signalled)
    }
}

pub trait CommandExecutor {
    /// Runs `job` to completion. `Err` only when it could not be started.
    fn execute(&mut self, job: &JobCommand) -> Result<Outcome>;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for Box<E> {
    fn execute(&mut self, job: &JobCommand) -> Result<Outcome> {
        (**self).execute(job)
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &mut E {
    fn execute(&mut self, job: &JobCommand) -> Result<Outcome> {
        (**self).execute(job)
    }
}

/// Spawns the scheduler binary directly (no shell) and waits for it.
/// stdout/stderr are inherited, so `bsub`'s own messages reach the terminal.
#[derive(Debug, Default, Clone)]
pub struct ProcessExecutor {
    workdir: Option<PathBuf>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log files named by the template are relative to this directory.
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }
}

impl CommandExecutor for ProcessExecutor {
    fn execute(&mut self, job: &JobCommand) -> Result<Outcome> {
        let mut cmd = Command::new(&job.program);
        cmd.args(&job.args);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        debug!(program = %job.program, args = ?job.args, "spawning");

        let status = cmd.status().map_err(|source| SweepError::Spawn {
            program: job.program.clone(),
            source,
        })?;
        Ok(status.into())
    }
}

/// Prints each command line instead of running it.
pub struct DryRunExecutor<W: Write> {
    out: W,
}

impl<W: Write> DryRunExecutor<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl DryRunExecutor<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> CommandExecutor for DryRunExecutor<W> {
    fn execute(&mut self, job: &JobCommand) -> Result<Outcome> {
        writeln!(self.out, "{}", job.command_line())?;
        Ok(Outcome::Exited(0))
    }
}

/// Test double: remembers every command, answers with scripted exit codes.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    commands: Vec<JobCommand>,
    exit_codes: Vec<i32>,
    fail_at: Option<usize>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit code for the i-th call; calls past the end exit 0.
    pub fn with_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.exit_codes = codes;
        self
    }

    /// The call with this index fails to spawn.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn commands(&self) -> &[JobCommand] {
        &self.commands
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.commands.iter().map(JobCommand::command_line).collect()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&mut self, job: &JobCommand) -> Result<Outcome> {
        let index = self.commands.len();
        if self.fail_at == Some(index) {
            return Err(SweepError::Spawn {
                program: job.program.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "program not found"),
            });
        }
        self.commands.push(job.clone());
        Ok(Outcome::Exited(self.exit_codes.get(index).copied().unwrap_or(0)))
    }
}

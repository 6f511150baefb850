//! The `bsub` submission template.
//!
//! The defaults reproduce the production line
//!
//! ```text
//! bsub -W 48:00 -n 36 -R "rusage[mem=2000]" -R fullnode -oo log_{0}-{1}-{2}.txt python results_psd_with_augmentation.py {0} {1} {2}
//! ```
//!
//! but the command is kept as a program plus discrete arguments so it can
//! be executed without going through a shell.

use std::fmt;

use crate::grid::ParamTuple;

/// Resource request and payload for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTemplate {
    pub scheduler: String,
    /// `-W`, hours:minutes.
    pub wall_clock: String,
    /// `-n`
    pub cores: u32,
    /// MB per core, goes into `rusage[mem=...]`.
    pub mem_per_core: u32,
    /// Adds `-R fullnode` (exclusive node).
    pub fullnode: bool,
    pub interpreter: String,
    pub script: String,
    pub log_prefix: String,
}

impl Default for SubmitTemplate {
    fn default() -> Self {
        Self {
            scheduler:    "bsub".to_string(),
            wall_clock:   "48:00".to_string(),
            cores:        36,
            mem_per_core: 2000,
            fullnode:     true,
            interpreter:  "python".to_string(),
            script:       "results_psd_with_augmentation.py".to_string(),
            log_prefix:   "log".to_string(),
        }
    }
}

impl SubmitTemplate {
    /// `a-b-c`, the only identity a job has.
    pub fn job_name(&self, p: &ParamTuple) -> String {
        format!("{}-{}-{}", p.sigma, p.order, p.sigma_noise)
    }

    /// `log_a-b-c.txt`
    pub fn log_file_name(&self, p: &ParamTuple) -> String {
        format!("{}_{}.txt", self.log_prefix, self.job_name(p))
    }

    pub fn build(&self, p: &ParamTuple) -> JobCommand {
        let mut args = vec![
            "-W".to_string(),
            self.wall_clock.clone(),
            "-n".to_string(),
            self.cores.to_string(),
            "-R".to_string(),
            format!("rusage[mem={}]", self.mem_per_core),
        ];
        if self.fullnode {
            args.push("-R".to_string());
            args.push("fullnode".to_string());
        }
        args.push("-oo".to_string());
        args.push(self.log_file_name(p));
        args.push(self.interpreter.clone());
        args.push(self.script.clone());
        args.extend(p.values().iter().map(|v| v.to_string()));

        JobCommand {
            program: self.scheduler.clone(),
            args,
        }
    }
}

/// A ready-to-run submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl JobCommand {
    /// Shell rendering, for logs, dry runs and the manifest.
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for JobCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

fn is_bare(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '.' | ',' | ':' | '/' | '=' | '@' | '+' | '%' | '-')
}

/// Bare when safe, otherwise double quoted with `" \ $ `` ` escaped.
pub fn shell_quote(arg: &str) -> String {
    if !arg.is_empty() && arg.chars().all(is_bare) {
        return arg.to_string();
    }
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

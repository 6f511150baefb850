use std::io;

use crate::dispatch::DispatchReport;

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The executor failed part way; `report` holds what went out before.
    #[error("sweep stopped after {} submission(s): {source}", .report.len())]
    Aborted {
        report: DispatchReport,
        #[source]
        source: Box<SweepError>,
    },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("grid row at line {line} has {found} fields, expected 3 (sigma,order,sigma_noise)")]
    GridRow { line: u64, found: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SweepError {
    /// Submissions made before the sweep stopped, if it got that far.
    pub fn partial_report(&self) -> Option<&DispatchReport> {
        match self {
            SweepError::Aborted { report, .. } => Some(report),
            _ => None,
        }
    }

    /// The error underneath an `Aborted` wrapper.
    pub fn cause(&self) -> &SweepError {
        match self {
            SweepError::Aborted { source, .. } => source.cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;

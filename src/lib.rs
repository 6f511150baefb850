pub mod cli;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod grid;
pub mod template;

pub use dispatch::{DispatchReport, Dispatcher, Submission};
pub use error::SweepError;
pub use executor::{CommandExecutor, DryRunExecutor, Outcome, ProcessExecutor, RecordingExecutor};
pub use grid::{Axis, Grid, ParamTuple, ParamValue};
pub use template::{JobCommand, SubmitTemplate};

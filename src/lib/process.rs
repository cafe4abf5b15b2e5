//! External tool stages (aligners, sorters) run as child processes.
//!
//! A stage is waited on with a poll loop so a hung tool cannot stall the pipeline forever. A
//! non-zero exit or a timeout is fatal for the stage and the error names the full command.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::errors::{FamcallError, Result};

/// Interval between checks on a running child
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Seconds to wait for an external sort before it is killed
pub const DEFAULT_SORT_TIMEOUT_SECS: u64 = 3600;

/// One external command.
#[derive(Debug, Clone)]
pub struct ExternalStage {
    program: OsString,
    args: Vec<OsString>,
}

impl ExternalStage {
    pub fn new<P, A, S>(program: P, args: A) -> Self
    where
        P: Into<OsString>,
        A: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self { program: program.into(), args: args.into_iter().map(Into::into).collect() }
    }

    /// A samtools-compatible sort of `input` by read name into the SAM file `output`.
    pub fn name_sort(program: impl Into<OsString>, input: &Path, output: &Path) -> Self {
        let args: [OsString; 7] = [
            "sort".into(),
            "-n".into(),
            "-O".into(),
            "sam".into(),
            "-o".into(),
            output.into(),
            input.into(),
        ];
        Self::new(program, args)
    }

    /// The command line as it would be typed.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the command to completion, killing it if `timeout` elapses first.
    ///
    /// Standard output is discarded; standard error is inherited so tool diagnostics reach
    /// the user.
    ///
    /// # Errors
    ///
    /// [`FamcallError::ExternalToolIo`] if the process cannot be spawned or waited on,
    /// [`FamcallError::ExternalToolFailed`] on a non-zero exit and
    /// [`FamcallError::ExternalToolTimeout`] when the timeout elapses.
    pub fn run(&self, timeout: Duration) -> Result<()> {
        let command = self.command_line();
        let io_error = |source| FamcallError::ExternalToolIo { command: command.clone(), source };

        info!("Running: {command}");
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(io_error)?;

        let status: ExitStatus = loop {
            if let Some(status) = child.try_wait().map_err(io_error)? {
                break status;
            }
            if started.elapsed() >= timeout {
                // The child may exit between the check and the kill; either way it is reaped.
                let _ = child.kill();
                child.wait().map_err(io_error)?;
                return Err(FamcallError::ExternalToolTimeout {
                    command,
                    seconds: timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL.min(timeout.saturating_sub(started.elapsed())));
        };

        debug!("{command} finished in {:?} with {status}", started.elapsed());
        if status.success() {
            Ok(())
        } else {
            Err(FamcallError::ExternalToolFailed { command, status: status.to_string() })
        }
    }
}

//! The [`Command`] trait implemented by every famcall subcommand.

use anyhow::Result;
use enum_dispatch::enum_dispatch;

/// A runnable subcommand. `command_line` is the full invocation, logged for provenance.
#[enum_dispatch]
pub trait Command {
    fn execute(&self, command_line: &str) -> Result<()>;
}

//! End-to-end tests that run the `famcall` binary on small files.

mod helpers;
mod test_consensus_command;
mod test_merge_command;
mod test_rescue_command;

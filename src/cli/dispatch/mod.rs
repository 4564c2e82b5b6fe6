//! Maps parsed arguments to the action the binary executes.

use crate::cli::actions::{replay::Args, Action};
use crate::cli::commands::{flow, ARG_SCRIPT, ARG_SETTLE_MS, CMD_REPLAY};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// # Errors
/// Returns an error if the subcommand is unknown or its arguments are invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((CMD_REPLAY, sub)) => {
            let script = sub
                .get_one::<String>(ARG_SCRIPT)
                .map(PathBuf::from)
                .context("missing required argument: <script>")?;
            let settle_ms = sub.get_one::<u64>(ARG_SETTLE_MS).copied().unwrap_or(100);

            Ok(Action::Replay(Args {
                script,
                settle_after: Duration::from_millis(settle_ms),
                config: flow::parse(sub)?,
            }))
        }
        Some((name, _)) => Err(anyhow!("unknown command: {name}")),
        None => Err(anyhow!("missing command")),
    }
}

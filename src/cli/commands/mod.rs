pub mod flow;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const CMD_REPLAY: &str = "replay";
pub const ARG_SCRIPT: &str = "script";
pub const ARG_SETTLE_MS: &str = "settle-ms";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("authflow")
        .about("Post-login orchestration for namespaced sessions")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_REPLAY)
                .about("Replay a login event script against in-memory services")
                .arg(
                    Arg::new(ARG_SCRIPT)
                        .help("Path to a JSON event script")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_SETTLE_MS)
                        .long("settle-ms")
                        .help("Time each navigation takes to settle")
                        .default_value("100")
                        .env("AUTHFLOW_SETTLE_MS")
                        .value_parser(clap::value_parser!(u64)),
                ),
        );

    let command = flow::with_args(command);
    logging::with_args(command)
}

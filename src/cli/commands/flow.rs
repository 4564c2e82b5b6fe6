use crate::config::FlowConfig;
use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_MANAGED_NAMESPACE_ROOT: &str = "managed-namespace-root";
pub const ARG_DEBOUNCE_MS: &str = "debounce-ms";
pub const ARG_LANDING_ROUTE: &str = "landing-route";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MANAGED_NAMESPACE_ROOT)
                .long("managed-namespace-root")
                .help("Namespace prefix users can neither see nor edit, example: admin")
                .env("AUTHFLOW_MANAGED_NAMESPACE_ROOT")
                .global(true),
        )
        .arg(
            Arg::new(ARG_DEBOUNCE_MS)
                .long("debounce-ms")
                .help("Quiet period before a namespace edit is committed")
                .default_value("500")
                .env("AUTHFLOW_DEBOUNCE_MS")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_LANDING_ROUTE)
                .long("landing-route")
                .help("Route to land on after login when no redirect is pending")
                .default_value("vault.cluster")
                .env("AUTHFLOW_LANDING_ROUTE")
                .global(true),
        )
}

/// Builds the flow configuration from parsed arguments.
///
/// # Errors
/// Returns an error if the landing route is blank.
pub fn parse(matches: &ArgMatches) -> Result<FlowConfig> {
    let mut config = FlowConfig::new().with_managed_namespace_root(
        matches
            .get_one::<String>(ARG_MANAGED_NAMESPACE_ROOT)
            .map(String::as_str),
    );

    if let Some(ms) = matches.get_one::<u64>(ARG_DEBOUNCE_MS) {
        config = config.with_namespace_debounce(Duration::from_millis(*ms));
    }

    if let Some(route) = matches.get_one::<String>(ARG_LANDING_ROUTE) {
        let route = route.trim();
        if route.is_empty() {
            anyhow::bail!("--{ARG_LANDING_ROUTE} must not be empty");
        }
        config = config.with_landing_route(route.to_string());
    }

    Ok(config)
}

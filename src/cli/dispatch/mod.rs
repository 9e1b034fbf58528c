//! Map parsed CLI arguments to the action to run.

use crate::cli::{
    actions::{server::Args, Action},
    commands::{ARG_DSN, ARG_PORT, ARG_TEMPLATE_DIR},
};
use anyhow::{anyhow, Context, Result};
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if the DSN is missing or is not a PostgreSQL URL.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let parsed = Url::parse(&dsn).context("Invalid database connection string")?;
    if !matches!(parsed.scheme(), "postgres" | "postgresql") {
        return Err(anyhow!(
            "Unsupported database scheme: {}, expected postgres://",
            parsed.scheme()
        ));
    }

    let template_dir = matches.get_one::<String>(ARG_TEMPLATE_DIR).cloned();

    Ok(Action::Server(Args {
        port,
        dsn,
        template_dir,
    }))
}

use anyhow::Result;
use clap::Command;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;
mod config;

fn cli() -> Command {
    Command::new("folio")
        .about("Build a personal resume page from a single JSON content document")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(cmd::build::make_subcommand())
        .subcommand(cmd::serve::make_subcommand())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli().get_matches().subcommand() {
        Some(("build", args)) => cmd::build::execute(args).await,
        Some(("serve", args)) => cmd::serve::execute(args).await,
        _ => unreachable!("subcommand is required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_subcommand_required() {
        assert!(cli().try_get_matches_from(["folio"]).is_err());
        assert!(cli().try_get_matches_from(["folio", "build"]).is_ok());
    }
}

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use folio_core::build_site;
use std::path::Path;

use crate::config::load_build_config;

pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("DIR")
                .help("Source directory holding the content document"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for the built page"),
        )
        .arg(
            Arg::new("theme")
                .short('t')
                .long("theme")
                .value_name("DIR")
                .help("Theme directory with the page template and assets"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: ./folio.toml]"),
        )
}

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("build")).about("Build the resume page")
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = load_build_config(args)?;
    let build = config.build_config();

    let output_dir = Path::new(&build.output);
    let page = build_site(
        config.site_config(),
        Path::new(&build.source),
        output_dir,
        Path::new(&build.theme),
    )
    .await?;

    if page.site().is_none() {
        tracing::warn!("Content did not load; the page keeps its template text");
    }
    tracing::info!("Page built in {}", output_dir.display());

    Ok(())
}

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use folio_core::build_site;
use folio_dev_server::{LiveServer, LiveServerConfig};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::cmd::build::add_build_args;
use crate::config::{FolioConfig, load_serve_config};

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("serve"))
        .about("Build the page and preview it with live reload")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16))
                .help("Port to serve on [default: 3000]"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to [default: 127.0.0.1]"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open browser automatically")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Build in preview mode. Build errors are logged rather than returned so a
/// bad edit does not stop the server.
async fn rebuild(config: &FolioConfig) -> bool {
    let build = config.build_config();
    let mut site = config.site_config().clone();
    site.dev(build.host.clone(), build.port);

    match build_site(
        &site,
        Path::new(&build.source),
        Path::new(&build.output),
        Path::new(&build.theme),
    )
    .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Build error: {e}");
            false
        }
    }
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = load_serve_config(args)?;
    let build = config.build_config();

    let output_dir = PathBuf::from(&build.output);
    std::fs::create_dir_all(&output_dir)?;
    rebuild(&config).await;

    // The server watches the output dir and reloads clients on change
    let server = LiveServer::new(LiveServerConfig {
        host: build.host.clone(),
        port: build.port,
        root: output_dir,
        open: build.open,
        ignore: vec![".git".to_string(), ".tmp".to_string()],
    });
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("Dev server error: {e}");
        }
    });

    let watcher_config = config.clone();
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watch_source_files(watcher_config).await {
            tracing::error!("Source watcher error: {e}");
        }
    });

    let _ = tokio::try_join!(server_handle, watcher_handle)?;

    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

async fn watch_source_files(config: FolioConfig) -> Result<()> {
    let build = config.build_config();
    let source_dir = PathBuf::from(&build.source);
    let theme_dir = PathBuf::from(&build.theme);
    let config_file = PathBuf::from(&build.config);

    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        move |res: DebounceEventResult| {
            if let Ok(events) = res {
                for event in events {
                    let _ = tx.blocking_send(event.path);
                }
            }
        },
    )?;

    if source_dir.exists() {
        debouncer
            .watcher()
            .watch(&source_dir, notify::RecursiveMode::Recursive)?;
        tracing::info!("Watching source directory: {}", source_dir.display());
    }

    if theme_dir.exists() {
        debouncer
            .watcher()
            .watch(&theme_dir, notify::RecursiveMode::Recursive)?;
        tracing::info!("Watching theme directory: {}", theme_dir.display());
    }

    if config_file.exists() {
        debouncer
            .watcher()
            .watch(&config_file, notify::RecursiveMode::NonRecursive)?;
        tracing::info!("Watching config file: {}", config_file.display());
    }

    let abs_source_dir = absolute(&source_dir);
    let abs_theme_dir = absolute(&theme_dir);
    let abs_config_file = absolute(&config_file);

    while let Some(path) = rx.recv().await {
        let abs_path = absolute(&path);
        let is_source_change = abs_path.starts_with(&abs_source_dir)
            || abs_path.starts_with(&abs_theme_dir)
            || abs_path == abs_config_file;

        if !is_source_change {
            tracing::debug!("Skipping non-source change: {}", path.display());
            continue;
        }

        tracing::info!("Source changed: {}", path.display());
        if rebuild(&config).await {
            tracing::info!("Page rebuilt");
        }
    }

    Ok(())
}

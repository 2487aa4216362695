//! exestamp CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, OutputFormat};
use exestamp::version::Git;
use exestamp::{startup, BuildHistory, BuildInfo, Startup};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    // Reclaim any stale backup before the configuration can fail
    match startup(cli.trigger(), cli.to_config())? {
        Startup::Exit(0) => {
            info!("Temporary files cleared. Exiting...");
            return Ok(());
        }
        Startup::Exit(code) => std::process::exit(code),
        Startup::Continue => {}
    }

    let build = BuildInfo::embedded();

    if let Some(path) = &cli.record_build {
        let mut history = if path.exists() {
            BuildHistory::load_from_file(path)?
        } else {
            BuildHistory::new(cli.history_limit)
        };
        history.add_build(build.clone());
        history.save_to_file(path)?;
        info!("Recorded build {} in {}", build.build_id, path.display());
    }

    if let Some(format) = cli.build_info {
        match format {
            OutputFormat::Text => println!("{build}"),
            OutputFormat::Json => println!("{}", build.to_json()?),
            OutputFormat::Markdown => println!("{}", build.to_markdown()),
        }
    }

    if cli.changelog {
        let changelog = Git::new(std::env::current_dir()?).changelog(cli.since.as_deref())?;
        match cli.changelog_format {
            OutputFormat::Json => println!("{}", changelog.to_json()?),
            OutputFormat::Text | OutputFormat::Markdown => print!("{}", changelog.to_markdown()),
        }
    }

    if cli.build_info.is_none() && !cli.changelog && cli.record_build.is_none() {
        println!("{}", build.detailed_version);
    }

    Ok(())
}

use amigo::Settings;
use amigo::cli::commands;
use amigo::cli::{Cli, Commands};
use anyhow::Context;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            Settings::load_from(path)
        }
        None => Settings::load(),
    }
    .context("cannot load configuration")?;

    settings.apply_overrides(cli.overrides()?);

    amigo::logging::init_with_config(&settings.logging);

    match cli.command() {
        Commands::Serve => commands::serve::run(settings).await,
        Commands::List { json } => commands::list::run(&settings, json),
        Commands::Config => commands::show_config::run(&settings),
    }
}

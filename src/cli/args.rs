//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::{ConfigError, Overrides, parse_directories, parse_extensions};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch directories and serve a live file registry over HTTP
#[derive(Parser, Debug)]
#[command(
    name = "amigo",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch directories and serve a live file registry over HTTP",
    long_about = "Tracks files with the given extensions under labeled directories and \
                  serves them at /registry.json and /files/<label>/<path>.",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Space-separated directories to watch, as `label:dir` or bare `dir`
    #[arg(short, long, global = true, env = "AMIGO_DIRECTORY")]
    pub directory: Option<String>,

    /// Comma-separated file extensions to track, e.g. `png,svg,js`
    #[arg(short, long, global = true, env = "AMIGO_EXTENSIONS")]
    pub extensions: Option<String>,

    /// Port to listen on (also used in file URLs)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Host name written into file URLs
    #[arg(long, global = true)]
    pub host: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Walk, watch and serve the registry (default)
    Serve,

    /// Walk once and print the registry
    List {
        /// Print the same JSON `/registry.json` returns
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    /// Command to run, defaulting to `serve`.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }

    /// Settings overrides taken from the flags.
    pub fn overrides(&self) -> Result<Overrides, ConfigError> {
        let directories = self
            .directory
            .as_deref()
            .map(parse_directories)
            .transpose()?;

        Ok(Overrides {
            directories,
            extensions: self.extensions.as_deref().map(parse_extensions),
            host: self.host.clone(),
            port: self.port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::try_parse_from(["amigo"]).unwrap();
        assert_eq!(cli.command(), Commands::Serve);

        let overrides = cli.overrides().unwrap();
        assert!(overrides.port.is_none());
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "amigo",
            "--directory",
            "site:/tmp/assets /srv/docs",
            "--extensions",
            "png,md",
            "--port",
            "8080",
            "list",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.command(), Commands::List { json: true });

        let overrides = cli.overrides().unwrap();
        let dirs = overrides.directories.unwrap();
        assert_eq!(dirs["site"], PathBuf::from("/tmp/assets"));
        assert_eq!(dirs["docs"], PathBuf::from("/srv/docs"));
        assert_eq!(overrides.extensions.unwrap(), vec!["png", "md"]);
        assert_eq!(overrides.port, Some(8080));
    }

    #[test]
    fn test_invalid_directory_spec() {
        let cli = Cli::try_parse_from(["amigo", "--directory", ":/tmp"]).unwrap();
        assert!(cli.overrides().is_err());
    }
}

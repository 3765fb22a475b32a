use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use super::{DotsCommand, PagesCommand, UploadCommand};
use crate::config::{default_config_path, Config, ConfigManager};

/// Headless pagination and upload engines
#[derive(Parser)]
#[command(
    name = "uikit",
    version,
    about = "Headless pagination and upload engines",
    long_about = r#"Exercise the pagination range calculator and the upload job manager from the terminal.

Examples:
  uikit pages --page 5 --total 10           # 1 … 4 5 6 … 10
  uikit dots --page 8 --total 15            # dot indicator window
  uikit upload ./photos --dest /tmp/out     # copy files with progress"#
)]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the page-number layout for a page
    Pages(PagesCommand),
    /// Print the dot-indicator window for a page
    Dots(DotsCommand),
    /// Upload files into a local directory
    Upload(UploadCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.debug {
            debug!("Debug logging enabled");
        }

        let config = self.load_config().await?;
        debug!("Configuration initialized");

        match self.command {
            Commands::Pages(cmd) => cmd.execute(&config),
            Commands::Dots(cmd) => cmd.execute(&config),
            Commands::Upload(cmd) => cmd.execute(&config).await,
        }
    }

    async fn load_config(&self) -> Result<Config> {
        let path = self.config.clone().unwrap_or_else(default_config_path);
        let mut manager = ConfigManager::new(path);
        manager.load().await?;

        let mut config = manager.into_config();
        config.load_from_env();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["uikit", "--debug", "pages", "--page", "5", "--total", "10"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Pages(_)));

        let cli = Cli::try_parse_from(["uikit", "upload", "a.txt", "b.txt", "--dest", "/tmp/out"]).unwrap();
        match cli.command {
            Commands::Upload(cmd) => assert_eq!(cmd.paths.len(), 2),
            _ => panic!("expected upload"),
        }

        assert!(Cli::try_parse_from(["uikit"]).is_err());
    }
}

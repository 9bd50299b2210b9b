use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments shared across all binaries
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Common subcommands available for all binaries
#[derive(Subcommand, Debug, Clone, Default)]
pub enum CommonCommands {
    /// Start the service (default behavior)
    #[default]
    Start,
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Log level implied by the verbosity flags
    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Initialize logging based on CLI arguments; `RUST_LOG` takes precedence
    pub fn init_logging(args: &CommonArgs) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level(args)));

        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("promrelay configuration:");
            println!("========================");
            println!("Listen address: {}", config.frontend.listen_address);
            println!("Rule endpoints: {}", config.frontend.rule_endpoints);
            println!("Backend timeout: {:?}", config.frontend.backend_timeout);
            println!("Query target URL: {}", config.query.target_url);
            println!("Query timeout: {:?}", config.query.timeout);
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");

        config
            .frontend
            .listen_addr()
            .context("Invalid frontend listen address")?;

        let endpoints = config
            .frontend
            .rule_endpoint_urls()
            .context("Invalid rule endpoints")?;

        if config.frontend.backend_timeout.is_zero() {
            anyhow::bail!("Backend timeout cannot be zero");
        }

        config.query.target().context("Invalid query target URL")?;

        if config.query.timeout.is_zero() {
            anyhow::bail!("Query timeout cannot be zero");
        }

        log::info!(
            "Configuration validation passed ({} rule endpoint(s))",
            endpoints.len()
        );
        Ok(())
    }

    /// Handle common CLI commands that don't require starting services
    pub async fn handle_common_command(
        command: &CommonCommands,
        config: &Configuration,
    ) -> Result<bool> {
        match command {
            CommonCommands::Config { json } => {
                display_config(config, *json)?;
                Ok(true) // Command handled, don't start service
            }
            CommonCommands::Validate => {
                validate_config(config)?;
                Ok(true)
            }
            CommonCommands::Version => {
                println!("{}", version_info());
                Ok(true)
            }
            CommonCommands::Start => Ok(false),
        }
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "{} {} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use std::time::Duration;

    fn args(verbose: bool, quiet: bool) -> CommonArgs {
        CommonArgs {
            config: None,
            verbose,
            quiet,
        }
    }

    #[test]
    fn test_common_commands_default() {
        let default_cmd = CommonCommands::default();
        assert!(matches!(default_cmd, CommonCommands::Start));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(utils::log_level(&args(false, false)), "info");
        assert_eq!(utils::log_level(&args(true, false)), "debug");
        assert_eq!(utils::log_level(&args(true, true)), "warn");
    }

    #[test]
    fn test_version_info() {
        let version = utils::version_info();
        assert!(version.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_validate_default_config() {
        assert!(utils::validate_config(&Configuration::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Configuration::default();
        config.frontend.rule_endpoints = String::new();
        assert!(utils::validate_config(&config).is_err());

        let mut config = Configuration::default();
        config.frontend.backend_timeout = Duration::ZERO;
        assert!(utils::validate_config(&config).is_err());

        let mut config = Configuration::default();
        config.query.target_url = "::not-a-url".to_string();
        assert!(utils::validate_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_start_is_not_handled() {
        let handled = utils::handle_common_command(&CommonCommands::Start, &Configuration::default())
            .await
            .unwrap();
        assert!(!handled);
    }
}

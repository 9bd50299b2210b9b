use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::cli::{CommonArgs, CommonCommands, utils};
use frontend::{AppState, FrontendState};

#[derive(Parser)]
#[command(name = "promrelay-frontend")]
#[command(about = "Prometheus query frontend - federates the rules and alerts APIs of rule evaluators")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<FrontendCommands>,

    #[arg(long, help = "Address on which to expose the HTTP API")]
    listen_address: Option<String>,

    #[arg(
        long,
        help = "Comma separated list of rule-evaluator base URLs serving /api/v1/rules and /api/v1/alerts"
    )]
    rule_endpoints: Option<String>,
}

#[derive(Subcommand)]
enum FrontendCommands {
    #[command(flatten)]
    Common(CommonCommands),
}

impl Default for FrontendCommands {
    fn default() -> Self {
        Self::Common(CommonCommands::Start)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on CLI arguments
    utils::init_logging(&cli.common);

    let mut config = utils::load_config(cli.common.config.as_ref())?;
    if let Some(listen_address) = cli.listen_address {
        config.frontend.listen_address = listen_address;
    }
    if let Some(rule_endpoints) = cli.rule_endpoints {
        config.frontend.rule_endpoints = rule_endpoints;
    }

    // Handle common commands that don't require starting the service
    let command = cli.command.unwrap_or_default();
    let FrontendCommands::Common(ref common_cmd) = command;
    if utils::handle_common_command(common_cmd, &config).await? {
        return Ok(());
    }

    let listen_addr = config
        .frontend
        .listen_addr()
        .context("Invalid listen address")?;
    let state = AppState::from_config(&config).context("Failed to set up rule federation")?;
    for endpoint in state.rule_proxy().endpoints() {
        log::info!("Federating rules and alerts from {endpoint}");
    }

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;

    frontend::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for ctrl+c signal: {e}");
            std::future::pending::<()>().await;
        }
        log::info!("Shutting down query frontend...");
    })
    .await?;

    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::cli::{CommonArgs, CommonCommands, utils};
use querier::{PrometheusClient, RemoteQuerier, Selector, SeriesSet, TimeRange};
use serde_json::json;

/// Default selection window when only `--end` (or nothing) is given
const DEFAULT_WINDOW_SECS: i64 = 300;

#[derive(Parser)]
#[command(name = "promrelay-query")]
#[command(about = "Run a single range selection against a Prometheus-compatible query API")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<QueryCommands>,

    #[arg(long, help = "Series selector, e.g. up{job=\"node\"}")]
    selector: Option<String>,

    #[arg(long, help = "Start of the range in epoch seconds (default: end - 300)")]
    start: Option<i64>,

    #[arg(long, help = "End of the range in epoch seconds (default: now)")]
    end: Option<i64>,

    #[arg(long, help = "Override query.target_url")]
    target_url: Option<String>,
}

#[derive(Subcommand)]
enum QueryCommands {
    #[command(flatten)]
    Common(CommonCommands),
}

impl Default for QueryCommands {
    fn default() -> Self {
        Self::Common(CommonCommands::Start)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::init_logging(&cli.common);

    let mut config = utils::load_config(cli.common.config.as_ref())?;
    if let Some(target_url) = cli.target_url {
        config.query.target_url = target_url;
    }

    let command = cli.command.unwrap_or_default();
    let QueryCommands::Common(ref common_cmd) = command;
    if utils::handle_common_command(common_cmd, &config).await? {
        return Ok(());
    }

    let selector: Selector = cli
        .selector
        .as_deref()
        .context("--selector is required")?
        .parse()
        .context("Invalid selector")?;

    let end = cli.end.unwrap_or_else(|| chrono::Utc::now().timestamp());
    let start = cli.start.unwrap_or(end.saturating_sub(DEFAULT_WINDOW_SECS));

    let target = config.query.target().context("Invalid query target URL")?;
    let client = PrometheusClient::new(&target, config.query.timeout)
        .context("Failed to build query client")?;

    log::info!("Selecting {selector} over [{start}, {end}] from {target}");
    let querier = RemoteQuerier::new(client);
    let set = querier.select(TimeRange::new(start, end), &selector).await;

    let failed = set.err().is_some();
    println!("{}", serde_json::to_string_pretty(&render(set))?);

    if failed {
        anyhow::bail!("Selection failed");
    }
    Ok(())
}

fn render(set: SeriesSet) -> serde_json::Value {
    let (series, warnings, err) = set.into_parts();
    let series: Vec<_> = series
        .into_iter()
        .map(|s| {
            let points: Vec<_> = s.iter().map(|p| json!([p.timestamp, format_value(p.value)])).collect();
            json!({ "metric": s.metric.labels, "points": points })
        })
        .collect();

    json!({
        "series": series,
        "warnings": warnings.iter().map(|w| w.message()).collect::<Vec<_>>(),
        "error": err.map(|e| e.to_string()),
    })
}

/// Sample value in the Prometheus API's string form
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

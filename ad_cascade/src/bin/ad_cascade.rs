use std::path::PathBuf;

use ad_cascade::{
    cascade::BatchCascadeOrchestrator,
    config::{CascadeConfig, Credentials},
    error::BatchError,
    ledger::{CsvLedgerSink, LedgerSink, ResultLedger},
    plan::BatchPlan,
    rows::RowSource,
    telemetry::init_tracing,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use meta_ads::{
    models::search::LocationType,
    providers::{graph_rest::GraphApiProvider, paced::PacedPlatform},
};
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Bulk campaign -> ad set -> ad creation from a CSV batch")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the cascade over an input CSV and write the result ledger.
    Run(RunCmd),
    /// Look up targeting ids by name.
    Search(SearchCmd),
}

#[derive(Args)]
struct RunCmd {
    #[arg(long, value_name = "CSV")]
    input: PathBuf,
    #[arg(long, value_name = "CSV")]
    output: PathBuf,
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct SearchCmd {
    kind: SearchKind,
    query: String,
    /// Country scope for region and city lookups.
    #[arg(long, default_value = "IN")]
    country: String,
    /// Maximum interest results.
    #[arg(long, default_value_t = 25)]
    limit: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchKind {
    Regions,
    Cities,
    Interests,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info")?;
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Run(cmd) => run(cmd).await,
        Cmd::Search(cmd) => search(cmd).await,
    }
}

async fn run(cmd: RunCmd) -> Result<()> {
    let config = CascadeConfig::load(cmd.config.as_deref())?;

    let (headers, records) = RowSource::from_csv_path(&cmd.input)?.into_parts();
    let mut ledger = ResultLedger::new(headers, records);
    let plan = match BatchPlan::build(ledger.records()) {
        Ok(plan) => plan,
        Err(BatchError::EmptyInput) => {
            info!(input = %cmd.input.display(), "no campaigns detected, nothing to do");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // Credentials are only needed once there is something to submit.
    let creds = Credentials::from_env()?;
    let mut provider = GraphApiProvider::new(
        creds.access_token,
        creds.account_id,
        &config.platform.api_version,
    )?
    .with_video_poll_interval(config.creative.video_poll_interval());
    if let Some(base_url) = &config.platform.base_url {
        provider = provider.with_base_url(base_url);
    }
    let platform = PacedPlatform::new(provider, config.pacing.period());

    let orchestrator = BatchCascadeOrchestrator::new(platform, &config, creds.page_id)?;
    let report = orchestrator.run(&plan, &mut ledger).await;

    let written = CsvLedgerSink::new(&cmd.output)
        .write(&ledger)
        .await
        .with_context(|| format!("writing ledger for {}", cmd.input.display()))?;
    println!("{report}");
    println!("ledger: {}", written.display());
    Ok(())
}

async fn search(cmd: SearchCmd) -> Result<()> {
    let provider = GraphApiProvider::from_env()?;
    let lines = match cmd.kind {
        SearchKind::Regions | SearchKind::Cities => {
            let location_type = match cmd.kind {
                SearchKind::Cities => LocationType::City,
                _ => LocationType::Region,
            };
            provider
                .search_geo_locations(&cmd.query, location_type, Some(&cmd.country))
                .await?
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?
        }
        SearchKind::Interests => provider
            .search_interests(&cmd.query, cmd.limit)
            .await?
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?,
    };
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

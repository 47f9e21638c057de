//! `defect`: cache and analyse NHTSA complaints and recalls for a vehicle.
//!
//! ```text
//! defect ingest --make honda --model accord --year 2021
//! defect ingest --vin 1HGCV1F34MA012345
//! defect summary --make honda --model accord --year 2021
//! defect trend --vin 1HGCV1F34MA012345 --bucket year
//! defect serve
//! ```
//!
//! Only `ingest` (and `POST /ingest` under `serve`) talks to the network;
//! every other command reads the local cache. Results are printed as JSON on
//! stdout, logs go to stderr.

mod commands;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use defect_api::AppState;
use defect_core::{query::DEFAULT_COMPONENT_LIMIT, trend::Bucket};
use defect_ingest::{NhtsaClient, Pipeline};
use defect_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[derive(Parser)]
#[command(author, version, about = "Vehicle defect complaint and recall cache")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "defect.toml", env = "DEFECT_CONFIG")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

/// Identifies a vehicle: `--vin`, or all of `--make`, `--model` and `--year`.
#[derive(Args, Debug, Clone)]
pub struct SelectorArgs {
  #[arg(long, conflicts_with_all = ["make", "model", "year"])]
  pub vin:   Option<String>,
  #[arg(long)]
  pub make:  Option<String>,
  #[arg(long)]
  pub model: Option<String>,
  #[arg(long)]
  pub year:  Option<i32>,
}

#[derive(Subcommand)]
enum Command {
  /// Fetch complaints and recalls from NHTSA into the local cache.
  Ingest(SelectorArgs),

  /// Crash, fire, injury and death totals.
  Summary(SelectorArgs),

  /// Most-complained-about components.
  Components {
    #[command(flatten)]
    selector: SelectorArgs,
    #[arg(long, default_value_t = DEFAULT_COMPONENT_LIMIT)]
    limit:    usize,
  },

  /// Complaint counts per month or year.
  Trend {
    #[command(flatten)]
    selector: SelectorArgs,
    /// `month` or `year`.
    #[arg(long, default_value = "month")]
    bucket:   Bucket,
  },

  /// Complaints whose summary contains TEXT (case-insensitive).
  Search {
    #[command(flatten)]
    selector: SelectorArgs,
    text:     String,
    #[arg(long)]
    limit:    Option<usize>,
  },

  /// Recall campaigns, newest first.
  Recalls(SelectorArgs),

  /// Every cached complaint, newest first.
  Complaints(SelectorArgs),

  /// Every cached vehicle.
  Vehicles,

  /// Serve the JSON API.
  Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  if let Some(parent) = settings.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  let store = Arc::new(store);

  match cli.command {
    Command::Ingest(selector) => {
      let pipeline = pipeline(&settings, store)?;
      commands::ingest(&pipeline, &selector).await
    }
    Command::Summary(selector) => commands::summary(&*store, &selector).await,
    Command::Components { selector, limit } => {
      commands::components(&*store, &selector, limit).await
    }
    Command::Trend { selector, bucket } => commands::trend(&*store, &selector, bucket).await,
    Command::Search { selector, text, limit } => {
      commands::search(&*store, &selector, &text, limit).await
    }
    Command::Recalls(selector) => commands::recalls(&*store, &selector).await,
    Command::Complaints(selector) => commands::complaints(&*store, &selector).await,
    Command::Vehicles => commands::vehicles(&*store).await,
    Command::Serve => serve(&settings, store).await,
  }
}

fn pipeline(
  settings: &Settings,
  store:    Arc<SqliteStore>,
) -> anyhow::Result<Pipeline<SqliteStore, NhtsaClient>> {
  let client = NhtsaClient::new(settings.nhtsa.clone()).context("failed to build HTTP client")?;
  Ok(Pipeline::new(store, Arc::new(client), settings.retry))
}

async fn serve(settings: &Settings, store: Arc<SqliteStore>) -> anyhow::Result<()> {
  let pipeline = Arc::new(pipeline(settings, store)?);
  let app = defect_api::api_router(AppState::new(pipeline)).layer(TraceLayer::new_for_http());

  let address = settings.bind_address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

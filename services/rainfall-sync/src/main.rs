//! Rainfall sync batch job.
//!
//! Reconciles forecast and observed rainfall into the simulation store:
//! - Per-grid-cell 5-minute series built by resampling and model averaging
//! - Incremental runs driven by a durable per-series cursor
//! - Grid mapping import and schema migration subcommands

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use rain_common::{GridInterpolation, ModelFamily};
use rainfall_sync::config::load_job_configs;
use rainfall_sync::job::{run_job, Stores};
use storage::{
    PgForecastStore, PgObservationStore, PgReferenceStore, PgSimulationStore, ReferenceStore,
};
use sync::geometry::load_grid_mappings;
use sync::SyncSummary;

#[derive(Parser, Debug)]
#[command(name = "rainfall-sync")]
#[command(about = "Sync forecast and observed rainfall onto 5-minute grid cell series")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Simulation store (run/data/grid_map tables)
    #[arg(long, env = "SIM_DATABASE_URL")]
    sim_database_url: String,

    /// Maximum connections per pool
    #[arg(long, default_value = "4")]
    max_connections: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every enabled job once
    Run {
        /// Configuration directory (contains jobs/*.yaml)
        #[arg(long, env = "CONFIG_DIR", default_value = "config")]
        config_dir: PathBuf,

        /// Run only this job id
        #[arg(long)]
        job: Option<String>,

        /// Forecast store
        #[arg(long, env = "FCST_DATABASE_URL")]
        fcst_database_url: Option<String>,

        /// Observation store
        #[arg(long, env = "OBS_DATABASE_URL")]
        obs_database_url: Option<String>,
    },

    /// Create simulation and reference tables if absent
    Migrate,

    /// Upsert a grid mapping CSV (grid_index,obs1,obs2,obs3,fcst)
    ImportMappings {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long)]
        model_family: String,

        #[arg(long, default_value = "MDPA")]
        grid_interpolation: String,
    },
}

/// Pools opened for one invocation.
struct Pools {
    sim: PgPool,
    fcst: Option<PgPool>,
    obs: Option<PgPool>,
}

impl Pools {
    async fn close(self) {
        self.sim.close().await;
        if let Some(pool) = self.fcst {
            pool.close().await;
        }
        if let Some(pool) = self.obs {
            pool.close().await;
        }
        info!("Closed database pools");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match &args.command {
        Command::Run {
            config_dir,
            job,
            fcst_database_url,
            obs_database_url,
        } => {
            run(
                &args,
                config_dir,
                job.as_deref(),
                fcst_database_url.as_deref(),
                obs_database_url.as_deref(),
            )
            .await
        }
        Command::Migrate => migrate(&args).await,
        Command::ImportMappings {
            csv,
            model_family,
            grid_interpolation,
        } => import_mappings(&args, csv, model_family, grid_interpolation).await,
    }
}

async fn run(
    args: &Args,
    config_dir: &std::path::Path,
    only_job: Option<&str>,
    fcst_url: Option<&str>,
    obs_url: Option<&str>,
) -> Result<()> {
    info!(config_dir = %config_dir.display(), "Starting rainfall sync");

    let jobs: Vec<_> = load_job_configs(config_dir)?
        .into_iter()
        .filter(|job| only_job.map_or(true, |id| job.job.id == id))
        .collect();
    if jobs.is_empty() {
        bail!("No enabled jobs to run");
    }

    let needs_fcst = jobs.iter().any(|j| j.is_forecast());
    let needs_obs = jobs.iter().any(|j| !j.is_forecast());

    let sim = storage::connect(&args.sim_database_url, args.max_connections).await?;
    let pools = Pools {
        sim,
        fcst: None,
        obs: None,
    };
    let pools = match open_optional(pools, needs_fcst, fcst_url, needs_obs, obs_url, args).await {
        Ok(pools) => pools,
        Err(e) => {
            error!(error = %e, "Failed to open upstream pools");
            return Err(e);
        }
    };

    let stores = Stores {
        reference: Arc::new(PgReferenceStore::new(pools.sim.clone())),
        simulation: Arc::new(PgSimulationStore::new(pools.sim.clone())),
        forecast: pools
            .fcst
            .clone()
            .map(|p| Arc::new(PgForecastStore::new(p)) as Arc<dyn storage::ForecastStore>),
        observation: pools
            .obs
            .clone()
            .map(|p| Arc::new(PgObservationStore::new(p)) as Arc<dyn storage::ObservationStore>),
    };

    let now = chrono::Local::now().naive_local();
    let mut total = SyncSummary::default();
    let mut failed_jobs = Vec::new();

    for job in &jobs {
        match run_job(job, config_dir, &stores, now).await {
            Ok(summary) => {
                info!(job = %job.job.id, summary = %summary, "Job complete");
                total.merge(summary);
            }
            Err(e) => {
                error!(job = %job.job.id, error = %e, "Job failed");
                failed_jobs.push(job.job.id.clone());
            }
        }
    }

    pools.close().await;

    if !failed_jobs.is_empty() || total.has_failures() {
        error!(
            summary = %total,
            failed_jobs = ?failed_jobs,
            "Rainfall sync finished with failures"
        );
        return Err(anyhow!(
            "{} job(s) failed, {} cell(s) failed",
            failed_jobs.len(),
            total.failed
        ));
    }

    info!(summary = %total, "Rainfall sync complete");
    Ok(())
}

/// Open the upstream pools the jobs need. The simulation pool is closed
/// before returning an error.
async fn open_optional(
    mut pools: Pools,
    needs_fcst: bool,
    fcst_url: Option<&str>,
    needs_obs: bool,
    obs_url: Option<&str>,
    args: &Args,
) -> Result<Pools> {
    let result: Result<()> = async {
        if needs_fcst {
            let url = fcst_url.context("FCST_DATABASE_URL is required by forecast jobs")?;
            pools.fcst = Some(storage::connect(url, args.max_connections).await?);
        }
        if needs_obs {
            let url = obs_url.context("OBS_DATABASE_URL is required by observation jobs")?;
            pools.obs = Some(storage::connect(url, args.max_connections).await?);
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => Ok(pools),
        Err(e) => {
            pools.close().await;
            Err(e)
        }
    }
}

async fn migrate(args: &Args) -> Result<()> {
    let pool = storage::connect(&args.sim_database_url, args.max_connections).await?;

    let result = async {
        PgSimulationStore::new(pool.clone()).migrate().await?;
        PgReferenceStore::new(pool.clone()).migrate().await?;
        Ok::<_, rain_common::SyncError>(())
    }
    .await;

    pool.close().await;
    result?;
    info!("Migration complete");
    Ok(())
}

async fn import_mappings(
    args: &Args,
    csv: &std::path::Path,
    model_family: &str,
    grid_interpolation: &str,
) -> Result<()> {
    let family = ModelFamily::new(model_family)?;
    let interpolation = GridInterpolation::new(grid_interpolation)?;
    let records = load_grid_mappings(csv, &family, &interpolation)
        .with_context(|| format!("Failed to load mapping CSV: {}", csv.display()))?;

    let pool = storage::connect(&args.sim_database_url, args.max_connections).await?;
    let result = PgReferenceStore::new(pool.clone())
        .upsert_grid_mappings(&records)
        .await;
    pool.close().await;

    let written = result?;
    info!(
        family = %family,
        interpolation = %interpolation,
        rows = records.len(),
        written,
        "Imported grid mappings"
    );
    Ok(())
}

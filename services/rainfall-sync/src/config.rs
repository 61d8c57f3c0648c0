//! Job configuration loading.
//!
//! Loads sync job definitions from YAML files in `<config-dir>/jobs/`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use rain_common::{GridInterpolation, ModelFamily, ValueMethod};
use sync::MappingKind;

/// Root configuration loaded from a job YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub job: JobInfo,
    pub target: TargetConfig,
    pub cells: CellsConfig,
    pub source: SourceConfig,
}

/// Basic job identification.
#[derive(Debug, Clone, Deserialize)]
pub struct JobInfo {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// The simulation-store series this job writes.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Hydrological model the series feed (e.g. `FLO2D_250`, `HecHMS`)
    pub model: String,
    pub method: ValueMethod,
    pub grid_interpolation: GridInterpolation,
    /// Grid id prefix; ignored for station cells, which use `rainfall`
    #[serde(default)]
    pub model_family: Option<ModelFamily>,
}

/// Where the grid cells come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CellsConfig {
    /// Model grid geometry CSV; stations resolved from the reference store
    Geometry { path: PathBuf },
    /// Active observation station CSV; each station is its own cell
    Stations { path: PathBuf },
}

/// Upstream data for the job.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Forecast(ForecastSourceConfig),
    Observation(ObservationSourceConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastSourceConfig {
    #[serde(default = "default_sim_tag")]
    pub sim_tag: String,
    #[serde(default = "default_variable_id")]
    pub variable_id: i32,
    #[serde(default = "default_unit_id")]
    pub unit_id: i32,
    pub models: Vec<ForecastModelRef>,
}

fn default_sim_tag() -> String {
    "evening_18hrs".to_string()
}

fn default_variable_id() -> i32 {
    1
}

fn default_unit_id() -> i32 {
    1
}

/// One `(model, version)` pair in the forecast store.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastModelRef {
    pub model: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservationSourceConfig {
    /// Window fetched for cells that were never synced
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
}

fn default_lookback_hours() -> u32 {
    24
}

impl JobConfig {
    /// Load a job configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: JobConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid job config: {}", path.display()))?;

        debug!(job = %config.job.id, path = %path.display(), "Loaded job config");
        Ok(config)
    }

    /// Reject combinations the driver cannot run.
    pub fn validate(&self) -> Result<()> {
        match (&self.cells, &self.source) {
            (CellsConfig::Stations { .. }, SourceConfig::Forecast(_)) => {
                bail!("station cells have no forecast mapping")
            }
            (CellsConfig::Geometry { .. }, _) if self.target.model_family.is_none() => {
                bail!("geometry cells need target.model_family")
            }
            _ => {}
        }

        match &self.source {
            SourceConfig::Forecast(f) if f.models.is_empty() => {
                bail!("forecast source lists no models")
            }
            SourceConfig::Forecast(_) if self.target.method == ValueMethod::Observation => {
                bail!("forecast source cannot write {} series", ValueMethod::Observation)
            }
            SourceConfig::Observation(_) if self.target.method != ValueMethod::Observation => {
                bail!("observation source must write {} series", ValueMethod::Observation)
            }
            _ => Ok(()),
        }
    }

    pub fn is_forecast(&self) -> bool {
        matches!(self.source, SourceConfig::Forecast(_))
    }

    /// Which mapping columns feed geometry cells.
    pub fn mapping_kind(&self) -> MappingKind {
        match self.source {
            SourceConfig::Forecast(_) => MappingKind::Forecast,
            SourceConfig::Observation(_) => MappingKind::Observation,
        }
    }
}

/// Resolve `path` against `config_dir` unless it is absolute.
pub fn resolve_path(config_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config_dir.join(path)
    }
}

/// Load all enabled job configurations from a directory.
pub fn load_job_configs(config_dir: &Path) -> Result<Vec<JobConfig>> {
    let jobs_dir = config_dir.join("jobs");

    if !jobs_dir.exists() {
        warn!(path = %jobs_dir.display(), "Jobs config directory not found");
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(&jobs_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "yaml" || ext == "yml"))
        .collect();
    paths.sort();

    let mut configs = Vec::new();
    for path in paths {
        match JobConfig::load(&path) {
            Ok(config) => {
                if config.job.enabled {
                    info!(job = %config.job.id, "Loaded job configuration");
                    configs.push(config);
                } else {
                    debug!(job = %config.job.id, "Skipping disabled job");
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "Failed to load job config");
            }
        }
    }

    info!(count = configs.len(), "Loaded job configurations");
    Ok(configs)
}

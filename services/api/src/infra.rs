use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use preclinitrain::access::RoleBasedPolicy;
use preclinitrain::config::EngineConfig;
use preclinitrain::error::AppError;
use preclinitrain::workflows::competency::CompetencyService;
use preclinitrain::workflows::continuous_training::ContinuousTrainingService;
use preclinitrain::workflows::memory::{Dataset, InMemoryStore};
use preclinitrain::workflows::time::parse_instant;
use preclinitrain::workflows::EngineError;
use tracing::info;

use crate::demo::demo_dataset;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Both engine services wired to one in-memory store.
pub(crate) struct Engine {
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) competencies: CompetencyService<InMemoryStore, RoleBasedPolicy>,
    pub(crate) training: ContinuousTrainingService<InMemoryStore, RoleBasedPolicy>,
}

impl Engine {
    pub(crate) fn from_dataset(dataset: Dataset, reconcile_attempts: u32) -> Result<Self, AppError> {
        let policy = Arc::new(dataset.access.policy());
        let store = Arc::new(InMemoryStore::from_dataset(dataset).map_err(EngineError::from)?);

        Ok(Self {
            competencies: CompetencyService::new(store.clone(), policy.clone())
                .with_reconcile_attempts(reconcile_attempts),
            training: ContinuousTrainingService::new(store.clone(), policy),
            store,
        })
    }

    /// Loads the configured dataset, falling back to the bundled demo records.
    pub(crate) fn load(config: &EngineConfig, now: DateTime<Utc>) -> Result<Self, AppError> {
        let dataset = match &config.data_file {
            Some(path) => read_dataset(path)?,
            None => {
                info!("no dataset configured; using demo records");
                demo_dataset(now)
            }
        };
        Self::from_dataset(dataset, config.reconcile_attempts)
    }
}

pub(crate) fn read_dataset(path: &Path) -> Result<Dataset, AppError> {
    let file = File::open(path)?;
    let dataset = Dataset::from_reader(BufReader::new(file))?;
    info!(
        path = %path.display(),
        users = dataset.users.len(),
        skills = dataset.skills.len(),
        competencies = dataset.competencies.len(),
        attendances = dataset.attendances.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// clap value parser accepting the same date and timestamp forms as the engine.
pub(crate) fn parse_instant_arg(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_instant(raw).map_err(|err| err.to_string())
}

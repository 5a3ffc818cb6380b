// Ingestion pipeline
// JSONL file -> per-user table append -> occasional maintenance


use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use crate::IngestError;
use crate::config::{Config, ConfigError, MaintenanceConfig};
use crate::database::{UserTable, connect};
use crate::jsonl::read_records;

/// Decides whether an ingestion run should also optimize the table
pub trait MaintenancePolicy: Send + Sync {
    fn should_optimize(&self) -> bool;
}

/// Optimizes with a fixed probability, drawn from a seedable generator
#[derive(Debug)]
pub struct RandomMaintenance {
    probability: f64,
    rng: Mutex<StdRng>,
}

impl RandomMaintenance {
    #[inline]
    pub fn new(probability: f64) -> Result<Self, ConfigError> {
        Self::with_rng(probability, StdRng::from_entropy())
    }

    /// Deterministic decisions for a given seed
    #[inline]
    pub fn seeded(probability: f64, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(probability, StdRng::seed_from_u64(seed))
    }

    #[inline]
    pub fn from_config(config: &MaintenanceConfig) -> Result<Self, ConfigError> {
        match config.seed {
            Some(seed) => Self::seeded(config.probability, seed),
            None => Self::new(config.probability),
        }
    }

    fn with_rng(probability: f64, rng: StdRng) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::InvalidProbability(probability));
        }
        Ok(Self {
            probability,
            rng: Mutex::new(rng),
        })
    }

    #[inline]
    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl MaintenancePolicy for RandomMaintenance {
    #[inline]
    fn should_optimize(&self) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_bool(self.probability)
    }
}

/// Result of a single ingestion run
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub table: UserTable,
    pub rows_appended: usize,
    pub optimized: bool,
}

/// Runs the JSONL ingestion pipeline against the configured database
pub struct Ingestor {
    config: Config,
    maintenance: Box<dyn MaintenancePolicy>,
}

impl Ingestor {
    /// Create an ingestor whose maintenance policy follows `config.maintenance`
    #[inline]
    pub fn new(config: Config) -> Result<Self, IngestError> {
        let maintenance = RandomMaintenance::from_config(&config.maintenance)?;
        Ok(Self::with_policy(config, maintenance))
    }

    #[inline]
    pub fn with_policy<P>(config: Config, maintenance: P) -> Self
    where
        P: MaintenancePolicy + 'static,
    {
        Self {
            config,
            maintenance: Box::new(maintenance),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Append the records of the JSONL file for `url` to the table named
    /// `user_id`, optimizing the table when the maintenance policy says so.
    ///
    /// Not idempotent: running twice appends the records twice.
    #[inline]
    pub async fn ingest_jsonl(
        &self,
        url: &str,
        user_id: &str,
    ) -> Result<IngestOutcome, IngestError> {
        let records = read_records(self.config.get_base_dir(), url).await?;

        let connection = connect(&self.config).await?;
        let table = UserTable::open_or_create(&connection, user_id).await?;
        let rows_appended = table.append(&records).await?;
        debug!("Appended {} rows to {}", rows_appended, user_id);

        let optimized = self.maintenance.should_optimize();
        if optimized {
            table.optimize(chrono::Duration::zero()).await?;
            info!("{} table optimized", user_id);
        } else {
            info!("{} table not optimized this time", user_id);
        }

        Ok(IngestOutcome {
            table,
            rows_appended,
            optimized,
        })
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

use crate::config::Settings;
use crate::error::Result;
use crate::processors::ingestion::{IngestReport, IngestionPipeline};
use crate::processors::statistics_aggregator::{AggregationReport, StatisticsAggregator};
use crate::storage::{Store, Table};
use crate::utils::progress::ProgressReporter;
use std::path::Path;
use tracing::info;

/// What a gated `initialize` run actually did
#[derive(Debug, Clone, Default)]
pub struct InitializeReport {
    pub ingest: Option<IngestReport>,
    pub statistics: Option<AggregationReport>,
}

/// Entry points for callers: load a folder, compute statistics, or both on startup.
pub struct WeatherPipeline {
    store: Store,
    settings: Settings,
}

impl WeatherPipeline {
    pub fn new(store: Store, settings: Settings) -> Self {
        Self { store, settings }
    }

    /// Connect using `settings` and build the pipeline around the new store.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let store = Store::connect(&settings).await?;
        Ok(Self::new(store, settings))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn ingest_folder(
        &self,
        path: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<IngestReport> {
        let ingest = &self.settings.ingest;
        IngestionPipeline::new(self.store.clone(), ingest.max_workers)
            .with_batch_size(ingest.batch_size)
            .with_file_extension(&ingest.file_extension)
            .ingest_folder(path, progress)
            .await
    }

    pub async fn compute_statistics(&self) -> Result<AggregationReport> {
        StatisticsAggregator::new(&self.store)
            .with_policy(self.settings.statistics.conflict_policy)
            .with_batch_size(self.settings.ingest.batch_size)
            .aggregate()
            .await
    }

    /// Startup gate: ingest only when stations or records are empty, aggregate
    /// only when statistics are empty.
    pub async fn initialize(
        &self,
        path: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<InitializeReport> {
        self.store.ensure_schema().await?;
        let mut report = InitializeReport::default();

        if self.store.is_empty(Table::Records).await? || self.store.is_empty(Table::Stations).await? {
            report.ingest = Some(self.ingest_folder(path, progress).await?);
        } else {
            info!("Records already loaded, skipping ingestion");
        }

        if self.store.is_empty(Table::Statistics).await? {
            report.statistics = Some(self.compute_statistics().await?);
        } else {
            info!("Statistics already present, skipping aggregation");
        }

        Ok(report)
    }
}

pub mod ingestion;
pub mod pipeline;
pub mod statistics_aggregator;

pub use ingestion::{FileFailure, FileOutcome, IngestReport, IngestionPipeline};
pub use pipeline::{InitializeReport, WeatherPipeline};
pub use statistics_aggregator::{summarize, AggregationReport, StatisticsAggregator};

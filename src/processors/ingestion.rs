use crate::error::{IngestError, Result, Severity};
use crate::readers::{discover_station_files, ParseStats, RecordReader, StationFile};
use crate::storage::{LoadSummary, RecordLoader, StationResolver, Store};
use crate::utils::constants::{DEFAULT_BATCH_SIZE, DEFAULT_FILE_EXTENSION};
use crate::utils::progress::ProgressReporter;
use chrono::Local;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Result of ingesting one file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub station_name: String,
    pub station_id: i64,
    pub parse: ParseStats,
    pub load: LoadSummary,
}

/// A file that was skipped because of a problem confined to it
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub station_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub files_found: usize,
    pub files_loaded: usize,
    pub records_parsed: usize,
    pub records_inserted: u64,
    pub lines_dropped: usize,
    pub failures: Vec<FileFailure>,
}

impl IngestReport {
    fn add(&mut self, outcome: &FileOutcome) {
        self.files_loaded += 1;
        self.records_parsed += outcome.parse.records;
        self.records_inserted += outcome.load.inserted;
        self.lines_dropped += outcome.parse.dropped_missing;
    }

    pub fn summary(&self) -> String {
        format!(
            "Files: {} found, {} loaded, {} failed\nRecords: {} parsed, {} inserted, {} lines dropped for missing values",
            self.files_found,
            self.files_loaded,
            self.failures.len(),
            self.records_parsed,
            self.records_inserted,
            self.lines_dropped
        )
    }
}

/// Loads a folder of station files with a bounded number of files in flight.
///
/// Each file is resolved, parsed and committed on its own, so a broken file
/// never takes records of other files with it.
pub struct IngestionPipeline {
    store: Store,
    reader: RecordReader,
    max_workers: usize,
    batch_size: usize,
    file_extension: String,
}

impl IngestionPipeline {
    pub fn new(store: Store, max_workers: usize) -> Self {
        Self {
            store,
            reader: RecordReader::new(),
            max_workers: max_workers.max(1),
            batch_size: DEFAULT_BATCH_SIZE,
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_file_extension(mut self, extension: &str) -> Self {
        self.file_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub async fn ingest_folder(
        &self,
        dir_path: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<IngestReport> {
        let started = Local::now();
        info!(folder = %dir_path.display(), %started, "Data load started");

        let files = discover_station_files(dir_path, &self.file_extension)?;
        let mut report = IngestReport {
            files_found: files.len(),
            ..Default::default()
        };

        if let Some(p) = progress {
            p.set_length(files.len() as u64);
        }

        let mut outcomes = stream::iter(files)
            .map(|file| async move {
                let result = self.ingest_file(&file).await;
                (file, result)
            })
            .buffer_unordered(self.max_workers);

        while let Some((file, result)) = outcomes.next().await {
            if let Some(p) = progress {
                p.set_message(&format!("Processed {}", file.station_name));
                p.increment(1);
            }

            match result {
                Ok(outcome) => report.add(&outcome),
                Err(e) => match e.severity() {
                    Severity::FileLocal => {
                        warn!(
                            path = %file.path.display(),
                            station = %file.station_name,
                            error = %e,
                            "Skipping file"
                        );
                        report.failures.push(FileFailure {
                            path: file.path,
                            station_name: file.station_name,
                            reason: e.to_string(),
                        });
                    }
                    Severity::Fatal => {
                        error!(path = %file.path.display(), error = %e, "Ingestion aborted");
                        return Err(e);
                    }
                    Severity::Retryable => {
                        error!(
                            path = %file.path.display(),
                            files_committed = report.files_loaded,
                            error = %e,
                            "Ingestion interrupted"
                        );
                        return Err(IngestError::Interrupted {
                            files_committed: report.files_loaded,
                            source: Box::new(e),
                        });
                    }
                },
            }
        }

        if let Some(p) = progress {
            p.finish_with_message(&format!("Loaded {} files", report.files_loaded));
        }

        info!(
            started = %started,
            finished = %Local::now(),
            files = report.files_loaded,
            failed = report.failures.len(),
            inserted = report.records_inserted,
            "Data load finished"
        );

        Ok(report)
    }

    /// Resolve, parse and load a single file.
    pub async fn ingest_file(&self, file: &StationFile) -> Result<FileOutcome> {
        let station_id = StationResolver::new(&self.store)
            .resolve(&file.station_name)
            .await?;

        let reader = self.reader;
        let path = file.path.clone();
        let (records, parse) =
            tokio::task::spawn_blocking(move || reader.read_file(&path, station_id)?.collect_with_stats())
                .await??;

        let load = RecordLoader::new(&self.store)
            .with_batch_size(self.batch_size)
            .load(&records)
            .await?;

        debug!(
            station = %file.station_name,
            station_id,
            parsed = parse.records,
            dropped = parse.dropped_missing,
            inserted = load.inserted,
            "File loaded"
        );

        Ok(FileOutcome {
            station_name: file.station_name.clone(),
            station_id,
            parse,
            load,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::temp_store;
    use crate::storage::Table;
    use tempfile::TempDir;

    fn write_station(dir: &Path, name: &str, lines: &[&str]) {
        let mut content = lines.join("\n");
        content.push('\n');
        std::fs::write(dir.join(format!("{}.txt", name)), content).unwrap();
    }

    #[tokio::test]
    async fn test_ingest_folder_counts() {
        let (store, _db) = temp_store().await;
        let input = TempDir::new().unwrap();
        write_station(
            input.path(),
            "STATION_A",
            &["20200101\t100\t-20\t50", "20200102\t-9999\t-9999\t-9999"],
        );
        write_station(input.path(), "STATION_B", &["20200101\t80\t-40\t0"]);

        let pipeline = IngestionPipeline::new(store.clone(), 2);
        let report = pipeline.ingest_folder(input.path(), None).await.unwrap();

        assert_eq!(report.files_found, 2);
        assert_eq!(report.files_loaded, 2);
        assert_eq!(report.records_parsed, 2);
        assert_eq!(report.records_inserted, 2);
        assert_eq!(report.lines_dropped, 1);
        assert!(report.failures.is_empty());
        assert_eq!(store.count(Table::Stations).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_broken_file_is_isolated() {
        let (store, _db) = temp_store().await;
        let input = TempDir::new().unwrap();
        write_station(input.path(), "GOOD", &["20200101\t100\t-20\t50"]);
        write_station(
            input.path(),
            "BROKEN",
            &["20200101\t100\t-20\t50", "2020XX02\t100\t-20\t50"],
        );

        let pipeline = IngestionPipeline::new(store.clone(), 4);
        let report = pipeline.ingest_folder(input.path(), None).await.unwrap();

        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].station_name, "BROKEN");
        assert!(report.failures[0].reason.contains("line 2"));
        assert_eq!(store.count(Table::Records).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_file_is_isolated() {
        let (store, _db) = temp_store().await;
        let input = TempDir::new().unwrap();
        write_station(input.path(), "A_GOOD", &["20200101\t100\t-20\t50"]);
        std::fs::write(
            input.path().join("B_BAD.txt"),
            b"20200101\t100\t-20\t50\n20200102\t\xff\t-20\t50\n",
        )
        .unwrap();
        write_station(input.path(), "C_GOOD", &["20200101\t90\t-10\t0"]);

        let pipeline = IngestionPipeline::new(store.clone(), 1);
        let report = pipeline.ingest_folder(input.path(), None).await.unwrap();

        assert_eq!(report.files_found, 3);
        assert_eq!(report.files_loaded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].station_name, "B_BAD");
        assert_eq!(store.count(Table::Records).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_custom_extension() {
        let (store, _db) = temp_store().await;
        let input = TempDir::new().unwrap();
        std::fs::write(input.path().join("STATION_A.dat"), "20200101\t1\t2\t3\n").unwrap();
        write_station(input.path(), "IGNORED", &["20200101\t1\t2\t3"]);

        let pipeline = IngestionPipeline::new(store.clone(), 1).with_file_extension(".dat");
        let progress = ProgressReporter::new(0, "Processing files...", true);
        let report = pipeline
            .ingest_folder(input.path(), Some(&progress))
            .await
            .unwrap();

        assert_eq!(report.files_found, 1);
        assert_eq!(report.files_loaded, 1);
    }
}

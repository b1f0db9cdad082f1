use crate::error::Result;
use crate::models::Record;
use crate::storage::Store;
use crate::utils::constants::{DEFAULT_BATCH_SIZE, MAX_BIND_PARAMETERS};
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

const RECORD_COLUMNS: usize = 5;

/// Outcome of one `load` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub submitted: usize,
    pub inserted: u64,
}

impl LoadSummary {
    /// Records that were already present
    pub fn duplicates(&self) -> u64 {
        self.submitted as u64 - self.inserted
    }
}

/// Persists records keyed by (date, station_id).
///
/// A call writes everything it is given in one transaction, as multi-row
/// inserts of at most `batch_size` rows. Rows that already exist are skipped,
/// so loading the same records twice leaves the table unchanged.
pub struct RecordLoader<'a> {
    store: &'a Store,
    batch_size: usize,
}

impl<'a> RecordLoader<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BIND_PARAMETERS / RECORD_COLUMNS);
        self
    }

    pub async fn load(&self, records: &[Record]) -> Result<LoadSummary> {
        if records.is_empty() {
            return Ok(LoadSummary::default());
        }

        self.store
            .with_retry("load records", move || self.load_once(records))
            .await
    }

    async fn load_once(&self, records: &[Record]) -> Result<LoadSummary> {
        let mut tx = self.store.pool().begin().await?;
        let mut inserted = 0;

        for chunk in records.chunks(self.batch_size) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO records (date, station_id, max_temperature, min_temperature, precipitation) ",
            );
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.date)
                    .push_bind(record.station_id)
                    .push_bind(record.max_temperature)
                    .push_bind(record.min_temperature)
                    .push_bind(record.precipitation);
            });
            builder.push(" ON CONFLICT (date, station_id) DO NOTHING");

            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        debug!(submitted = records.len(), inserted, "Loaded records");
        Ok(LoadSummary {
            submitted: records.len(),
            inserted,
        })
    }
}

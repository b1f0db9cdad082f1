use crate::config::ConflictPolicy;
use crate::error::Result;
use crate::models::{Record, Statistic, YearlyAccumulator};
use crate::storage::Store;
use crate::utils::constants::{DEFAULT_BATCH_SIZE, MAX_BIND_PARAMETERS};
use chrono::Datelike;
use futures::TryStreamExt;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::BTreeMap;
use tracing::info;

const STATISTIC_COLUMNS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationReport {
    pub records_scanned: u64,
    pub groups: usize,
    pub written: u64,
}

/// Group complete records by (station_id, year) and reduce each group.
pub fn summarize<'r>(records: impl IntoIterator<Item = &'r Record>) -> Vec<Statistic> {
    let mut groups = BTreeMap::new();
    for record in records {
        accumulate(&mut groups, record);
    }
    finish(&groups)
}

fn accumulate(groups: &mut BTreeMap<(i64, i32), YearlyAccumulator>, record: &Record) {
    if record.is_complete() {
        groups
            .entry((record.station_id, record.date.year()))
            .or_default()
            .add(record);
    }
}

fn finish(groups: &BTreeMap<(i64, i32), YearlyAccumulator>) -> Vec<Statistic> {
    groups
        .iter()
        .filter_map(|(&(station_id, year), acc)| acc.finish(station_id, year))
        .collect()
}

/// Rebuilds yearly per-station statistics from the full record history.
///
/// Each run rescans every record. With [`ConflictPolicy::Skip`] only groups
/// without an existing row take effect, so re-running is harmless.
pub struct StatisticsAggregator<'a> {
    store: &'a Store,
    policy: ConflictPolicy,
    batch_size: usize,
}

impl<'a> StatisticsAggregator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            policy: ConflictPolicy::Skip,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BIND_PARAMETERS / STATISTIC_COLUMNS);
        self
    }

    pub async fn aggregate(&self) -> Result<AggregationReport> {
        let (statistics, records_scanned) = self
            .store
            .with_retry("scan records", move || self.compute())
            .await?;

        let statistics = &statistics;
        let written = self
            .store
            .with_retry("write statistics", move || self.write(statistics))
            .await?;

        let report = AggregationReport {
            records_scanned,
            groups: statistics.len(),
            written,
        };

        info!(
            scanned = report.records_scanned,
            groups = report.groups,
            written = report.written,
            policy = ?self.policy,
            "Statistics computed"
        );

        Ok(report)
    }

    async fn compute(&self) -> Result<(Vec<Statistic>, u64)> {
        let mut groups = BTreeMap::new();
        let mut scanned = 0;

        let mut rows = sqlx::query_as::<_, Record>(
            r#"
            SELECT date, station_id, max_temperature, min_temperature, precipitation
            FROM records
            WHERE max_temperature IS NOT NULL
              AND min_temperature IS NOT NULL
              AND precipitation IS NOT NULL
            "#,
        )
        .fetch(self.store.pool());

        while let Some(record) = rows.try_next().await? {
            scanned += 1;
            accumulate(&mut groups, &record);
        }

        Ok((finish(&groups), scanned))
    }

    async fn write(&self, statistics: &[Statistic]) -> Result<u64> {
        if statistics.is_empty() {
            return Ok(0);
        }

        let conflict_clause = match self.policy {
            ConflictPolicy::Skip => " ON CONFLICT (station_id, year) DO NOTHING",
            ConflictPolicy::Refresh => {
                " ON CONFLICT (station_id, year) DO UPDATE SET \
                 avg_max_temperature = excluded.avg_max_temperature, \
                 avg_min_temperature = excluded.avg_min_temperature, \
                 total_precipitation = excluded.total_precipitation"
            }
        };

        let mut tx = self.store.pool().begin().await?;
        let mut written = 0;

        for chunk in statistics.chunks(self.batch_size) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO statistics (station_id, year, avg_max_temperature, avg_min_temperature, total_precipitation) ",
            );
            builder.push_values(chunk, |mut row, stat| {
                row.push_bind(stat.station_id)
                    .push_bind(stat.year)
                    .push_bind(stat.avg_max_temperature)
                    .push_bind(stat.avg_min_temperature)
                    .push_bind(stat.total_precipitation);
            });
            builder.push(conflict_clause);

            written += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }
}

//! Read-side access to the materialized tables with filtering and pagination.

use crate::error::Result;
use crate::models::{Record, Station, Statistic};
use crate::storage::Store;
use crate::utils::constants::DEFAULT_PAGE_LIMIT;
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite};

/// Zero-based page of at most `limit` rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit: limit.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFilter {
    pub station_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticFilter {
    pub station_id: Option<i64>,
    pub year: Option<i32>,
}

pub async fn station_by_name(store: &Store, name: &str) -> Result<Option<Station>> {
    let station = sqlx::query_as::<_, Station>("SELECT id, name FROM stations WHERE name = ?1")
        .bind(name)
        .fetch_optional(store.pool())
        .await?;
    Ok(station)
}

pub async fn list_records(store: &Store, filter: RecordFilter, page: Page) -> Result<Vec<Record>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT date, station_id, max_temperature, min_temperature, precipitation FROM records WHERE 1 = 1",
    );

    if let Some(station_id) = filter.station_id {
        builder.push(" AND station_id = ").push_bind(station_id);
    }
    if let Some(date) = filter.date {
        builder.push(" AND date = ").push_bind(date);
    }

    builder
        .push(" ORDER BY station_id, date LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset());

    let records = builder
        .build_query_as::<Record>()
        .fetch_all(store.pool())
        .await?;
    Ok(records)
}

pub async fn list_statistics(
    store: &Store,
    filter: StatisticFilter,
    page: Page,
) -> Result<Vec<Statistic>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT station_id, year, avg_max_temperature, avg_min_temperature, total_precipitation FROM statistics WHERE 1 = 1",
    );

    if let Some(station_id) = filter.station_id {
        builder.push(" AND station_id = ").push_bind(station_id);
    }
    if let Some(year) = filter.year {
        builder.push(" AND year = ").push_bind(year);
    }

    builder
        .push(" ORDER BY station_id, year LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset());

    let statistics = builder
        .build_query_as::<Statistic>()
        .fetch_all(store.pool())
        .await?;
    Ok(statistics)
}

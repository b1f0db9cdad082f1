use crate::error::{IngestError, Result};
use crate::storage::Store;
use tracing::debug;

/// Maps station names to their stable ids, creating stations on first sight.
///
/// Concurrent resolution of the same new name is adjudicated by the unique
/// constraint on `stations.name`: the losing insert becomes a no-op and falls
/// back to reading the winner's id.
pub struct StationResolver<'a> {
    store: &'a Store,
}

impl<'a> StationResolver<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, name: &str) -> Result<i64> {
        self.store
            .with_retry("resolve station", move || self.insert_or_fetch(name))
            .await
    }

    async fn insert_or_fetch(&self, name: &str) -> Result<i64> {
        let mut conn = self.store.pool().acquire().await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO stations (name) VALUES (?1)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(id) = inserted {
            debug!(station = name, id, "Created station");
            return Ok(id);
        }

        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM stations WHERE name = ?1")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;

        existing.ok_or_else(|| IngestError::StationIntegrity {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::temp_store;
    use crate::storage::Table;

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (store, _dir) = temp_store().await;
        let resolver = StationResolver::new(&store);

        let first = resolver.resolve("USC00110072").await.unwrap();
        let second = resolver.resolve("USC00110072").await.unwrap();
        let other = resolver.resolve("USC00110187").await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(store.count(Table::Stations).await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolve_shares_one_station() {
        let (store, _dir) = temp_store().await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { StationResolver::new(&store).resolve("STATION_A").await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.count(Table::Stations).await.unwrap(), 1);
    }
}

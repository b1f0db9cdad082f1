use serde::{Deserialize, Serialize};

/// A named observation site. `name` is the business key, `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Station {
    pub id: i64,
    pub name: String,
}

/// Table definitions, applied in order. Dates are stored as ISO-8601 text.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stations (
        id   INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS records (
        date            TEXT    NOT NULL,
        station_id      INTEGER NOT NULL REFERENCES stations (id),
        max_temperature INTEGER,
        min_temperature INTEGER,
        precipitation   INTEGER,
        PRIMARY KEY (date, station_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_records_station_id ON records (station_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS statistics (
        station_id          INTEGER NOT NULL REFERENCES stations (id),
        year                INTEGER NOT NULL,
        avg_max_temperature REAL    NOT NULL,
        avg_min_temperature REAL    NOT NULL,
        total_precipitation REAL    NOT NULL,
        PRIMARY KEY (station_id, year)
    )
    "#,
];

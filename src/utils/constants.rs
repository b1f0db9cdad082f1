/// Input file format
pub const MISSING_VALUE_SENTINEL: &str = "-9999";
pub const FIELD_SEPARATOR: char = '\t';
pub const EXPECTED_FIELDS: usize = 4;
pub const DATE_FORMAT: &str = "%Y%m%d";
pub const DEFAULT_FILE_EXTENSION: &str = "txt";

/// Unit conversion: temperatures are stored in tenths of a degree,
/// precipitation in hundredths of a unit
pub const TENTHS_PER_DEGREE: f64 = 10.0;
pub const HUNDREDTHS_PER_UNIT: f64 = 100.0;

/// Table names
pub const STATIONS_TABLE: &str = "stations";
pub const RECORDS_TABLE: &str = "records";
pub const STATISTICS_TABLE: &str = "statistics";

/// Processing defaults
pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://weather.db";
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 10;

/// Retry defaults
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 60;

/// SQLite caps bound parameters per statement at 32766
pub const MAX_BIND_PARAMETERS: usize = 32_000;

pub mod record_reader;
pub mod station_files;

pub use record_reader::{ParseStats, RecordIterator, RecordReader};
pub use station_files::{discover_station_files, StationFile};

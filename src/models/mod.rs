pub mod record;
pub mod station;
pub mod statistic;

pub use record::Record;
pub use station::Station;
pub use statistic::{Statistic, YearlyAccumulator};

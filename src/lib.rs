pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod storage;
pub mod utils;

pub use error::{IngestError, Result, Severity};

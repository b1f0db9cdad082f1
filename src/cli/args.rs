use crate::utils::constants::DEFAULT_PAGE_LIMIT;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wx-ingest")]
#[command(about = "Load daily weather station files into SQLite and derive yearly statistics")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "TOML settings file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Database URL [default: sqlite://weather.db]")]
    pub database_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load every station file in a folder
    Ingest {
        #[arg(short, long, help = "Folder of per-station observation files")]
        input_dir: PathBuf,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long)]
        batch_size: Option<usize>,

        #[arg(short, long, help = "Hide the progress bar")]
        quiet: bool,
    },

    /// Compute yearly per-station statistics from loaded records
    Aggregate {
        #[arg(long, help = "Overwrite statistics that already exist")]
        refresh: bool,
    },

    /// Ingest and aggregate, skipping steps whose tables are already populated
    Init {
        #[arg(short, long, help = "Folder of per-station observation files")]
        input_dir: PathBuf,

        #[arg(short, long, help = "Hide the progress bar")]
        quiet: bool,
    },

    /// List loaded daily records as JSON
    Records {
        #[arg(short, long)]
        station_id: Option<i64>,

        #[arg(short, long, help = "Date as YYYYMMDD or YYYY-MM-DD")]
        date: Option<String>,

        #[arg(long, default_value = "0")]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },

    /// List computed yearly statistics as JSON
    Statistics {
        #[arg(short, long)]
        station_id: Option<i64>,

        #[arg(short, long)]
        year: Option<i32>,

        #[arg(long, default_value = "0")]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },
}

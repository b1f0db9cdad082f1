use crate::cli::args::{Cli, Commands};
use crate::config::{ConflictPolicy, Settings};
use crate::error::{IngestError, Result};
use crate::processors::WeatherPipeline;
use crate::storage::queries::{list_records, list_statistics, Page, RecordFilter, StatisticFilter};
use crate::utils::logging::init_logging;
use crate::utils::progress::ProgressReporter;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        settings.database.url = url;
    }

    match cli.command {
        Commands::Ingest {
            input_dir,
            max_workers,
            batch_size,
            quiet,
        } => {
            if let Some(workers) = max_workers {
                settings.ingest.max_workers = workers.max(1);
            }
            if let Some(size) = batch_size {
                settings.ingest.batch_size = size.max(1);
            }

            let pipeline = WeatherPipeline::connect(settings).await?;
            let progress = ProgressReporter::new(0, "Processing files...", quiet);

            let report = pipeline.ingest_folder(&input_dir, Some(&progress)).await?;

            println!("{}", report.summary());
            for failure in &report.failures {
                println!("  skipped {}: {}", failure.path.display(), failure.reason);
            }
        }

        Commands::Aggregate { refresh } => {
            if refresh {
                settings.statistics.conflict_policy = ConflictPolicy::Refresh;
            }

            let pipeline = WeatherPipeline::connect(settings).await?;
            let report = pipeline.compute_statistics().await?;

            println!(
                "Scanned {} records into {} station-years, wrote {} statistics",
                report.records_scanned, report.groups, report.written
            );
        }

        Commands::Init { input_dir, quiet } => {
            info!("Data ingestion started, please wait until it completes");

            let pipeline = WeatherPipeline::connect(settings).await?;
            let progress = ProgressReporter::new(0, "Processing files...", quiet);
            let report = pipeline.initialize(&input_dir, Some(&progress)).await?;

            match report.ingest {
                Some(ingest) => println!("{}", ingest.summary()),
                None => println!("Records already loaded"),
            }
            match report.statistics {
                Some(stats) => println!("Wrote {} statistics", stats.written),
                None => println!("Statistics already present"),
            }

            info!("Data ingestion completed");
        }

        Commands::Records {
            station_id,
            date,
            page,
            limit,
        } => {
            let date = date.as_deref().map(parse_query_date).transpose()?;
            let pipeline = WeatherPipeline::connect(settings).await?;

            let filter = RecordFilter { station_id, date };
            let records = list_records(pipeline.store(), filter, Page::new(page, limit)).await?;
            print_json(&records)?;
        }

        Commands::Statistics {
            station_id,
            year,
            page,
            limit,
        } => {
            let pipeline = WeatherPipeline::connect(settings).await?;

            let filter = StatisticFilter { station_id, year };
            let statistics =
                list_statistics(pipeline.store(), filter, Page::new(page, limit)).await?;
            print_json(&statistics)?;
        }
    }

    Ok(())
}

/// Accepts `YYYYMMDD`, `YYYY-MM-DD` or `YYYY/MM/DD`
fn parse_query_date(value: &str) -> Result<NaiveDate> {
    let digits: String = value.chars().filter(|c| *c != '-' && *c != '/').collect();
    if digits.len() != 8 {
        return Err(IngestError::Config(format!(
            "Invalid date '{}', expected YYYYMMDD",
            value
        )));
    }

    NaiveDate::parse_from_str(&digits, crate::utils::constants::DATE_FORMAT)
        .map_err(|_| IngestError::Config(format!("Invalid date '{}'", value)))
}

#[derive(Serialize)]
struct Listing<'a, T> {
    count: usize,
    data: &'a [T],
}

fn print_json<T: Serialize>(rows: &[T]) -> Result<()> {
    let listing = Listing {
        count: rows.len(),
        data: rows,
    };
    let json = serde_json::to_string_pretty(&listing)
        .map_err(|e| IngestError::Config(format!("Cannot serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::io::Cursor;
use wx_ingest::models::Record;
use wx_ingest::processors::summarize;
use wx_ingest::readers::RecordReader;

// One station file worth of lines, every tenth day missing
fn create_station_file(days: usize) -> String {
    let base_date = NaiveDate::from_ymd_opt(1985, 1, 1).unwrap();
    let mut content = String::with_capacity(days * 32);

    for day in 0..days {
        let date = base_date + Duration::days(day as i64);
        if day % 10 == 9 {
            content.push_str(&format!("{}\t-9999\t-9999\t-9999\n", date.format("%Y%m%d")));
        } else {
            content.push_str(&format!(
                "{}\t{:>6}\t{:>6}\t{:>6}\n",
                date.format("%Y%m%d"),
                150 + (day % 200) as i32,
                -50 + (day % 120) as i32,
                (day % 37) as i32
            ));
        }
    }

    content
}

fn create_records(stations: usize, days: usize) -> Vec<Record> {
    let base_date = NaiveDate::from_ymd_opt(1985, 1, 1).unwrap();
    let mut records = Vec::with_capacity(stations * days);

    for station_id in 1..=stations as i64 {
        for day in 0..days {
            records.push(Record::new(
                base_date + Duration::days(day as i64),
                station_id,
                150 + (day % 200) as i32,
                -50 + (day % 120) as i32,
                (day % 37) as i32,
            ));
        }
    }

    records
}

fn benchmark_record_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_parsing");
    let reader = RecordReader::new();

    for days in [365, 3650, 10950].iter() {
        let content = create_station_file(*days);

        group.bench_with_input(BenchmarkId::new("days", days), &content, |b, content| {
            b.iter(|| {
                let (records, _) = reader
                    .records(Cursor::new(content.as_bytes()), 1)
                    .collect_with_stats()
                    .unwrap();
                black_box(records)
            })
        });
    }

    group.finish();
}

fn benchmark_yearly_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("yearly_summary");

    for stations in [10, 100].iter() {
        let records = create_records(*stations, 3650);

        group.bench_with_input(BenchmarkId::new("stations", stations), &records, |b, records| {
            b.iter(|| black_box(summarize(records)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_record_parsing, benchmark_yearly_summary);
criterion_main!(benches);

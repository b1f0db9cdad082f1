use crate::error::{IngestError, Result};
use crate::models::Record;
use crate::utils::constants::{
    DATE_FORMAT, DEFAULT_BUFFER_SIZE, EXPECTED_FIELDS, FIELD_SEPARATOR, MISSING_VALUE_SENTINEL,
};
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parses tab-separated daily observation files.
///
/// Each line is `DATE\tMAX_TEMP\tMIN_TEMP\tPRECIPITATION` with the date as
/// `YYYYMMDD` and raw integer measurements. A line holding the missing-value
/// sentinel in any field is dropped entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordReader;

/// Line counters for one parsed file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines_read: usize,
    pub records: usize,
    pub dropped_missing: usize,
    pub blank_lines: usize,
}

impl RecordReader {
    pub fn new() -> Self {
        Self
    }

    /// Open a file and stream its records. Calling again restarts from the first line.
    pub fn read_file(&self, path: &Path, station_id: i64) -> Result<RecordIterator<BufReader<File>>> {
        let file = File::open(path).map_err(|source| IngestError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
        Ok(self.records(reader, station_id))
    }

    /// Stream records from any buffered source
    pub fn records<R: BufRead>(&self, reader: R, station_id: i64) -> RecordIterator<R> {
        RecordIterator {
            reader,
            station_id,
            line: String::new(),
            stats: ParseStats::default(),
            finished: false,
        }
    }

    /// Parse one line. `Ok(None)` means the line carries no record.
    pub fn parse_line(&self, line: &str, line_number: usize, station_id: i64) -> Result<Option<Record>> {
        match classify_line(line, line_number, station_id)? {
            Line::Record(record) => Ok(Some(record)),
            Line::Blank | Line::Missing => Ok(None),
        }
    }
}

enum Line {
    Record(Record),
    Blank,
    Missing,
}

fn classify_line(line: &str, line_number: usize, station_id: i64) -> Result<Line> {
    if line.trim().is_empty() {
        return Ok(Line::Blank);
    }

    let fields: Vec<&str> = line
        .trim_end_matches(['\r', '\n'])
        .split(FIELD_SEPARATOR)
        .map(str::trim)
        .collect();

    // All-or-nothing: one missing measurement drops the whole day
    if fields.iter().any(|field| *field == MISSING_VALUE_SENTINEL) {
        return Ok(Line::Missing);
    }

    if fields.len() != EXPECTED_FIELDS {
        return Err(IngestError::MalformedLine {
            line: line_number,
            reason: format!("expected {} fields, found {}", EXPECTED_FIELDS, fields.len()),
        });
    }

    let date = NaiveDate::parse_from_str(fields[0], DATE_FORMAT).map_err(|_| {
        IngestError::InvalidDate {
            line: line_number,
            value: fields[0].to_string(),
        }
    })?;

    let max_temperature = parse_measurement(fields[1], "max temperature", line_number)?;
    let min_temperature = parse_measurement(fields[2], "min temperature", line_number)?;
    let precipitation = parse_measurement(fields[3], "precipitation", line_number)?;

    Ok(Line::Record(Record::new(
        date,
        station_id,
        max_temperature,
        min_temperature,
        precipitation,
    )))
}

fn parse_measurement(value: &str, field: &str, line_number: usize) -> Result<i32> {
    value.parse::<i32>().map_err(|_| IngestError::MalformedLine {
        line: line_number,
        reason: format!("invalid {}: '{}'", field, value),
    })
}

/// Lazy record stream over one file.
///
/// The first parse error is yielded once and ends the stream, so the rest of
/// a broken file is never read.
pub struct RecordIterator<R> {
    reader: R,
    station_id: i64,
    line: String,
    stats: ParseStats,
    finished: bool,
}

impl<R: BufRead> RecordIterator<R> {
    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Drain the stream, stopping at the first error.
    pub fn collect_with_stats(mut self) -> Result<(Vec<Record>, ParseStats)> {
        let mut records = Vec::new();
        for record in self.by_ref() {
            records.push(record?);
        }
        Ok((records, self.stats))
    }
}

impl<R: BufRead> Iterator for RecordIterator<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.line.clear();

            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {
                    self.stats.lines_read += 1;

                    match classify_line(&self.line, self.stats.lines_read, self.station_id) {
                        Ok(Line::Record(record)) => {
                            self.stats.records += 1;
                            return Some(Ok(record));
                        }
                        Ok(Line::Blank) => self.stats.blank_lines += 1,
                        Ok(Line::Missing) => self.stats.dropped_missing += 1,
                        Err(e) => {
                            self.finished = true;
                            return Some(Err(e));
                        }
                    }
                }
                // Read failures such as invalid UTF-8 stay local to this file
                Err(e) => {
                    self.finished = true;
                    return Some(Err(IngestError::MalformedLine {
                        line: self.stats.lines_read + 1,
                        reason: e.to_string(),
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_line() {
        let reader = RecordReader::new();

        let record = reader
            .parse_line("20200101\t100\t-20\t50", 1, 3)
            .unwrap()
            .unwrap();

        assert_eq!(record.station_id, 3);
        assert_eq!(record.date.format("%Y-%m-%d").to_string(), "2020-01-01");
        assert_eq!(record.max_temperature, Some(100));
        assert_eq!(record.min_temperature, Some(-20));
        assert_eq!(record.precipitation, Some(50));
    }

    #[test]
    fn test_padded_fields() {
        let reader = RecordReader::new();

        let record = reader
            .parse_line("19850101\t   -22\t  -128\t    94\n", 1, 1)
            .unwrap()
            .unwrap();

        assert_eq!(record.max_temperature, Some(-22));
        assert_eq!(record.min_temperature, Some(-128));
        assert_eq!(record.precipitation, Some(94));
    }

    #[test]
    fn test_sentinel_in_any_field_drops_line() {
        let reader = RecordReader::new();

        for line in [
            "20200102\t-9999\t-9999\t-9999",
            "20200102\t-9999\t-20\t50",
            "20200102\t100\t-9999\t50",
            "20200102\t100\t-20\t -9999",
        ] {
            assert_eq!(reader.parse_line(line, 1, 1).unwrap(), None, "line: {line}");
        }
    }

    #[test]
    fn test_sentinel_wins_over_malformed_fields() {
        let reader = RecordReader::new();
        assert_eq!(reader.parse_line("-9999\tabc", 1, 1).unwrap(), None);
    }

    #[test]
    fn test_invalid_date() {
        let reader = RecordReader::new();

        let err = reader.parse_line("20201301\t100\t-20\t50", 4, 1).unwrap_err();
        assert!(matches!(err, IngestError::InvalidDate { line: 4, ref value } if value == "20201301"));
    }

    #[test]
    fn test_wrong_field_count() {
        let reader = RecordReader::new();

        let err = reader.parse_line("20200101\t100\t-20", 2, 1).unwrap_err();
        assert!(matches!(err, IngestError::MalformedLine { line: 2, .. }));

        let err = reader.parse_line("20200101\t100\tx\t50", 2, 1).unwrap_err();
        assert!(matches!(err, IngestError::MalformedLine { line: 2, .. }));
    }

    #[test]
    fn test_iterator_counts_lines() -> Result<()> {
        let data = "20200101\t100\t-20\t50\n\n20200102\t-9999\t-9999\t-9999\n20200103\t90\t-10\t0\n";
        let reader = RecordReader::new();

        let (records, stats) = reader.records(Cursor::new(data), 9).collect_with_stats()?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2020, 1, 3).unwrap());
        assert_eq!(
            stats,
            ParseStats {
                lines_read: 4,
                records: 2,
                dropped_missing: 1,
                blank_lines: 1,
            }
        );

        Ok(())
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let data = "20200101\t100\t-20\t50\nbad-date\t1\t2\t3\n20200103\t90\t-10\t0\n";
        let reader = RecordReader::new();
        let mut iter = reader.records(Cursor::new(data), 1);

        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(
            iter.next(),
            Some(Err(IngestError::InvalidDate { line: 2, .. }))
        ));
        assert!(iter.next().is_none());
        assert_eq!(iter.stats().records, 1);
    }

    #[test]
    fn test_undecodable_bytes_are_malformed() {
        let data: &[u8] = b"20200101\t100\t-20\t50\n20200102\t\xff\t-20\t50\n";
        let reader = RecordReader::new();
        let mut iter = reader.records(Cursor::new(data), 1);

        assert!(iter.next().unwrap().is_ok());
        let err = iter.next().unwrap().unwrap_err();
        assert!(matches!(err, IngestError::MalformedLine { line: 2, .. }));
        assert_eq!(err.severity(), crate::error::Severity::FileLocal);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_read_file_is_restartable() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "20200101\t100\t-20\t50")?;
        writeln!(temp_file, "20200102\t-9999\t-9999\t-9999")?;

        let reader = RecordReader::new();
        let first: Vec<Record> = reader
            .read_file(temp_file.path(), 1)?
            .collect::<Result<_>>()?;
        let second: Vec<Record> = reader
            .read_file(temp_file.path(), 1)?
            .collect::<Result<_>>()?;

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let reader = RecordReader::new();
        let err = reader
            .read_file(Path::new("/nonexistent/STATION.txt"), 1)
            .err()
            .unwrap();
        assert!(matches!(err, IngestError::UnreadableFile { .. }));
    }
}

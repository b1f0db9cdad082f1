use crate::error::{IngestError, Result};
use std::path::{Path, PathBuf};
use validator::Validate;

/// An input file and the station it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct StationFile {
    pub path: PathBuf,

    #[validate(length(min = 1))]
    pub station_name: String,
}

impl StationFile {
    /// Station name is the file stem (e.g. USC00110072.txt -> USC00110072)
    pub fn from_path(path: &Path) -> Result<Self> {
        let station_name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::trim)
            .ok_or_else(|| IngestError::InvalidFileName(path.to_path_buf()))?;

        let file = Self {
            path: path.to_path_buf(),
            station_name: station_name.to_string(),
        };
        file.validate()
            .map_err(|_| IngestError::InvalidFileName(path.to_path_buf()))?;

        Ok(file)
    }
}

/// Find the eligible observation files directly inside `dir_path`, sorted by name.
pub fn discover_station_files(dir_path: &Path, extension: &str) -> Result<Vec<StationFile>> {
    if !dir_path.is_dir() {
        return Err(IngestError::Config(format!(
            "Input path is not a directory: {}",
            dir_path.display()
        )));
    }

    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir_path)? {
        let path = entry?.path();

        if !path.is_file() || path.extension().map_or(true, |ext| ext != extension) {
            continue;
        }

        match StationFile::from_path(&path) {
            Ok(file) => files.push(file),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping file"),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

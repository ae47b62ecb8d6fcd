//! Archive extraction
//!
//! Unpacks the dataset zip into the csv working directory and returns
//! every CSV present there afterwards. The scan is over the whole
//! directory, not just freshly extracted entries, so a partially
//! populated directory from an earlier run is picked up too.
//! Re-extraction overwrites in place.

use anyhow::Result;
use fdp_common::FdpError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extract all archive entries into `csv_dir` and list the CSV files found
pub fn extract_archive(archive_path: &Path, csv_dir: &Path) -> Result<Vec<PathBuf>> {
    let file = std::fs::File::open(archive_path).map_err(|e| {
        FdpError::ArchiveCorrupt(format!("{}: {}", archive_path.display(), e))
    })?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        FdpError::ArchiveCorrupt(format!("{}: {}", archive_path.display(), e))
    })?;

    debug!(entries = archive.len(), "opening archive");
    archive.extract(csv_dir).map_err(|e| {
        FdpError::ArchiveCorrupt(format!("{}: {}", archive_path.display(), e))
    })?;

    let mut csv_files = Vec::new();
    for entry in std::fs::read_dir(csv_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("csv") {
            csv_files.push(path);
        }
    }
    csv_files.sort();

    info!(
        archive = %archive_path.display(),
        csv_count = csv_files.len(),
        "archive extracted"
    );
    Ok(csv_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn build_archive(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, contents) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_returns_only_csv_paths() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("data.zip");
        build_archive(
            &archive,
            &[
                ("airports.csv", "iata,City\nJFK,New York\n"),
                ("flights.csv", "id\n1\n"),
                ("README.txt", "not a table"),
            ],
        );

        let csv_dir = dir.path().join("csvs");
        std::fs::create_dir_all(&csv_dir).unwrap();
        let files = extract_archive(&archive, &csv_dir).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.extension().unwrap() == "csv"));
        assert!(csv_dir.join("README.txt").is_file());
    }

    #[test]
    fn test_extract_picks_up_preexisting_csvs() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("data.zip");
        build_archive(&archive, &[("flights.csv", "id\n1\n")]);

        let csv_dir = dir.path().join("csvs");
        std::fs::create_dir_all(&csv_dir).unwrap();
        std::fs::write(csv_dir.join("earlier.csv"), "x\n1\n").unwrap();

        let files = extract_archive(&archive, &csv_dir).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_corrupt_archive_is_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("data.zip");
        std::fs::write(&archive, b"this is not a zip").unwrap();

        let csv_dir = dir.path().join("csvs");
        std::fs::create_dir_all(&csv_dir).unwrap();
        let err = extract_archive(&archive, &csv_dir).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FdpError>(),
            Some(FdpError::ArchiveCorrupt(_))
        ));
    }
}

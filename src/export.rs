//! CSV history of queue counts.
//!
//! One row is appended per poll cycle. Each file has a fixed column set;
//! when the tracked queue set changes a new file is started with its own
//! header.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::data::TrendEntry;
use crate::error::ExportError;

const FILE_PREFIX: &str = "azqmon_";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The file currently being appended to and its column schema.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportSession {
    path: PathBuf,
    columns: Vec<String>,
}

/// Appends queue counts to `;`-delimited CSV files.
#[derive(Debug)]
pub struct HistoryExporter {
    directory: PathBuf,
    session: Option<ExportSession>,
}

impl HistoryExporter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            session: None,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The file the last row was written to.
    pub fn current_file(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    /// Append one row for `entries`, rotating the file if the queue set changed.
    ///
    /// Nothing is written while no queue is tracked.
    pub fn append_row<'a, I>(&mut self, entries: I, now: DateTime<Local>) -> Result<(), ExportError>
    where
        I: IntoIterator<Item = &'a TrendEntry>,
    {
        let counts: HashMap<&str, u64> = entries
            .into_iter()
            .map(|e| (e.name.as_str(), e.current_count))
            .collect();
        if counts.is_empty() {
            return Ok(());
        }

        let mut columns: Vec<String> = counts.keys().map(|k| k.to_string()).collect();
        columns.sort();

        let session = match self.session.take() {
            Some(session) if session.columns == columns => session,
            previous => {
                if let Some(previous) = previous {
                    info!(
                        "Queue set changed ({} -> {} queues), closing {}",
                        previous.columns.len(),
                        columns.len(),
                        previous.path.display()
                    );
                }
                self.start_session(columns, now)?
            }
        };

        let mut record = Vec::with_capacity(session.columns.len() + 1);
        record.push(now.format(TIMESTAMP_FORMAT).to_string());
        record.extend(
            session
                .columns
                .iter()
                .map(|c| counts.get(c.as_str()).copied().unwrap_or(0).to_string()),
        );
        let written = write_record(&session.path, &record);

        self.session = Some(session);
        written
    }

    fn start_session(
        &self,
        columns: Vec<String>,
        now: DateTime<Local>,
    ) -> Result<ExportSession, ExportError> {
        fs::create_dir_all(&self.directory)
            .map_err(|e| ExportError::CreateDirectory(self.directory.clone(), e))?;

        let path = self.unused_path(now);
        let mut header = Vec::with_capacity(columns.len() + 1);
        header.push("Date".to_string());
        header.extend(columns.iter().cloned());
        write_record(&path, &header)?;

        info!("Exporting {} queues to {}", columns.len(), path.display());
        Ok(ExportSession { path, columns })
    }

    /// A file name for `now` that does not collide with an earlier session.
    fn unused_path(&self, now: DateTime<Local>) -> PathBuf {
        let stem = format!("{}{}", FILE_PREFIX, now.format("%Y%m%d%H%M%S"));
        let mut path = self.directory.join(format!("{}.csv", stem));
        let mut suffix = 1;
        while path.exists() {
            path = self.directory.join(format!("{}_{}.csv", stem, suffix));
            suffix += 1;
        }
        path
    }
}

fn write_record(path: &Path, record: &[String]) -> Result<(), ExportError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ExportError::Write(path.to_path_buf(), e))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(file);
    writer.write_record(record)?;
    writer
        .flush()
        .map_err(|e| ExportError::Write(path.to_path_buf(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{QueueRules, TrendTracker};
    use crate::source::QueueSnapshot;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn at(secs: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 1, 14, 0, secs)
            .single()
            .unwrap()
    }

    fn csv_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|e| e == "csv"))
            .collect();
        files.sort();
        files
    }

    #[test]
    fn first_row_writes_header() {
        let dir = tempdir().unwrap();
        let mut tracker = TrendTracker::new(Arc::new(QueueRules::default()));
        tracker.ingest(&QueueSnapshot::from_counts([("b", 2), ("a", 1)]), at(0));

        let mut exporter = HistoryExporter::new(dir.path());
        exporter.append_row(tracker.entries(), at(0)).unwrap();
        tracker.ingest(&QueueSnapshot::from_counts([("b", 5), ("a", 0)]), at(2));
        exporter.append_row(tracker.entries(), at(2)).unwrap();

        let files = csv_files(dir.path());
        assert_eq!(files.len(), 1);
        assert_eq!(
            files[0].file_name().unwrap().to_str().unwrap(),
            "azqmon_20240501140000.csv"
        );

        let content = fs::read_to_string(&files[0]).unwrap();
        assert_eq!(
            content,
            "Date;a;b\n2024-05-01 14:00:00;1;2\n2024-05-01 14:00:02;0;5\n"
        );
    }

    #[test]
    fn queue_set_change_starts_new_file() {
        let dir = tempdir().unwrap();
        let mut tracker = TrendTracker::new(Arc::new(QueueRules::default()));
        let mut exporter = HistoryExporter::new(dir.path());

        tracker.ingest(&QueueSnapshot::from_counts([("a", 1), ("b", 1), ("c", 1)]), at(0));
        exporter.append_row(tracker.entries(), at(0)).unwrap();
        let first = exporter.current_file().unwrap().to_path_buf();

        tracker.ingest(
            &QueueSnapshot::from_counts([("a", 1), ("b", 1), ("c", 1), ("d", 7)]),
            at(0),
        );
        exporter.append_row(tracker.entries(), at(0)).unwrap();
        let second = exporter.current_file().unwrap().to_path_buf();

        assert_ne!(first, second);
        assert_eq!(csv_files(dir.path()).len(), 2);

        let first_content = fs::read_to_string(&first).unwrap();
        assert!(first_content.starts_with("Date;a;b;c\n"));
        assert_eq!(first_content.lines().count(), 2);

        let second_content = fs::read_to_string(&second).unwrap();
        assert!(second_content.starts_with("Date;a;b;c;d\n"));
        assert!(second_content.ends_with(";1;1;1;7\n"));
    }

    #[test]
    fn empty_tracker_writes_nothing() {
        let dir = tempdir().unwrap();
        let tracker = TrendTracker::new(Arc::new(QueueRules::default()));
        let mut exporter = HistoryExporter::new(dir.path().join("history"));

        exporter.append_row(tracker.entries(), at(0)).unwrap();

        assert!(exporter.current_file().is_none());
        assert!(!dir.path().join("history").exists());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("history");
        let mut tracker = TrendTracker::new(Arc::new(QueueRules::default()));
        tracker.ingest(&QueueSnapshot::from_counts([("a", 1)]), at(0));

        let mut exporter = HistoryExporter::new(&target);
        exporter.append_row(tracker.entries(), at(0)).unwrap();

        assert_eq!(csv_files(&target).len(), 1);
    }

    #[test]
    fn unwritable_directory_is_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let mut tracker = TrendTracker::new(Arc::new(QueueRules::default()));
        tracker.ingest(&QueueSnapshot::from_counts([("a", 1)]), at(0));

        let mut exporter = HistoryExporter::new(blocker.join("history"));
        let result = exporter.append_row(tracker.entries(), at(0));

        assert!(matches!(result, Err(ExportError::CreateDirectory(_, _))));
    }
}

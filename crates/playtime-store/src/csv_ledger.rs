//! CSV-file session ledger

use csv::{ByteRecord, ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::record::{has_displaced_columns, is_header, looks_like_data, parse_row};
use crate::{
    LedgerScan, SchemaStatus, SessionLedger, SessionRecord, SkipReason, SkippedRow, StoreError,
    StoreResult, LEDGER_HEADER,
};

/// Session ledger backed by a CSV file
pub struct CsvLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvLedger {
    /// Use the log at the given path. Nothing is touched until the first
    /// call to [`SessionLedger::ensure_schema`] or [`SessionLedger::append`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Use the log at the given path and make sure its header is usable
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let ledger = Self::new(path);
        let status = ledger.ensure_schema()?;
        debug!(path = %ledger.path.display(), status = ?status, "Session log opened");
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn header_line() -> String {
        let mut line = LEDGER_HEADER.join(",");
        line.push('\n');
        line
    }

    /// Replace the whole file through a synced temporary file, so a crash
    /// leaves either the old or the new contents.
    fn replace_contents(&self, contents: &[u8]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(contents)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        sync_parent_dir(&self.path);
        Ok(())
    }
}

impl SessionLedger for CsvLedger {
    fn ensure_schema(&self) -> StoreResult<SchemaStatus> {
        let _guard = self.lock();

        // Bytes, not text: a row saved in another encoding must not stop the
        // header check
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if contents.iter().all(u8::is_ascii_whitespace) {
            self.replace_contents(Self::header_line().as_bytes())?;
            info!(path = %self.path.display(), "Created session log");
            return Ok(SchemaStatus::Created);
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(contents.as_slice());
        let mut raw = ByteRecord::new();
        reader.read_byte_record(&mut raw)?;
        let rest_offset = (reader.position().byte() as usize).min(contents.len());
        let first = StringRecord::from_byte_record_lossy(raw);

        if is_header(&first) {
            return Ok(SchemaStatus::Valid);
        }

        if looks_like_data(&first) {
            let mut repaired = Self::header_line().into_bytes();
            repaired.extend_from_slice(&contents);
            self.replace_contents(&repaired)?;
            warn!(path = %self.path.display(), "Session log had no header, inserted one");
            return Ok(SchemaStatus::HeaderInserted);
        }

        // Known column names in other positions mean the rows below follow
        // that order, and a canonical header would misalign them
        if first.len() == LEDGER_HEADER.len() && !has_displaced_columns(&first) {
            let mut repaired = Self::header_line().into_bytes();
            repaired.extend_from_slice(&contents[rest_offset..]);
            self.replace_contents(&repaired)?;
            warn!(
                path = %self.path.display(),
                found = ?first.iter().collect::<Vec<_>>(),
                "Session log header was wrong, rewrote it"
            );
            return Ok(SchemaStatus::HeaderRepaired);
        }

        Err(StoreError::SchemaMismatch {
            found: first.iter().map(str::to_string).collect(),
            expected: LEDGER_HEADER.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn append(&self, record: &SessionRecord) -> StoreResult<()> {
        let _guard = self.lock();

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut buf = Vec::new();
        let len = file.metadata()?.len();
        if len == 0 {
            buf.extend_from_slice(Self::header_line().as_bytes());
        } else {
            // A hand-edited file may have lost its final newline
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                buf.push(b'\n');
            }
        }

        {
            let mut writer = WriterBuilder::new().has_headers(false).from_writer(&mut buf);
            writer.write_record(record.to_row())?;
            writer.flush()?;
        }

        file.write_all(&buf)?;
        file.sync_all()?;

        debug!(
            date = %record.date,
            duration_minutes = record.duration_minutes,
            activity = %record.activity,
            "Session appended"
        );
        Ok(())
    }

    fn read_all(&self) -> StoreResult<LedgerScan> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LedgerScan::default()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut scan = LedgerScan::default();
        let mut first = true;

        for result in reader.records() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                        return Err(e.into());
                    }
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    warn!(line, error = %e, "Skipping unreadable session log row");
                    scan.skipped.push(SkippedRow {
                        line,
                        reason: SkipReason::Unreadable(e.to_string()),
                    });
                    first = false;
                    continue;
                }
            };

            let line = row.position().map(|p| p.line()).unwrap_or(0);
            if first {
                first = false;
                if is_header(&row) {
                    continue;
                }
            }

            match parse_row(&row) {
                Ok(record) => scan.records.push(record),
                Err(reason) => {
                    debug!(line, reason = %reason, "Skipping malformed session log row");
                    scan.skipped.push(SkippedRow { line, reason });
                }
            }
        }

        Ok(scan)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        })
        && let Err(e) = dir.sync_all()
    {
        debug!(error = %e, "Failed to sync session log directory");
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn ledger_in(dir: &tempfile::TempDir) -> CsvLedger {
        CsvLedger::new(dir.path().join("playtime_log.csv"))
    }

    fn write(ledger: &CsvLedger, contents: &str) {
        fs::write(ledger.path(), contents).unwrap();
    }

    fn read(ledger: &CsvLedger) -> String {
        fs::read_to_string(ledger.path()).unwrap()
    }

    const HEADER: &str = "date,start_time,end_time,duration_minutes,game\n";

    #[test]
    fn test_ensure_schema_creates_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("nested").join("log.csv"));

        assert_eq!(ledger.ensure_schema().unwrap(), SchemaStatus::Created);
        assert_eq!(read(&ledger), HEADER);
        assert_eq!(ledger.ensure_schema().unwrap(), SchemaStatus::Valid);
    }

    #[test]
    fn test_ensure_schema_fills_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        write(&ledger, "\n");

        assert_eq!(ledger.ensure_schema().unwrap(), SchemaStatus::Created);
        assert_eq!(read(&ledger), HEADER);
    }

    #[test]
    fn test_ensure_schema_inserts_missing_header() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let data = "2024-12-25,09:00 AM,10:05 AM,65.0,VR\n";
        write(&ledger, data);

        assert_eq!(ledger.ensure_schema().unwrap(), SchemaStatus::HeaderInserted);
        assert_eq!(read(&ledger), format!("{}{}", HEADER, data));
        assert_eq!(ledger.read_all().unwrap().records.len(), 1);
    }

    #[test]
    fn test_ensure_schema_repairs_wrong_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let data = "2024-12-25,2024-12-25 09:00:00,2024-12-25 10:05:00,65,VR\n\
                    2024-12-26,bad,row,x,\n";
        write(&ledger, &format!("Date,Start,End,Minutes,Game\n{}", data));

        assert_eq!(ledger.ensure_schema().unwrap(), SchemaStatus::HeaderRepaired);
        assert_eq!(read(&ledger), format!("{}{}", HEADER, data));
    }

    #[test]
    fn test_ensure_schema_refuses_column_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let original = "date,start_time,end_time,duration_minutes\n2024-12-25,09:00 AM,10:00 AM,60\n";
        write(&ledger, original);

        let err = ledger.ensure_schema().unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { ref found, .. } if found.len() == 4));
        assert_eq!(read(&ledger), original, "rows must be left alone");
    }

    #[test]
    fn test_ensure_schema_refuses_reordered_header() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let original = "game,date,start_time,end_time,duration_minutes\n\
                        VR,2024-12-25,2024-12-25 09:00:00,2024-12-25 10:05:00,65\n";
        write(&ledger, original);

        let err = ledger.ensure_schema().unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { ref found, .. } if found[0] == "game"));
        assert_eq!(read(&ledger), original, "rows must be left alone");
    }

    #[test]
    fn test_ensure_schema_tolerates_non_utf8_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let mut contents = HEADER.as_bytes().to_vec();
        contents.extend_from_slice(b"2024-12-25,2024-12-25 09:00:00,2024-12-25 10:05:00,65,VR\n");
        // "Pok\xe9mon" as Latin-1
        contents.extend_from_slice(b"2024-12-25,2024-12-25 11:00:00,2024-12-25 11:30:00,30,Pok\xe9mon\n");
        fs::write(ledger.path(), &contents).unwrap();

        assert_eq!(ledger.ensure_schema().unwrap(), SchemaStatus::Valid);
        assert_eq!(fs::read(ledger.path()).unwrap(), contents);

        let scan = ledger.read_all().unwrap();
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].line, 3);
    }

    #[test]
    fn test_ensure_schema_inserts_header_before_non_utf8_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        let data = b"2024-12-25,09:00 AM,09:30 AM,30.0,Pok\xe9mon\n".to_vec();
        fs::write(ledger.path(), &data).unwrap();

        assert_eq!(ledger.ensure_schema().unwrap(), SchemaStatus::HeaderInserted);
        let mut expected = HEADER.as_bytes().to_vec();
        expected.extend_from_slice(&data);
        assert_eq!(fs::read(ledger.path()).unwrap(), expected);
    }

    #[test]
    fn test_activity_with_surrounding_spaces_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        let record = SessionRecord::new(at(25, 9, 0), at(25, 9, 20), " VR ");
        ledger.append(&record).unwrap();

        assert_eq!(ledger.read_all().unwrap().records, vec![record]);
    }

    #[test]
    fn test_append_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.ensure_schema().unwrap();

        let record = SessionRecord::new(at(25, 9, 0), at(25, 10, 5), "Minecraft");
        ledger.append(&record).unwrap();

        // A fresh handle stands in for a new process
        let reopened = CsvLedger::open(ledger.path()).unwrap();
        let scan = reopened.read_all().unwrap();
        assert_eq!(scan.records, vec![record]);
        assert!(scan.skipped.is_empty());
    }

    #[test]
    fn test_append_without_schema_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        ledger
            .append(&SessionRecord::new(at(25, 9, 0), at(25, 9, 30), ""))
            .unwrap();

        assert!(read(&ledger).starts_with(HEADER));
        assert_eq!(ledger.ensure_schema().unwrap(), SchemaStatus::Valid);
    }

    #[test]
    fn test_append_after_missing_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        write(
            &ledger,
            "date,start_time,end_time,duration_minutes,game\n2024-12-24,09:00 AM,09:30 AM,30.0,VR",
        );

        ledger
            .append(&SessionRecord::new(at(25, 9, 0), at(25, 9, 45), "Roblox"))
            .unwrap();

        let scan = ledger.read_all().unwrap();
        assert_eq!(scan.records.len(), 2);
        assert!(scan.skipped.is_empty());
        assert_eq!(scan.records[1].activity, "Roblox");
    }

    #[test]
    fn test_activity_with_comma_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        let record = SessionRecord::new(at(25, 9, 0), at(25, 9, 20), "Lego, \"Star\" set");
        ledger.append(&record).unwrap();

        assert_eq!(ledger.read_all().unwrap().records, vec![record]);
    }

    #[test]
    fn test_read_all_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.ensure_schema().unwrap();
        ledger
            .append(&SessionRecord::new(at(25, 9, 0), at(25, 9, 30), "VR"))
            .unwrap();
        ledger
            .append(&SessionRecord::new(at(25, 14, 0), at(25, 14, 10), "Other"))
            .unwrap();

        assert_eq!(ledger.read_all().unwrap(), ledger.read_all().unwrap());
    }

    #[test]
    fn test_read_all_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        write(
            &ledger,
            "date,start_time,end_time,duration_minutes,game\n\
             2024-12-25,2024-12-25 09:00:00,2024-12-25 10:05:00,65,VR\n\
             2024-12-25,2024-12-25 11:00:00,2024-12-25 11:30:00,lots,VR\n",
        );

        let scan = ledger.read_all().unwrap();
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.records[0].duration_minutes, 65);
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].line, 3);
        assert!(matches!(scan.skipped[0].reason, SkipReason::InvalidDuration(_)));
    }

    #[test]
    fn test_read_all_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let scan = ledger_in(&dir).read_all().unwrap();
        assert!(scan.records.is_empty());
        assert!(scan.skipped.is_empty());
    }

    #[test]
    fn test_recent_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        for day in 20..25 {
            ledger
                .append(&SessionRecord::new(at(day, 9, 0), at(day, 9, 30), ""))
                .unwrap();
        }

        let recent = ledger.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].date, NaiveDate::from_ymd_opt(2024, 12, 24).unwrap());
        assert_eq!(recent[1].date, NaiveDate::from_ymd_opt(2024, 12, 23).unwrap());
    }
}

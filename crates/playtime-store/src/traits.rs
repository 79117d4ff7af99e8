//! Store trait definitions

use crate::{LedgerScan, SessionRecord, StoreResult};

/// Outcome of checking the session log layout at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// The log did not exist (or was empty) and was created with a header
    Created,
    /// The header was already correct
    Valid,
    /// The log started with data rows; a header was put in front of them
    HeaderInserted,
    /// The header had the right width but wrong names and was rewritten
    HeaderRepaired,
}

/// Append-only store of completed sessions
pub trait SessionLedger: Send + Sync {
    /// Verify the stored layout, creating or repairing the header if that
    /// can be done without touching data rows.
    fn ensure_schema(&self) -> StoreResult<SchemaStatus>;

    /// Durably append one record. On success the record is on disk.
    fn append(&self, record: &SessionRecord) -> StoreResult<()>;

    /// Read every record in file order, skipping malformed rows
    fn read_all(&self) -> StoreResult<LedgerScan>;

    /// Most recent records, newest first
    fn recent(&self, limit: usize) -> StoreResult<Vec<SessionRecord>> {
        let scan = self.read_all()?;
        Ok(scan.records.into_iter().rev().take(limit).collect())
    }

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

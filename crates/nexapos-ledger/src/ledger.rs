//! The append-only sale ledger
//!
//! Appends are flushed to the medium before the call returns: on a
//! handheld device, power loss must never silently drop a completed sale.
//! Appends are never retried internally either — the payment may already
//! be accepted off-device, and a blind retry after a partial write could
//! duplicate the record. Failures surface to the operator instead.

use thiserror::Error;

use crate::record::{RecordError, RecordId, SaleRecord};
use crate::storage::{StorageError, StorageMedium};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Storage full")]
    StorageFull,
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] RecordError),
    #[error("Corrupt ledger record {record}: {reason}")]
    Corrupt { record: RecordId, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for LedgerError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Full => LedgerError::StorageFull,
            StorageError::Unavailable(msg) => LedgerError::StorageUnavailable(msg),
            StorageError::Io(e) => LedgerError::Io(e),
        }
    }
}

/// The sales log: one writer, append-only, durable per append.
pub struct SaleLedger<S: StorageMedium> {
    storage: S,
    next_id: RecordId,
}

impl<S: StorageMedium> SaleLedger<S> {
    /// Open the ledger over a medium, resuming the record sequence from
    /// whatever the log already holds.
    pub fn open(storage: S) -> Result<Self, LedgerError> {
        let contents = storage.read_all()?;
        let next_id = contents.lines().filter(|l| !l.is_empty()).count() as RecordId;

        if next_id > 0 {
            log::info!("ledger opened with {} existing record(s)", next_id);
        }

        Ok(Self { storage, next_id })
    }

    /// Append one sale. The record is on the physical medium when this
    /// returns `Ok`.
    pub fn append_sale(&mut self, record: &SaleRecord) -> Result<RecordId, LedgerError> {
        record.validate()?;

        let line = record.to_csv_line();
        self.storage.append(line.as_bytes())?;
        self.storage.flush()?;

        let id = self.next_id;
        self.next_id += 1;
        log::debug!("sale {} appended ({} bytes)", id, line.len());
        Ok(id)
    }

    /// Iterate every sale in append order.
    ///
    /// Finite and restartable: each call re-reads the medium, so iterating
    /// twice without intervening appends yields identical sequences. A line
    /// that fails to parse is yielded as [`LedgerError::Corrupt`] and
    /// iteration continues with the next line.
    pub fn iter_sales(&self) -> Result<SalesIter, LedgerError> {
        let contents = self.storage.read_all()?;
        Ok(SalesIter {
            contents,
            offset: 0,
            next_id: 0,
        })
    }

    /// Number of records appended so far (including pre-existing ones).
    pub fn record_count(&self) -> RecordId {
        self.next_id
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

/// Lazy iterator over ledger records. Parsing happens per `next()` call.
pub struct SalesIter {
    contents: String,
    offset: usize,
    next_id: RecordId,
}

impl Iterator for SalesIter {
    type Item = Result<(RecordId, SaleRecord), LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.offset >= self.contents.len() {
                return None;
            }

            let rest = &self.contents[self.offset..];
            let (line, advance) = match rest.find('\n') {
                Some(i) => (&rest[..i], i + 1),
                None => (rest, rest.len()),
            };
            self.offset += advance;

            if line.is_empty() {
                continue;
            }

            let id = self.next_id;
            self.next_id += 1;

            return Some(
                SaleRecord::from_csv_line(line)
                    .map(|record| (id, record))
                    .map_err(|e| LedgerError::Corrupt {
                        record: id,
                        reason: e.to_string(),
                    }),
            );
        }
    }
}

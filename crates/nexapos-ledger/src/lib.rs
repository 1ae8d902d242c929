//! NexaPOS Ledger
//!
//! The durable sales log: one CSV record per line, append-only, written
//! through a storage medium abstraction (internal flash or removable
//! card). Every append is flushed to the medium before the call returns,
//! so a power loss never drops a completed sale.

pub mod ledger;
pub mod reconcile;
pub mod record;
pub mod storage;

pub use ledger::{LedgerError, SaleLedger, SalesIter};
pub use reconcile::ReconcileSummary;
pub use record::{CurrencyCode, FiatAmount, RecordError, RecordId, SaleRecord};
pub use storage::{InternalFlashStorage, RemovableCardStorage, StorageError, StorageMedium};

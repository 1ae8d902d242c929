//! End-of-day reconciliation over the ledger.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ledger::{LedgerError, SaleLedger};
use crate::record::{CurrencyCode, FiatAmount, RecordError};
use crate::storage::StorageMedium;

/// Per-currency totals plus the overall record count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub record_count: u64,
    /// Totals in minor units, keyed by currency code
    pub totals: BTreeMap<CurrencyCode, FiatAmount>,
}

impl ReconcileSummary {
    pub fn total_for(&self, currency: CurrencyCode) -> FiatAmount {
        self.totals.get(&currency).copied().unwrap_or(FiatAmount::ZERO)
    }
}

impl<S: StorageMedium> SaleLedger<S> {
    /// Sum every record in the log.
    ///
    /// A corrupt line aborts with its error rather than producing a
    /// silently short total — reconciliation exists to be trusted.
    pub fn reconcile(&self) -> Result<ReconcileSummary, LedgerError> {
        let mut summary = ReconcileSummary::default();

        for item in self.iter_sales()? {
            let (id, record) = item?;
            let total = summary.totals.entry(record.currency).or_default();
            *total = total.checked_add(record.amount).ok_or_else(|| {
                LedgerError::InvalidRecord(RecordError::InvalidAmount(format!(
                    "total overflow at record {}",
                    id
                )))
            })?;
            summary.record_count += 1;
        }

        Ok(summary)
    }
}

//! The sale event path — a single-consumer queue in front of the ledger.
//!
//! UI-triggered sale events are queued; one worker task owns the ledger
//! and the address source, so exactly one logical writer ever touches the
//! log. A sale can be abandoned by simply not submitting it; once
//! submitted, the append runs to completion or failure — it is never
//! cancelled mid-write. Failures come back to the submitter so the
//! operator sees an unconfirmed sale instead of a silent retry.

use nexapos_core::{AddressSource, DerivationError};
use nexapos_ledger::{
    CurrencyCode, FiatAmount, LedgerError, RecordId, SaleLedger, SaleRecord, StorageMedium,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Queue depth: sales are operator-paced, so a short buffer suffices
const QUEUE_DEPTH: usize = 8;

#[derive(Error, Debug)]
pub enum SaleError {
    #[error("Address derivation failed: {0}")]
    Derivation(#[from] DerivationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Sale worker is gone")]
    WorkerGone,
}

/// A confirmed sale, as durably recorded.
#[derive(Debug, Clone)]
pub struct SaleReceipt {
    pub record_id: RecordId,
    pub timestamp: u64,
    pub amount: FiatAmount,
    pub currency: CurrencyCode,
    pub address: String,
    /// Derivation index behind the address; `None` in static-address mode
    pub derivation_index: Option<u32>,
}

struct SaleRequest {
    amount: FiatAmount,
    memo: Option<String>,
    reply: oneshot::Sender<Result<SaleReceipt, SaleError>>,
}

/// Handle for submitting sales to the worker. Cheap to clone.
#[derive(Clone)]
pub struct SaleQueue {
    tx: mpsc::Sender<SaleRequest>,
}

impl SaleQueue {
    /// Submit a sale and wait for it to be durably recorded.
    ///
    /// Resolves with the receipt once the record is flushed to the
    /// medium, or with the error the operator must act on.
    pub async fn record_sale(
        &self,
        amount: FiatAmount,
        memo: Option<String>,
    ) -> Result<SaleReceipt, SaleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SaleRequest {
                amount,
                memo,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SaleError::WorkerGone)?;
        reply_rx.await.map_err(|_| SaleError::WorkerGone)?
    }
}

/// The single consumer of the sale queue. Owns the ledger and the address
/// source for the whole session.
pub struct SaleWorker<S: StorageMedium> {
    ledger: SaleLedger<S>,
    source: AddressSource,
    currency: CurrencyCode,
    rx: mpsc::Receiver<SaleRequest>,
}

impl<S: StorageMedium> SaleWorker<S> {
    pub fn new(
        ledger: SaleLedger<S>,
        source: AddressSource,
        currency: CurrencyCode,
    ) -> (SaleQueue, Self) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        (
            SaleQueue { tx },
            Self {
                ledger,
                source,
                currency,
                rx,
            },
        )
    }

    /// Drain sale requests until every queue handle is dropped.
    pub async fn run(mut self) {
        log::info!(
            "sale worker ready ({} mode)",
            if self.source.is_derived() {
                "HD derivation"
            } else {
                "static address"
            }
        );

        while let Some(request) = self.rx.recv().await {
            let result = self.process(request.amount, request.memo);
            if let Err(e) = &result {
                log::error!("sale NOT recorded — operator action required: {}", e);
            }
            // Receipt delivery is best-effort; the record is already durable
            let _ = request.reply.send(result);
        }

        log::info!("sale worker shutting down");
    }

    fn process(&mut self, amount: FiatAmount, memo: Option<String>) -> Result<SaleReceipt, SaleError> {
        let (derivation_index, address) = self.source.next()?;
        let timestamp = chrono::Utc::now().timestamp().max(0) as u64;

        let record = SaleRecord::new(
            timestamp,
            amount,
            self.currency,
            address.as_str().to_string(),
            memo,
        );
        let record_id = self.ledger.append_sale(&record)?;

        log::info!(
            "sale {} recorded: {} {} -> {}",
            record_id,
            amount,
            self.currency,
            address
        );

        Ok(SaleReceipt {
            record_id,
            timestamp,
            amount,
            currency: self.currency,
            address: address.into_string(),
            derivation_index,
        })
    }
}

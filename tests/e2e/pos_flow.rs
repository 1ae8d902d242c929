//! End-to-end test of the NexaPOS sale path.
//!
//! Exercises the complete flow without hardware:
//!
//! 1. Seed provisioning (vault encrypt/decrypt round trip)
//! 2. Receiving-address derivation on the Nexa coin type
//! 3. Durable ledger appends over both storage media
//! 4. Iteration and end-of-day reconciliation
//! 5. The sale queue tying all components together
//!
//! Run with: cargo test --test pos_flow

use nexapos_core::{
    decrypt_seed, derive_seed, encrypt_seed, generate_mnemonic, parse_mnemonic, AddressDeriver,
    AddressSource, EncryptedSeed, ReceivePath, ReceivingAddress, NEXA_COIN_TYPE,
};
use nexapos_device::config::DeviceConfig;
use nexapos_device::hal::{DisplayDriver, Frame, NetworkClient, Point};
use nexapos_device::queue::{SaleError, SaleWorker};
use nexapos_ledger::{
    CurrencyCode, FiatAmount, InternalFlashStorage, LedgerError, RemovableCardStorage, SaleLedger,
    SaleRecord, StorageMedium,
};

const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn test_deriver() -> AddressDeriver {
    let mnemonic = parse_mnemonic(TEST_MNEMONIC).unwrap();
    AddressDeriver::new(derive_seed(&mnemonic, ""), ReceivePath::new(NEXA_COIN_TYPE))
}

fn usd() -> CurrencyCode {
    CurrencyCode::parse("USD").unwrap()
}

// ============================================================================
// Derivation properties
// ============================================================================

#[test]
fn test_derivation_stable_and_unlinkable() {
    let deriver = test_deriver();

    let a0 = deriver.derive_address(0).unwrap();
    let a1 = deriver.derive_address(1).unwrap();

    // Deterministic across repeated calls
    assert_eq!(a0, deriver.derive_address(0).unwrap());
    // Distinct indexes, distinct addresses
    assert_ne!(a0, a1);
    // Chain namespace pinned by the coin type
    assert!(a0.as_str().starts_with("nexa1"));
    assert!(a1.as_str().starts_with("nexa1"));

    // A deriver built from the same words lands on the same addresses
    assert_eq!(a0, test_deriver().derive_address(0).unwrap());
}

#[test]
fn test_vault_provisioning_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let vault_path = dir.path().join("wallet.seed");

    let mnemonic = generate_mnemonic().unwrap();
    let seed = derive_seed(&mnemonic, "");
    let direct = AddressDeriver::new(seed.clone(), ReceivePath::default())
        .derive_address(0)
        .unwrap();

    // Provision: encrypt to disk
    encrypt_seed(&seed, "1234").unwrap().save(&vault_path).unwrap();

    // Boot: decrypt from disk and derive the same address
    let restored = decrypt_seed(&EncryptedSeed::load(&vault_path).unwrap(), "1234").unwrap();
    let from_vault = AddressDeriver::new(restored, ReceivePath::default())
        .derive_address(0)
        .unwrap();

    assert_eq!(direct, from_vault);

    // Wrong PIN must not yield a seed
    assert!(decrypt_seed(&EncryptedSeed::load(&vault_path).unwrap(), "9999").is_err());
}

// ============================================================================
// The core sale scenario: derive, append, iterate
// ============================================================================

#[test]
fn test_sale_scenario_single_record() {
    let dir = tempfile::tempdir().unwrap();
    let deriver = test_deriver();

    let a0 = deriver.derive_address(0).unwrap();
    let a1 = deriver.derive_address(1).unwrap();
    assert_ne!(a0, a1);

    let storage = InternalFlashStorage::open(&dir.path().join("sales.csv")).unwrap();
    let mut ledger = SaleLedger::open(storage).unwrap();

    let record = SaleRecord::new(
        100,
        FiatAmount::parse("5.00").unwrap(),
        usd(),
        a0.as_str().to_string(),
        None,
    );
    ledger.append_sale(&record).unwrap();

    let sales: Vec<_> = ledger
        .iter_sales()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(sales.len(), 1);

    let (id, stored) = &sales[0];
    assert_eq!(*id, 0);
    assert_eq!(stored.timestamp, 100);
    assert_eq!(stored.amount, FiatAmount::parse("5.00").unwrap());
    assert_eq!(stored.currency, usd());
    assert_eq!(stored.address, a0.as_str());
}

#[test]
fn test_full_storage_preserves_first_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.csv");

    let first = SaleRecord::new(
        100,
        FiatAmount::parse("5.00").unwrap(),
        usd(),
        "nexa1qfirst".to_string(),
        None,
    );
    let capacity = first.to_csv_line().len() as u64;

    let storage = InternalFlashStorage::with_capacity(&path, capacity).unwrap();
    let mut ledger = SaleLedger::open(storage).unwrap();

    ledger.append_sale(&first).unwrap();

    let second = SaleRecord::new(
        200,
        FiatAmount::parse("2.00").unwrap(),
        usd(),
        "nexa1qsecond".to_string(),
        None,
    );
    assert!(matches!(
        ledger.append_sale(&second),
        Err(LedgerError::StorageFull)
    ));

    let sales: Vec<_> = ledger.iter_sales().unwrap().map(|r| r.unwrap().1).collect();
    assert_eq!(sales, vec![first]);
}

// ============================================================================
// Full device flow through the sale queue
// ============================================================================

#[tokio::test]
async fn test_full_sale_flow_and_reconciliation() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("sales.csv");

    let ledger = SaleLedger::open(InternalFlashStorage::open(&log_path).unwrap()).unwrap();
    let source = AddressSource::Derived(test_deriver());
    let (queue, worker) = SaleWorker::new(ledger, source, usd());
    let worker_handle = tokio::spawn(worker.run());

    let mut addresses = Vec::new();
    for (amount, memo) in [
        ("5.00", Some("latte".to_string())),
        ("2.50", None),
        ("12.00", Some("beans 1kg".to_string())),
    ] {
        let receipt = queue
            .record_sale(FiatAmount::parse(amount).unwrap(), memo)
            .await
            .unwrap();
        addresses.push(receipt.address);
    }

    drop(queue);
    worker_handle.await.unwrap();

    // Every sale got a fresh address
    assert_ne!(addresses[0], addresses[1]);
    assert_ne!(addresses[1], addresses[2]);
    assert_ne!(addresses[0], addresses[2]);

    // Reopen from disk: everything survived, in order
    let ledger = SaleLedger::open(InternalFlashStorage::open(&log_path).unwrap()).unwrap();
    let sales: Vec<_> = ledger
        .iter_sales()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(sales.len(), 3);
    assert_eq!(sales[0].1.memo.as_deref(), Some("latte"));
    assert_eq!(sales[1].1.memo, None);
    assert_eq!(sales[0].1.address, addresses[0]);
    assert_eq!(sales[2].1.address, addresses[2]);

    // Iterating twice without appends yields identical sequences
    let again: Vec<_> = ledger
        .iter_sales()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(sales, again);

    // End-of-day totals
    let summary = ledger.reconcile().unwrap();
    assert_eq!(summary.record_count, 3);
    assert_eq!(summary.total_for(usd()).minor_units(), 1950);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["record_count"], 3);
    assert_eq!(json["totals"]["USD"], 1950);
}

#[tokio::test]
async fn test_static_fallback_flow() {
    let dir = tempfile::tempdir().unwrap();

    // A device configured with HD derivation off
    let toml = r#"
[shop]
fallback_address = "nexa1qshopfallback"

[wallet]
hd_enabled = false
"#;
    let mut config: DeviceConfig = toml::from_str(toml).unwrap();
    config.storage.log_file = dir.path().join("sales.csv");
    config.validate().unwrap();

    let ledger =
        SaleLedger::open(InternalFlashStorage::open(&config.storage.log_file).unwrap()).unwrap();
    let source = AddressSource::Static(ReceivingAddress::from_string(
        config.shop.fallback_address.clone(),
    ));
    let (queue, worker) = SaleWorker::new(ledger, source, config.currency().unwrap());
    tokio::spawn(worker.run());

    let first = queue
        .record_sale(FiatAmount::parse("1.00").unwrap(), None)
        .await
        .unwrap();
    let second = queue
        .record_sale(FiatAmount::parse("2.00").unwrap(), None)
        .await
        .unwrap();

    // Static reuse mode: same address, no derivation indexes
    assert_eq!(first.address, "nexa1qshopfallback");
    assert_eq!(second.address, "nexa1qshopfallback");
    assert_eq!(first.derivation_index, None);
    assert_eq!(second.derivation_index, None);
}

#[tokio::test]
async fn test_card_ejection_surfaces_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let mount = dir.path().join("sd");
    std::fs::create_dir(&mount).unwrap();

    let storage = RemovableCardStorage::open(&mount, "sales.csv").unwrap();
    let ledger = SaleLedger::open(storage).unwrap();
    let (queue, worker) = SaleWorker::new(ledger, AddressSource::Derived(test_deriver()), usd());
    tokio::spawn(worker.run());

    queue
        .record_sale(FiatAmount::parse("3.00").unwrap(), None)
        .await
        .unwrap();

    // Card pulled mid-session
    std::fs::remove_dir_all(&mount).unwrap();

    let err = queue
        .record_sale(FiatAmount::parse("4.00").unwrap(), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SaleError::Ledger(LedgerError::StorageUnavailable(_))
    ));
}

// ============================================================================
// Collaborator interfaces
// ============================================================================

/// A bench double standing in for the firmware shell.
struct BenchShell {
    rendered: Vec<Frame>,
    touch: Option<Point>,
    associated: bool,
}

impl DisplayDriver for BenchShell {
    fn render(&mut self, frame: &Frame) {
        self.rendered.push(frame.clone());
    }

    fn poll_touch(&mut self) -> Option<Point> {
        self.touch.take()
    }
}

impl NetworkClient for BenchShell {
    fn connect(&mut self, ssid: &str, _password: &str) -> bool {
        self.associated = !ssid.is_empty();
        self.associated
    }
}

#[test]
fn test_collaborator_interfaces() {
    let config = DeviceConfig::default();
    let mut shell = BenchShell {
        rendered: Vec::new(),
        touch: Some(Point { x: 120, y: 160 }),
        associated: false,
    };

    // The UI layer renders into the configured geometry and drains touches
    let frame = Frame::blank(config.display.width, config.display.height);
    shell.render(&frame);
    assert_eq!(shell.rendered.len(), 1);
    assert_eq!(shell.poll_touch(), Some(Point { x: 120, y: 160 }));
    assert_eq!(shell.poll_touch(), None);

    // Empty factory credentials leave the device unassociated
    assert!(!shell.connect(&config.wifi.ssid, &config.wifi.password));
}

// ============================================================================
// Corrupt log handling across the reopen path
// ============================================================================

#[test]
fn test_reopen_with_torn_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.csv");

    {
        let mut ledger = SaleLedger::open(InternalFlashStorage::open(&path).unwrap()).unwrap();
        ledger
            .append_sale(&SaleRecord::new(
                100,
                FiatAmount::parse("5.00").unwrap(),
                usd(),
                "nexa1qok".to_string(),
                None,
            ))
            .unwrap();
    }

    // Power loss mid-append left a torn half-line
    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str("1700000000,2.5");
    std::fs::write(&path, &contents).unwrap();

    let storage = InternalFlashStorage::open(&path).unwrap();
    assert!(storage.len().unwrap() > 0);
    let ledger = SaleLedger::open(storage).unwrap();

    let results: Vec<_> = ledger.iter_sales().unwrap().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(LedgerError::Corrupt { .. })));

    // Reconciliation refuses to total a corrupt log
    assert!(ledger.reconcile().is_err());
}

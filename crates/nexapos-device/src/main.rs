//! NexaPOS Device — headless point-of-sale daemon
//!
//! Wires the address deriver and the sales ledger behind the device
//! configuration and runs the operator console. Display, touch, and Wi-Fi
//! management belong to the firmware shell; this binary owns the
//! sale/ledger path.
//!
//! # Usage
//!
//! ```bash
//! nexapos-device --config /data/nexapos.toml
//! nexapos-device --validate          # Validate config and exit
//! nexapos-device --provision        # Create the encrypted seed vault
//! nexapos-device --sale 5.00 --memo "latte"
//! nexapos-device --report           # Reconciliation summary as JSON
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;

use nexapos_core::{
    decrypt_seed, derive_seed, encrypt_seed, generate_mnemonic, parse_mnemonic, AddressDeriver,
    AddressSource, EncryptedSeed, ReceivePath, ReceivingAddress,
};
use nexapos_device::config::DeviceConfig;
use nexapos_device::queue::{SaleQueue, SaleReceipt, SaleWorker};
use nexapos_ledger::{
    FiatAmount, InternalFlashStorage, RemovableCardStorage, SaleLedger, StorageMedium,
};

fn main() -> Result<()> {
    // Seed material lives in this process — a crash must not dump it to flash
    nexapos_core::memory::disable_core_dumps();

    // Parse CLI args (minimal — no clap dependency needed)
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = PathBuf::from("/data/nexapos.toml");
    let mut validate_only = false;
    let mut provision = false;
    let mut report = false;
    let mut sale_amount: Option<String> = None;
    let mut memo: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--validate" => {
                validate_only = true;
            }
            "--provision" => {
                provision = true;
            }
            "--report" => {
                report = true;
            }
            "--sale" => {
                i += 1;
                if i < args.len() {
                    sale_amount = Some(args[i].clone());
                } else {
                    anyhow::bail!("--sale requires an amount argument");
                }
            }
            "--memo" => {
                i += 1;
                if i < args.len() {
                    memo = Some(args[i].clone());
                } else {
                    anyhow::bail!("--memo requires a text argument");
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("nexapos-device {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => {
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    // Load config
    let mut config = DeviceConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Apply env overrides
    config.apply_env_overrides();

    // Validate
    config
        .validate()
        .context("Configuration validation failed")?;

    // Init logger
    std::env::set_var("RUST_LOG", &config.device.log_level);
    env_logger::init();

    if validate_only {
        println!("Configuration is valid.");
        println!("  Shop:       {}", config.shop.name);
        println!("  Currency:   {}", config.shop.currency);
        println!(
            "  Display:    {}x{}",
            config.display.width, config.display.height
        );
        println!("  Coin type:  {}", config.wallet.coin_type);
        println!("  HD wallet:  {}", config.wallet.hd_enabled);
        println!("  Log file:   {}", config.storage.log_file.display());
        println!(
            "  Medium:     {}",
            if config.storage.use_sd {
                "removable card"
            } else {
                "internal flash"
            }
        );
        return Ok(());
    }

    if provision {
        return provision_seed(&config);
    }

    let storage = build_storage(&config)?;
    let ledger = SaleLedger::open(storage).context("Failed to open the sales ledger")?;

    if report {
        let summary = ledger.reconcile().context("Reconciliation failed")?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let source = build_address_source(&config)?;
    let currency = config.currency()?;
    let shop = config.shop.name.clone();

    // Build tokio runtime
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(async {
        let (queue, worker) = SaleWorker::new(ledger, source, currency);
        let worker_handle = tokio::spawn(worker.run());

        let result = if let Some(amount_str) = sale_amount {
            one_shot_sale(&queue, &shop, &amount_str, memo).await
        } else {
            tokio::select! {
                result = operator_console(&queue, &shop) => result,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received shutdown signal. Exiting…");
                    Ok(())
                }
            }
        };

        // Let the worker drain and exit before the runtime goes away
        drop(queue);
        let _ = worker_handle.await;
        result
    })
}

/// Open the log medium the configuration selects. The choice is made once
/// here; nothing downstream re-checks the flag.
fn build_storage(config: &DeviceConfig) -> Result<Box<dyn StorageMedium>> {
    if config.storage.use_sd {
        let file_name = config
            .storage
            .log_file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("sales.csv");
        let storage = RemovableCardStorage::open(&config.storage.sd_mount, file_name)
            .with_context(|| {
                format!(
                    "Failed to open the sales log on the card at {}",
                    config.storage.sd_mount.display()
                )
            })?;
        Ok(Box::new(storage))
    } else {
        let storage = InternalFlashStorage::with_capacity(
            &config.storage.log_file,
            config.storage.flash_capacity,
        )
        .with_context(|| {
            format!(
                "Failed to open the sales log at {}",
                config.storage.log_file.display()
            )
        })?;
        Ok(Box::new(storage))
    }
}

/// Decide where receiving addresses come from for this session.
///
/// Seed sources, in order: `NEXAPOS_MNEMONIC` (provisioning/bench use),
/// then the encrypted vault unlocked with `NEXAPOS_SEED_PIN`. With no
/// seed, or with HD derivation disabled, every sale reuses the configured
/// fallback address.
fn build_address_source(config: &DeviceConfig) -> Result<AddressSource> {
    if config.wallet.hd_enabled {
        let path = ReceivePath::new(config.wallet.coin_type);

        if let Ok(words) = std::env::var("NEXAPOS_MNEMONIC") {
            let mnemonic = parse_mnemonic(&words).context("NEXAPOS_MNEMONIC is not valid")?;
            let seed = derive_seed(&mnemonic, "");
            return Ok(AddressSource::Derived(AddressDeriver::new(seed, path)));
        }

        if config.wallet.seed_file.exists() {
            let pin = std::env::var("NEXAPOS_SEED_PIN")
                .context("NEXAPOS_SEED_PIN must be set to unlock the seed vault")?;
            let vault = EncryptedSeed::load(&config.wallet.seed_file).with_context(|| {
                format!(
                    "Failed to read the seed vault at {}",
                    config.wallet.seed_file.display()
                )
            })?;
            let seed = decrypt_seed(&vault, &pin).context("Failed to unlock the seed vault")?;
            return Ok(AddressSource::Derived(AddressDeriver::new(seed, path)));
        }

        log::warn!("HD derivation enabled but no seed found — falling back to the static address");
    }

    anyhow::ensure!(
        !config.shop.fallback_address.is_empty(),
        "No wallet seed and no shop.fallback_address configured — cannot accept sales"
    );
    Ok(AddressSource::Static(ReceivingAddress::from_string(
        config.shop.fallback_address.clone(),
    )))
}

/// Generate a fresh seed and write the encrypted vault.
fn provision_seed(config: &DeviceConfig) -> Result<()> {
    let pin = std::env::var("NEXAPOS_SEED_PIN")
        .context("NEXAPOS_SEED_PIN must be set to provision the seed vault")?;

    anyhow::ensure!(
        !config.wallet.seed_file.exists(),
        "Seed vault already exists at {} — refusing to overwrite",
        config.wallet.seed_file.display()
    );

    let mnemonic = generate_mnemonic()?;
    let seed = derive_seed(&mnemonic, "");
    encrypt_seed(&seed, &pin)?
        .save(&config.wallet.seed_file)
        .with_context(|| {
            format!(
                "Failed to write the seed vault to {}",
                config.wallet.seed_file.display()
            )
        })?;

    println!(
        "Seed vault written to {}",
        config.wallet.seed_file.display()
    );
    println!();
    println!("Recovery words — write them down, they will not be shown again:");
    println!("  {}", mnemonic);
    Ok(())
}

/// Record a single sale from the command line and print the receipt.
async fn one_shot_sale(
    queue: &SaleQueue,
    shop: &str,
    amount_str: &str,
    memo: Option<String>,
) -> Result<()> {
    let amount =
        FiatAmount::parse(amount_str).with_context(|| format!("Bad amount: {}", amount_str))?;

    match queue.record_sale(amount, memo).await {
        Ok(receipt) => {
            print_receipt(shop, &receipt);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(e).context("SALE NOT RECORDED — operator action required")),
    }
}

/// Read sales from stdin until EOF or `quit`. One sale per line:
/// `AMOUNT [memo]`.
async fn operator_console(queue: &SaleQueue, shop: &str) -> Result<()> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    println!(
        "{} — enter sales as: AMOUNT [memo]   ('quit' or Ctrl-C to stop)",
        shop
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let (amount_str, memo) = match line.split_once(' ') {
            Some((amount, rest)) => (amount, Some(rest.trim().to_string())),
            None => (line, None),
        };

        let amount = match FiatAmount::parse(amount_str) {
            Ok(amount) => amount,
            Err(e) => {
                eprintln!("  {}", e);
                continue;
            }
        };

        match queue.record_sale(amount, memo).await {
            Ok(receipt) => print_receipt(shop, &receipt),
            Err(e) => eprintln!("  SALE NOT RECORDED — operator action required: {}", e),
        }
    }

    Ok(())
}

fn print_receipt(shop: &str, receipt: &SaleReceipt) {
    println!("=== {} ===", shop);
    println!("  Sale #{}", receipt.record_id);
    println!("  Amount:  {} {}", receipt.amount, receipt.currency);
    println!("  Pay to:  {}", receipt.address);
    if let Some(index) = receipt.derivation_index {
        println!("  Address index: {}", index);
    }
}

fn print_help() {
    println!(
        r#"NexaPOS Device — headless point-of-sale daemon

USAGE:
    nexapos-device [OPTIONS]

OPTIONS:
    -c, --config <PATH>   Config file path (default: /data/nexapos.toml)
    --validate            Validate config file and exit
    --provision           Generate a seed and write the encrypted vault
    --sale <AMOUNT>       Record one sale and exit
    --memo <TEXT>         Memo for --sale
    --report              Print the reconciliation summary as JSON
    -h, --help            Show this help message
    -V, --version         Show version

ENVIRONMENT VARIABLES (override config file):
    NEXAPOS_LOG_LEVEL         Log level (error/warn/info/debug/trace)
    NEXAPOS_SHOP_NAME         Shop name shown on receipts
    NEXAPOS_CURRENCY          Fiat currency code (e.g. USD)
    NEXAPOS_FALLBACK_ADDRESS  Static receiving address
    NEXAPOS_WIFI_SSID         Wi-Fi SSID
    NEXAPOS_WIFI_PASSWORD     Wi-Fi password
    NEXAPOS_COIN_TYPE         SLIP-0044 coin type
    NEXAPOS_HD_ENABLED        true/false
    NEXAPOS_SEED_FILE         Encrypted seed vault path
    NEXAPOS_LOG_FILE          Sales log path
    NEXAPOS_USE_SD            true/false
    NEXAPOS_SD_MOUNT          Card mount point

SECRETS (never stored in config):
    NEXAPOS_SEED_PIN          Operator PIN unlocking the seed vault
    NEXAPOS_MNEMONIC          BIP-39 words (bench/provisioning use only)

EXAMPLES:
    # Validate configuration
    nexapos-device --config nexapos.toml --validate

    # Provision the seed vault
    NEXAPOS_SEED_PIN=1234 nexapos-device --provision

    # Record one sale
    NEXAPOS_SEED_PIN=1234 nexapos-device --sale 5.00 --memo "latte"

    # End-of-day reconciliation
    nexapos-device --report
"#
    );
}

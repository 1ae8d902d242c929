//! Device configuration — parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > built-in defaults.
//! Every section defaults to the factory values, so a device boots with no
//! config file at all. The struct is built once at startup and passed by
//! reference; nothing here is mutable global state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use nexapos_ledger::CurrencyCode;

/// Top-level device configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// General device settings
    #[serde(default)]
    pub device: DeviceSection,

    /// TFT panel geometry
    #[serde(default)]
    pub display: DisplaySection,

    /// Pin assignments for the display bus and touch controller
    #[serde(default)]
    pub pins: PinsSection,

    /// Wi-Fi credentials (may be empty — the UI prompts at runtime)
    #[serde(default)]
    pub wifi: WifiSection,

    /// Shop identity and fiat defaults
    #[serde(default)]
    pub shop: ShopSection,

    /// HD wallet settings
    #[serde(default)]
    pub wallet: WalletSection,

    /// Sales log placement
    #[serde(default)]
    pub storage: StorageSection,
}

/// General device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSection {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// TFT panel geometry (CYD ESP32-2432S028R: ILI9341, 240x320)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySection {
    #[serde(default = "default_display_width")]
    pub width: u32,
    #[serde(default = "default_display_height")]
    pub height: u32,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            width: default_display_width(),
            height: default_display_height(),
        }
    }
}

/// Pin assignments (adjust per board)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinsSection {
    #[serde(default = "default_tft_mosi")]
    pub tft_mosi: u8,
    #[serde(default = "default_tft_miso")]
    pub tft_miso: u8,
    #[serde(default = "default_tft_sclk")]
    pub tft_sclk: u8,
    #[serde(default = "default_tft_cs")]
    pub tft_cs: u8,
    #[serde(default = "default_tft_dc")]
    pub tft_dc: u8,
    #[serde(default = "default_tft_rst")]
    pub tft_rst: u8,
    #[serde(default = "default_tft_backlight")]
    pub tft_backlight: u8,
    #[serde(default = "default_touch_cs")]
    pub touch_cs: u8,
    #[serde(default = "default_touch_irq")]
    pub touch_irq: u8,
}

impl Default for PinsSection {
    fn default() -> Self {
        Self {
            tft_mosi: default_tft_mosi(),
            tft_miso: default_tft_miso(),
            tft_sclk: default_tft_sclk(),
            tft_cs: default_tft_cs(),
            tft_dc: default_tft_dc(),
            tft_rst: default_tft_rst(),
            tft_backlight: default_tft_backlight(),
            touch_cs: default_touch_cs(),
            touch_irq: default_touch_irq(),
        }
    }
}

/// Wi-Fi credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WifiSection {
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub password: String,
}

/// Shop identity and fiat defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopSection {
    /// Shop name shown on receipts
    #[serde(default = "default_shop_name")]
    pub name: String,

    /// Static receiving address, used only when HD derivation is disabled
    /// or no seed is available. Must be replaced before production use.
    #[serde(default)]
    pub fallback_address: String,

    /// Fiat currency for sale amounts
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for ShopSection {
    fn default() -> Self {
        Self {
            name: default_shop_name(),
            fallback_address: String::new(),
            currency: default_currency(),
        }
    }
}

/// HD wallet settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSection {
    /// SLIP-0044 coin type (Nexa)
    #[serde(default = "default_coin_type")]
    pub coin_type: u32,

    /// Derive a fresh address per sale; when false every sale reuses the
    /// fallback address
    #[serde(default = "default_hd_enabled")]
    pub hd_enabled: bool,

    /// Encrypted seed vault location
    #[serde(default = "default_seed_file")]
    pub seed_file: PathBuf,
}

impl Default for WalletSection {
    fn default() -> Self {
        Self {
            coin_type: default_coin_type(),
            hd_enabled: default_hd_enabled(),
            seed_file: default_seed_file(),
        }
    }
}

/// Sales log placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    /// Sales log path on the internal flash partition
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Write the log to the removable card instead of internal flash
    #[serde(default)]
    pub use_sd: bool,

    /// Card mount point (only used when `use_sd` is set)
    #[serde(default = "default_sd_mount")]
    pub sd_mount: PathBuf,

    /// Internal flash log partition quota in bytes
    #[serde(default = "default_flash_capacity")]
    pub flash_capacity: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            use_sd: false,
            sd_mount: default_sd_mount(),
            flash_capacity: default_flash_capacity(),
        }
    }
}

// ============================================================================
// Default value functions (factory values of the CYD board build)
// ============================================================================

fn default_log_level() -> String {
    "info".to_string()
}

fn default_display_width() -> u32 {
    240
}

fn default_display_height() -> u32 {
    320
}

fn default_tft_mosi() -> u8 {
    23
}

fn default_tft_miso() -> u8 {
    19
}

fn default_tft_sclk() -> u8 {
    18
}

fn default_tft_cs() -> u8 {
    5
}

fn default_tft_dc() -> u8 {
    2
}

fn default_tft_rst() -> u8 {
    4
}

fn default_tft_backlight() -> u8 {
    32
}

fn default_touch_cs() -> u8 {
    33
}

fn default_touch_irq() -> u8 {
    36
}

fn default_shop_name() -> String {
    "My Shop".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_coin_type() -> u32 {
    29223
}

fn default_hd_enabled() -> bool {
    true
}

fn default_seed_file() -> PathBuf {
    PathBuf::from("/data/wallet.seed")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/data/sales.csv")
}

fn default_sd_mount() -> PathBuf {
    PathBuf::from("/sd")
}

fn default_flash_capacity() -> u64 {
    512 * 1024
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl DeviceConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: DeviceConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Load from a TOML file when it exists, otherwise start from the
    /// factory defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            log::info!(
                "no config file at {} — using factory defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `NEXAPOS_LOG_LEVEL`
    /// - `NEXAPOS_SHOP_NAME`
    /// - `NEXAPOS_CURRENCY`
    /// - `NEXAPOS_FALLBACK_ADDRESS`
    /// - `NEXAPOS_WIFI_SSID`
    /// - `NEXAPOS_WIFI_PASSWORD`
    /// - `NEXAPOS_COIN_TYPE`
    /// - `NEXAPOS_HD_ENABLED`
    /// - `NEXAPOS_SEED_FILE`
    /// - `NEXAPOS_LOG_FILE`
    /// - `NEXAPOS_USE_SD`
    /// - `NEXAPOS_SD_MOUNT`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("NEXAPOS_LOG_LEVEL") {
            self.device.log_level = v;
        }
        if let Ok(v) = std::env::var("NEXAPOS_SHOP_NAME") {
            self.shop.name = v;
        }
        if let Ok(v) = std::env::var("NEXAPOS_CURRENCY") {
            self.shop.currency = v;
        }
        if let Ok(v) = std::env::var("NEXAPOS_FALLBACK_ADDRESS") {
            self.shop.fallback_address = v;
        }
        if let Ok(v) = std::env::var("NEXAPOS_WIFI_SSID") {
            self.wifi.ssid = v;
        }
        if let Ok(v) = std::env::var("NEXAPOS_WIFI_PASSWORD") {
            self.wifi.password = v;
        }
        if let Ok(v) = std::env::var("NEXAPOS_COIN_TYPE") {
            if let Ok(coin_type) = v.parse::<u32>() {
                self.wallet.coin_type = coin_type;
            }
        }
        if let Ok(v) = std::env::var("NEXAPOS_HD_ENABLED") {
            if let Ok(enabled) = v.parse::<bool>() {
                self.wallet.hd_enabled = enabled;
            }
        }
        if let Ok(v) = std::env::var("NEXAPOS_SEED_FILE") {
            self.wallet.seed_file = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NEXAPOS_LOG_FILE") {
            self.storage.log_file = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("NEXAPOS_USE_SD") {
            if let Ok(use_sd) = v.parse::<bool>() {
                self.storage.use_sd = use_sd;
            }
        }
        if let Ok(v) = std::env::var("NEXAPOS_SD_MOUNT") {
            self.storage.sd_mount = PathBuf::from(v);
        }
    }

    /// Parse the configured fiat currency.
    pub fn currency(&self) -> Result<CurrencyCode> {
        CurrencyCode::parse(&self.shop.currency)
            .with_context(|| format!("shop.currency {:?} is not a valid code", self.shop.currency))
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.display.width > 0 && self.display.height > 0,
            "display geometry must be non-zero"
        );

        anyhow::ensure!(!self.shop.name.is_empty(), "shop.name must not be empty");

        self.currency()?;

        anyhow::ensure!(
            self.wallet.coin_type < (1 << 31),
            "wallet.coin_type must be below 2^31 (hardened derivation)"
        );

        // Without HD derivation, every sale depends on the fallback address
        if !self.wallet.hd_enabled {
            anyhow::ensure!(
                !self.shop.fallback_address.is_empty(),
                "shop.fallback_address is required when wallet.hd_enabled is false"
            );
        }

        anyhow::ensure!(
            self.storage.log_file.file_name().is_some(),
            "storage.log_file must name a file"
        );

        anyhow::ensure!(
            self.storage.flash_capacity > 0,
            "storage.flash_capacity must be > 0"
        );

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

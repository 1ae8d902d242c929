//! NexaPOS Device
//!
//! Device configuration, the single-consumer sale queue, and the hardware
//! collaborator interfaces. The `nexapos-device` binary wires these
//! together into the headless daemon.

pub mod config;
pub mod hal;
pub mod queue;

pub use config::DeviceConfig;
pub use queue::{SaleError, SaleQueue, SaleReceipt, SaleWorker};

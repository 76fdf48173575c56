//! Commodity Risk Contracts
//!
//! Risk-parameter core for a lending pool that accepts tokenized commodities
//! as collateral.
//!
//! ## Architecture
//!
//! - **ReserveConfiguration**: every parameter and flag of a reserve packed into one 256-bit word
//! - **UserConfiguration**: per-user borrow/collateral bitmap over up to 128 reserves
//! - **HaircutEngine**: risk discount per asset class from volatility, drawdown,
//!   quality grade, certificate age and liquidity
//! - **CircuitBreakers**: per-asset staleness, deviation, utilization and
//!   liquidation-wave checks that dispatch mitigations to an emergency module
//!
//! The pure stores (`ReserveRegistry`, `UserLedgers`, `HaircutEngine`,
//! `CircuitBreakers`) take the caller's role explicitly. The contract modules
//! (`ReserveManager`, `RiskMonitor`) resolve roles through `AccessControl`
//! and persist the same records in odra storage.

#![cfg_attr(target_arch = "wasm32", no_std)]

extern crate alloc;

// Re-export odra for downstream usage
pub use odra;

// Core module declarations
pub mod types;
pub mod errors;
pub mod interfaces;
pub mod access_control;

// Packed records and pure stores
pub mod reserve_config;
pub mod reserve_registry;
pub mod user_config;
pub mod haircut;
pub mod circuit_breaker;

// Contract modules
pub mod reserve_manager;
pub mod risk_monitor;

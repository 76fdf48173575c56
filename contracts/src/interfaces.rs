//! Collaborator interfaces for the risk core.
//!
//! The core never owns its collaborators. Callers inject them per operation:
//! in-memory stubs in tests, cross-contract adapters on chain
//! (see `risk_monitor`).

use odra::prelude::*;
use odra::casper_types::U256;
use crate::reserve_config::ReserveConfiguration;
use crate::types::Mitigation;

/// Resolves reserves for the user ledger composites
pub trait ReserveLookup {
    /// Index assigned to `asset` at onboarding
    fn reserve_index(&self, asset: &Address) -> Option<u32>;

    /// Packed configuration of the reserve at `index`
    fn reserve_configuration(&self, index: u32) -> Option<ReserveConfiguration>;
}

/// Pool figures consulted by the circuit breakers
pub trait PoolMetrics {
    /// Total value locked in the asset's reserve
    fn total_value_locked(&self, asset: &Address) -> U256;

    /// Reserve utilization in basis points
    fn utilization_bps(&self, asset: &Address) -> u32;
}

/// Oracle prices consulted by the deviation breaker
pub trait PriceFeed {
    fn current_price(&self, asset: &Address) -> U256;

    /// Reference price the deviation is measured against
    fn historical_price(&self, asset: &Address) -> U256;
}

/// Receives mitigation requests when a breaker trips or warns
///
/// Delivery failures are the implementor's concern; the breakers never
/// observe them.
pub trait EmergencyModule {
    fn execute_mitigation(&mut self, mitigation: Mitigation, asset: &Address);
}

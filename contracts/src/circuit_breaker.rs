//! Per-asset circuit breakers.
//!
//! Checked on demand, never on a timer. `check_all` evaluates, in order:
//!
//! 1. oracle staleness (first sighting initializes the timestamp silently)
//! 2. price deviation against the oracle's historical reference
//! 3. high utilization (warning only: dispatches a rate increase, keeps going)
//! 4. liquidation wave over a rolling window
//!
//! and stops at the first trip. Trips are reported as values; they never fail
//! the call that detects them.
//!
//! The record-level functions (`run_checks`, `apply_oracle_update`,
//! `apply_liquidation`) are shared by the in-memory store and the on-chain
//! `RiskMonitor`.

use alloc::collections::BTreeMap;
use odra::prelude::*;
use odra::casper_types::U256;
use crate::access_control::{require_role, GOVERNORS, ORACLE_KEEPERS, POOL_ONLY};
use crate::errors::{RiskError, RiskResult};
use crate::interfaces::{EmergencyModule, PoolMetrics, PriceFeed};
use crate::types::{bps_of, BreakerKind, Role};

pub use crate::types::BPS_SCALE;

pub const DEFAULT_STALENESS_SECS: u64 = 3_600;
pub const DEFAULT_DEVIATION_BPS: u32 = 1_000;
pub const DEFAULT_UTILIZATION_BPS: u32 = 9_800;
pub const DEFAULT_LIQUIDATION_WAVE_BPS: u32 = 1_000;
pub const DEFAULT_ROLLING_WINDOW_SECS: u64 = 86_400;

/// Breaker thresholds, shared by every asset
#[odra::odra_type]
#[derive(Copy)]
pub struct BreakerConfig {
    /// Maximum oracle silence before borrowing is paused
    pub staleness_secs: u64,
    /// Maximum |current - historical| / historical
    pub deviation_bps: u32,
    /// Utilization above which rates are raised
    pub utilization_bps: u32,
    /// Rolling liquidation volume, as a share of TVL, that pauses the asset
    pub liquidation_wave_bps: u32,
    /// Length of the liquidation window
    pub rolling_window_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            staleness_secs: DEFAULT_STALENESS_SECS,
            deviation_bps: DEFAULT_DEVIATION_BPS,
            utilization_bps: DEFAULT_UTILIZATION_BPS,
            liquidation_wave_bps: DEFAULT_LIQUIDATION_WAVE_BPS,
            rolling_window_secs: DEFAULT_ROLLING_WINDOW_SECS,
        }
    }
}

impl BreakerConfig {
    pub fn validate(&self) -> RiskResult<()> {
        let bps_valid = |bps: u32| (1..=BPS_SCALE).contains(&bps);
        if self.staleness_secs == 0
            || self.rolling_window_secs == 0
            || !bps_valid(self.deviation_bps)
            || !bps_valid(self.utilization_bps)
            || !bps_valid(self.liquidation_wave_bps)
        {
            return Err(RiskError::InvalidBreakerConfig);
        }
        Ok(())
    }
}

/// Breaker bookkeeping for one asset
#[odra::odra_type]
#[derive(Default)]
pub struct BreakerState {
    /// Last oracle update; `None` until first seen
    pub last_oracle_update: Option<u64>,
    /// Liquidations recorded in the current window
    pub liquidation_volume: U256,
    /// Start of the current window
    pub window_start: u64,
}

impl BreakerState {
    /// Reset the liquidation window if it has elapsed; true if it was reset
    fn roll_window(&mut self, now: u64, window_secs: u64) -> bool {
        if now.saturating_sub(self.window_start) < window_secs {
            return false;
        }
        self.liquidation_volume = U256::zero();
        self.window_start = now;
        true
    }
}

/// Outcome of `check_all`
#[odra::odra_type]
#[derive(Default)]
pub struct BreakerReport {
    pub triggered: bool,
    /// Breaker that tripped
    pub breaker: Option<BreakerKind>,
    /// Empty when nothing tripped
    pub reason: String,
    /// Warning-only checks that dispatched a mitigation
    pub warnings: Vec<BreakerKind>,
}

impl BreakerReport {
    fn tripped(kind: BreakerKind, warnings: Vec<BreakerKind>) -> Self {
        Self {
            triggered: true,
            breaker: Some(kind),
            reason: String::from(kind.reason()),
            warnings,
        }
    }

    fn clear(warnings: Vec<BreakerKind>) -> Self {
        Self {
            warnings,
            ..Self::default()
        }
    }
}

// ========== Record-level checks ==========

fn is_stale(config: &BreakerConfig, state: &mut BreakerState, asset: &Address, now: u64) -> bool {
    match state.last_oracle_update {
        None => {
            state.last_oracle_update = Some(now);
            tracing::debug!(?asset, now, "oracle timestamp initialized");
            false
        }
        Some(last) => now.saturating_sub(last) > config.staleness_secs,
    }
}

fn is_deviated<F: PriceFeed + ?Sized>(config: &BreakerConfig, asset: &Address, oracle: &F) -> bool {
    let historical = oracle.historical_price(asset);
    if historical.is_zero() {
        return false;
    }
    let current = oracle.current_price(asset);
    let deviation = if current > historical { current - historical } else { historical - current };
    // deviation * 10000 > historical * bps
    deviation > bps_of(historical, config.deviation_bps)
}

fn is_over_utilized<P: PoolMetrics + ?Sized>(config: &BreakerConfig, asset: &Address, pool: &P) -> bool {
    pool.utilization_bps(asset) > config.utilization_bps
}

fn is_liquidation_wave<P: PoolMetrics + ?Sized>(
    config: &BreakerConfig,
    state: &mut BreakerState,
    asset: &Address,
    now: u64,
    pool: &P,
) -> bool {
    if state.roll_window(now, config.rolling_window_secs) {
        tracing::debug!(?asset, now, "liquidation window reset");
    }
    let tvl = pool.total_value_locked(asset);
    if tvl.is_zero() {
        return false;
    }
    state.liquidation_volume > bps_of(tvl, config.liquidation_wave_bps)
}

/// Run every breaker against `state`, dispatching mitigations as they fire
///
/// Not read-only: the first check on an asset records `now` as its oracle
/// timestamp, and an expired liquidation window is reset before the wave
/// check. Callers must persist `state` afterwards.
pub fn run_checks<P, F, E>(
    config: &BreakerConfig,
    state: &mut BreakerState,
    asset: &Address,
    now: u64,
    pool: &P,
    oracle: &F,
    emergency: &mut E,
) -> BreakerReport
where
    P: PoolMetrics + ?Sized,
    F: PriceFeed + ?Sized,
    E: EmergencyModule + ?Sized,
{
    let mut warnings = Vec::new();

    let trip = |kind: BreakerKind, emergency: &mut E, warnings: Vec<BreakerKind>| {
        tracing::warn!(?asset, breaker = ?kind, reason = kind.reason(), "circuit breaker triggered");
        emergency.execute_mitigation(kind.mitigation(), asset);
        BreakerReport::tripped(kind, warnings)
    };

    if is_stale(config, state, asset, now) {
        return trip(BreakerKind::OracleStaleness, emergency, warnings);
    }
    if is_deviated(config, asset, oracle) {
        return trip(BreakerKind::PriceDeviation, emergency, warnings);
    }
    if is_over_utilized(config, asset, pool) {
        let kind = BreakerKind::HighUtilization;
        tracing::warn!(?asset, breaker = ?kind, reason = kind.reason(), "circuit breaker warning");
        emergency.execute_mitigation(kind.mitigation(), asset);
        warnings.push(kind);
    }
    if is_liquidation_wave(config, state, asset, now, pool) {
        return trip(BreakerKind::LiquidationWave, emergency, warnings);
    }
    BreakerReport::clear(warnings)
}

/// Record an oracle update; timestamps older than the stored one are ignored.
/// Returns whether the state changed.
pub fn apply_oracle_update(state: &mut BreakerState, timestamp: u64) -> bool {
    if matches!(state.last_oracle_update, Some(last) if timestamp < last) {
        return false;
    }
    state.last_oracle_update = Some(timestamp);
    true
}

/// Reset an expired window, then add `amount` to the current one
pub fn apply_liquidation(config: &BreakerConfig, state: &mut BreakerState, amount: U256, now: u64) {
    if state.roll_window(now, config.rolling_window_secs) {
        tracing::debug!(now, "liquidation window reset");
    }
    state.liquidation_volume = state.liquidation_volume.saturating_add(amount);
}

// ========== Store ==========

/// In-memory breaker store keyed by asset
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakers {
    config: BreakerConfig,
    states: BTreeMap<Address, BreakerState>,
}

impl CircuitBreakers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BreakerConfig) -> RiskResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            states: BTreeMap::new(),
        })
    }

    /// Run every breaker for `asset` at `now`
    pub fn check_all<P, F, E>(
        &mut self,
        asset: &Address,
        now: u64,
        pool: &P,
        oracle: &F,
        emergency: &mut E,
    ) -> BreakerReport
    where
        P: PoolMetrics + ?Sized,
        F: PriceFeed + ?Sized,
        E: EmergencyModule + ?Sized,
    {
        let mut state = self.breaker_state(asset);
        let report = run_checks(&self.config, &mut state, asset, now, pool, oracle, emergency);
        self.states.insert(*asset, state);
        report
    }

    pub fn update_oracle_timestamp(&mut self, caller: Role, asset: Address, timestamp: u64) -> RiskResult<()> {
        require_role(caller, ORACLE_KEEPERS)?;
        let mut state = self.breaker_state(&asset);
        if apply_oracle_update(&mut state, timestamp) {
            self.states.insert(asset, state);
        }
        Ok(())
    }

    pub fn record_liquidation(&mut self, caller: Role, asset: Address, amount: U256, now: u64) -> RiskResult<()> {
        require_role(caller, POOL_ONLY)?;
        let mut state = self.breaker_state(&asset);
        apply_liquidation(&self.config, &mut state, amount, now);
        self.states.insert(asset, state);
        Ok(())
    }

    pub fn set_breaker_config(&mut self, caller: Role, config: BreakerConfig) -> RiskResult<()> {
        require_role(caller, GOVERNORS)?;
        config.validate()?;
        self.config = config;
        tracing::info!(
            staleness = config.staleness_secs,
            deviation = config.deviation_bps,
            utilization = config.utilization_bps,
            wave = config.liquidation_wave_bps,
            window = config.rolling_window_secs,
            "breaker config updated"
        );
        Ok(())
    }

    pub fn breaker_config(&self) -> BreakerConfig {
        self.config
    }

    /// State of `asset`; default for assets never seen
    pub fn breaker_state(&self, asset: &Address) -> BreakerState {
        self.states.get(asset).cloned().unwrap_or_default()
    }
}

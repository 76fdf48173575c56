//! Risk Monitor Contract
//!
//! On-chain home of the haircut engine and the per-asset circuit breakers.
//!
//! Collaborators are reached through cross-contract calls:
//! - pool: `get_total_value_locked(asset)`, `get_utilization_bps(asset)`
//! - oracle: `get_current_price(asset)`, `get_historical_price(asset)`
//! - emergency module: `execute_mitigation(mitigation, asset)`, where
//!   `mitigation` is the wire name (`PAUSE_BORROWING`, `PAUSE_ALL`,
//!   `INCREASE_RATES`)

use alloc::rc::Rc;
use odra::prelude::*;
use odra::casper_types::{U256, RuntimeArgs, runtime_args};
use odra::{CallDef, ContractEnv};
use crate::access_control::{AccessControl, GOVERNORS, ORACLE_KEEPERS, POOL_ONLY, RISK_ADMINS};
use crate::circuit_breaker::{apply_liquidation, apply_oracle_update, run_checks, BreakerConfig, BreakerReport, BreakerState};
use crate::errors::{or_revert, RiskError};
use crate::haircut::{
    default_haircut_configs, quality_key, validate_discount, validate_price_series, HaircutBreakdown, HaircutConfig,
    PricePoint, RiskMetrics,
};
use crate::interfaces::{EmergencyModule, PoolMetrics, PriceFeed};
use crate::types::{AssetClass, Mitigation, Role};

/// Risk Monitor Contract
#[odra::module]
pub struct RiskMonitor {
    /// Role book
    access: SubModule<AccessControl>,
    /// Haircut parameters per asset class
    haircut_configs: Mapping<AssetClass, HaircutConfig>,
    /// Latest risk metrics per asset class
    risk_metrics: Mapping<AssetClass, RiskMetrics>,
    /// Latest price series per asset class
    price_history: Mapping<AssetClass, Vec<PricePoint>>,
    /// Quality discounts: (asset class, SHA-256 of grade label) -> bps
    quality_discounts: Mapping<(AssetClass, [u8; 32]), u32>,
    /// Breaker thresholds
    breaker_config: Var<BreakerConfig>,
    /// Breaker state per asset
    breaker_states: Mapping<Address, BreakerState>,
    /// Pool contract address
    pool: Var<Address>,
    /// Oracle contract address
    oracle: Var<Address>,
    /// Emergency module contract address
    emergency: Var<Address>,
}

#[odra::module]
impl RiskMonitor {
    /// Initialize with the first admin, the collaborators and the default tiers
    pub fn init(&mut self, admin: Address, pool: Address, oracle: Address, emergency: Address) {
        self.access.init(admin);
        self.pool.set(pool);
        self.oracle.set(oracle);
        self.emergency.set(emergency);
        self.breaker_config.set(BreakerConfig::default());
        for (class, config) in default_haircut_configs() {
            self.haircut_configs.set(&class, config);
        }
        tracing::debug!("risk monitor initialized");
    }

    // ========== Roles ==========

    pub fn grant_role(&mut self, role: Role, account: Address) {
        self.access.grant_role(role, account);
    }

    pub fn revoke_role(&mut self, role: Role, account: Address) {
        self.access.revoke_role(role, account);
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.access.has_role(role, account)
    }

    /// Repoint the collaborator contracts (governance only)
    pub fn set_collaborators(&mut self, pool: Address, oracle: Address, emergency: Address) {
        self.require_caller_role(GOVERNORS);
        self.pool.set(pool);
        self.oracle.set(oracle);
        self.emergency.set(emergency);
    }

    // ========== Haircut: Governance ==========

    pub fn register_asset_class(&mut self, class: AssetClass, config: HaircutConfig) {
        self.require_caller_role(GOVERNORS);
        if self.haircut_configs.get(&class).is_some() {
            self.env().revert(RiskError::AssetClassAlreadyRegistered);
        }
        or_revert(&self.env(), config.validate());
        self.haircut_configs.set(&class, config);
        tracing::info!(class = class.as_u8(), "asset class registered");
    }

    pub fn set_haircut_config(&mut self, class: AssetClass, base: u32, min: u32, max: u32) {
        self.require_caller_role(GOVERNORS);
        let mut config = self.get_haircut_config(class);
        or_revert(&self.env(), config.set_bounds(base, min, max));
        self.haircut_configs.set(&class, config);
        tracing::info!(class = class.as_u8(), base, min, max, "haircut bounds updated");
    }

    // ========== Haircut: Risk Admin ==========

    pub fn load_price_history(&mut self, class: AssetClass, series: Vec<PricePoint>) {
        self.require_caller_role(RISK_ADMINS);
        self.require_asset_class(class);
        or_revert(&self.env(), validate_price_series(&series));
        let points = series.len();
        self.price_history.set(&class, series);
        tracing::info!(class = class.as_u8(), points, "price history loaded");
    }

    pub fn update_risk_metrics(&mut self, class: AssetClass, metrics: RiskMetrics) {
        self.require_caller_role(RISK_ADMINS);
        let mut config = self.get_haircut_config(class);
        or_revert(&self.env(), config.refresh_components(&metrics));
        self.risk_metrics.set(&class, metrics);
        self.haircut_configs.set(&class, config);
        tracing::info!(class = class.as_u8(), "risk metrics replaced");
    }

    pub fn set_quality_discount(&mut self, class: AssetClass, quality_label: String, discount_bps: u32) {
        self.require_caller_role(RISK_ADMINS);
        self.require_asset_class(class);
        or_revert(&self.env(), validate_discount(discount_bps));
        self.quality_discounts.set(&(class, quality_key(&quality_label)), discount_bps);
        tracing::info!(class = class.as_u8(), label = quality_label.as_str(), discount_bps, "quality discount set");
    }

    pub fn set_age_depreciation(&mut self, class: AssetClass, rate_per_day_bps: u32, max_discount_bps: u32) {
        self.require_caller_role(RISK_ADMINS);
        let mut config = self.get_haircut_config(class);
        or_revert(&self.env(), config.set_age_depreciation(rate_per_day_bps, max_discount_bps));
        self.haircut_configs.set(&class, config);
        tracing::info!(class = class.as_u8(), rate_per_day_bps, max_discount_bps, "age depreciation updated");
    }

    // ========== Haircut: Queries ==========

    pub fn calculate_haircut(
        &self,
        class: AssetClass,
        market_value: U256,
        quality_label: String,
        certificate_date: u64,
    ) -> HaircutBreakdown {
        let config = self.get_haircut_config(class);
        let quality_bps = self.get_quality_discount(class, quality_label);
        config.breakdown(quality_bps, certificate_date, self.now(), market_value)
    }

    pub fn value_after_haircut(
        &self,
        class: AssetClass,
        market_value: U256,
        quality_label: String,
        certificate_date: u64,
    ) -> U256 {
        self.calculate_haircut(class, market_value, quality_label, certificate_date)
            .discounted_value
    }

    pub fn get_haircut_config(&self, class: AssetClass) -> HaircutConfig {
        or_revert(&self.env(), self.haircut_configs.get(&class).ok_or(RiskError::UnknownAssetClass))
    }

    pub fn get_risk_metrics(&self, class: AssetClass) -> Option<RiskMetrics> {
        self.risk_metrics.get(&class)
    }

    pub fn get_price_history(&self, class: AssetClass) -> Vec<PricePoint> {
        self.price_history.get(&class).unwrap_or_default()
    }

    pub fn get_quality_discount(&self, class: AssetClass, quality_label: String) -> u32 {
        self.quality_discounts
            .get(&(class, quality_key(&quality_label)))
            .unwrap_or(0)
    }

    // ========== Circuit Breakers ==========

    /// Run every breaker for `asset`; trips are reported, never reverted
    pub fn check_all(&mut self, asset: Address) -> BreakerReport {
        let now = self.now();
        let config = self.get_breaker_config();
        let mut state = self.get_breaker_state(asset);

        let env = self.env();
        let pool = PoolContract { env: env.clone(), address: self.collaborator(&self.pool) };
        let oracle = OracleContract { env: env.clone(), address: self.collaborator(&self.oracle) };
        let mut emergency = EmergencyContract { env, address: self.collaborator(&self.emergency) };

        let report = run_checks(&config, &mut state, &asset, now, &pool, &oracle, &mut emergency);
        self.breaker_states.set(&asset, state);
        report
    }

    pub fn update_oracle_timestamp(&mut self, asset: Address, timestamp: u64) {
        self.require_caller_role(ORACLE_KEEPERS);
        let mut state = self.get_breaker_state(asset);
        if apply_oracle_update(&mut state, timestamp) {
            self.breaker_states.set(&asset, state);
        }
    }

    pub fn record_liquidation(&mut self, asset: Address, amount: U256) {
        self.require_caller_role(POOL_ONLY);
        let config = self.get_breaker_config();
        let mut state = self.get_breaker_state(asset);
        apply_liquidation(&config, &mut state, amount, self.now());
        self.breaker_states.set(&asset, state);
    }

    pub fn set_breaker_config(&mut self, config: BreakerConfig) {
        self.require_caller_role(GOVERNORS);
        or_revert(&self.env(), config.validate());
        self.breaker_config.set(config);
        tracing::info!("breaker config updated");
    }

    pub fn get_breaker_config(&self) -> BreakerConfig {
        self.breaker_config.get().unwrap_or_default()
    }

    pub fn get_breaker_state(&self, asset: Address) -> BreakerState {
        self.breaker_states.get(&asset).unwrap_or_default()
    }
}

impl RiskMonitor {
    fn require_caller_role(&self, allowed: &[Role]) {
        if self.access.resolve_role(self.env().caller(), allowed).is_none() {
            self.env().revert(RiskError::Unauthorized);
        }
    }

    fn require_asset_class(&self, class: AssetClass) {
        if self.haircut_configs.get(&class).is_none() {
            self.env().revert(RiskError::UnknownAssetClass);
        }
    }

    fn collaborator(&self, slot: &Var<Address>) -> Address {
        or_revert(&self.env(), slot.get().ok_or(RiskError::CollaboratorNotSet))
    }

    /// Block time in seconds
    fn now(&self) -> u64 {
        self.env().get_block_time() / 1000
    }
}

// ========== Collaborator Adapters ==========

/// Pool reached through cross-contract calls
struct PoolContract {
    env: Rc<ContractEnv>,
    address: Address,
}

impl PoolMetrics for PoolContract {
    fn total_value_locked(&self, asset: &Address) -> U256 {
        let args = runtime_args! {
            "asset" => *asset
        };
        let call = CallDef::new("get_total_value_locked", false, args);
        self.env.call_contract::<U256>(self.address, call)
    }

    fn utilization_bps(&self, asset: &Address) -> u32 {
        let args = runtime_args! {
            "asset" => *asset
        };
        let call = CallDef::new("get_utilization_bps", false, args);
        self.env.call_contract::<u32>(self.address, call)
    }
}

/// Oracle reached through cross-contract calls
struct OracleContract {
    env: Rc<ContractEnv>,
    address: Address,
}

impl PriceFeed for OracleContract {
    fn current_price(&self, asset: &Address) -> U256 {
        let args = runtime_args! {
            "asset" => *asset
        };
        let call = CallDef::new("get_current_price", false, args);
        self.env.call_contract::<U256>(self.address, call)
    }

    fn historical_price(&self, asset: &Address) -> U256 {
        let args = runtime_args! {
            "asset" => *asset
        };
        let call = CallDef::new("get_historical_price", false, args);
        self.env.call_contract::<U256>(self.address, call)
    }
}

/// Emergency module reached through cross-contract calls
struct EmergencyContract {
    env: Rc<ContractEnv>,
    address: Address,
}

impl EmergencyModule for EmergencyContract {
    fn execute_mitigation(&mut self, mitigation: Mitigation, asset: &Address) {
        let args = runtime_args! {
            "mitigation" => String::from(mitigation.name()),
            "asset" => *asset
        };
        let call = CallDef::new("execute_mitigation", true, args);
        self.env.call_contract::<()>(self.address, call);
    }
}

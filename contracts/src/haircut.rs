//! Collateral haircut engine.
//!
//! Derives a risk discount for commodity collateral from externally computed
//! risk metrics, a quality grade and (for perishables) the age of the
//! warehouse certificate. The total is the sum of six components clamped
//! into the governance band `[min_haircut_bps, max_haircut_bps]`:
//!
//! 1. base (governance)
//! 2. volatility x 0.5
//! 3. max drawdown x 0.3
//! 4. quality discount, looked up by SHA-256 of the grade label
//! 5. age: whole days since certification x daily depreciation, capped
//! 6. liquidity: step function of the liquidity score
//!
//! Components 2, 3 and 6 are written into the class's `HaircutConfig`
//! whenever its risk metrics are replaced.

use alloc::collections::BTreeMap;
use odra::prelude::*;
use odra::casper_types::U256;
use sha2::{Digest, Sha256};
use crate::access_control::{require_role, GOVERNORS, RISK_ADMINS};
use crate::errors::{RiskError, RiskResult};
use crate::types::{bps_of, AssetClass, Role};

pub use crate::types::BPS_SCALE;

/// Hard protocol ceiling for any haircut bound or discount (50%)
pub const MAX_HAIRCUT_BPS: u32 = 5_000;

/// Volatility weight (0.5)
pub const VOLATILITY_MULTIPLIER_BPS: u32 = 5_000;

/// Drawdown weight (0.3)
pub const DRAWDOWN_MULTIPLIER_BPS: u32 = 3_000;

/// Liquidity score scale (10000 = perfectly liquid)
pub const MAX_LIQUIDITY_SCORE: u32 = 10_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Liquidity steps: (minimum score, haircut), highest score first
const LIQUIDITY_STEPS: [(u32, u32); 3] = [(8_000, 0), (5_000, 100), (2_000, 300)];

/// Haircut for scores below the last step
const ILLIQUID_HAIRCUT_BPS: u32 = 500;

/// One observation of a price series
#[odra::odra_type]
#[derive(Copy)]
pub struct PricePoint {
    /// Seconds since epoch
    pub timestamp: u64,
    pub price: U256,
}

/// Statistical risk profile of an asset class, computed off-core
#[odra::odra_type]
#[derive(Copy)]
pub struct RiskMetrics {
    /// Annualized volatility in bps
    pub volatility_bps: u32,
    /// Maximum drawdown in bps
    pub max_drawdown_bps: u32,
    /// 95% value-at-risk in bps
    pub var_95_bps: u32,
    /// 99% value-at-risk in bps
    pub var_99_bps: u32,
    /// Sharpe ratio scaled by 1e4 (may be negative)
    pub sharpe_ratio_bps: i32,
    /// 0 (illiquid) to 10000 (perfectly liquid)
    pub liquidity_score: u32,
    /// Observations the metrics were computed from
    pub sample_count: u32,
    /// When the metrics were computed
    pub calculated_at: u64,
}

/// Haircut parameters of one asset class
#[odra::odra_type]
#[derive(Copy)]
pub struct HaircutConfig {
    /// Governance base haircut
    pub base_haircut_bps: u32,
    /// Derived from volatility
    pub volatility_haircut_bps: u32,
    /// Derived from max drawdown
    pub drawdown_haircut_bps: u32,
    /// Derived from liquidity score
    pub liquidity_haircut_bps: u32,
    /// Daily depreciation for perishables (0 = not perishable)
    pub age_depreciation_bps_per_day: u32,
    /// Cap on the age component
    pub max_age_discount_bps: u32,
    /// Lower clamp of the total
    pub min_haircut_bps: u32,
    /// Upper clamp of the total
    pub max_haircut_bps: u32,
}

impl HaircutConfig {
    /// Config with governance bounds only; derived components start at zero
    pub fn with_bounds(base_haircut_bps: u32, min_haircut_bps: u32, max_haircut_bps: u32) -> Self {
        Self {
            base_haircut_bps,
            volatility_haircut_bps: 0,
            drawdown_haircut_bps: 0,
            liquidity_haircut_bps: 0,
            age_depreciation_bps_per_day: 0,
            max_age_discount_bps: 0,
            min_haircut_bps,
            max_haircut_bps,
        }
    }
}

/// Result of a haircut calculation
#[odra::odra_type]
#[derive(Copy)]
pub struct HaircutBreakdown {
    /// Clamped total
    pub total_haircut_bps: u32,
    pub base_bps: u32,
    pub volatility_bps: u32,
    pub drawdown_bps: u32,
    pub quality_bps: u32,
    pub age_bps: u32,
    pub liquidity_bps: u32,
    /// `market_value * (10000 - total) / 10000`
    pub discounted_value: U256,
}

/// Default tiers, seeded once at initialization (lowest to highest risk)
pub fn default_haircut_configs() -> Vec<(AssetClass, HaircutConfig)> {
    let mut agriculture = HaircutConfig::with_bounds(2_000, 1_000, 4_000);
    agriculture.age_depreciation_bps_per_day = 10;
    agriculture.max_age_discount_bps = 1_500;

    Vec::from([
        (AssetClass::PreciousMetals, HaircutConfig::with_bounds(500, 500, 2_000)),
        (AssetClass::IndustrialMetals, HaircutConfig::with_bounds(1_000, 700, 3_000)),
        (AssetClass::Energy, HaircutConfig::with_bounds(1_500, 1_000, 3_500)),
        (AssetClass::Agriculture, agriculture),
        (AssetClass::CarbonCredits, HaircutConfig::with_bounds(2_500, 1_500, MAX_HAIRCUT_BPS)),
    ])
}

// ========== Validation ==========

/// Fail unless `series` is non-empty and strictly increasing in time
pub fn validate_price_series(series: &[PricePoint]) -> RiskResult<()> {
    if series.is_empty() {
        return Err(RiskError::EmptyPriceSeries);
    }
    if series.windows(2).any(|pair| pair[1].timestamp <= pair[0].timestamp) {
        return Err(RiskError::NonChronologicalPriceSeries);
    }
    Ok(())
}

pub fn validate_risk_metrics(metrics: &RiskMetrics) -> RiskResult<()> {
    if metrics.sample_count == 0 || metrics.volatility_bps == 0 || metrics.max_drawdown_bps == 0 {
        return Err(RiskError::InvalidRiskMetrics);
    }
    if metrics.liquidity_score > MAX_LIQUIDITY_SCORE {
        return Err(RiskError::PercentageOutOfRange);
    }
    Ok(())
}

/// Fail unless `min <= base <= max <= MAX_HAIRCUT_BPS`
pub fn validate_haircut_bounds(base: u32, min: u32, max: u32) -> RiskResult<()> {
    if max > MAX_HAIRCUT_BPS {
        return Err(RiskError::HaircutAboveMaximum);
    }
    if min > base || base > max {
        return Err(RiskError::HaircutBoundsInverted);
    }
    Ok(())
}

/// Fail unless a single discount stays under the protocol ceiling
pub fn validate_discount(discount_bps: u32) -> RiskResult<()> {
    if discount_bps > MAX_HAIRCUT_BPS {
        return Err(RiskError::HaircutAboveMaximum);
    }
    Ok(())
}

// ========== Components ==========

/// Key of a quality grade in the discount table
pub fn quality_key(label: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(label.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

pub fn volatility_component(volatility_bps: u32) -> u32 {
    (volatility_bps as u64 * VOLATILITY_MULTIPLIER_BPS as u64 / BPS_SCALE as u64) as u32
}

pub fn drawdown_component(max_drawdown_bps: u32) -> u32 {
    (max_drawdown_bps as u64 * DRAWDOWN_MULTIPLIER_BPS as u64 / BPS_SCALE as u64) as u32
}

pub fn liquidity_component(liquidity_score: u32) -> u32 {
    LIQUIDITY_STEPS
        .iter()
        .find(|(min_score, _)| liquidity_score >= *min_score)
        .map(|(_, haircut)| *haircut)
        .unwrap_or(ILLIQUID_HAIRCUT_BPS)
}

/// Overwrite the derived components of `config` from `metrics`
pub fn apply_risk_metrics(config: &mut HaircutConfig, metrics: &RiskMetrics) {
    config.volatility_haircut_bps = volatility_component(metrics.volatility_bps);
    config.drawdown_haircut_bps = drawdown_component(metrics.max_drawdown_bps);
    config.liquidity_haircut_bps = liquidity_component(metrics.liquidity_score);
}

/// Whole days since `certificate_date` x daily rate, capped; zero for
/// non-perishables and for certificates dated in the future
pub fn age_component(config: &HaircutConfig, certificate_date: u64, now: u64) -> u32 {
    if config.age_depreciation_bps_per_day == 0 {
        return 0;
    }
    let age_days = now.saturating_sub(certificate_date) / SECONDS_PER_DAY;
    let discount = age_days.saturating_mul(config.age_depreciation_bps_per_day as u64);
    discount.min(config.max_age_discount_bps as u64) as u32
}

/// `market_value * (10000 - haircut) / 10000`
pub fn apply_haircut(market_value: U256, haircut_bps: u32) -> U256 {
    bps_of(market_value, BPS_SCALE.saturating_sub(haircut_bps))
}

/// Sum the six components, clamp into the governance band, discount the value
pub fn compute_haircut(
    config: &HaircutConfig,
    quality_bps: u32,
    age_bps: u32,
    market_value: U256,
) -> HaircutBreakdown {
    let raw_total = config.base_haircut_bps as u64
        + config.volatility_haircut_bps as u64
        + config.drawdown_haircut_bps as u64
        + quality_bps as u64
        + age_bps as u64
        + config.liquidity_haircut_bps as u64;
    let total = raw_total
        .max(config.min_haircut_bps as u64)
        .min(config.max_haircut_bps as u64) as u32;

    HaircutBreakdown {
        total_haircut_bps: total,
        base_bps: config.base_haircut_bps,
        volatility_bps: config.volatility_haircut_bps,
        drawdown_bps: config.drawdown_haircut_bps,
        quality_bps,
        age_bps,
        liquidity_bps: config.liquidity_haircut_bps,
        discounted_value: apply_haircut(market_value, total),
    }
}

// ========== Record Operations ==========

// Shared by `HaircutEngine` and the `RiskMonitor` contract. Each check runs
// before any field is written, so a failed call leaves the record as it was.
impl HaircutConfig {
    /// Check a config offered for a new asset class
    pub fn validate(&self) -> RiskResult<()> {
        validate_haircut_bounds(self.base_haircut_bps, self.min_haircut_bps, self.max_haircut_bps)?;
        validate_discount(self.max_age_discount_bps)
    }

    pub fn set_bounds(&mut self, base: u32, min: u32, max: u32) -> RiskResult<()> {
        validate_haircut_bounds(base, min, max)?;
        self.base_haircut_bps = base;
        self.min_haircut_bps = min;
        self.max_haircut_bps = max;
        Ok(())
    }

    /// A zero rate disables the age component
    pub fn set_age_depreciation(&mut self, rate_per_day_bps: u32, max_discount_bps: u32) -> RiskResult<()> {
        validate_discount(max_discount_bps)?;
        validate_discount(rate_per_day_bps)?;
        self.age_depreciation_bps_per_day = rate_per_day_bps;
        self.max_age_discount_bps = max_discount_bps;
        Ok(())
    }

    /// Validate `metrics` and re-derive the volatility, drawdown and liquidity components
    pub fn refresh_components(&mut self, metrics: &RiskMetrics) -> RiskResult<()> {
        validate_risk_metrics(metrics)?;
        apply_risk_metrics(self, metrics);
        Ok(())
    }

    /// Full breakdown for a certificate of the given grade discount and date
    pub fn breakdown(&self, quality_bps: u32, certificate_date: u64, now: u64, market_value: U256) -> HaircutBreakdown {
        let age_bps = age_component(self, certificate_date, now);
        compute_haircut(self, quality_bps, age_bps, market_value)
    }
}

// ========== Store ==========

/// In-memory haircut store keyed by asset class
#[derive(Debug, Clone, Default)]
pub struct HaircutEngine {
    configs: BTreeMap<AssetClass, HaircutConfig>,
    metrics: BTreeMap<AssetClass, RiskMetrics>,
    price_history: BTreeMap<AssetClass, Vec<PricePoint>>,
    quality_discounts: BTreeMap<(AssetClass, [u8; 32]), u32>,
}

impl HaircutEngine {
    /// Engine seeded with `default_haircut_configs`
    pub fn new() -> Self {
        let mut engine = Self::default();
        for (class, config) in default_haircut_configs() {
            engine.configs.insert(class, config);
        }
        engine
    }

    /// Engine with no asset class registered
    pub fn empty() -> Self {
        Self::default()
    }

    // ========== Governance ==========

    pub fn register_asset_class(&mut self, caller: Role, class: AssetClass, config: HaircutConfig) -> RiskResult<()> {
        require_role(caller, GOVERNORS)?;
        if self.configs.contains_key(&class) {
            return Err(RiskError::AssetClassAlreadyRegistered);
        }
        config.validate()?;
        self.configs.insert(class, config);
        tracing::info!(class = class.as_u8(), "asset class registered");
        Ok(())
    }

    /// Replace the base haircut and its clamp band
    pub fn set_haircut_config(&mut self, caller: Role, class: AssetClass, base: u32, min: u32, max: u32) -> RiskResult<()> {
        require_role(caller, GOVERNORS)?;
        let mut config = self.config(class)?;
        config.set_bounds(base, min, max)?;
        self.configs.insert(class, config);
        tracing::info!(class = class.as_u8(), base, min, max, "haircut bounds updated");
        Ok(())
    }

    // ========== Risk Admin ==========

    /// Replace the stored series; the previous one is discarded, not merged
    pub fn load_price_history(&mut self, caller: Role, class: AssetClass, series: Vec<PricePoint>) -> RiskResult<()> {
        require_role(caller, RISK_ADMINS)?;
        self.config(class)?;
        validate_price_series(&series)?;
        let points = series.len();
        self.price_history.insert(class, series);
        tracing::info!(class = class.as_u8(), points, "price history loaded");
        Ok(())
    }

    /// Replace the metrics wholesale and re-derive the class's components
    pub fn update_risk_metrics(&mut self, caller: Role, class: AssetClass, metrics: RiskMetrics) -> RiskResult<HaircutConfig> {
        require_role(caller, RISK_ADMINS)?;
        let mut config = self.config(class)?;
        config.refresh_components(&metrics)?;
        self.metrics.insert(class, metrics);
        self.configs.insert(class, config);
        tracing::info!(
            class = class.as_u8(),
            volatility = config.volatility_haircut_bps,
            drawdown = config.drawdown_haircut_bps,
            liquidity = config.liquidity_haircut_bps,
            "risk metrics replaced"
        );
        Ok(config)
    }

    pub fn set_quality_discount(&mut self, caller: Role, class: AssetClass, label: &str, discount_bps: u32) -> RiskResult<()> {
        require_role(caller, RISK_ADMINS)?;
        self.config(class)?;
        validate_discount(discount_bps)?;
        self.quality_discounts.insert((class, quality_key(label)), discount_bps);
        tracing::info!(class = class.as_u8(), label, discount_bps, "quality discount set");
        Ok(())
    }

    /// Set the perishable depreciation; a zero rate disables the age component
    pub fn set_age_depreciation(&mut self, caller: Role, class: AssetClass, rate_per_day_bps: u32, max_discount_bps: u32) -> RiskResult<()> {
        require_role(caller, RISK_ADMINS)?;
        let mut config = self.config(class)?;
        config.set_age_depreciation(rate_per_day_bps, max_discount_bps)?;
        self.configs.insert(class, config);
        tracing::info!(class = class.as_u8(), rate_per_day_bps, max_discount_bps, "age depreciation updated");
        Ok(())
    }

    // ========== Calculation ==========

    pub fn calculate_haircut(
        &self,
        class: AssetClass,
        market_value: U256,
        quality_label: &str,
        certificate_date: u64,
        now: u64,
    ) -> RiskResult<HaircutBreakdown> {
        let config = self.config(class)?;
        let quality_bps = self.quality_discount(class, quality_label);
        Ok(config.breakdown(quality_bps, certificate_date, now, market_value))
    }

    /// Risk-adjusted value only
    pub fn value_after_haircut(
        &self,
        class: AssetClass,
        market_value: U256,
        quality_label: &str,
        certificate_date: u64,
        now: u64,
    ) -> RiskResult<U256> {
        self.calculate_haircut(class, market_value, quality_label, certificate_date, now)
            .map(|breakdown| breakdown.discounted_value)
    }

    // ========== Queries ==========

    pub fn haircut_config(&self, class: AssetClass) -> RiskResult<HaircutConfig> {
        self.config(class)
    }

    pub fn risk_metrics(&self, class: AssetClass) -> Option<RiskMetrics> {
        self.metrics.get(&class).copied()
    }

    pub fn price_history(&self, class: AssetClass) -> &[PricePoint] {
        self.price_history.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Discount for a grade label; zero when the grade is not listed
    pub fn quality_discount(&self, class: AssetClass, label: &str) -> u32 {
        self.quality_discounts
            .get(&(class, quality_key(label)))
            .copied()
            .unwrap_or(0)
    }

    fn config(&self, class: AssetClass) -> RiskResult<HaircutConfig> {
        self.configs.get(&class).copied().ok_or(RiskError::UnknownAssetClass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn metrics(volatility_bps: u32, max_drawdown_bps: u32, liquidity_score: u32) -> RiskMetrics {
        RiskMetrics {
            volatility_bps,
            max_drawdown_bps,
            var_95_bps: 250,
            var_99_bps: 400,
            sharpe_ratio_bps: 8_000,
            liquidity_score,
            sample_count: 365,
            calculated_at: 1_700_000_000,
        }
    }

    fn points(timestamps: &[u64]) -> Vec<PricePoint> {
        timestamps
            .iter()
            .map(|ts| PricePoint { timestamp: *ts, price: U256::from(1_000u64) })
            .collect()
    }

    #[test]
    fn test_haircut_scenario_capped_at_max() {
        let mut engine = HaircutEngine::new();
        engine
            .update_risk_metrics(Role::RiskAdmin, AssetClass::PreciousMetals, metrics(1_500, 3_000, 9_000))
            .unwrap();

        let result = engine
            .calculate_haircut(AssetClass::PreciousMetals, U256::from(1_000u64), "", 0, 0)
            .unwrap();

        assert_eq!(result.base_bps, 500);
        assert_eq!(result.volatility_bps, 750);
        assert_eq!(result.drawdown_bps, 900);
        assert_eq!(result.liquidity_bps, 0);
        assert_eq!(result.quality_bps, 0);
        assert_eq!(result.age_bps, 0);
        assert_eq!(result.total_haircut_bps, 2_000);
        assert_eq!(result.discounted_value, U256::from(800u64));
    }

    #[test]
    fn test_haircut_on_values_near_u256_max() {
        let engine = HaircutEngine::new();
        let result = engine
            .calculate_haircut(AssetClass::PreciousMetals, U256::MAX, "", 0, 0)
            .unwrap();
        assert_eq!(result.total_haircut_bps, 500);
        let nineteen = U256::from(19u64);
        let twenty = U256::from(20u64);
        assert_eq!(result.discounted_value, U256::MAX / twenty * nineteen + U256::MAX % twenty * nineteen / twenty);

        let half = engine
            .value_after_haircut(AssetClass::PreciousMetals, U256::MAX / 2, "", 0, 0)
            .unwrap();
        assert!(half < U256::MAX / 2);
        assert_eq!(apply_haircut(U256::MAX, 0), U256::MAX);
        assert_eq!(apply_haircut(U256::MAX, BPS_SCALE), U256::zero());
    }

    #[test]
    fn test_config_unchanged_when_an_update_is_rejected() {
        let mut config = HaircutConfig::with_bounds(1_000, 700, 3_000);
        let before = config;

        assert_eq!(config.set_bounds(800, 900, 3_000), Err(RiskError::HaircutBoundsInverted));
        assert_eq!(config.set_age_depreciation(10, 5_001), Err(RiskError::HaircutAboveMaximum));
        assert_eq!(config.refresh_components(&metrics(0, 100, 100)), Err(RiskError::InvalidRiskMetrics));
        assert_eq!(config, before);

        config.set_bounds(900, 900, 3_000).unwrap();
        config.refresh_components(&metrics(1_000, 1_000, 9_000)).unwrap();
        assert_eq!(config.base_haircut_bps, 900);
        assert_eq!(config.volatility_haircut_bps, 500);
        assert_eq!(config.drawdown_haircut_bps, 300);
    }

    #[test]
    fn test_total_raised_to_floor() {
        let engine = HaircutEngine::new();
        let config = engine.haircut_config(AssetClass::IndustrialMetals).unwrap();
        let result = compute_haircut(&HaircutConfig { base_haircut_bps: 700, ..config }, 0, 0, U256::from(100u64));
        assert_eq!(result.total_haircut_bps, 700);

        let low = HaircutConfig::with_bounds(100, 400, 1_000);
        assert_eq!(compute_haircut(&low, 0, 0, U256::zero()).total_haircut_bps, 400);
    }

    #[test]
    fn test_liquidity_steps() {
        assert_eq!(liquidity_component(10_000), 0);
        assert_eq!(liquidity_component(8_000), 0);
        assert_eq!(liquidity_component(7_999), 100);
        assert_eq!(liquidity_component(5_000), 100);
        assert_eq!(liquidity_component(4_999), 300);
        assert_eq!(liquidity_component(2_000), 300);
        assert_eq!(liquidity_component(1_999), 500);
        assert_eq!(liquidity_component(0), 500);
    }

    #[test]
    fn test_quality_discount_lookup_by_label_hash() {
        let mut engine = HaircutEngine::new();
        engine
            .set_quality_discount(Role::RiskAdmin, AssetClass::Agriculture, "GRADE_B", 300)
            .unwrap();

        assert_eq!(engine.quality_discount(AssetClass::Agriculture, "GRADE_B"), 300);
        assert_eq!(engine.quality_discount(AssetClass::Agriculture, "GRADE_A"), 0);
        assert_eq!(engine.quality_discount(AssetClass::Energy, "GRADE_B"), 0);
        assert_eq!(quality_key("GRADE_B"), quality_key("GRADE_B"));
        assert_ne!(quality_key("GRADE_B"), quality_key("grade_b"));
    }

    #[test]
    fn test_age_component_for_perishables() {
        let engine = HaircutEngine::new();
        let config = engine.haircut_config(AssetClass::Agriculture).unwrap();
        let issued = 1_000_000u64;

        // 10 bps per whole day, partial days ignored
        assert_eq!(age_component(&config, issued, issued + 30 * SECONDS_PER_DAY + 3_600), 300);
        // Capped at 1500
        assert_eq!(age_component(&config, issued, issued + 400 * SECONDS_PER_DAY), 1_500);
        // Future-dated certificate
        assert_eq!(age_component(&config, issued, issued - 1), 0);

        let metals = engine.haircut_config(AssetClass::PreciousMetals).unwrap();
        assert_eq!(age_component(&metals, 0, 400 * SECONDS_PER_DAY), 0);
    }

    #[test]
    fn test_perishable_haircut_includes_age_and_quality() {
        let mut engine = HaircutEngine::new();
        engine
            .set_quality_discount(Role::RiskAdmin, AssetClass::Agriculture, "No. 2 Yellow", 200)
            .unwrap();
        let now = 100 * SECONDS_PER_DAY;
        let result = engine
            .calculate_haircut(AssetClass::Agriculture, U256::from(10_000u64), "No. 2 Yellow", 50 * SECONDS_PER_DAY, now)
            .unwrap();

        // base 2000 + quality 200 + age 500 + liquidity 0 (no metrics yet)
        assert_eq!(result.age_bps, 500);
        assert_eq!(result.quality_bps, 200);
        assert_eq!(result.total_haircut_bps, 2_700);
        assert_eq!(result.discounted_value, U256::from(7_300u64));
    }

    #[test]
    fn test_price_history_validation_and_replacement() {
        let mut engine = HaircutEngine::new();
        assert_eq!(
            engine.load_price_history(Role::RiskAdmin, AssetClass::Energy, Vec::new()),
            Err(RiskError::EmptyPriceSeries)
        );
        assert_eq!(
            engine.load_price_history(Role::RiskAdmin, AssetClass::Energy, points(&[1, 2, 2])),
            Err(RiskError::NonChronologicalPriceSeries)
        );
        assert_eq!(
            engine.load_price_history(Role::RiskAdmin, AssetClass::Energy, points(&[3, 2])),
            Err(RiskError::NonChronologicalPriceSeries)
        );
        assert!(engine.price_history(AssetClass::Energy).is_empty());

        engine.load_price_history(Role::RiskAdmin, AssetClass::Energy, points(&[1, 2, 3])).unwrap();
        engine.load_price_history(Role::RiskAdmin, AssetClass::Energy, points(&[10])).unwrap();
        assert_eq!(engine.price_history(AssetClass::Energy), points(&[10]).as_slice());
    }

    #[test]
    fn test_risk_metrics_validation() {
        let mut engine = HaircutEngine::new();
        let before = engine.haircut_config(AssetClass::Energy).unwrap();
        for bad in [metrics(0, 1_000, 5_000), metrics(1_000, 0, 5_000), RiskMetrics { sample_count: 0, ..metrics(1, 1, 1) }] {
            assert_eq!(
                engine.update_risk_metrics(Role::RiskAdmin, AssetClass::Energy, bad),
                Err(RiskError::InvalidRiskMetrics)
            );
        }
        assert_eq!(
            engine.update_risk_metrics(Role::RiskAdmin, AssetClass::Energy, metrics(1, 1, 10_001)),
            Err(RiskError::PercentageOutOfRange)
        );
        assert_eq!(engine.haircut_config(AssetClass::Energy).unwrap(), before);
        assert_eq!(engine.risk_metrics(AssetClass::Energy), None);
    }

    #[test]
    fn test_metrics_update_rederives_components() {
        let mut engine = HaircutEngine::new();
        let config = engine
            .update_risk_metrics(Role::RiskAdmin, AssetClass::Energy, metrics(2_000, 1_000, 3_000))
            .unwrap();
        assert_eq!(config.volatility_haircut_bps, 1_000);
        assert_eq!(config.drawdown_haircut_bps, 300);
        assert_eq!(config.liquidity_haircut_bps, 300);

        engine
            .update_risk_metrics(Role::RiskAdmin, AssetClass::Energy, metrics(400, 100, 9_500))
            .unwrap();
        let config = engine.haircut_config(AssetClass::Energy).unwrap();
        assert_eq!(config.volatility_haircut_bps, 200);
        assert_eq!(config.drawdown_haircut_bps, 30);
        assert_eq!(config.liquidity_haircut_bps, 0);
        assert_eq!(engine.risk_metrics(AssetClass::Energy).unwrap().volatility_bps, 400);
    }

    #[test]
    fn test_governance_bounds() {
        let mut engine = HaircutEngine::new();
        assert_eq!(
            engine.set_haircut_config(Role::Governance, AssetClass::Energy, 400, 500, 3_000),
            Err(RiskError::HaircutBoundsInverted)
        );
        assert_eq!(
            engine.set_haircut_config(Role::Governance, AssetClass::Energy, 3_500, 500, 3_000),
            Err(RiskError::HaircutBoundsInverted)
        );
        assert_eq!(
            engine.set_haircut_config(Role::Governance, AssetClass::Energy, 1_000, 500, 5_001),
            Err(RiskError::HaircutAboveMaximum)
        );
        assert_eq!(
            engine.set_haircut_config(Role::RiskAdmin, AssetClass::Energy, 1_000, 500, 3_000),
            Err(RiskError::Unauthorized)
        );

        engine.set_haircut_config(Role::Governance, AssetClass::Energy, 1_000, 500, 3_000).unwrap();
        let config = engine.haircut_config(AssetClass::Energy).unwrap();
        assert_eq!((config.min_haircut_bps, config.base_haircut_bps, config.max_haircut_bps), (500, 1_000, 3_000));
    }

    #[test]
    fn test_sub_parameter_ceilings() {
        let mut engine = HaircutEngine::new();
        assert_eq!(
            engine.set_quality_discount(Role::RiskAdmin, AssetClass::Energy, "X", 5_001),
            Err(RiskError::HaircutAboveMaximum)
        );
        assert_eq!(
            engine.set_age_depreciation(Role::RiskAdmin, AssetClass::Agriculture, 10, 6_000),
            Err(RiskError::HaircutAboveMaximum)
        );
        assert_eq!(
            engine.set_age_depreciation(Role::Governance, AssetClass::Agriculture, 10, 1_000),
            Err(RiskError::Unauthorized)
        );
        engine.set_age_depreciation(Role::RiskAdmin, AssetClass::Agriculture, 0, 0).unwrap();
        let config = engine.haircut_config(AssetClass::Agriculture).unwrap();
        assert_eq!(age_component(&config, 0, 1_000 * SECONDS_PER_DAY), 0);
    }

    #[test]
    fn test_unknown_asset_class() {
        let mut engine = HaircutEngine::empty();
        assert_eq!(
            engine.calculate_haircut(AssetClass::Energy, U256::one(), "", 0, 0),
            Err(RiskError::UnknownAssetClass)
        );
        assert_eq!(
            engine.load_price_history(Role::RiskAdmin, AssetClass::Energy, points(&[1])),
            Err(RiskError::UnknownAssetClass)
        );

        engine
            .register_asset_class(Role::Governance, AssetClass::Energy, HaircutConfig::with_bounds(1_000, 500, 3_000))
            .unwrap();
        assert_eq!(
            engine.register_asset_class(Role::Governance, AssetClass::Energy, HaircutConfig::with_bounds(1_000, 500, 3_000)),
            Err(RiskError::AssetClassAlreadyRegistered)
        );
        assert!(engine.calculate_haircut(AssetClass::Energy, U256::one(), "", 0, 0).is_ok());
    }

    #[test]
    fn test_default_tiers_are_consistent() {
        let tiers = default_haircut_configs();
        assert_eq!(tiers.len(), AssetClass::ALL.len());
        let mut previous_base = 0;
        for (_, config) in tiers {
            assert_eq!(
                validate_haircut_bounds(config.base_haircut_bps, config.min_haircut_bps, config.max_haircut_bps),
                Ok(())
            );
            assert!(config.base_haircut_bps > previous_base);
            previous_base = config.base_haircut_bps;
        }
    }

    proptest! {
        #[test]
        fn prop_haircut_monotonic_in_volatility_and_clamped(
            class_index in 0usize..5,
            vol_a in 1u32..=u32::MAX,
            vol_b in 1u32..=u32::MAX,
            drawdown in 1u32..=10_000,
            liquidity in 0u32..=10_000,
        ) {
            let class = AssetClass::ALL[class_index];
            let (low, high) = if vol_a <= vol_b { (vol_a, vol_b) } else { (vol_b, vol_a) };

            let mut engine = HaircutEngine::new();
            engine.update_risk_metrics(Role::RiskAdmin, class, metrics(low, drawdown, liquidity)).unwrap();
            let at_low = engine.calculate_haircut(class, U256::from(1_000_000u64), "", 0, 0).unwrap();
            engine.update_risk_metrics(Role::RiskAdmin, class, metrics(high, drawdown, liquidity)).unwrap();
            let at_high = engine.calculate_haircut(class, U256::from(1_000_000u64), "", 0, 0).unwrap();

            let config = engine.haircut_config(class).unwrap();
            prop_assert!(at_low.total_haircut_bps <= at_high.total_haircut_bps);
            prop_assert!(at_high.discounted_value <= at_low.discounted_value);
            for result in [at_low, at_high] {
                prop_assert!(result.total_haircut_bps >= config.min_haircut_bps);
                prop_assert!(result.total_haircut_bps <= config.max_haircut_bps);
            }
        }
    }
}

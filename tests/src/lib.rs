//! Commodity Risk Integration Tests
//!
//! Cross-module scenarios over the pure stores, with recording stubs standing
//! in for the pool, oracle and emergency collaborators.

#[cfg(test)]
mod stubs {
    use commodity_risk_contracts::interfaces::{EmergencyModule, PoolMetrics, PriceFeed};
    use commodity_risk_contracts::reserve_registry::ReserveRegistry;
    use commodity_risk_contracts::types::{Mitigation, Role};
    use odra::casper_types::account::AccountHash;
    use odra::casper_types::U256;
    use odra::prelude::*;

    pub fn address(seed: u8) -> Address {
        Address::Account(AccountHash::new([seed; 32]))
    }

    /// Pool figures for a single asset
    pub struct StubPool {
        pub tvl: U256,
        pub utilization_bps: u32,
    }

    impl PoolMetrics for StubPool {
        fn total_value_locked(&self, _asset: &Address) -> U256 {
            self.tvl
        }

        fn utilization_bps(&self, _asset: &Address) -> u32 {
            self.utilization_bps
        }
    }

    /// Oracle with a fixed current and historical price
    pub struct StubOracle {
        pub current: U256,
        pub historical: U256,
    }

    impl StubOracle {
        pub fn steady(price: u64) -> Self {
            Self {
                current: U256::from(price),
                historical: U256::from(price),
            }
        }
    }

    impl PriceFeed for StubOracle {
        fn current_price(&self, _asset: &Address) -> U256 {
            self.current
        }

        fn historical_price(&self, _asset: &Address) -> U256 {
            self.historical
        }
    }

    /// Records every mitigation by wire name
    #[derive(Default)]
    pub struct RecordingEmergency {
        pub requests: Vec<(String, Address)>,
    }

    impl EmergencyModule for RecordingEmergency {
        fn execute_mitigation(&mut self, mitigation: Mitigation, asset: &Address) {
            self.requests.push((String::from(mitigation.name()), *asset));
        }
    }

    /// Emergency module that acts on the reserve registry as the guardian
    pub struct PausingEmergency<'a> {
        pub registry: &'a mut ReserveRegistry,
    }

    impl EmergencyModule for PausingEmergency<'_> {
        fn execute_mitigation(&mut self, mitigation: Mitigation, asset: &Address) {
            let Some(index) = self.registry.index_of(asset) else {
                return;
            };
            match mitigation {
                Mitigation::PauseAll => {
                    let _ = self.registry.set_paused(Role::Guardian, index, true);
                }
                Mitigation::PauseBorrowing => {
                    let _ = self.registry.configure(Role::Governance, index, |config| {
                        config.set_borrowing_enabled(false);
                        Ok(())
                    });
                }
                Mitigation::IncreaseRates => {}
            }
        }
    }
}

#[cfg(test)]
mod reserve_tests {
    use crate::stubs::address;
    use commodity_risk_contracts::errors::RiskError;
    use commodity_risk_contracts::reserve_config::{ReserveFlags, ReserveParams};
    use commodity_risk_contracts::reserve_registry::ReserveRegistry;
    use commodity_risk_contracts::types::Role;
    use commodity_risk_contracts::user_config::UserLedgers;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserve_onboarding_flow() {
        let mut registry = ReserveRegistry::new();
        let gold = address(1);
        let index = registry.init_reserve(Role::Governance, gold).unwrap();

        registry
            .configure(Role::RiskAdmin, index, |config| {
                config.set_ltv(7500)?;
                config.set_liquidation_threshold(8000)?;
                config.set_decimals(18)?;
                config.set_active(true);
                Ok(())
            })
            .unwrap();

        let config = registry.configuration(index).unwrap();
        assert_eq!(config.get_ltv(), 7500);
        assert_eq!(config.get_decimals(), 18);
        assert_eq!(
            config.flags(),
            ReserveFlags {
                active: true,
                frozen: false,
                borrowing_enabled: false,
                stable_rate_borrowing_enabled: false,
                paused: false,
                borrowable_in_isolation: false,
                siloed_borrowing: false,
                flash_loan_enabled: false,
            }
        );
        assert!(config.flags().is_usable());
        assert_eq!(
            config.params(),
            ReserveParams {
                ltv: 7500,
                liquidation_threshold: 8000,
                liquidation_bonus: 0,
                decimals: 18,
                reserve_factor: 0,
                emode_category: 0,
            }
        );
    }

    #[test]
    fn test_failed_configuration_leaves_reserve_untouched() {
        let mut registry = ReserveRegistry::new();
        let index = registry.init_reserve(Role::Governance, address(1)).unwrap();
        registry
            .configure_collateral(Role::RiskAdmin, index, 7000, 7500, 10500)
            .unwrap();
        let before = registry.configuration(index).unwrap();

        assert_eq!(
            registry.configure_collateral(Role::RiskAdmin, index, 8000, 7500, 10500),
            Err(RiskError::InvalidCollateralParams)
        );
        assert_eq!(
            registry.configure(Role::RiskAdmin, index, |config| {
                config.set_borrow_cap(1_000)?;
                config.set_decimals(256)
            }),
            Err(RiskError::InvalidDecimals)
        );
        assert_eq!(registry.configuration(index).unwrap(), before);
    }

    #[test]
    fn test_isolation_debt_ceiling_scenario() {
        let mut registry = ReserveRegistry::new();
        for seed in 0..4 {
            registry.init_reserve(Role::Governance, address(seed)).unwrap();
        }
        registry
            .configure(Role::Governance, 3, |config| config.set_debt_ceiling(500_000))
            .unwrap();

        let user = address(99);
        let mut ledgers = UserLedgers::new();
        ledgers.set_using_as_collateral(Role::Pool, user, 3, true).unwrap();

        let ledger = ledgers.get(&user);
        assert_eq!(ledger.isolated_asset(), Some(3));
        // 5000.00 in 2-decimal USD
        assert_eq!(ledger.isolation_debt_ceiling(&registry), Some(500_000));

        ledgers.set_using_as_collateral(Role::Pool, user, 1, true).unwrap();
        assert_eq!(ledgers.get(&user).isolation_debt_ceiling(&registry), None);
    }

    #[test]
    fn test_borrowing_only_resolves_asset_index() {
        let mut registry = ReserveRegistry::new();
        let (gold, copper) = (address(1), address(2));
        registry.init_reserve(Role::Governance, gold).unwrap();
        let copper_index = registry.init_reserve(Role::Governance, copper).unwrap();

        let user = address(50);
        let mut ledgers = UserLedgers::new();
        ledgers.set_borrowing(Role::Pool, user, copper_index, true).unwrap();

        let ledger = ledgers.get(&user);
        assert!(ledger.is_borrowing_only(&copper, &registry));
        assert!(!ledger.is_borrowing_only(&gold, &registry));
        assert!(!ledger.is_borrowing_only(&address(77), &registry));
    }
}

#[cfg(test)]
mod haircut_tests {
    use commodity_risk_contracts::haircut::{HaircutEngine, PricePoint, RiskMetrics, SECONDS_PER_DAY};
    use commodity_risk_contracts::types::{AssetClass, Role};
    use odra::casper_types::U256;
    use pretty_assertions::assert_eq;

    fn metrics(volatility_bps: u32, max_drawdown_bps: u32, liquidity_score: u32) -> RiskMetrics {
        RiskMetrics {
            volatility_bps,
            max_drawdown_bps,
            var_95_bps: 300,
            var_99_bps: 500,
            sharpe_ratio_bps: -2_500,
            liquidity_score,
            sample_count: 252,
            calculated_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_haircut_computation_scenario() {
        let mut engine = HaircutEngine::new();
        engine
            .load_price_history(
                Role::RiskAdmin,
                AssetClass::PreciousMetals,
                vec![
                    PricePoint { timestamp: 1_000, price: U256::from(1_900u64) },
                    PricePoint { timestamp: 2_000, price: U256::from(1_950u64) },
                ],
            )
            .unwrap();
        engine
            .update_risk_metrics(Role::RiskAdmin, AssetClass::PreciousMetals, metrics(1_500, 3_000, 9_000))
            .unwrap();

        let result = engine
            .calculate_haircut(AssetClass::PreciousMetals, U256::from(1_000u64), "LBMA Good Delivery", 0, 0)
            .unwrap();
        assert_eq!(
            (result.base_bps, result.volatility_bps, result.drawdown_bps, result.liquidity_bps),
            (500, 750, 900, 0)
        );
        assert_eq!(result.total_haircut_bps, 2_000);
        assert_eq!(result.discounted_value, U256::from(800u64));
    }

    #[test]
    fn test_aged_grain_receipt() {
        let mut engine = HaircutEngine::new();
        engine
            .update_risk_metrics(Role::RiskAdmin, AssetClass::Agriculture, metrics(1_000, 1_000, 4_000))
            .unwrap();
        engine
            .set_quality_discount(Role::RiskAdmin, AssetClass::Agriculture, "No. 3 Yellow", 250)
            .unwrap();

        let certified = 1_700_000_000;
        let now = certified + 45 * SECONDS_PER_DAY;
        let result = engine
            .calculate_haircut(AssetClass::Agriculture, U256::from(1_000_000u64), "No. 3 Yellow", certified, now)
            .unwrap();

        // 2000 base + 500 vol + 300 drawdown + 250 quality + 450 age + 300 liquidity = 3800
        assert_eq!(result.age_bps, 450);
        assert_eq!(result.total_haircut_bps, 3_800);
        assert_eq!(result.discounted_value, U256::from(620_000u64));
        assert_eq!(
            engine
                .value_after_haircut(AssetClass::Agriculture, U256::from(1_000_000u64), "No. 3 Yellow", certified, now)
                .unwrap(),
            U256::from(620_000u64)
        );
    }
}

#[cfg(test)]
mod breaker_tests {
    use crate::stubs::{address, PausingEmergency, RecordingEmergency, StubOracle, StubPool};
    use commodity_risk_contracts::circuit_breaker::CircuitBreakers;
    use commodity_risk_contracts::reserve_registry::ReserveRegistry;
    use commodity_risk_contracts::types::{BreakerKind, Role};
    use odra::casper_types::U256;
    use pretty_assertions::assert_eq;

    const NOW: u64 = 1_700_000_000;

    fn pool() -> StubPool {
        StubPool {
            tvl: U256::from(1_000_000u64),
            utilization_bps: 6_000,
        }
    }

    #[test]
    fn test_liquidation_wave_scenario() {
        let asset = address(1);
        let mut breakers = CircuitBreakers::new();
        breakers.update_oracle_timestamp(Role::Oracle, asset, NOW).unwrap();
        let mut emergency = RecordingEmergency::default();

        breakers.record_liquidation(Role::Pool, asset, U256::from(50_000u64), NOW).unwrap();
        let report = breakers.check_all(&asset, NOW + 60, &pool(), &StubOracle::steady(100), &mut emergency);
        assert!(!report.triggered);
        assert!(emergency.requests.is_empty());

        breakers.record_liquidation(Role::Pool, asset, U256::from(60_000u64), NOW + 120).unwrap();
        let report = breakers.check_all(&asset, NOW + 180, &pool(), &StubOracle::steady(100), &mut emergency);
        assert!(report.triggered);
        assert_eq!(report.reason, "Liquidation wave detected");
        assert_eq!(emergency.requests, vec![(String::from("PAUSE_ALL"), asset)]);
    }

    #[test]
    fn test_utilization_warning_then_trip() {
        let asset = address(1);
        let mut breakers = CircuitBreakers::new();
        breakers.update_oracle_timestamp(Role::Oracle, asset, NOW).unwrap();
        let mut emergency = RecordingEmergency::default();
        breakers.record_liquidation(Role::Pool, asset, U256::from(200_000u64), NOW).unwrap();

        let hot = StubPool {
            tvl: U256::from(1_000_000u64),
            utilization_bps: 9_950,
        };
        let report = breakers.check_all(&asset, NOW, &hot, &StubOracle::steady(100), &mut emergency);
        assert_eq!(report.breaker, Some(BreakerKind::LiquidationWave));
        assert_eq!(report.warnings, vec![BreakerKind::HighUtilization]);
        assert_eq!(
            emergency.requests,
            vec![(String::from("INCREASE_RATES"), asset), (String::from("PAUSE_ALL"), asset)]
        );
    }

    #[test]
    fn test_stale_oracle_pauses_borrowing_on_reserve() {
        let asset = address(7);
        let mut registry = ReserveRegistry::new();
        let index = registry.init_reserve(Role::Governance, asset).unwrap();
        registry
            .configure(Role::RiskAdmin, index, |config| {
                config.set_active(true);
                config.set_borrowing_enabled(true);
                Ok(())
            })
            .unwrap();

        let mut breakers = CircuitBreakers::new();
        breakers.update_oracle_timestamp(Role::Oracle, asset, NOW).unwrap();
        let report = {
            let mut emergency = PausingEmergency { registry: &mut registry };
            breakers.check_all(&asset, NOW + 2 * 3_600, &pool(), &StubOracle::steady(100), &mut emergency)
        };

        assert_eq!(report.breaker, Some(BreakerKind::OracleStaleness));
        assert_eq!(report.reason, "Oracle price stale");
        let flags = registry.configuration(index).unwrap().flags();
        assert!(!flags.borrowing_enabled);
        assert!(!flags.paused);
    }

    #[test]
    fn test_liquidation_wave_pauses_reserve() {
        let asset = address(8);
        let mut registry = ReserveRegistry::new();
        let index = registry.init_reserve(Role::Governance, asset).unwrap();

        let mut breakers = CircuitBreakers::new();
        breakers.update_oracle_timestamp(Role::Oracle, asset, NOW).unwrap();
        breakers.record_liquidation(Role::Pool, asset, U256::from(150_000u64), NOW).unwrap();
        {
            let mut emergency = PausingEmergency { registry: &mut registry };
            let report = breakers.check_all(&asset, NOW, &pool(), &StubOracle::steady(100), &mut emergency);
            assert!(report.triggered);
        }
        assert!(registry.configuration(index).unwrap().get_paused());
    }
}

#[cfg(test)]
mod property_tests {
    use commodity_risk_contracts::reserve_config::{ReserveConfiguration, ReserveField};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_out_of_range_write_is_rejected_without_mutation(
            field_id in 0u8..11,
            seed in any::<[u64; 4]>(),
            excess in 1u64..1_000,
        ) {
            let field = ReserveField::from_id(field_id).unwrap();
            let mut config = ReserveConfiguration::from_raw(odra::casper_types::U256(seed));
            let before = config;
            let result = config.set(field, field.descriptor().max + excess);
            prop_assert!(result.is_err());
            prop_assert_eq!(config, before);
        }
    }
}

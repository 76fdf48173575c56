//! Reserve onboarding and configuration store.
//!
//! Keeps one `ReserveConfiguration` per onboarded asset, keyed by the index
//! assigned at onboarding. Mutations take the caller's role explicitly and are
//! applied to a copy of the record, committed only when every check passes.

use alloc::collections::BTreeMap;
use odra::prelude::*;
use crate::access_control::{require_role, RESERVE_CONFIGURATORS, RESERVE_LISTERS, RESERVE_PAUSERS};
use crate::errors::{RiskError, RiskResult};
use crate::interfaces::ReserveLookup;
use crate::reserve_config::{ReserveConfiguration, ReserveField, ReserveFlag};
use crate::types::Role;

/// Maximum number of reserves (one 2-bit slot each in a user ledger)
pub const MAX_RESERVES: u32 = 128;

/// 100% in basis points
pub const PERCENTAGE_FACTOR: u32 = 10_000;

/// Fail unless `bps` is at most 100%
pub fn validate_percentage(bps: u32) -> RiskResult<()> {
    if bps > PERCENTAGE_FACTOR {
        return Err(RiskError::PercentageOutOfRange);
    }
    Ok(())
}

/// Validate the collateral triple before it is written
///
/// - `ltv <= liquidation_threshold <= 100%`
/// - with a non-zero threshold the bonus is at least 100% and the threshold
///   stays solvent after the bonus (`threshold * bonus <= 100% * 100%`)
/// - a zero threshold disables collateral, so the bonus must be zero too
pub fn validate_collateral_params(
    ltv: u32,
    liquidation_threshold: u32,
    liquidation_bonus: u32,
) -> RiskResult<()> {
    validate_percentage(liquidation_threshold)?;
    if ltv > liquidation_threshold {
        return Err(RiskError::InvalidCollateralParams);
    }
    if liquidation_threshold == 0 {
        if liquidation_bonus != 0 {
            return Err(RiskError::InvalidCollateralParams);
        }
        return Ok(());
    }
    if liquidation_bonus < PERCENTAGE_FACTOR {
        return Err(RiskError::InvalidCollateralParams);
    }
    let threshold_after_bonus = liquidation_threshold as u64 * liquidation_bonus as u64;
    if threshold_after_bonus > (PERCENTAGE_FACTOR as u64) * (PERCENTAGE_FACTOR as u64) {
        return Err(RiskError::InvalidCollateralParams);
    }
    Ok(())
}

/// Fail unless `index` addresses a possible ledger slot
pub fn validate_reserve_index(index: u32) -> RiskResult<()> {
    if index >= MAX_RESERVES {
        return Err(RiskError::InvalidReserveIndex);
    }
    Ok(())
}

// ========== Record Operations ==========

// Shared by `ReserveRegistry` and the `ReserveManager` contract.

/// Index the next onboarded asset receives
pub fn next_reserve_index(already_listed: bool, reserves_count: u32) -> RiskResult<u32> {
    if already_listed {
        return Err(RiskError::ReserveAlreadyInitialized);
    }
    if reserves_count >= MAX_RESERVES {
        return Err(RiskError::TooManyReserves);
    }
    Ok(reserves_count)
}

/// Roles allowed to write `flag`; pausing is also open to the guardian
pub fn flag_setters(flag: ReserveFlag) -> &'static [Role] {
    match flag {
        ReserveFlag::Paused => RESERVE_PAUSERS,
        _ => RESERVE_CONFIGURATORS,
    }
}

/// Write LTV, liquidation threshold and bonus after cross-validation
pub fn apply_collateral_params(
    config: &mut ReserveConfiguration,
    ltv: u32,
    liquidation_threshold: u32,
    liquidation_bonus: u32,
) -> RiskResult<()> {
    validate_collateral_params(ltv, liquidation_threshold, liquidation_bonus)?;
    config.set_ltv(ltv)?;
    config.set_liquidation_threshold(liquidation_threshold)?;
    config.set_liquidation_bonus(liquidation_bonus)
}

pub fn apply_reserve_factor(config: &mut ReserveConfiguration, reserve_factor: u32) -> RiskResult<()> {
    validate_percentage(reserve_factor)?;
    config.set_reserve_factor(reserve_factor)
}

pub fn apply_liquidation_protocol_fee(config: &mut ReserveConfiguration, fee: u32) -> RiskResult<()> {
    validate_percentage(fee)?;
    config.set_liquidation_protocol_fee(fee)
}

/// Onboarded reserve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveEntry {
    pub asset: Address,
    pub configuration: ReserveConfiguration,
}

/// In-memory reserve store
#[derive(Debug, Clone, Default)]
pub struct ReserveRegistry {
    reserves: Vec<ReserveEntry>,
    indices: BTreeMap<Address, u32>,
}

impl ReserveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Onboarding ==========

    /// Onboard `asset` with a zero-initialized configuration, returning its index
    pub fn init_reserve(&mut self, caller: Role, asset: Address) -> RiskResult<u32> {
        require_role(caller, RESERVE_LISTERS)?;
        let index = next_reserve_index(self.indices.contains_key(&asset), self.reserves_count())?;

        self.reserves.push(ReserveEntry {
            asset,
            configuration: ReserveConfiguration::new(),
        });
        self.indices.insert(asset, index);
        tracing::info!(index, "reserve onboarded");
        Ok(index)
    }

    // ========== Configuration ==========

    /// Apply `update` to a copy of the reserve's configuration and commit it
    /// only if every setter inside succeeded
    pub fn configure<F>(&mut self, caller: Role, index: u32, update: F) -> RiskResult<ReserveConfiguration>
    where
        F: FnOnce(&mut ReserveConfiguration) -> RiskResult<()>,
    {
        require_role(caller, RESERVE_CONFIGURATORS)?;
        self.commit(index, update)
    }

    /// Write a numeric field through the field table
    pub fn set_field(&mut self, caller: Role, index: u32, field: ReserveField, value: u64) -> RiskResult<()> {
        require_role(caller, RESERVE_CONFIGURATORS)?;
        self.commit(index, |config| config.set(field, value))?;
        Ok(())
    }

    pub fn set_flag(&mut self, caller: Role, index: u32, flag: ReserveFlag, enabled: bool) -> RiskResult<()> {
        require_role(caller, flag_setters(flag))?;
        self.commit(index, |config| {
            config.set_flag(flag, enabled);
            Ok(())
        })?;
        Ok(())
    }

    /// Pause or unpause a reserve; also open to the guardian
    pub fn set_paused(&mut self, caller: Role, index: u32, paused: bool) -> RiskResult<()> {
        self.set_flag(caller, index, ReserveFlag::Paused, paused)?;
        tracing::info!(index, paused, "reserve pause flag updated");
        Ok(())
    }

    /// Set LTV, liquidation threshold and bonus together after cross-validation
    pub fn configure_collateral(
        &mut self,
        caller: Role,
        index: u32,
        ltv: u32,
        liquidation_threshold: u32,
        liquidation_bonus: u32,
    ) -> RiskResult<()> {
        require_role(caller, RESERVE_CONFIGURATORS)?;
        self.commit(index, |config| {
            apply_collateral_params(config, ltv, liquidation_threshold, liquidation_bonus)
        })?;
        Ok(())
    }

    pub fn set_reserve_factor(&mut self, caller: Role, index: u32, reserve_factor: u32) -> RiskResult<()> {
        require_role(caller, RESERVE_CONFIGURATORS)?;
        self.commit(index, |config| apply_reserve_factor(config, reserve_factor))?;
        Ok(())
    }

    pub fn set_liquidation_protocol_fee(&mut self, caller: Role, index: u32, fee: u32) -> RiskResult<()> {
        require_role(caller, RESERVE_CONFIGURATORS)?;
        self.commit(index, |config| apply_liquidation_protocol_fee(config, fee))?;
        Ok(())
    }

    // ========== Queries ==========

    pub fn configuration(&self, index: u32) -> RiskResult<ReserveConfiguration> {
        self.entry(index).map(|entry| entry.configuration)
    }

    pub fn index_of(&self, asset: &Address) -> Option<u32> {
        self.indices.get(asset).copied()
    }

    pub fn asset_at(&self, index: u32) -> Option<Address> {
        self.reserves.get(index as usize).map(|entry| entry.asset)
    }

    pub fn reserves_count(&self) -> u32 {
        self.reserves.len() as u32
    }

    // ========== Internal Functions ==========

    fn entry(&self, index: u32) -> RiskResult<&ReserveEntry> {
        validate_reserve_index(index)?;
        self.reserves.get(index as usize).ok_or(RiskError::UnknownReserve)
    }

    fn commit<F>(&mut self, index: u32, update: F) -> RiskResult<ReserveConfiguration>
    where
        F: FnOnce(&mut ReserveConfiguration) -> RiskResult<()>,
    {
        let mut next = self.entry(index)?.configuration;
        update(&mut next)?;
        self.reserves[index as usize].configuration = next;
        tracing::info!(index, "reserve configuration committed");
        Ok(next)
    }
}

impl ReserveLookup for ReserveRegistry {
    fn reserve_index(&self, asset: &Address) -> Option<u32> {
        self.index_of(asset)
    }

    fn reserve_configuration(&self, index: u32) -> Option<ReserveConfiguration> {
        self.configuration(index).ok()
    }
}

//! Reserve Manager Contract
//!
//! On-chain home of the packed reserve configurations and user ledgers.
//! Callers are mapped to a role through the embedded `AccessControl` book;
//! validation and bit manipulation are delegated to `reserve_config`,
//! `reserve_registry` and `user_config`.

use odra::prelude::*;
use crate::access_control::{AccessControl, POOL_ONLY, RESERVE_CONFIGURATORS, RESERVE_LISTERS, RESERVE_PAUSERS};
use crate::errors::{or_revert, RiskError, RiskResult};
use crate::interfaces::ReserveLookup;
use crate::reserve_config::{
    ReserveCaps, ReserveConfiguration, ReserveField, ReserveFlag, ReserveFlags, ReserveParams,
};
use crate::reserve_registry::{
    apply_collateral_params, apply_liquidation_protocol_fee, apply_reserve_factor, flag_setters, next_reserve_index,
    validate_reserve_index,
};
use crate::types::Role;
use crate::user_config::UserConfiguration;

/// Reserve Manager Contract
#[odra::module]
pub struct ReserveManager {
    /// Role book
    access: SubModule<AccessControl>,
    /// Packed configuration per reserve index
    configurations: Mapping<u32, ReserveConfiguration>,
    /// Asset at each reserve index
    assets: Mapping<u32, Address>,
    /// Reserve index of each asset
    indices: Mapping<Address, u32>,
    /// Number of onboarded reserves
    reserves_count: Var<u32>,
    /// User ledgers
    ledgers: Mapping<Address, UserConfiguration>,
}

#[odra::module]
impl ReserveManager {
    /// Initialize with the first admin of the role book
    pub fn init(&mut self, admin: Address) {
        self.access.init(admin);
        self.reserves_count.set(0);
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

    // ========== Onboarding ==========

    /// Onboard `asset` with a zero configuration (governance only)
    pub fn init_reserve(&mut self, asset: Address) -> u32 {
        self.require_caller_role(RESERVE_LISTERS);
        let listed = self.indices.get(&asset).is_some();
        let index = or_revert(&self.env(), next_reserve_index(listed, self.get_reserves_count()));

        self.configurations.set(&index, ReserveConfiguration::new());
        self.assets.set(&index, asset);
        self.indices.set(&asset, index);
        self.reserves_count.set(index + 1);
        tracing::info!(index, "reserve onboarded");
        index
    }

    // ========== Configuration ==========

    /// Set LTV, liquidation threshold and bonus together
    pub fn configure_collateral(&mut self, index: u32, ltv: u32, liquidation_threshold: u32, liquidation_bonus: u32) {
        self.require_caller_role(RESERVE_CONFIGURATORS);
        self.update_reserve(index, |config| {
            apply_collateral_params(config, ltv, liquidation_threshold, liquidation_bonus)
        });
    }

    pub fn set_reserve_factor(&mut self, index: u32, reserve_factor: u32) {
        self.require_caller_role(RESERVE_CONFIGURATORS);
        self.update_reserve(index, |config| apply_reserve_factor(config, reserve_factor));
    }

    pub fn set_liquidation_protocol_fee(&mut self, index: u32, fee: u32) {
        self.require_caller_role(RESERVE_CONFIGURATORS);
        self.update_reserve(index, |config| apply_liquidation_protocol_fee(config, fee));
    }

    /// Write a numeric field by its position in the field table
    pub fn set_reserve_field(&mut self, index: u32, field_id: u8, value: u64) {
        self.require_caller_role(RESERVE_CONFIGURATORS);
        let field = or_revert(&self.env(), ReserveField::from_id(field_id));
        self.update_reserve(index, |config| config.set(field, value));
    }

    /// Write a flag by its position in `ReserveFlag::ALL`
    pub fn set_reserve_flag(&mut self, index: u32, flag_id: u8, enabled: bool) {
        let flag = or_revert(&self.env(), ReserveFlag::from_id(flag_id));
        self.require_caller_role(flag_setters(flag));
        self.update_reserve(index, |config| {
            config.set_flag(flag, enabled);
            Ok(())
        });
    }

    /// Pause or unpause a reserve; also open to the guardian
    pub fn set_paused(&mut self, index: u32, paused: bool) {
        self.require_caller_role(RESERVE_PAUSERS);
        self.update_reserve(index, |config| {
            config.set_paused(paused);
            Ok(())
        });
    }

    // ========== Reserve Queries ==========

    pub fn get_configuration(&self, index: u32) -> ReserveConfiguration {
        or_revert(&self.env(), self.load_reserve(index))
    }

    pub fn get_flags(&self, index: u32) -> ReserveFlags {
        self.get_configuration(index).flags()
    }

    pub fn get_caps(&self, index: u32) -> ReserveCaps {
        self.get_configuration(index).caps()
    }

    pub fn get_params(&self, index: u32) -> ReserveParams {
        self.get_configuration(index).params()
    }

    pub fn get_reserve_index(&self, asset: Address) -> Option<u32> {
        self.indices.get(&asset)
    }

    pub fn get_reserve_asset(&self, index: u32) -> Option<Address> {
        self.assets.get(&index)
    }

    pub fn get_reserves_count(&self) -> u32 {
        self.reserves_count.get().unwrap_or(0)
    }

    // ========== User Ledgers ==========

    pub fn set_user_borrowing(&mut self, user: Address, index: u32, borrowing: bool) {
        self.require_caller_role(POOL_ONLY);
        let mut ledger = self.get_user_configuration(user);
        or_revert(&self.env(), ledger.set_borrowing(index, borrowing));
        self.ledgers.set(&user, ledger);
    }

    pub fn set_user_collateral(&mut self, user: Address, index: u32, using: bool) {
        self.require_caller_role(POOL_ONLY);
        let mut ledger = self.get_user_configuration(user);
        or_revert(&self.env(), ledger.set_using_as_collateral(index, using));
        self.ledgers.set(&user, ledger);
    }

    pub fn set_user_emode_category(&mut self, user: Address, category: u8) {
        self.require_caller_role(POOL_ONLY);
        let mut ledger = self.get_user_configuration(user);
        ledger.set_emode_category(category);
        self.ledgers.set(&user, ledger);
    }

    /// Ledger of `user`; all-zero for users never seen
    pub fn get_user_configuration(&self, user: Address) -> UserConfiguration {
        self.ledgers.get(&user).unwrap_or_default()
    }

    /// Debt ceiling of the user's isolated collateral, if isolated
    pub fn get_isolation_debt_ceiling(&self, user: Address) -> Option<u64> {
        self.get_user_configuration(user).isolation_debt_ceiling(self)
    }

    /// Index of the user's single siloed borrow, if any
    pub fn get_siloed_borrowing_state(&self, user: Address) -> Option<u32> {
        self.get_user_configuration(user).siloed_borrowing_state(self)
    }

    pub fn is_borrowing_only(&self, user: Address, asset: Address) -> bool {
        self.get_user_configuration(user).is_borrowing_only(&asset, self)
    }
}

impl ReserveManager {
    fn require_caller_role(&self, allowed: &[Role]) {
        if self.access.resolve_role(self.env().caller(), allowed).is_none() {
            self.env().revert(RiskError::Unauthorized);
        }
    }

    fn load_reserve(&self, index: u32) -> RiskResult<ReserveConfiguration> {
        validate_reserve_index(index)?;
        self.configurations.get(&index).ok_or(RiskError::UnknownReserve)
    }

    /// Apply `update` to a copy of the reserve and store it only on success
    fn update_reserve<F>(&mut self, index: u32, update: F)
    where
        F: FnOnce(&mut ReserveConfiguration) -> RiskResult<()>,
    {
        let result = self.load_reserve(index).and_then(|mut next| update(&mut next).map(|_| next));
        let next = or_revert(&self.env(), result);
        self.configurations.set(&index, next);
        tracing::info!(index, "reserve configuration committed");
    }
}

impl ReserveLookup for ReserveManager {
    fn reserve_index(&self, asset: &Address) -> Option<u32> {
        self.indices.get(asset)
    }

    fn reserve_configuration(&self, index: u32) -> Option<ReserveConfiguration> {
        self.load_reserve(index).ok()
    }
}

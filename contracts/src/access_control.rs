//! Role-based access control for the risk core.
//!
//! Two layers:
//! - Pure gates (`require_role` and the per-operation role sets) used by the
//!   in-memory stores, which receive the caller's role explicitly.
//! - `AccessControl`, the on-chain role book. Contract modules resolve the
//!   caller's role through it and pass that role down to the pure layer.
//!
//! Role hierarchy:
//! - ADMIN grants and revokes every role; the last admin cannot be removed
//! - GOVERNANCE owns protocol-wide parameters and haircut bounds
//! - RISK_ADMIN owns risk inputs and haircut sub-parameters
//! - POOL owns user ledgers and liquidation accounting
//! - ORACLE reports price freshness
//! - GUARDIAN may pause reserves

use odra::prelude::*;
use crate::errors::{RiskError, RiskResult};
use crate::types::Role;

/// Reserve onboarding
pub const RESERVE_LISTERS: &[Role] = &[Role::Governance];
/// Reserve parameter and flag setters
pub const RESERVE_CONFIGURATORS: &[Role] = &[Role::RiskAdmin, Role::Governance];
/// Pause flag
pub const RESERVE_PAUSERS: &[Role] = &[Role::RiskAdmin, Role::Governance, Role::Guardian];
/// User ledger mutations and liquidation recording
pub const POOL_ONLY: &[Role] = &[Role::Pool];
/// Price history, risk metrics, quality and age parameters
pub const RISK_ADMINS: &[Role] = &[Role::RiskAdmin];
/// Haircut bounds, asset class registration, breaker thresholds
pub const GOVERNORS: &[Role] = &[Role::Governance];
/// Oracle freshness updates
pub const ORACLE_KEEPERS: &[Role] = &[Role::Oracle];

/// Fail with `Unauthorized` unless `caller` is one of `allowed`
pub fn require_role(caller: Role, allowed: &[Role]) -> RiskResult<()> {
    if allowed.contains(&caller) {
        Ok(())
    } else {
        Err(RiskError::Unauthorized)
    }
}

/// Access Control Contract
#[odra::module]
pub struct AccessControl {
    /// Role assignments: (role id, account) -> bool
    roles: Mapping<(u8, Address), bool>,
    /// Number of accounts with each role
    role_count: Mapping<u8, u32>,
    /// Whether the contract is initialized
    initialized: Var<bool>,
}

#[odra::module]
impl AccessControl {
    /// Initialize access control with initial admin
    pub fn init(&mut self, initial_admin: Address) {
        if self.initialized.get().unwrap_or(false) {
            self.env().revert(RiskError::AlreadyInitialized);
        }
        self.set_role_internal(Role::Admin, initial_admin, true);
        self.initialized.set(true);
    }

    // ========== Role Queries ==========

    /// Check if account has a specific role
    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.roles.get(&(role.id(), account)).unwrap_or(false)
    }

    /// Get the number of accounts with a role
    pub fn get_role_member_count(&self, role: Role) -> u32 {
        self.role_count.get(&role.id()).unwrap_or(0)
    }

    // ========== Role Management ==========

    /// Grant a role to an account (admin only)
    pub fn grant_role(&mut self, role: Role, account: Address) {
        self.require_admin();
        if self.has_role(role, account) {
            return;
        }
        self.set_role_internal(role, account, true);
    }

    /// Revoke a role from an account (admin only)
    pub fn revoke_role(&mut self, role: Role, account: Address) {
        self.require_admin();
        if !self.has_role(role, account) {
            return;
        }
        self.require_not_last_admin(role);
        self.set_role_internal(role, account, false);
    }

    /// Renounce a role held by the caller
    pub fn renounce_role(&mut self, role: Role) {
        let caller = self.env().caller();
        if !self.has_role(role, caller) {
            return;
        }
        self.require_not_last_admin(role);
        self.set_role_internal(role, caller, false);
    }

    // ========== Internal Functions ==========

    fn require_admin(&self) {
        if !self.has_role(Role::Admin, self.env().caller()) {
            self.env().revert(RiskError::Unauthorized);
        }
    }

    fn require_not_last_admin(&self, role: Role) {
        if role == Role::Admin && self.get_role_member_count(Role::Admin) <= 1 {
            self.env().revert(RiskError::LastAdmin);
        }
    }

    fn set_role_internal(&mut self, role: Role, account: Address, value: bool) {
        let had_role = self.has_role(role, account);
        self.roles.set(&(role.id(), account), value);

        let current_count = self.get_role_member_count(role);
        if value && !had_role {
            self.role_count.set(&role.id(), current_count + 1);
        } else if !value && had_role && current_count > 0 {
            self.role_count.set(&role.id(), current_count - 1);
        }
    }
}

impl AccessControl {
    /// First role from `allowed` held by `account`, for modules that gate on
    /// several roles before delegating to the pure layer
    pub fn resolve_role(&self, account: Address, allowed: &[Role]) -> Option<Role> {
        allowed.iter().copied().find(|role| self.has_role(*role, account))
    }
}

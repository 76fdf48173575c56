//! Common types used across the risk core.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::{RiskError, RiskResult};

/// Basis points in 100%
pub const BPS_SCALE: u32 = 10_000;

/// `amount * bps / 10000`, rounded down, without the intermediate product
///
/// Exact for any `amount` as long as `bps <= BPS_SCALE`.
pub fn bps_of(amount: U256, bps: u32) -> U256 {
    let scale = U256::from(BPS_SCALE);
    let bps = U256::from(bps);
    (amount / scale).saturating_mul(bps).saturating_add((amount % scale) * bps / scale)
}

/// Caller roles recognised by the risk core
///
/// Every mutating operation takes the caller's role explicitly; the on-chain
/// modules resolve it from `AccessControl` before delegating.
#[odra::odra_type]
#[derive(Copy, PartialOrd, Ord)]
pub enum Role {
    /// Grants and revokes roles
    Admin,
    /// Protocol-wide parameters and haircut bounds
    Governance,
    /// Risk inputs and haircut sub-parameters
    RiskAdmin,
    /// Lending pool: user ledgers and liquidation volume
    Pool,
    /// Oracle keeper: freshness timestamps
    Oracle,
    /// Emergency guardian: may pause reserves
    Guardian,
}

impl Role {
    /// All roles, in storage id order
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Governance,
        Role::RiskAdmin,
        Role::Pool,
        Role::Oracle,
        Role::Guardian,
    ];

    /// Storage id of the role
    pub const fn id(&self) -> u8 {
        match self {
            Role::Admin => 0,
            Role::Governance => 1,
            Role::RiskAdmin => 2,
            Role::Pool => 3,
            Role::Oracle => 4,
            Role::Guardian => 5,
        }
    }

    pub fn from_id(id: u8) -> Option<Role> {
        Role::ALL.iter().copied().find(|role| role.id() == id)
    }
}

/// Collateral asset class, ordered from lowest to highest risk tier
#[odra::odra_type]
#[derive(Copy, PartialOrd, Ord)]
pub enum AssetClass {
    /// Gold, silver, platinum
    PreciousMetals,
    /// Copper, aluminium, nickel
    IndustrialMetals,
    /// Crude, natural gas, refined products
    Energy,
    /// Grains, softs, livestock (perishable)
    Agriculture,
    /// Carbon credits and other environmental certificates
    CarbonCredits,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::PreciousMetals,
        AssetClass::IndustrialMetals,
        AssetClass::Energy,
        AssetClass::Agriculture,
        AssetClass::CarbonCredits,
    ];

    /// Frontend-friendly conversion: 0 = precious metals ... 4 = carbon credits
    pub fn from_u8(value: u8) -> RiskResult<AssetClass> {
        AssetClass::ALL
            .get(value as usize)
            .copied()
            .ok_or(RiskError::UnknownAssetClass)
    }

    pub const fn as_u8(&self) -> u8 {
        match self {
            AssetClass::PreciousMetals => 0,
            AssetClass::IndustrialMetals => 1,
            AssetClass::Energy => 2,
            AssetClass::Agriculture => 3,
            AssetClass::CarbonCredits => 4,
        }
    }
}

/// Mitigation requested from the emergency collaborator
#[odra::odra_type]
#[derive(Copy)]
pub enum Mitigation {
    /// Stop new borrows on the asset
    PauseBorrowing,
    /// Stop every operation on the asset
    PauseAll,
    /// Raise borrow rates on the asset
    IncreaseRates,
}

impl Mitigation {
    /// Wire name passed to the emergency module
    pub const fn name(&self) -> &'static str {
        match self {
            Mitigation::PauseBorrowing => "PAUSE_BORROWING",
            Mitigation::PauseAll => "PAUSE_ALL",
            Mitigation::IncreaseRates => "INCREASE_RATES",
        }
    }
}

/// Circuit breaker checks, in evaluation order
#[odra::odra_type]
#[derive(Copy)]
pub enum BreakerKind {
    OracleStaleness,
    PriceDeviation,
    HighUtilization,
    LiquidationWave,
}

impl BreakerKind {
    /// Human-readable reason reported when the breaker fires
    pub const fn reason(&self) -> &'static str {
        match self {
            BreakerKind::OracleStaleness => "Oracle price stale",
            BreakerKind::PriceDeviation => "Price deviation exceeds threshold",
            BreakerKind::HighUtilization => "Utilization above warning threshold",
            BreakerKind::LiquidationWave => "Liquidation wave detected",
        }
    }

    /// Mitigation dispatched when the check fires
    pub const fn mitigation(&self) -> Mitigation {
        match self {
            BreakerKind::OracleStaleness => Mitigation::PauseBorrowing,
            BreakerKind::PriceDeviation => Mitigation::PauseBorrowing,
            BreakerKind::HighUtilization => Mitigation::IncreaseRates,
            BreakerKind::LiquidationWave => Mitigation::PauseAll,
        }
    }

    /// Warning-only checks dispatch a mitigation but never trip the breaker
    pub const fn is_warning_only(&self) -> bool {
        matches!(self, BreakerKind::HighUtilization)
    }
}

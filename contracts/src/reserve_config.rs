//! Packed reserve configuration.
//!
//! All tunable parameters and flags of one reserve live in a single 256-bit
//! word. Numeric fields are described by the `FIELDS` table; every accessor
//! goes through it, so offsets and widths are declared exactly once.
//!
//! ## Layout (version 1)
//!
//! | bits     | field                      | width |
//! |----------|----------------------------|-------|
//! | 0-15     | LTV (bps)                  | 16    |
//! | 16-31    | liquidation threshold (bps)| 16    |
//! | 32-47    | liquidation bonus (bps)    | 16    |
//! | 48-55    | decimals                   | 8     |
//! | 56-63    | flags (see `ReserveFlag`)  | 8 x 1 |
//! | 64-79    | reserve factor (bps)       | 16    |
//! | 80-115   | borrow cap (whole tokens)  | 36    |
//! | 116-151  | supply cap (whole tokens)  | 36    |
//! | 152-167  | liquidation protocol fee   | 16    |
//! | 168-175  | e-mode category            | 8     |
//! | 176-211  | unbacked mint cap          | 36    |
//! | 212-251  | debt ceiling (2 dp USD)    | 40    |
//! | 252-255  | reserved for extension     | 4     |

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::{RiskError, RiskResult};

/// Version of the bit layout documented above
pub const LAYOUT_VERSION: u8 = 1;

/// First bit not assigned to any field
pub const RESERVED_BITS_START: usize = 252;

/// Decimal places of the debt ceiling field
pub const DEBT_CEILING_DECIMALS: u32 = 2;

/// Numeric reserve parameters, in `FIELDS` order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveField {
    Ltv,
    LiquidationThreshold,
    LiquidationBonus,
    Decimals,
    ReserveFactor,
    BorrowCap,
    SupplyCap,
    LiquidationProtocolFee,
    EModeCategory,
    UnbackedMintCap,
    DebtCeiling,
}

impl ReserveField {
    pub const ALL: [ReserveField; 11] = [
        ReserveField::Ltv,
        ReserveField::LiquidationThreshold,
        ReserveField::LiquidationBonus,
        ReserveField::Decimals,
        ReserveField::ReserveFactor,
        ReserveField::BorrowCap,
        ReserveField::SupplyCap,
        ReserveField::LiquidationProtocolFee,
        ReserveField::EModeCategory,
        ReserveField::UnbackedMintCap,
        ReserveField::DebtCeiling,
    ];

    pub fn descriptor(&self) -> &'static FieldDescriptor {
        &FIELDS[*self as usize]
    }

    /// Field at position `id` of `FIELDS`
    pub fn from_id(id: u8) -> RiskResult<ReserveField> {
        Self::ALL.get(id as usize).copied().ok_or(RiskError::UnknownReserveParameter)
    }
}

/// Position, width and bound of one numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field: ReserveField,
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    /// Always `2^width - 1`
    pub max: u64,
    /// Raised when a setter receives a value above `max`
    pub error: RiskError,
}

const fn max_for_width(width: usize) -> u64 {
    (1u64 << width) - 1
}

const fn descriptor(
    field: ReserveField,
    name: &'static str,
    offset: usize,
    width: usize,
    error: RiskError,
) -> FieldDescriptor {
    FieldDescriptor {
        field,
        name,
        offset,
        width,
        max: max_for_width(width),
        error,
    }
}

/// Field table, indexed by `ReserveField as usize`
pub const FIELDS: [FieldDescriptor; 11] = [
    descriptor(ReserveField::Ltv, "ltv", 0, 16, RiskError::InvalidLtv),
    descriptor(ReserveField::LiquidationThreshold, "liquidation_threshold", 16, 16, RiskError::InvalidLiquidationThreshold),
    descriptor(ReserveField::LiquidationBonus, "liquidation_bonus", 32, 16, RiskError::InvalidLiquidationBonus),
    descriptor(ReserveField::Decimals, "decimals", 48, 8, RiskError::InvalidDecimals),
    descriptor(ReserveField::ReserveFactor, "reserve_factor", 64, 16, RiskError::InvalidReserveFactor),
    descriptor(ReserveField::BorrowCap, "borrow_cap", 80, 36, RiskError::InvalidBorrowCap),
    descriptor(ReserveField::SupplyCap, "supply_cap", 116, 36, RiskError::InvalidSupplyCap),
    descriptor(ReserveField::LiquidationProtocolFee, "liquidation_protocol_fee", 152, 16, RiskError::InvalidLiquidationProtocolFee),
    descriptor(ReserveField::EModeCategory, "emode_category", 168, 8, RiskError::InvalidEModeCategory),
    descriptor(ReserveField::UnbackedMintCap, "unbacked_mint_cap", 176, 36, RiskError::InvalidUnbackedMintCap),
    descriptor(ReserveField::DebtCeiling, "debt_ceiling", 212, 40, RiskError::InvalidDebtCeiling),
];

/// Boolean reserve flags; the discriminant is the bit position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveFlag {
    Active = 56,
    Frozen = 57,
    BorrowingEnabled = 58,
    StableRateBorrowingEnabled = 59,
    Paused = 60,
    BorrowableInIsolation = 61,
    SiloedBorrowing = 62,
    FlashLoanEnabled = 63,
}

impl ReserveFlag {
    pub const ALL: [ReserveFlag; 8] = [
        ReserveFlag::Active,
        ReserveFlag::Frozen,
        ReserveFlag::BorrowingEnabled,
        ReserveFlag::StableRateBorrowingEnabled,
        ReserveFlag::Paused,
        ReserveFlag::BorrowableInIsolation,
        ReserveFlag::SiloedBorrowing,
        ReserveFlag::FlashLoanEnabled,
    ];

    pub const fn bit(&self) -> usize {
        *self as usize
    }

    /// Flag at position `id` of `ALL`
    pub fn from_id(id: u8) -> RiskResult<ReserveFlag> {
        Self::ALL.get(id as usize).copied().ok_or(RiskError::UnknownReserveParameter)
    }
}

/// All flags of a reserve, decoded in one read
#[odra::odra_type]
#[derive(Copy)]
pub struct ReserveFlags {
    pub active: bool,
    pub frozen: bool,
    pub borrowing_enabled: bool,
    pub stable_rate_borrowing_enabled: bool,
    pub paused: bool,
    pub borrowable_in_isolation: bool,
    pub siloed_borrowing: bool,
    pub flash_loan_enabled: bool,
}

impl ReserveFlags {
    /// Active, not frozen and not paused
    pub fn is_usable(&self) -> bool {
        self.active && !self.frozen && !self.paused
    }
}

/// Supply and borrow caps, in whole tokens (0 = uncapped)
#[odra::odra_type]
#[derive(Copy)]
pub struct ReserveCaps {
    pub borrow_cap: u64,
    pub supply_cap: u64,
}

/// Risk parameters consulted on every health-factor computation
#[odra::odra_type]
#[derive(Copy)]
pub struct ReserveParams {
    pub ltv: u32,
    pub liquidation_threshold: u32,
    pub liquidation_bonus: u32,
    pub decimals: u8,
    pub reserve_factor: u32,
    pub emode_category: u8,
}

/// Packed configuration word of one reserve
#[odra::odra_type]
#[derive(Copy)]
pub struct ReserveConfiguration {
    pub data: U256,
}

impl Default for ReserveConfiguration {
    fn default() -> Self {
        Self { data: U256::zero() }
    }
}

fn field_mask(width: usize) -> U256 {
    (U256::one() << width) - U256::one()
}

impl ReserveConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_raw(data: U256) -> Self {
        Self { data }
    }

    // ========== Generic Accessors ==========

    /// Read a numeric field (mask + shift, no side effects)
    pub fn get(&self, field: ReserveField) -> u64 {
        let d = field.descriptor();
        ((self.data >> d.offset) & field_mask(d.width)).low_u64()
    }

    /// Write a numeric field, leaving every other bit untouched
    ///
    /// Values above the field maximum are rejected before the word changes.
    pub fn set(&mut self, field: ReserveField, value: u64) -> RiskResult<()> {
        let d = field.descriptor();
        if value > d.max {
            return Err(d.error);
        }
        let mask = field_mask(d.width) << d.offset;
        self.data = (self.data & !mask) | (U256::from(value) << d.offset);
        Ok(())
    }

    pub fn get_flag(&self, flag: ReserveFlag) -> bool {
        self.data.bit(flag.bit())
    }

    pub fn set_flag(&mut self, flag: ReserveFlag, enabled: bool) {
        let mask = U256::one() << flag.bit();
        if enabled {
            self.data = self.data | mask;
        } else {
            self.data = self.data & !mask;
        }
    }

    // ========== Numeric Fields ==========

    pub fn set_ltv(&mut self, ltv: u32) -> RiskResult<()> {
        self.set(ReserveField::Ltv, ltv as u64)
    }

    pub fn get_ltv(&self) -> u32 {
        self.get(ReserveField::Ltv) as u32
    }

    pub fn set_liquidation_threshold(&mut self, threshold: u32) -> RiskResult<()> {
        self.set(ReserveField::LiquidationThreshold, threshold as u64)
    }

    pub fn get_liquidation_threshold(&self) -> u32 {
        self.get(ReserveField::LiquidationThreshold) as u32
    }

    pub fn set_liquidation_bonus(&mut self, bonus: u32) -> RiskResult<()> {
        self.set(ReserveField::LiquidationBonus, bonus as u64)
    }

    pub fn get_liquidation_bonus(&self) -> u32 {
        self.get(ReserveField::LiquidationBonus) as u32
    }

    /// Decimals arrive as `u32` so that out-of-range input is representable
    pub fn set_decimals(&mut self, decimals: u32) -> RiskResult<()> {
        self.set(ReserveField::Decimals, decimals as u64)
    }

    pub fn get_decimals(&self) -> u8 {
        self.get(ReserveField::Decimals) as u8
    }

    pub fn set_reserve_factor(&mut self, reserve_factor: u32) -> RiskResult<()> {
        self.set(ReserveField::ReserveFactor, reserve_factor as u64)
    }

    pub fn get_reserve_factor(&self) -> u32 {
        self.get(ReserveField::ReserveFactor) as u32
    }

    pub fn set_borrow_cap(&mut self, borrow_cap: u64) -> RiskResult<()> {
        self.set(ReserveField::BorrowCap, borrow_cap)
    }

    pub fn get_borrow_cap(&self) -> u64 {
        self.get(ReserveField::BorrowCap)
    }

    pub fn set_supply_cap(&mut self, supply_cap: u64) -> RiskResult<()> {
        self.set(ReserveField::SupplyCap, supply_cap)
    }

    pub fn get_supply_cap(&self) -> u64 {
        self.get(ReserveField::SupplyCap)
    }

    pub fn set_liquidation_protocol_fee(&mut self, fee: u32) -> RiskResult<()> {
        self.set(ReserveField::LiquidationProtocolFee, fee as u64)
    }

    pub fn get_liquidation_protocol_fee(&self) -> u32 {
        self.get(ReserveField::LiquidationProtocolFee) as u32
    }

    pub fn set_emode_category(&mut self, category: u32) -> RiskResult<()> {
        self.set(ReserveField::EModeCategory, category as u64)
    }

    pub fn get_emode_category(&self) -> u8 {
        self.get(ReserveField::EModeCategory) as u8
    }

    pub fn set_unbacked_mint_cap(&mut self, cap: u64) -> RiskResult<()> {
        self.set(ReserveField::UnbackedMintCap, cap)
    }

    pub fn get_unbacked_mint_cap(&self) -> u64 {
        self.get(ReserveField::UnbackedMintCap)
    }

    /// Debt ceiling in USD with `DEBT_CEILING_DECIMALS` decimals (500000 = $5,000.00)
    pub fn set_debt_ceiling(&mut self, ceiling: u64) -> RiskResult<()> {
        self.set(ReserveField::DebtCeiling, ceiling)
    }

    pub fn get_debt_ceiling(&self) -> u64 {
        self.get(ReserveField::DebtCeiling)
    }

    // ========== Flags ==========

    pub fn set_active(&mut self, active: bool) {
        self.set_flag(ReserveFlag::Active, active);
    }

    pub fn get_active(&self) -> bool {
        self.get_flag(ReserveFlag::Active)
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.set_flag(ReserveFlag::Frozen, frozen);
    }

    pub fn get_frozen(&self) -> bool {
        self.get_flag(ReserveFlag::Frozen)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.set_flag(ReserveFlag::Paused, paused);
    }

    pub fn get_paused(&self) -> bool {
        self.get_flag(ReserveFlag::Paused)
    }

    pub fn set_borrowing_enabled(&mut self, enabled: bool) {
        self.set_flag(ReserveFlag::BorrowingEnabled, enabled);
    }

    pub fn get_borrowing_enabled(&self) -> bool {
        self.get_flag(ReserveFlag::BorrowingEnabled)
    }

    pub fn set_stable_rate_borrowing_enabled(&mut self, enabled: bool) {
        self.set_flag(ReserveFlag::StableRateBorrowingEnabled, enabled);
    }

    pub fn get_stable_rate_borrowing_enabled(&self) -> bool {
        self.get_flag(ReserveFlag::StableRateBorrowingEnabled)
    }

    pub fn set_borrowable_in_isolation(&mut self, borrowable: bool) {
        self.set_flag(ReserveFlag::BorrowableInIsolation, borrowable);
    }

    pub fn get_borrowable_in_isolation(&self) -> bool {
        self.get_flag(ReserveFlag::BorrowableInIsolation)
    }

    pub fn set_siloed_borrowing(&mut self, siloed: bool) {
        self.set_flag(ReserveFlag::SiloedBorrowing, siloed);
    }

    pub fn get_siloed_borrowing(&self) -> bool {
        self.get_flag(ReserveFlag::SiloedBorrowing)
    }

    pub fn set_flash_loan_enabled(&mut self, enabled: bool) {
        self.set_flag(ReserveFlag::FlashLoanEnabled, enabled);
    }

    pub fn get_flash_loan_enabled(&self) -> bool {
        self.get_flag(ReserveFlag::FlashLoanEnabled)
    }

    // ========== Batched Reads ==========

    /// All flags from a single copy of the word
    pub fn flags(&self) -> ReserveFlags {
        let data = self.data;
        ReserveFlags {
            active: data.bit(ReserveFlag::Active.bit()),
            frozen: data.bit(ReserveFlag::Frozen.bit()),
            borrowing_enabled: data.bit(ReserveFlag::BorrowingEnabled.bit()),
            stable_rate_borrowing_enabled: data.bit(ReserveFlag::StableRateBorrowingEnabled.bit()),
            paused: data.bit(ReserveFlag::Paused.bit()),
            borrowable_in_isolation: data.bit(ReserveFlag::BorrowableInIsolation.bit()),
            siloed_borrowing: data.bit(ReserveFlag::SiloedBorrowing.bit()),
            flash_loan_enabled: data.bit(ReserveFlag::FlashLoanEnabled.bit()),
        }
    }

    /// Borrow and supply caps together (both are checked on every supply/borrow)
    pub fn caps(&self) -> ReserveCaps {
        ReserveCaps {
            borrow_cap: self.get_borrow_cap(),
            supply_cap: self.get_supply_cap(),
        }
    }

    pub fn params(&self) -> ReserveParams {
        ReserveParams {
            ltv: self.get_ltv(),
            liquidation_threshold: self.get_liquidation_threshold(),
            liquidation_bonus: self.get_liquidation_bonus(),
            decimals: self.get_decimals(),
            reserve_factor: self.get_reserve_factor(),
            emode_category: self.get_emode_category(),
        }
    }
}

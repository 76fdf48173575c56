//! Packed per-user reserve ledger.
//!
//! Reserve `i` (0 <= i < 128) owns bits `2i` (borrowing) and `2i + 1`
//! (used as collateral) of a 256-bit word. The e-mode category is a separate
//! tag byte stored next to the word, never reachable through slot arithmetic.
//!
//! ## Layout (version 1)
//!
//! | bits          | meaning                         |
//! |---------------|---------------------------------|
//! | `2i`          | borrowing reserve `i`           |
//! | `2i + 1`      | reserve `i` used as collateral  |
//! | tag byte      | e-mode category (0 = none)      |

use alloc::collections::BTreeMap;
use odra::prelude::*;
use odra::casper_types::U256;
use crate::access_control::{require_role, POOL_ONLY};
use crate::errors::RiskResult;
use crate::interfaces::ReserveLookup;
use crate::reserve_registry::{validate_reserve_index, MAX_RESERVES};
use crate::types::Role;

/// Version of the ledger layout documented above
pub const LAYOUT_VERSION: u8 = 1;

/// Numeric form of "no matching reserve" (one past the last index)
pub const NOT_FOUND_INDEX: u32 = MAX_RESERVES;

/// Every borrowing bit (even positions)
pub const BORROWING_MASK: U256 = U256([0x5555_5555_5555_5555; 4]);

/// Every collateral bit (odd positions)
pub const COLLATERAL_MASK: U256 = U256([0xAAAA_AAAA_AAAA_AAAA; 4]);

fn is_exactly_one_bit(bits: U256) -> bool {
    !bits.is_zero() && (bits & (bits - U256::one())).is_zero()
}

fn count_bits(bits: U256) -> u32 {
    bits.0.iter().map(|limb| limb.count_ones()).sum()
}

/// Reserve ledger of one user
#[odra::odra_type]
#[derive(Copy)]
pub struct UserConfiguration {
    pub data: U256,
    pub emode_category: u8,
}

impl Default for UserConfiguration {
    fn default() -> Self {
        Self {
            data: U256::zero(),
            emode_category: 0,
        }
    }
}

impl UserConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Slot Mutations ==========

    /// Mark reserve `index` as borrowed (or not); no other slot changes
    pub fn set_borrowing(&mut self, index: u32, borrowing: bool) -> RiskResult<()> {
        validate_reserve_index(index)?;
        self.write_bit(index as usize * 2, borrowing);
        Ok(())
    }

    /// Mark reserve `index` as collateral (or not); no other slot changes
    pub fn set_using_as_collateral(&mut self, index: u32, using: bool) -> RiskResult<()> {
        validate_reserve_index(index)?;
        self.write_bit(index as usize * 2 + 1, using);
        Ok(())
    }

    fn write_bit(&mut self, bit: usize, value: bool) {
        let mask = U256::one() << bit;
        if value {
            self.data = self.data | mask;
        } else {
            self.data = self.data & !mask;
        }
    }

    // ========== Single-Reserve Queries ==========

    pub fn is_using_as_collateral_or_borrowing(&self, index: u32) -> RiskResult<bool> {
        validate_reserve_index(index)?;
        let slot = U256::from(3u64) << (index as usize * 2);
        Ok(!(self.data & slot).is_zero())
    }

    pub fn is_borrowing(&self, index: u32) -> RiskResult<bool> {
        validate_reserve_index(index)?;
        Ok(self.data.bit(index as usize * 2))
    }

    pub fn is_using_as_collateral(&self, index: u32) -> RiskResult<bool> {
        validate_reserve_index(index)?;
        Ok(self.data.bit(index as usize * 2 + 1))
    }

    // ========== Aggregate Queries ==========

    pub fn is_empty(&self) -> bool {
        self.data.is_zero()
    }

    pub fn is_borrowing_any(&self) -> bool {
        !(self.data & BORROWING_MASK).is_zero()
    }

    pub fn is_using_as_collateral_any(&self) -> bool {
        !(self.data & COLLATERAL_MASK).is_zero()
    }

    /// Exactly one reserve borrowed
    pub fn is_borrowing_one(&self) -> bool {
        is_exactly_one_bit(self.data & BORROWING_MASK)
    }

    /// Two or more reserves borrowed
    pub fn is_borrowing_multiple(&self) -> bool {
        let bits = self.data & BORROWING_MASK;
        !bits.is_zero() && !is_exactly_one_bit(bits)
    }

    /// Exactly one reserve used as collateral
    pub fn is_using_as_collateral_one(&self) -> bool {
        is_exactly_one_bit(self.data & COLLATERAL_MASK)
    }

    /// Two or more reserves used as collateral
    pub fn is_using_as_collateral_multiple(&self) -> bool {
        let bits = self.data & COLLATERAL_MASK;
        !bits.is_zero() && !is_exactly_one_bit(bits)
    }

    pub fn borrowing_count(&self) -> u32 {
        count_bits(self.data & BORROWING_MASK)
    }

    pub fn collateral_count(&self) -> u32 {
        count_bits(self.data & COLLATERAL_MASK)
    }

    /// Lowest reserve index with a bit set in `mask`, or `None`
    ///
    /// `NOT_FOUND_INDEX` is the numeric form of `None` for callers that store it.
    pub fn first_asset_matching(&self, mask: U256) -> Option<u32> {
        let bits = self.data & mask;
        if bits.is_zero() {
            return None;
        }
        Some(bits.trailing_zeros() / 2)
    }

    /// Reserve indices with a bit set in `mask`, ascending
    pub fn assets_matching(&self, mask: U256) -> impl Iterator<Item = u32> {
        let mut bits = self.data & mask;
        core::iter::from_fn(move || {
            if bits.is_zero() {
                return None;
            }
            let index = bits.trailing_zeros() / 2;
            // A reserve may match on both of its bits; clear the whole slot
            bits = bits & !(U256::from(3u64) << (index as usize * 2));
            Some(index)
        })
    }

    // ========== Isolation & Siloed Borrowing ==========

    /// The single collateral reserve, if the user is in isolation mode
    ///
    /// Isolation holds with exactly one collateral bit and at most one borrow bit.
    pub fn isolated_asset(&self) -> Option<u32> {
        if !self.is_using_as_collateral_one() || self.borrowing_count() > 1 {
            return None;
        }
        self.first_asset_matching(COLLATERAL_MASK)
    }

    /// Debt ceiling (2 dp USD) of the isolated collateral reserve
    ///
    /// `None` outside isolation mode or when the reserve is unknown to `lookup`.
    pub fn isolation_debt_ceiling<L: ReserveLookup + ?Sized>(&self, lookup: &L) -> Option<u64> {
        let index = self.isolated_asset()?;
        lookup
            .reserve_configuration(index)
            .map(|config| config.get_debt_ceiling())
    }

    /// The borrowed reserve, if the user borrows exactly one reserve and it
    /// has siloed borrowing enabled
    pub fn siloed_borrowing_state<L: ReserveLookup + ?Sized>(&self, lookup: &L) -> Option<u32> {
        if !self.is_borrowing_one() {
            return None;
        }
        let index = self.first_asset_matching(BORROWING_MASK)?;
        let config = lookup.reserve_configuration(index)?;
        if config.get_siloed_borrowing() {
            Some(index)
        } else {
            None
        }
    }

    /// True when `asset` is the one and only reserve the user borrows
    pub fn is_borrowing_only<L: ReserveLookup + ?Sized>(&self, asset: &Address, lookup: &L) -> bool {
        match lookup.reserve_index(asset) {
            Some(index) => {
                self.is_borrowing_one() && self.first_asset_matching(BORROWING_MASK) == Some(index)
            }
            None => false,
        }
    }

    // ========== E-Mode ==========

    pub fn set_emode_category(&mut self, category: u8) {
        self.emode_category = category;
    }

    pub fn get_emode_category(&self) -> u8 {
        self.emode_category
    }
}

/// In-memory store of user ledgers, mutated only by the pool
#[derive(Debug, Clone, Default)]
pub struct UserLedgers {
    ledgers: BTreeMap<Address, UserConfiguration>,
}

impl UserLedgers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger of `user`; all-zero for users never seen
    pub fn get(&self, user: &Address) -> UserConfiguration {
        self.ledgers.get(user).copied().unwrap_or_default()
    }

    pub fn set_borrowing(&mut self, caller: Role, user: Address, index: u32, borrowing: bool) -> RiskResult<()> {
        require_role(caller, POOL_ONLY)?;
        let mut ledger = self.get(&user);
        ledger.set_borrowing(index, borrowing)?;
        self.ledgers.insert(user, ledger);
        Ok(())
    }

    pub fn set_using_as_collateral(&mut self, caller: Role, user: Address, index: u32, using: bool) -> RiskResult<()> {
        require_role(caller, POOL_ONLY)?;
        let mut ledger = self.get(&user);
        ledger.set_using_as_collateral(index, using)?;
        self.ledgers.insert(user, ledger);
        Ok(())
    }

    pub fn set_emode_category(&mut self, caller: Role, user: Address, category: u8) -> RiskResult<()> {
        require_role(caller, POOL_ONLY)?;
        let mut ledger = self.get(&user);
        ledger.set_emode_category(category);
        self.ledgers.insert(user, ledger);
        Ok(())
    }
}

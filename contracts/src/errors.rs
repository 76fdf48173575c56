//! Risk core error definitions.

use odra::prelude::*;
use odra::ContractEnv;

/// Result type for fallible risk core operations
pub type RiskResult<T> = Result<T, RiskError>;

/// Risk core errors
///
/// Every variant aborts the operation that raised it before any state is written.
/// Circuit breaker trips are not errors; they are reported through `BreakerReport`.
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RiskError {
    // Range errors (1xx)
    InvalidLtv = 100,
    InvalidLiquidationThreshold = 101,
    InvalidLiquidationBonus = 102,
    InvalidDecimals = 103,
    InvalidReserveFactor = 104,
    InvalidBorrowCap = 105,
    InvalidSupplyCap = 106,
    InvalidLiquidationProtocolFee = 107,
    InvalidEModeCategory = 108,
    InvalidUnbackedMintCap = 109,
    InvalidDebtCeiling = 110,
    PercentageOutOfRange = 111,
    HaircutAboveMaximum = 112,

    // Index errors (2xx)
    InvalidReserveIndex = 200,
    UnknownReserve = 201,
    TooManyReserves = 202,
    ReserveAlreadyInitialized = 203,
    UnknownAssetClass = 204,
    AssetClassAlreadyRegistered = 205,
    UnknownReserveParameter = 206,

    // Ordering errors (3xx)
    NonChronologicalPriceSeries = 300,
    HaircutBoundsInverted = 301,
    InvalidCollateralParams = 302,

    // Access control errors (4xx)
    Unauthorized = 400,
    LastAdmin = 401,
    AlreadyInitialized = 402,

    // Input validation errors (5xx)
    EmptyPriceSeries = 500,
    InvalidRiskMetrics = 501,
    InvalidBreakerConfig = 502,
    CollaboratorNotSet = 503,
}

impl RiskError {
    pub const fn message(&self) -> &'static str {
        match self {
            // Range
            RiskError::InvalidLtv => "LTV exceeds field maximum",
            RiskError::InvalidLiquidationThreshold => "Liquidation threshold exceeds field maximum",
            RiskError::InvalidLiquidationBonus => "Liquidation bonus exceeds field maximum",
            RiskError::InvalidDecimals => "Decimals exceed field maximum",
            RiskError::InvalidReserveFactor => "Reserve factor exceeds field maximum",
            RiskError::InvalidBorrowCap => "Borrow cap exceeds field maximum",
            RiskError::InvalidSupplyCap => "Supply cap exceeds field maximum",
            RiskError::InvalidLiquidationProtocolFee => "Liquidation protocol fee exceeds field maximum",
            RiskError::InvalidEModeCategory => "E-mode category exceeds field maximum",
            RiskError::InvalidUnbackedMintCap => "Unbacked mint cap exceeds field maximum",
            RiskError::InvalidDebtCeiling => "Debt ceiling exceeds field maximum",
            RiskError::PercentageOutOfRange => "Percentage exceeds 100%",
            RiskError::HaircutAboveMaximum => "Haircut exceeds protocol maximum",

            // Index
            RiskError::InvalidReserveIndex => "Reserve index out of range",
            RiskError::UnknownReserve => "Reserve not initialized",
            RiskError::TooManyReserves => "Maximum number of reserves reached",
            RiskError::ReserveAlreadyInitialized => "Reserve already initialized",
            RiskError::UnknownAssetClass => "Asset class not registered",
            RiskError::AssetClassAlreadyRegistered => "Asset class already registered",
            RiskError::UnknownReserveParameter => "Unknown reserve field or flag id",

            // Ordering
            RiskError::NonChronologicalPriceSeries => "Price series timestamps not strictly increasing",
            RiskError::HaircutBoundsInverted => "Haircut bounds violate min <= base <= max",
            RiskError::InvalidCollateralParams => "Collateral parameters inconsistent",

            // Access control
            RiskError::Unauthorized => "Unauthorized: caller lacks required role",
            RiskError::LastAdmin => "Cannot remove the last admin",
            RiskError::AlreadyInitialized => "Already initialized",

            // Validation
            RiskError::EmptyPriceSeries => "Price series is empty",
            RiskError::InvalidRiskMetrics => "Risk metrics invalid (zero samples, volatility or drawdown)",
            RiskError::InvalidBreakerConfig => "Invalid circuit breaker configuration",
            RiskError::CollaboratorNotSet => "Collaborator contract address not set",
        }
    }

    /// Numeric error code (stable across releases)
    pub const fn code(&self) -> u16 {
        *self as u16
    }
}

impl core::fmt::Display for RiskError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<RiskError> for OdraError {
    fn from(error: RiskError) -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            OdraError::user(error as u16)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            OdraError::user(error as u16, error.message())
        }
    }
}

/// Unwrap a core result, reverting the current call with its error
pub fn or_revert<T>(env: &ContractEnv, result: RiskResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => env.revert(error),
    }
}

//! Conversions between raw on-chain integer amounts and display decimals.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

pub const SOL_DECIMALS: u8 = 9;

/// `raw / 10^decimals`, or `None` when the scale is not representable
pub fn to_ui_amount(raw: u64, decimals: u8) -> Option<Decimal> {
    Decimal::try_from_i128_with_scale(raw as i128, decimals as u32).ok()
}

/// `amount * 10^decimals`, rounded half away from zero
///
/// Returns `None` for negative amounts or when the result does not fit a `u64`.
pub fn to_raw_amount(amount: Decimal, decimals: u8) -> Option<u64> {
    if amount.is_sign_negative() {
        return None;
    }
    let mut factor = Decimal::ONE;
    for _ in 0..decimals {
        factor = factor.checked_mul(Decimal::TEN)?;
    }
    amount
        .checked_mul(factor)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
}

pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from_i128_with_scale(lamports as i128, SOL_DECIMALS as u32)
}

pub fn sol_to_lamports(sol: Decimal) -> Option<u64> {
    to_raw_amount(sol, SOL_DECIMALS)
}

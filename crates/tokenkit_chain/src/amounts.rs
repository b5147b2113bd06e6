//! Fixed-point token arithmetic. All on-chain amounts are integers scaled by
//! the token's decimal count; nothing here touches floating point.

use alloy::primitives::U256;
use alloy::primitives::utils::parse_ether;
use anyhow::{Context, Result};
use tokenkit_core::mint_share;

/// `whole * 10^decimals`.
pub fn scale_units(whole: u128, decimals: u8) -> Result<U256> {
    let factor = U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .with_context(|| format!("10^{decimals} does not fit in uint256"))?;
    U256::from(whole)
        .checked_mul(factor)
        .with_context(|| format!("{whole} scaled by 10^{decimals} overflows uint256"))
}

/// Base units to mint: `floor(total_supply * pct / 100)` whole tokens, scaled.
pub fn mint_amount(total_supply: u128, mint_percentage: u8, decimals: u8) -> Result<U256> {
    scale_units(mint_share(total_supply, mint_percentage), decimals)
}

/// Minimum accepted amount for a slippage band: `desired * (100 - k) / 100`,
/// truncated toward zero. `k` above 100 is treated as 100.
pub fn min_with_slippage(desired: U256, slippage_percent: u8) -> U256 {
    let keep = U256::from(100u8.saturating_sub(slippage_percent));
    let hundred = U256::from(100u8);
    (desired / hundred) * keep + (desired % hundred) * keep / hundred
}

/// Native currency amount (decimal string, 18 decimals) in wei.
pub fn parse_native_amount(amount: &str) -> Result<U256> {
    parse_ether(amount).with_context(|| format!("invalid native amount '{amount}'"))
}

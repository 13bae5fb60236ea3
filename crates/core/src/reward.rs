use std::fmt;

use thiserror::Error;

/// Largest amount that survives the trip through `f64` without losing units.
pub const MAX_EXACT_AMOUNT: u64 = 1 << 53;

/// A pool-configured address receiving a percentage of the block reward.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeRecipient {
    pub address: String,
    pub percent: f64,
}

impl FeeRecipient {
    pub fn new(address: impl Into<String>, percent: f64) -> Self {
        FeeRecipient {
            address: address.into(),
            percent,
        }
    }
}

/// Which allocated output a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSlot {
    Pool,
    Recipient(usize),
}

impl fmt::Display for OutputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSlot::Pool => f.write_str("pool output"),
            OutputSlot::Recipient(idx) => write!(f, "recipients[{idx}]"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RewardError {
    #[error("recipients[{index}] percent must be within 0..=100, got {percent}")]
    InvalidPercent { index: usize, percent: f64 },
    #[error("recipient percentages sum to {0}, above 100")]
    PercentOverflow(f64),
    #[error("{0} would receive a negative amount")]
    NegativeAmount(OutputSlot),
    #[error("outputs allocate {allocated}, more than the available {available}")]
    ExceedsReward { allocated: u128, available: u128 },
    #[error("amount exceeds 2^53 units")]
    AmountTooLarge,
}

/// Output amounts in coinbase order: pool first, then recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub pool: u64,
    pub recipients: Vec<u64>,
}

impl Allocation {
    pub fn total(&self) -> u128 {
        u128::from(self.pool) + self.recipients.iter().map(|&a| u128::from(a)).sum::<u128>()
    }
}

/// Validate recipient percentages and return their sum.
pub fn fee_percent(recipients: &[FeeRecipient]) -> Result<f64, RewardError> {
    let mut sum = 0.0;
    for (index, recipient) in recipients.iter().enumerate() {
        let percent = recipient.percent;
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(RewardError::InvalidPercent { index, percent });
        }
        sum += percent;
    }
    if sum > 100.0 {
        return Err(RewardError::PercentOverflow(sum));
    }
    Ok(sum)
}

/// Round half away from zero to whole units, refusing negative results.
pub fn round_amount(value: f64, slot: OutputSlot) -> Result<u64, RewardError> {
    let rounded = value.round();
    if rounded < 0.0 {
        return Err(RewardError::NegativeAmount(slot));
    }
    if rounded > MAX_EXACT_AMOUNT as f64 {
        return Err(RewardError::AmountTooLarge);
    }
    Ok(rounded as u64)
}

/// Whether recipient outputs are emitted at all.
///
/// A list whose first address is empty means "no recipients"; the
/// percentages still come off the pool output.
pub fn recipients_enabled(recipients: &[FeeRecipient]) -> bool {
    recipients
        .first()
        .is_some_and(|first| !first.address.is_empty())
}

/// Split `total` (already net of masternode rewards) and `fee_reward`.
///
/// The pool gets `round(total * (1 - fee% / 100)) + fee_reward`. Each
/// recipient gets `round(total * percent / 100)`; with `burn_fees` the first
/// recipient alone also gives up `fee_reward`. When rounding pushes the sum
/// above `total + fee_reward`, the pool output is reduced by the overshoot.
pub fn allocate(
    total: u64,
    fee_reward: u64,
    recipients: &[FeeRecipient],
    burn_fees: bool,
) -> Result<Allocation, RewardError> {
    if total > MAX_EXACT_AMOUNT || fee_reward > MAX_EXACT_AMOUNT {
        return Err(RewardError::AmountTooLarge);
    }

    let fee_percent = fee_percent(recipients)?;
    let total_f = total as f64;

    let pool = round_amount(total_f * (1.0 - fee_percent / 100.0), OutputSlot::Pool)?
        .checked_add(fee_reward)
        .ok_or(RewardError::AmountTooLarge)?;

    let mut amounts = Vec::new();
    if recipients_enabled(recipients) {
        let mut burn = if burn_fees { fee_reward as f64 } else { 0.0 };
        for (idx, recipient) in recipients.iter().enumerate() {
            let share = total_f * (recipient.percent / 100.0) - burn;
            amounts.push(round_amount(share, OutputSlot::Recipient(idx))?);
            burn = 0.0;
        }
    }

    let mut allocation = Allocation {
        pool,
        recipients: amounts,
    };
    let available = u128::from(total) + u128::from(fee_reward);
    let allocated = allocation.total();
    if allocated > available {
        // Half-unit shares rounded up on both sides; the pool gives the excess back.
        let excess = u64::try_from(allocated - available).ok();
        match excess.and_then(|excess| allocation.pool.checked_sub(excess)) {
            Some(pool) => allocation.pool = pool,
            None => {
                return Err(RewardError::ExceedsReward {
                    allocated,
                    available,
                })
            }
        }
    }

    Ok(allocation)
}

/// Sum the fees of the template's non-coinbase transactions.
pub fn total_template_fees(fees: &[u64]) -> Result<u64, RewardError> {
    fees.iter()
        .try_fold(0u64, |acc, &fee| acc.checked_add(fee))
        .ok_or(RewardError::AmountTooLarge)
}

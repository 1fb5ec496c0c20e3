use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Loyalty tier, declared from highest to lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Tier {
    #[serde(rename = "VIP")]
    Vip,
    Platinum,
    Gold,
    Silver,
    Bronze,
}

impl Tier {
    /// Fixed display order for summaries.
    pub const ORDER: [Tier; 5] = [Tier::Vip, Tier::Platinum, Tier::Gold, Tier::Silver, Tier::Bronze];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Vip => "VIP",
            Self::Platinum => "Platinum",
            Self::Gold => "Gold",
            Self::Silver => "Silver",
            Self::Bronze => "Bronze",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Round to 2 decimal places (banker's rounding) and pin the scale to 2.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(2);
    rounded
}

/// Lifetime spend normalized by tenure, rounded to 2 decimals.
///
/// With no tenure the lifetime amount is the rate.
pub fn amount_per_month(amount_all_time: Decimal, duration_months: u32) -> Decimal {
    if duration_months > 0 {
        round2(amount_all_time / Decimal::from(duration_months))
    } else {
        round2(amount_all_time)
    }
}

/// Assign a tier from tenure and monthly spend. First matching rule wins.
///
/// Rule 1 and the first half of rule 4 compare amount with `>=`; every other
/// amount comparison is strict. Negative amounts are treated as 0.
pub fn classify_tier(duration_months: u32, amount_per_month: Decimal) -> Tier {
    let d = duration_months;
    let a = amount_per_month.max(Decimal::ZERO);

    if d >= 24 && a >= Decimal::from(30) {
        return Tier::Vip;
    }
    if (d >= 12 && a > Decimal::from(120))
        || (d >= 6 && a > Decimal::from(180))
        || (d >= 3 && a > Decimal::from(300))
    {
        return Tier::Platinum;
    }
    if (d >= 6 && a > Decimal::from(80)) || (d >= 3 && a > Decimal::from(120)) {
        return Tier::Gold;
    }
    if (d >= 6 && a >= Decimal::from(60)) || (d >= 3 && a > Decimal::from(80)) {
        return Tier::Silver;
    }
    Tier::Bronze
}

//! The lot ledger and the lowest-cost-first allocator.
//!
//! Lots are kept sorted ascending by rate, so a sale always consumes the
//! cheapest dollars first. Purchases whose rate is within
//! [`Rate::MERGE_TOLERANCE`] of an existing lot are merged into it, which
//! bounds the number of distinct lots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Lot, Money, Rate, ResultEngine, money::round_scaled};

/// One slice of a lot consumed by a sale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockUsed {
    pub rate: Rate,
    pub amount: Money,
}

/// Result of [`LotLedger::allocate`].
///
/// `remainder` is whatever could not be covered by the ledger. The allocator
/// does not check sufficiency; callers reject oversized sales up front.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Allocation {
    pub blocks: Vec<BlockUsed>,
    pub remainder: Money,
}

impl Allocation {
    /// USD covered by the consumed blocks.
    #[must_use]
    pub fn allocated(&self) -> Money {
        self.blocks.iter().map(|b| b.amount).sum()
    }

    /// Acquisition cost of the consumed blocks, rounded to cents.
    #[must_use]
    pub fn cost(&self) -> Money {
        cost_of(&self.blocks)
    }

    /// Realized profit of selling the consumed blocks for `proceeds`.
    ///
    /// The cost is summed unrounded and the difference is rounded once.
    #[must_use]
    pub fn profit_for(&self, proceeds: Money) -> Money {
        profit_of(proceeds, &self.blocks)
    }
}

pub(crate) fn cost_of(blocks: &[BlockUsed]) -> Money {
    let exact: i128 = blocks.iter().map(|b| b.rate.exact(b.amount)).sum();
    round_scaled(exact, i128::from(Rate::SCALE))
}

pub(crate) fn profit_of(proceeds: Money, blocks: &[BlockUsed]) -> Money {
    let exact_cost: i128 = blocks.iter().map(|b| b.rate.exact(b.amount)).sum();
    let exact_proceeds = i128::from(proceeds.cents()) * i128::from(Rate::SCALE);
    round_scaled(exact_proceeds - exact_cost, i128::from(Rate::SCALE))
}

/// All open lots of one account, sorted ascending by rate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotLedger {
    lots: Vec<Lot>,
}

impl LotLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from stored lots, re-applying the coalescing policy.
    pub fn from_lots<I>(lots: I) -> ResultEngine<Self>
    where
        I: IntoIterator<Item = Lot>,
    {
        let mut ledger = Self::new();
        for lot in lots {
            ledger.add_lot(lot.amount, lot.rate, lot.created_at)?;
        }
        Ok(ledger)
    }

    /// Adds purchased dollars.
    ///
    /// Merges into the first lot whose rate is within the merge tolerance
    /// (keeping that lot's rate), otherwise opens a new lot at `rate` rounded
    /// to two decimals. Non-positive amounts are ignored. Fails with
    /// `InvalidAmount`, leaving the ledger untouched, when the total holdings
    /// would no longer fit in [`Money`].
    pub fn add_lot(
        &mut self,
        amount: Money,
        rate: Rate,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        if !amount.is_positive() {
            return Ok(());
        }

        let overflow =
            || EngineError::InvalidAmount(format!("adding {amount} USD overflows the ledger"));
        // The total bounds every single lot, so a merge below cannot overflow.
        self.total_available()
            .checked_add(amount)
            .ok_or_else(overflow)?;

        if let Some(existing) = self.lots.iter_mut().find(|lot| lot.rate.coalesces_with(rate)) {
            existing.amount = existing.amount.checked_add(amount).ok_or_else(overflow)?;
        } else {
            self.lots.push(Lot {
                amount,
                rate: rate.rounded(),
                created_at,
            });
        }

        self.lots.sort_by_key(|lot| lot.rate);
        Ok(())
    }

    /// Consumes lots cheapest first until `amount` is covered or the ledger
    /// runs dry, then prunes exhausted lots (`amount <= 0.01`).
    pub fn allocate(&mut self, amount: Money) -> Allocation {
        let mut blocks = Vec::new();
        let mut remaining = amount;

        for lot in &mut self.lots {
            if !remaining.is_positive() {
                break;
            }
            let used = lot.amount.min(remaining);
            if !used.is_positive() {
                continue;
            }
            blocks.push(BlockUsed {
                rate: lot.rate,
                amount: used,
            });
            lot.amount -= used;
            remaining -= used;
        }

        self.lots.retain(|lot| lot.amount > Money::CENT);
        tracing::debug!(
            requested = %amount,
            blocks = blocks.len(),
            remainder = %remaining.max(Money::ZERO),
            "allocated lots"
        );

        Allocation {
            blocks,
            remainder: remaining.max(Money::ZERO),
        }
    }

    /// Same as [`allocate`](Self::allocate) on a copy, leaving `self` intact.
    #[must_use]
    pub fn preview(&self, amount: Money) -> Allocation {
        self.clone().allocate(amount)
    }

    /// Sum of all open lots.
    #[must_use]
    pub fn total_available(&self) -> Money {
        self.lots.iter().map(|lot| lot.amount).sum()
    }

    /// Weighted average acquisition rate of the open lots.
    #[must_use]
    pub fn average_rate(&self) -> Option<Rate> {
        Rate::weighted_average(self.lots.iter().map(|lot| (lot.amount, lot.rate)))
    }

    /// `true` when both ledgers hold the same amounts at the same rates,
    /// ignoring creation timestamps.
    #[must_use]
    pub fn same_holdings(&self, other: &LotLedger) -> bool {
        self.lots.len() == other.lots.len()
            && self
                .lots
                .iter()
                .zip(&other.lots)
                .all(|(a, b)| a.amount == b.amount && a.rate == b.rate)
    }

    #[must_use]
    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(s: &str) -> Rate {
        s.parse().unwrap()
    }

    fn usd(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn ledger(lots: &[(&str, &str)]) -> LotLedger {
        let mut ledger = LotLedger::new();
        for (amount, r) in lots {
            ledger.add_lot(usd(amount), rate(r), Utc::now()).unwrap();
        }
        ledger
    }

    fn holdings(ledger: &LotLedger) -> Vec<(Money, Rate)> {
        ledger.lots().iter().map(|l| (l.amount, l.rate)).collect()
    }

    #[test]
    fn add_lot_keeps_rate_order() {
        let ledger = ledger(&[("10", "3.80"), ("20", "3.60"), ("30", "3.70")]);
        let rates: Vec<Rate> = ledger.lots().iter().map(|l| l.rate).collect();
        assert_eq!(rates, vec![rate("3.60"), rate("3.70"), rate("3.80")]);
        assert_eq!(ledger.total_available(), usd("60"));
    }

    #[test]
    fn close_rates_merge_at_first_seen_rate() {
        let ledger = ledger(&[("100", "3.70"), ("50", "3.705")]);
        assert_eq!(holdings(&ledger), vec![(usd("150"), rate("3.70"))]);
    }

    #[test]
    fn rates_a_cent_apart_stay_separate() {
        let ledger = ledger(&[("100", "3.70"), ("50", "3.71")]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn new_lot_rate_is_rounded() {
        let ledger = ledger(&[("10", "3.705")]);
        assert_eq!(ledger.lots()[0].rate, rate("3.71"));
    }

    #[test]
    fn non_positive_amounts_are_ignored() {
        let mut ledger = LotLedger::new();
        ledger.add_lot(Money::ZERO, rate("3.70"), Utc::now()).unwrap();
        ledger.add_lot(usd("-5"), rate("3.70"), Utc::now()).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn overflowing_holdings_are_rejected() {
        let mut ledger = LotLedger::new();
        let half = Money::new(i64::MAX / 2 + 1);
        ledger.add_lot(half, rate("3.70"), Utc::now()).unwrap();

        let err = ledger.add_lot(half, rate("3.70"), Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        let err = ledger.add_lot(half, rate("3.90"), Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        assert_eq!(holdings(&ledger), vec![(half, rate("3.70"))]);
    }

    #[test]
    fn allocate_consumes_cheapest_first() {
        let mut ledger = ledger(&[("50", "3.70"), ("50", "3.60")]);
        let allocation = ledger.allocate(usd("70"));

        assert_eq!(
            allocation.blocks,
            vec![
                BlockUsed {
                    rate: rate("3.60"),
                    amount: usd("50"),
                },
                BlockUsed {
                    rate: rate("3.70"),
                    amount: usd("20"),
                },
            ]
        );
        assert_eq!(allocation.remainder, Money::ZERO);
        assert_eq!(allocation.cost(), usd("254"));
        assert_eq!(holdings(&ledger), vec![(usd("30"), rate("3.70"))]);
    }

    #[test]
    fn allocate_leaves_remainder_when_short() {
        let mut ledger = ledger(&[("30", "3.70")]);
        let allocation = ledger.allocate(usd("50"));
        assert_eq!(allocation.allocated(), usd("30"));
        assert_eq!(allocation.remainder, usd("20"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn allocate_prunes_dust_lots() {
        let mut ledger = ledger(&[("10.01", "3.70"), ("5", "3.80")]);
        ledger.allocate(usd("10"));
        // 0.01 left at 3.70 is considered exhausted.
        assert_eq!(holdings(&ledger), vec![(usd("5"), rate("3.80"))]);
    }

    #[test]
    fn allocation_never_exceeds_request_nor_goes_negative() {
        let mut ledger = ledger(&[("12.34", "3.61"), ("7.66", "3.65"), ("100", "3.90")]);
        for request in ["5", "10.5", "0.02", "3.33", "50"] {
            let allocation = ledger.allocate(usd(request));
            assert!(allocation.allocated() <= usd(request));
            assert!(ledger.lots().iter().all(|l| l.amount.is_positive()));
        }
    }

    #[test]
    fn preview_does_not_mutate() {
        let ledger = ledger(&[("50", "3.60")]);
        let allocation = ledger.preview(usd("20"));
        assert_eq!(allocation.allocated(), usd("20"));
        assert_eq!(ledger.total_available(), usd("50"));
    }

    #[test]
    fn profit_is_rounded_once() {
        let allocation = Allocation {
            blocks: vec![
                BlockUsed {
                    rate: rate("3.705"),
                    amount: usd("0.01"),
                },
                BlockUsed {
                    rate: rate("3.705"),
                    amount: usd("0.01"),
                },
            ],
            remainder: Money::ZERO,
        };
        // cost = 0.0741 exactly, proceeds 0.10 -> profit 0.0259 -> 0.03
        assert_eq!(allocation.profit_for(usd("0.10")), usd("0.03"));
        assert_eq!(allocation.cost(), usd("0.07"));
    }

    #[test]
    fn from_lots_recoalesces() {
        let original = ledger(&[("10", "3.60"), ("20", "3.70")]);
        let reloaded = LotLedger::from_lots(original.lots().to_vec()).unwrap();
        assert_eq!(reloaded, original);

        let now = Utc::now();
        let merged = LotLedger::from_lots(vec![
            Lot {
                amount: usd("10"),
                rate: rate("3.70"),
                created_at: now,
            },
            Lot {
                amount: usd("5"),
                rate: rate("3.705"),
                created_at: now,
            },
        ])
        .unwrap();
        assert_eq!(holdings(&merged), vec![(usd("15"), rate("3.70"))]);
    }

    #[test]
    fn average_rate_is_weighted() {
        let ledger = ledger(&[("30", "3.60"), ("10", "3.80")]);
        assert_eq!(ledger.average_rate(), Some(rate("3.65")));
        assert_eq!(LotLedger::new().average_rate(), None);
    }
}

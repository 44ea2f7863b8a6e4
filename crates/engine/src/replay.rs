//! Rebuilds the lot ledger from the operation history.
//!
//! Operations are replayed in chronological order; operations sharing a
//! timestamp keep their input order. Purchases add lots and sales allocate
//! exactly as the live path does, so `Ledger == rebuild(history)` holds after
//! any out-of-band change to the history.

use uuid::Uuid;

use crate::{Allocation, EngineError, LotLedger, Money, Operation, OperationKind, ResultEngine};

/// A sale the ledger could not fully cover while replaying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shortfall {
    pub operation_id: Uuid,
    pub missing: Money,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Replay {
    pub ledger: LotLedger,
    pub shortfalls: Vec<Shortfall>,
}

/// Regenerates the ledger from scratch. Trashed operations are skipped.
pub fn rebuild<'a, I>(operations: I) -> ResultEngine<LotLedger>
where
    I: IntoIterator<Item = &'a Operation>,
{
    Ok(replay(operations)?.ledger)
}

/// Like [`rebuild`], also reporting sales that came up short.
///
/// Only fails when the purchases overflow the ledger.
pub fn replay<'a, I>(operations: I) -> ResultEngine<Replay>
where
    I: IntoIterator<Item = &'a Operation>,
{
    let (replay, _) = run(operations, None)?;
    Ok(replay)
}

/// Replays the history and re-allocates the sale `target` at its
/// chronological position, failing if the ledger cannot cover it there.
pub(crate) fn replay_repricing<'a, I>(
    operations: I,
    target: Uuid,
) -> ResultEngine<(Replay, Option<Allocation>)>
where
    I: IntoIterator<Item = &'a Operation>,
{
    run(operations, Some(target))
}

fn run<'a, I>(operations: I, target: Option<Uuid>) -> ResultEngine<(Replay, Option<Allocation>)>
where
    I: IntoIterator<Item = &'a Operation>,
{
    let mut ordered: Vec<&Operation> = operations
        .into_iter()
        .filter(|op| !op.is_trashed())
        .collect();
    // `sort_by_key` is stable: same-timestamp operations keep input order.
    ordered.sort_by_key(|op| op.date);

    let mut replay = Replay::default();
    let mut repriced = None;

    for op in ordered {
        match op.kind {
            OperationKind::Purchase => replay.ledger.add_lot(op.usd, op.rate, op.date)?,
            OperationKind::Sale => {
                if Some(op.id) == target {
                    let available = replay.ledger.total_available();
                    if available < op.usd {
                        return Err(EngineError::InsufficientFunds(format!(
                            "only {available} USD available at {}, sale needs {}",
                            op.date, op.usd
                        )));
                    }
                    repriced = Some(replay.ledger.allocate(op.usd));
                    continue;
                }

                let allocation = replay.ledger.allocate(op.usd);
                if allocation.remainder.is_positive() {
                    replay.shortfalls.push(Shortfall {
                        operation_id: op.id,
                        missing: allocation.remainder,
                    });
                }
            }
        }
    }

    Ok((replay, repriced))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::{Allocation, Rate};

    fn rate(s: &str) -> Rate {
        s.parse().unwrap()
    }

    fn usd(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn buy(minutes: i64, amount: &str, r: &str) -> Operation {
        Operation::purchase("desk", at(minutes), usd(amount), rate(r))
    }

    fn sell(minutes: i64, amount: &str, r: &str) -> Operation {
        Operation::sale("desk", at(minutes), usd(amount), rate(r), Allocation::default())
    }

    fn holdings(ledger: &LotLedger) -> Vec<(Money, Rate)> {
        ledger.lots().iter().map(|l| (l.amount, l.rate)).collect()
    }

    #[test]
    fn replays_in_date_order_regardless_of_input_order() {
        let history = vec![
            sell(30, "70", "3.80"),
            buy(10, "50", "3.70"),
            buy(0, "50", "3.60"),
        ];
        let ledger = rebuild(&history).unwrap();
        assert_eq!(holdings(&ledger), vec![(usd("30"), rate("3.70"))]);
    }

    #[test]
    fn total_matches_purchases_minus_sales() {
        let history = vec![
            buy(0, "100", "3.70"),
            buy(1, "40", "3.72"),
            sell(2, "60", "3.75"),
            buy(3, "25.50", "3.65"),
            sell(4, "30.25", "3.78"),
        ];
        let ledger = rebuild(&history).unwrap();
        assert_eq!(
            ledger.total_available(),
            usd("100") + usd("40") + usd("25.50") - usd("60") - usd("30.25")
        );
    }

    #[test]
    fn rebuild_is_idempotent_and_deterministic() {
        let history = vec![
            buy(0, "100", "3.70"),
            buy(0, "10", "3.705"),
            sell(1, "45", "3.75"),
            buy(2, "20", "3.62"),
        ];
        let first = rebuild(&history).unwrap();
        let second = rebuild(&history).unwrap();
        assert_eq!(first, second);
        assert_eq!(LotLedger::from_lots(first.lots().to_vec()).unwrap(), first);
    }

    #[test]
    fn same_timestamp_keeps_input_order() {
        // A sale recorded before its purchase at the same instant comes up short.
        let history = vec![sell(0, "10", "3.75"), buy(0, "10", "3.70")];
        let replay = replay(&history).unwrap();
        assert_eq!(replay.shortfalls.len(), 1);
        assert_eq!(replay.shortfalls[0].missing, usd("10"));
        assert_eq!(replay.ledger.total_available(), usd("10"));

        let history = vec![buy(0, "10", "3.70"), sell(0, "10", "3.75")];
        assert!(rebuild(&history).unwrap().is_empty());
    }

    #[test]
    fn trashed_operations_are_skipped() {
        let mut purchase = buy(0, "10", "3.70");
        purchase.deleted_at = Some(at(5));
        assert!(rebuild([&purchase]).unwrap().is_empty());
    }

    #[test]
    fn repricing_fails_without_touching_anything_when_short() {
        let history = vec![buy(0, "10", "3.70"), sell(1, "20", "3.75")];
        let err = replay_repricing(&history, history[1].id).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds(_)));
    }

    #[test]
    fn repricing_returns_allocation_at_position() {
        let history = vec![
            buy(0, "50", "3.60"),
            sell(1, "30", "3.75"),
            buy(2, "50", "3.50"),
        ];
        let (replay, allocation) = replay_repricing(&history, history[1].id).unwrap();
        let allocation = allocation.unwrap();
        // The 3.50 lot did not exist yet when the sale happened.
        assert_eq!(allocation.blocks.len(), 1);
        assert_eq!(allocation.blocks[0].rate, rate("3.60"));
        assert_eq!(replay.ledger.total_available(), usd("70"));
    }
}

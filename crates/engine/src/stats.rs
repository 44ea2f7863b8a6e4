//! History filtering and desk statistics.
//!
//! All calendar arithmetic happens in the caller's time zone: a sale at
//! 23:30 in Lima belongs to that day even though it is the next day in UTC.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{Money, Operation, OperationKind, commands::Period};

impl Period {
    /// Whether `date` falls inside this period as seen from `now`.
    ///
    /// Periods are open-ended towards the future: `Week` matches anything
    /// from Monday of the current week onwards.
    pub fn contains<Tz: TimeZone>(&self, date: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
        let day = date.with_timezone(&now.timezone()).date_naive();
        let today = now.date_naive();
        match self {
            Self::All => true,
            Self::Day => day == today,
            Self::Week => day >= week_start(today),
            Self::Month => day >= today.with_day(1).unwrap_or(today),
            Self::Year => day >= today.with_ordinal(1).unwrap_or(today),
            Self::On(on) => day == *on,
        }
    }
}

fn week_start(day: NaiveDate) -> NaiveDate {
    day - chrono::Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub profit_today: Money,
    pub profit_week: Money,
    pub profit_month: Money,
    /// Sum of positive sale profits. Losses are not netted.
    pub total_profit: Money,
    pub purchases: u64,
    pub sales: u64,
    pub operations: u64,
    /// `total_profit / sales`, rounded to cents.
    pub average_profit: Money,
    /// Positive sale profit per weekday, Monday first.
    pub profit_by_weekday: [Money; 7],
    pub dollars_available: Money,
}

impl Statistics {
    /// Aggregates the live history as seen from `now`.
    pub fn compute<'a, I, Tz>(operations: I, dollars_available: Money, now: &DateTime<Tz>) -> Self
    where
        I: IntoIterator<Item = &'a Operation>,
        Tz: TimeZone,
    {
        let mut stats = Self {
            dollars_available,
            ..Self::default()
        };

        for op in operations.into_iter().filter(|op| !op.is_trashed()) {
            stats.operations += 1;
            match op.kind {
                OperationKind::Purchase => stats.purchases += 1,
                OperationKind::Sale => stats.sales += 1,
            }
            if op.kind != OperationKind::Sale || !op.profit.is_positive() {
                continue;
            }

            stats.total_profit += op.profit;
            if Period::Day.contains(op.date, now) {
                stats.profit_today += op.profit;
            }
            if Period::Week.contains(op.date, now) {
                stats.profit_week += op.profit;
            }
            if Period::Month.contains(op.date, now) {
                stats.profit_month += op.profit;
            }
            let weekday = op
                .date
                .with_timezone(&now.timezone())
                .weekday()
                .num_days_from_monday() as usize;
            stats.profit_by_weekday[weekday] += op.profit;
        }

        if stats.sales > 0 {
            let average = crate::money::div_round(
                i128::from(stats.total_profit.cents()),
                i128::from(stats.sales),
            );
            stats.average_profit = Money::new(average as i64);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono_tz::America::Lima;

    use super::*;
    use crate::{Allocation, BlockUsed, Rate};

    fn usd(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn lima(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Lima.with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn sale(date: DateTime<Utc>, amount: &str, sell: &str, bought: &str) -> Operation {
        let allocation = Allocation {
            blocks: vec![BlockUsed {
                rate: bought.parse().unwrap(),
                amount: usd(amount),
            }],
            remainder: Money::ZERO,
        };
        Operation::sale("desk", date, usd(amount), sell.parse().unwrap(), allocation)
    }

    fn purchase(date: DateTime<Utc>) -> Operation {
        Operation::purchase("desk", date, usd("100"), Rate::from_cents(370))
    }

    #[test]
    fn periods_use_local_calendar() {
        // Wednesday 2026-03-04, 10:00 in Lima.
        let now = Lima.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap();

        // 23:00 Lima on Tuesday is already Wednesday in UTC.
        let late_tuesday = lima(2026, 3, 3, 23);
        assert!(!Period::Day.contains(late_tuesday, &now));
        assert!(Period::Week.contains(late_tuesday, &now));

        let last_sunday = lima(2026, 3, 1, 12);
        assert!(!Period::Week.contains(last_sunday, &now));
        assert!(Period::Month.contains(last_sunday, &now));

        let february = lima(2026, 2, 27, 12);
        assert!(!Period::Month.contains(february, &now));
        assert!(Period::Year.contains(february, &now));
        assert!(!Period::Year.contains(lima(2025, 12, 31, 12), &now));

        let on = Period::On(NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
        assert!(on.contains(late_tuesday, &now));
        assert!(Period::All.contains(lima(2001, 1, 1, 0), &now));
    }

    #[test]
    fn statistics_only_count_positive_sale_profit() {
        let now = Lima.with_ymd_and_hms(2026, 3, 4, 18, 0, 0).unwrap();
        let mut trashed = sale(lima(2026, 3, 4, 9), "10", "3.80", "3.60");
        trashed.deleted_at = Some(Utc::now());
        let history = vec![
            purchase(lima(2026, 2, 20, 9)),
            // +8.00 on Wednesday (today)
            sale(lima(2026, 3, 4, 9), "40", "3.80", "3.60"),
            // +4.00 on Monday (this week)
            sale(lima(2026, 3, 2, 9), "40", "3.75", "3.65"),
            // -2.00 loss, ignored
            sale(lima(2026, 3, 3, 9), "20", "3.60", "3.70"),
            // +3.00 on Sunday (last week, this month)
            sale(lima(2026, 3, 1, 9), "30", "3.80", "3.70"),
            trashed,
        ];

        let stats = Statistics::compute(&history, usd("50"), &now);
        assert_eq!(stats.profit_today, usd("8"));
        assert_eq!(stats.profit_week, usd("12"));
        assert_eq!(stats.profit_month, usd("15"));
        assert_eq!(stats.total_profit, usd("15"));
        assert_eq!(stats.purchases, 1);
        assert_eq!(stats.sales, 4);
        assert_eq!(stats.operations, 5);
        assert_eq!(stats.average_profit, usd("3.75"));
        assert_eq!(stats.profit_by_weekday[0], usd("4"));
        assert_eq!(stats.profit_by_weekday[1], Money::ZERO);
        assert_eq!(stats.profit_by_weekday[2], usd("8"));
        assert_eq!(stats.profit_by_weekday[6], usd("3"));
        assert_eq!(stats.dollars_available, usd("50"));
    }

    #[test]
    fn empty_history_has_zero_average() {
        let history: Vec<Operation> = Vec::new();
        let stats = Statistics::compute(&history, Money::ZERO, &Utc::now());
        assert_eq!(stats, Statistics::default());
    }
}

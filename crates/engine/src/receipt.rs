//! Fixed-width text receipt for a single operation.

use std::fmt;

use chrono::{DateTime, TimeZone};

use crate::{Currency, Operation};

/// Receipt width in columns.
pub const RECEIPT_WIDTH: usize = 35;

pub struct Receipt<'a, Tz: TimeZone> {
    operation: &'a Operation,
    date: DateTime<Tz>,
}

impl<'a, Tz: TimeZone> Receipt<'a, Tz> {
    /// Renders `operation` with its date shown in `tz`.
    pub fn new(operation: &'a Operation, tz: &Tz) -> Self {
        Self {
            operation,
            date: operation.date.with_timezone(tz),
        }
    }
}

impl<Tz> fmt::Display for Receipt<'_, Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let double = "=".repeat(RECEIPT_WIDTH);
        let single = "-".repeat(RECEIPT_WIDTH);
        let op = self.operation;

        writeln!(f, "{double}")?;
        writeln!(f, "{:^RECEIPT_WIDTH$}", "CURRENCY EXCHANGE RECEIPT")?;
        writeln!(f, "{double}")?;
        writeln!(f, "Date: {}", self.date.format("%d/%m/%Y %H:%M:%S"))?;
        writeln!(f, "{single}")?;
        writeln!(f, "Operation: {}", op.kind.label())?;
        writeln!(f, "Amount: {}", Currency::Usd.format(op.usd))?;
        writeln!(f, "Rate: {}", Currency::Pen.format_rate(op.rate))?;
        writeln!(f, "{single}")?;
        writeln!(f, "TOTAL: {}", Currency::Pen.format(op.pen))?;
        writeln!(f, "{double}")?;
        writeln!(f, "{:^RECEIPT_WIDTH$}", "Thank you for your business")?;
        write!(f, "{double}")
    }
}

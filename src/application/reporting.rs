use serde::Serialize;

use crate::domain::{Cents, DateRange, Entry, LedgerSnapshot, compute, signed_amount};

/// One statement row: the entry plus the balance after applying it.
#[derive(Debug, Clone, Serialize)]
pub struct StatementLine {
    pub entry: Entry,
    pub running_balance: Cents,
}

/// A bank-style statement for one book over a date window: entries in
/// chronological order, each with a running balance, closed by the
/// window's totals.
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub book_name: String,
    pub range: DateRange,
    pub lines: Vec<StatementLine>,
    pub totals: LedgerSnapshot,
}

/// Order entries chronologically (date, time, recorded-at as the tie
/// breaker) and fold the running balance with the same integer-cents
/// arithmetic the aggregation uses.
pub fn build_statement(book_name: String, range: DateRange, mut entries: Vec<Entry>) -> Statement {
    entries.sort_by(|a, b| {
        (a.date, a.time, a.created_at).cmp(&(b.date, b.time, b.created_at))
    });

    let totals = compute(&entries);

    let mut running: Cents = 0;
    let lines = entries
        .into_iter()
        .map(|entry| {
            running += signed_amount(&entry);
            StatementLine {
                entry,
                running_balance: running,
            }
        })
        .collect();

    Statement {
        book_name,
        range,
        lines,
        totals,
    }
}

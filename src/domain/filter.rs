use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Entry, EntryType, format_cents};

/// Inclusive calendar window. Open ends mean unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn between(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// The duration picker options from the book view, resolved against a
/// reference day so range math stays testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationPreset {
    AllTime,
    Today,
    Yesterday,
    ThisMonth,
    LastMonth,
}

impl DurationPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationPreset::AllTime => "all-time",
            DurationPreset::Today => "today",
            DurationPreset::Yesterday => "yesterday",
            DurationPreset::ThisMonth => "this-month",
            DurationPreset::LastMonth => "last-month",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" | "all-time" => Some(DurationPreset::AllTime),
            "today" => Some(DurationPreset::Today),
            "yesterday" => Some(DurationPreset::Yesterday),
            "this-month" | "month" => Some(DurationPreset::ThisMonth),
            "last-month" => Some(DurationPreset::LastMonth),
            _ => None,
        }
    }

    pub fn range(&self, today: NaiveDate) -> DateRange {
        match self {
            DurationPreset::AllTime => DateRange::all_time(),
            DurationPreset::Today => DateRange::between(Some(today), Some(today)),
            DurationPreset::Yesterday => {
                let day = today - Duration::days(1);
                DateRange::between(Some(day), Some(day))
            }
            DurationPreset::ThisMonth => {
                let first = first_of_month(today);
                DateRange::between(Some(first), Some(last_of_month(today)))
            }
            DurationPreset::LastMonth => {
                // Last day of the previous month is the day before this
                // month's first
                let last = first_of_month(today) - Duration::days(1);
                DateRange::between(Some(first_of_month(last)), Some(last))
            }
        }
    }
}

impl std::fmt::Display for DurationPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_of_month(date: NaiveDate) -> NaiveDate {
    let next_month_first = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    match next_month_first {
        Some(first) => first - Duration::days(1),
        None => date,
    }
}

/// Client-side predicates over a book's entries. All set fields must
/// match. Text fields compare case-insensitively; `search` matches the
/// remarks or the formatted amount, like the book view's search box.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub entry_type: Option<EntryType>,
    pub range: DateRange,
    pub category: Option<String>,
    pub payment_mode: Option<String>,
    pub contact: Option<String>,
    pub search: Option<String>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(entry_type) = self.entry_type {
            if entry.entry_type != entry_type {
                return false;
            }
        }
        if !self.range.contains(entry.date) {
            return false;
        }
        if !field_matches(&self.category, &entry.category) {
            return false;
        }
        if !field_matches(&self.payment_mode, &entry.payment_mode) {
            return false;
        }
        if !field_matches(&self.contact, &entry.contact) {
            return false;
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let in_remarks = entry
                .remarks
                .as_deref()
                .is_some_and(|r| r.to_lowercase().contains(&needle));
            let in_amount = format_cents(entry.amount_cents).contains(&needle);
            if !in_remarks && !in_amount {
                return false;
            }
        }
        true
    }

    pub fn filter<'a>(&self, entries: &'a [Entry]) -> Vec<&'a Entry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }
}

fn field_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => actual
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case(wanted)),
    }
}

use super::types::normalize_operator;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOperator {
    Is,
    IsNot,
    IsBefore,
    IsOnOrAfter,
    IsAfter,
    IsOnOrBefore,
    IsBetween,
    IsNotBetween,
}

impl DateOperator {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_operator(raw).as_str() {
            "is" | "equals" => Some(Self::Is),
            "is_not" | "not_equals" => Some(Self::IsNot),
            "is_before" | "before" => Some(Self::IsBefore),
            "is_on_or_after" | "on_or_after" => Some(Self::IsOnOrAfter),
            "is_after" | "after" => Some(Self::IsAfter),
            "is_on_or_before" | "on_or_before" => Some(Self::IsOnOrBefore),
            "is_between" | "between" => Some(Self::IsBetween),
            "is_not_between" | "not_between" => Some(Self::IsNotBetween),
            _ => None,
        }
    }

    fn needs_end(&self) -> bool {
        matches!(self, Self::IsBetween | Self::IsNotBetween)
    }
}

/// What to do with a record whose date is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullDates {
    #[default]
    Include,
    Exclude,
}

/// Date predicate with the default null policy (records without a date pass).
pub fn evaluate_date_filter(
    record_date: Option<DateTime<Utc>>,
    range_start: Option<DateTime<Utc>>,
    range_end: Option<DateTime<Utc>>,
    operator: DateOperator,
) -> bool {
    evaluate_date_filter_with(record_date, range_start, range_end, operator, NullDates::Include)
}

/// Date predicate over a record date and the operand bounds.
///
/// Single-operand operators read `range_start`. A missing required bound
/// makes the filter inapplicable and the record passes, whatever its date.
/// Only `is`/`is_not` compare calendar days; the rest compare timestamps.
pub fn evaluate_date_filter_with(
    record_date: Option<DateTime<Utc>>,
    range_start: Option<DateTime<Utc>>,
    range_end: Option<DateTime<Utc>>,
    operator: DateOperator,
    null_dates: NullDates,
) -> bool {
    let Some(start) = range_start else {
        return true;
    };
    if operator.needs_end() && range_end.is_none() {
        return true;
    }
    let Some(date) = record_date else {
        return null_dates == NullDates::Include;
    };

    match operator {
        DateOperator::Is => date.date_naive() == start.date_naive(),
        DateOperator::IsNot => date.date_naive() != start.date_naive(),
        DateOperator::IsBefore => date < start,
        DateOperator::IsOnOrAfter => date >= start,
        DateOperator::IsAfter => date > start,
        DateOperator::IsOnOrBefore => date <= start,
        DateOperator::IsBetween => range_end.is_some_and(|end| start <= date && date <= end),
        DateOperator::IsNotBetween => range_end.is_some_and(|end| date < start || date > end),
    }
}

/// Parses an operand as RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC) or
/// `YYYY-MM-DD` (midnight UTC). Anything else is treated as no bound.
pub fn parse_date_operand(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

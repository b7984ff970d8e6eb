//! Date parsing, validation, and formatting.
//!
//! Stored records always carry a normalized `NaiveDate`; shape
//! detection happens exactly once, at the input boundary. Three textual
//! shapes are accepted: ISO-with-time, `YYYY-MM-DD`, and `DD-MM-YYYY`.
//! Anything else is unparseable, never a panic.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::config::DateConfig;
use crate::error::{Error, Result};

/// Gregorian leap year rule
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in a month, accounting for leap years
pub fn days_in_month(month: u32, year: i32) -> u32 {
    match month {
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Detect the textual shape and normalize to a calendar date.
///
/// Returns `None` for ambiguous or malformed input; a failed parse can
/// never be assumed overdue or not, so callers exclude such values from
/// date comparisons instead of guessing.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    // ISO with time component
    if trimmed.contains('T') {
        if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(datetime.date_naive());
        }
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(datetime.date());
        }
        return None;
    }

    let parts: Vec<&str> = trimmed.split('-').collect();
    if parts.len() != 3 || !parts.iter().all(|part| part.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    // YYYY-MM-DD
    if parts[0].len() == 4 && parts[1].len() == 2 && parts[2].len() == 2 {
        let year: i32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let day: u32 = parts[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    // DD-MM-YYYY
    if parts[0].len() == 2 && parts[1].len() == 2 && parts[2].len() == 4 {
        let day: u32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let year: i32 = parts[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Parse strict `DD-MM-YYYY` form input with field-level messages.
pub fn parse_dmy(input: &str, config: &DateConfig) -> Result<NaiveDate> {
    let trimmed = input.trim();
    let parts: Vec<&str> = trimmed.split('-').collect();
    let well_formed = parts.len() == 3
        && parts[0].len() == 2
        && parts[1].len() == 2
        && parts[2].len() == 4
        && parts
            .iter()
            .all(|part| part.bytes().all(|b| b.is_ascii_digit()));
    if !well_formed {
        return Err(Error::Validation(format!(
            "invalid date '{trimmed}': expected DD-MM-YYYY"
        )));
    }

    let day: u32 = parts[0]
        .parse()
        .map_err(|_| Error::Validation(format!("invalid day in '{trimmed}'")))?;
    let month: u32 = parts[1]
        .parse()
        .map_err(|_| Error::Validation(format!("invalid month in '{trimmed}'")))?;
    let year: i32 = parts[2]
        .parse()
        .map_err(|_| Error::Validation(format!("invalid year in '{trimmed}'")))?;

    if !(1..=12).contains(&month) {
        return Err(Error::Validation(format!(
            "month must be between 1 and 12, got {month}"
        )));
    }
    if year < config.min_year || year > config.max_year {
        return Err(Error::Validation(format!(
            "year must be between {} and {}, got {year}",
            config.min_year, config.max_year
        )));
    }
    let max_days = days_in_month(month, year);
    if day < 1 || day > max_days {
        return Err(Error::Validation(format!(
            "month {month} only has {max_days} days, got day {day}"
        )));
    }

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::Validation(format!("invalid date '{trimmed}'")))
}

/// Parse boundary input in any accepted shape and check the year
/// window.
///
/// Falls back to the strict `DD-MM-YYYY` parser when shape detection
/// fails, so form-style input still gets field-level messages.
pub fn parse_input(input: &str, config: &DateConfig) -> Result<NaiveDate> {
    if let Some(date) = parse_date(input) {
        let year = date.year();
        if year < config.min_year || year > config.max_year {
            return Err(Error::Validation(format!(
                "year must be between {} and {}, got {year}",
                config.min_year, config.max_year
            )));
        }
        return Ok(date);
    }
    parse_dmy(input, config)
}

/// Check a task due date against its project window.
///
/// The due date must fall strictly after `today` and no later than the
/// project end date (equal to the end date is accepted).
pub fn validate_due_date(due: NaiveDate, today: NaiveDate, project_end: NaiveDate) -> Result<()> {
    if due <= today {
        return Err(Error::Validation(format!(
            "due date {} must be after today ({})",
            format_dmy(due),
            format_dmy(today)
        )));
    }
    if due > project_end {
        return Err(Error::Validation(format!(
            "due date {} is past the project end date ({})",
            format_dmy(due),
            format_dmy(project_end)
        )));
    }
    Ok(())
}

/// Format a date as `DD-MM-YYYY`
pub fn format_dmy(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

//! Lenient date parsing for source responses.
//!
//! Every source formats its dates differently and some of them format dates loosely. A bad date
//! must never abort a batch or drop a paper, so the parsers here always produce a value: either
//! the parsed date, or the caller-supplied `now` with [`DateParse::fell_back`] set. Fetchers log
//! the fallback case so it is never silent.
//!
//! All values are truncated to whole seconds, the resolution of the persisted snapshot.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use scipaper::dates::parse_pubmed_date;
//!
//! let now = Utc.with_ymd_and_hms(2025, 11, 20, 12, 0, 0).unwrap();
//!
//! let parsed = parse_pubmed_date(Some("2025 Nov 6"), now);
//! assert_eq!(parsed.value, Utc.with_ymd_and_hms(2025, 11, 6, 0, 0, 0).unwrap());
//! assert!(!parsed.fell_back);
//!
//! let parsed = parse_pubmed_date(Some("Winter 2025"), now);
//! assert_eq!(parsed.value, now);
//! assert!(parsed.fell_back);
//! ```

use chrono::{NaiveDateTime, SubsecRound, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;

use super::*;

/// The outcome of a lenient date parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParse {
  /// The parsed date, or the fallback value
  pub value:     DateTime<Utc>,
  /// `true` when the input could not be parsed and `value` is the fallback
  pub fell_back: bool,
}

impl DateParse {
  /// A successfully parsed date.
  fn parsed(value: DateTime<Utc>) -> Self { Self { value: value.trunc_subsecs(0), fell_back: false } }

  /// The fallback value for an absent or unparsable date.
  pub(crate) fn fallback(now: DateTime<Utc>) -> Self {
    Self { value: now.trunc_subsecs(0), fell_back: true }
  }

  /// Parses with `parse`, falling back to `now` when the input is absent or rejected.
  fn or_now(
    raw: Option<&str>,
    now: DateTime<Utc>,
    parse: impl FnOnce(&str) -> Option<DateTime<Utc>>,
  ) -> Self {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()).and_then(parse) {
      Some(value) => Self::parsed(value),
      None => Self::fallback(now),
    }
  }
}

/// Midnight UTC on the given calendar date.
fn midnight(date: NaiveDate) -> DateTime<Utc> { date.and_time(chrono::NaiveTime::MIN).and_utc() }

/// Parses an Atom feed timestamp (arXiv `published`/`updated`).
///
/// A well-formed RFC 3339 value is used as is. Otherwise a trailing numeric offset (`+01:00`,
/// `-0500`) or `Z` is stripped and the remainder is read as an ISO-8601 date-time or date,
/// taken as UTC.
pub fn parse_atom_date(raw: Option<&str>, now: DateTime<Utc>) -> DateParse {
  lazy_static! {
    static ref TRAILING_OFFSET: Regex = Regex::new(r"(?:[+-]\d{2}:?\d{2}|Z)$").unwrap();
  }

  DateParse::or_now(raw, now, |raw| {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
      return Some(dt.with_timezone(&Utc));
    }
    let stripped = TRAILING_OFFSET.replace(raw, "");
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
      .iter()
      .find_map(|fmt| NaiveDateTime::parse_from_str(&stripped, fmt).ok())
      .map(|naive| naive.and_utc())
      .or_else(|| NaiveDate::parse_from_str(&stripped, "%Y-%m-%d").ok().map(midnight))
  })
}

/// Parses a bioRxiv/medRxiv `YYYY-MM-DD` date.
pub fn parse_rxiv_date(raw: Option<&str>, now: DateTime<Utc>) -> DateParse {
  DateParse::or_now(raw, now, |raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(midnight))
}

/// Parses a PubMed ESummary `pubdate`.
///
/// The field is loosely formatted (`"2025 Nov 6"`, `"2025 Nov"`, `"2025"`). The formats tried,
/// in order, are `%Y %b %d`, `%Y %b`, `%Y` and finally `%Y-%m-%d`; missing month or day
/// components default to the first.
pub fn parse_pubmed_date(raw: Option<&str>, now: DateTime<Utc>) -> DateParse {
  DateParse::or_now(raw, now, |raw| {
    NaiveDate::parse_from_str(raw, "%Y %b %d")
      .or_else(|_| NaiveDate::parse_from_str(&format!("{raw} 1"), "%Y %b %d"))
      .ok()
      .or_else(|| parse_year(raw))
      .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
      .map(midnight)
  })
}

/// January 1st of a bare four-digit year.
fn parse_year(raw: &str) -> Option<NaiveDate> {
  if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  NaiveDate::from_ymd_opt(raw.parse().ok()?, 1, 1)
}

/// Converts Crossref `date-parts` (`[[year, month?, day?]]`) into a date.
///
/// Missing month and day default to 1. Returns `None` when the year is missing or the parts
/// don't form a valid calendar date.
pub fn parse_date_parts(parts: &[Vec<Option<i64>>]) -> Option<DateTime<Utc>> {
  let first = parts.first()?;
  let year = (*first.first()?)?;
  let month = first.get(1).copied().flatten().unwrap_or(1);
  let day = first.get(2).copied().flatten().unwrap_or(1);
  trace!("Date parts: year {year}, month {month}, day {day}");

  Utc
    .with_ymd_and_hms(
      i32::try_from(year).ok()?,
      u32::try_from(month).ok()?,
      u32::try_from(day).ok()?,
      0,
      0,
      0,
    )
    .single()
}

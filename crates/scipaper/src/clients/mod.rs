//! Client implementations for harvesting papers from the supported sources.
//!
//! Each submodule turns one source's query and response shape into [`Paper`]s:
//! - Building the source-specific query from a [`FetchQuery`]
//! - Making the API requests
//! - Normalizing responses, recovering from per-item parse problems
//!
//! # Supported Sources
//!
//! - [`arxiv`] - arXiv Atom search API
//! - [`rxiv`] - bioRxiv and medRxiv details API
//! - [`pubmed`] - NCBI E-utilities (ESearch + ESummary)
//! - [`chemrxiv`] - ChemRxiv works, found through Crossref by DOI prefix
//!
//! Transport failures (connection errors, timeouts, non-success status codes) are returned to
//! the caller as [`ScipaperError::Network`] and never retried.
//!
//! # Examples
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use scipaper::clients::{ArxivClient, FetchQuery, RxivClient, RxivServer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let today = Utc::now().date_naive();
//! let query = FetchQuery {
//!   keywords:    vec!["aging".to_string()],
//!   categories:  vec!["q-bio.GN".to_string()],
//!   start_date:  today - Duration::days(7),
//!   end_date:    today,
//!   max_results: 50,
//! };
//!
//! let from_arxiv = ArxivClient::new()?.fetch(&query).await?;
//! let from_biorxiv = RxivClient::new(RxivServer::BioRxiv)?.fetch(&query).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use quick_xml::de::from_str;

pub mod arxiv;
pub mod chemrxiv;
pub mod pubmed;
pub mod rxiv;

pub use arxiv::ArxivClient;
pub use chemrxiv::ChemRxivClient;
pub use pubmed::PubMedClient;
pub use rxiv::{RxivClient, RxivServer};

use super::*;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("scipaper/", env!("CARGO_PKG_VERSION"));

/// Timeout used when a client is built without an explicit one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What to harvest: the common input of every fetcher.
///
/// Not every source uses every field: arXiv has no server-side date filter (callers filter on
/// `published` afterwards), bioRxiv/medRxiv ignore keywords, and only arXiv uses categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchQuery {
  /// Keywords to search for
  pub keywords:    Vec<String>,
  /// Source taxonomy categories to restrict to
  pub categories:  Vec<String>,
  /// First day of the date window
  pub start_date:  NaiveDate,
  /// Last day of the date window
  pub end_date:    NaiveDate,
  /// Result cap
  pub max_results: usize,
}

impl FetchQuery {
  /// Keywords with surrounding whitespace removed and blanks dropped.
  pub fn terms(&self) -> impl Iterator<Item = &str> {
    self.keywords.iter().map(|keyword| keyword.trim()).filter(|keyword| !keyword.is_empty())
  }

  /// `start_date` as `YYYY-MM-DD`.
  pub fn start(&self) -> String { self.start_date.format("%Y-%m-%d").to_string() }

  /// `end_date` as `YYYY-MM-DD`.
  pub fn end(&self) -> String { self.end_date.format("%Y-%m-%d").to_string() }
}

/// Builds the HTTP client every source client uses.
fn http_client(timeout: Duration) -> Result<reqwest::Client, ScipaperError> {
  Ok(reqwest::Client::builder().user_agent(USER_AGENT).timeout(timeout).build()?)
}

/// Decodes a JSON field, falling back to `T::default()` when it is null or of the wrong type.
///
/// Use with `#[serde(default, deserialize_with = "lenient")]` so that one odd field costs only
/// that field and not the whole record.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: serde::Deserializer<'de>,
  T: serde::de::DeserializeOwned + Default, {
  let value = serde_json::Value::deserialize(deserializer)?;
  Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decodes a JSON list element by element, dropping elements that don't decode.
///
/// Anything but an array yields an empty list.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
  D: serde::Deserializer<'de>,
  T: serde::de::DeserializeOwned, {
  match serde_json::Value::deserialize(deserializer)? {
    serde_json::Value::Array(items) =>
      Ok(items.into_iter().filter_map(|item| serde_json::from_value(item).ok()).collect()),
    _ => Ok(Vec::new()),
  }
}

/// Wraps a search term in double quotes when it contains anything but ASCII letters and digits.
fn quote_term(term: &str) -> String {
  if term.chars().all(|c| c.is_ascii_alphanumeric()) {
    term.to_string()
  } else {
    format!("\"{term}\"")
  }
}

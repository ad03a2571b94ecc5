//! The canonical paper record and its source enumeration.
//!
//! Every fetcher in [`crate::clients`] normalizes its source's response into a [`Paper`], and
//! every later stage (matching, deduplication, persistence) works on this one shape only.
//!
//! # Serialized form
//!
//! A paper serializes to a flat JSON object. Timestamps use a fixed UTC format with a literal
//! trailing `Z` and whole-second resolution (`2025-01-02T03:04:05Z`). Optional fields are
//! written as `null` rather than omitted.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use scipaper::paper::{Paper, Source};
//!
//! let paper = Paper {
//!   id:               "PMID:111".to_string(),
//!   title:            "Aging clocks in mice".to_string(),
//!   authors:          vec!["Doe J".to_string()],
//!   summary:          String::new(),
//!   published:        Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
//!   updated:          None,
//!   link:             "https://pubmed.ncbi.nlm.nih.gov/111/".to_string(),
//!   categories:       Vec::new(),
//!   source:           Source::PubMed,
//!   doi:              None,
//!   primary_category: None,
//!   matched_keywords: None,
//! };
//!
//! let json = serde_json::to_value(&paper).unwrap();
//! assert_eq!(json["published"], "2025-01-02T00:00:00Z");
//! assert_eq!(json["source"], "PubMed");
//! ```

use super::*;

/// Timestamp format used for every persisted date.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The repository or index a paper was harvested from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Source {
  /// Preprints from arxiv.org
  #[serde(rename = "arXiv")]
  Arxiv,
  /// Life-science preprints from biorxiv.org
  #[serde(rename = "bioRxiv")]
  BioRxiv,
  /// Health-science preprints from medrxiv.org
  #[serde(rename = "medRxiv")]
  MedRxiv,
  /// Indexed literature from NCBI PubMed
  #[serde(rename = "PubMed")]
  PubMed,
  /// Chemistry preprints, harvested through Crossref by DOI prefix
  #[serde(rename = "ChemRxiv")]
  ChemRxiv,
}

impl Source {
  /// All sources, in the fixed order the pipeline harvests them.
  pub const ALL: [Source; 5] =
    [Source::Arxiv, Source::BioRxiv, Source::MedRxiv, Source::PubMed, Source::ChemRxiv];
}

impl Default for Source {
  fn default() -> Self { Source::Arxiv }
}

impl std::fmt::Display for Source {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Source::Arxiv => write!(f, "arXiv"),
      Source::BioRxiv => write!(f, "bioRxiv"),
      Source::MedRxiv => write!(f, "medRxiv"),
      Source::PubMed => write!(f, "PubMed"),
      Source::ChemRxiv => write!(f, "ChemRxiv"),
    }
  }
}

impl FromStr for Source {
  type Err = ScipaperError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match &s.trim().to_lowercase() as &str {
      "arxiv" => Ok(Source::Arxiv),
      "biorxiv" => Ok(Source::BioRxiv),
      "medrxiv" => Ok(Source::MedRxiv),
      "pubmed" => Ok(Source::PubMed),
      "chemrxiv" => Ok(Source::ChemRxiv),
      s => Err(ScipaperError::InvalidSource(s.to_owned())),
    }
  }
}

/// A paper normalized from any supported source.
///
/// The `id` is the deduplication key: it is source-scoped and stable across runs for the same
/// underlying item (`PMID:<n>` for PubMed, `doi:<doi>` for the DOI-based sources, the entry URL
/// for arXiv).
///
/// A paper is built once by a fetcher, gets its [`Paper::matched_keywords`] assigned once by the
/// [`crate::matcher`], and is otherwise treated as immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
  /// Source-scoped, run-stable identifier
  pub id:               String,
  /// The paper's title
  pub title:            String,
  /// Author display names, in source order
  #[serde(default)]
  pub authors:          Vec<String>,
  /// Abstract text, empty when the source endpoint does not expose one
  #[serde(default)]
  pub summary:          String,
  /// Publication time, never absent
  #[serde(with = "timestamp")]
  pub published:        DateTime<Utc>,
  /// Revision time, only for sources that distinguish it
  #[serde(default, with = "optional_timestamp")]
  pub updated:          Option<DateTime<Utc>>,
  /// Canonical URL of the item
  #[serde(default)]
  pub link:             String,
  /// Source taxonomy tags, empty for sources without one
  #[serde(default)]
  pub categories:       Vec<String>,
  /// Where the paper was harvested from
  #[serde(default)]
  pub source:           Source,
  /// The paper's DOI, if known
  #[serde(default)]
  pub doi:              Option<String>,
  /// The source's primary category, if it has one
  #[serde(default)]
  pub primary_category: Option<String>,
  /// Keywords this paper satisfied; absent until matched
  #[serde(default, deserialize_with = "non_empty_list")]
  pub matched_keywords: Option<Vec<String>>,
}

impl Paper {
  /// The text keyword matching runs against: title and summary, newline separated.
  pub fn text(&self) -> String { format!("{}\n{}", self.title, self.summary) }

  /// Whether the matcher assigned at least one keyword to this paper.
  pub fn is_matched(&self) -> bool {
    self.matched_keywords.as_ref().is_some_and(|keywords| !keywords.is_empty())
  }
}

/// Treats a missing, `null` or empty keyword list as "not matched".
fn non_empty_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where D: serde::Deserializer<'de> {
  let list = Option::<Vec<String>>::deserialize(deserializer)?;
  Ok(list.filter(|list| !list.is_empty()))
}

/// Parses a persisted timestamp, accepting RFC 3339 as a lenient second choice.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  chrono::NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
    .map(|naive| naive.and_utc())
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc)))
}

/// Serde adapter for required timestamps in [`TIMESTAMP_FORMAT`].
mod timestamp {
  use serde::{de::Error, Deserializer, Serializer};

  use super::*;

  /// Writes the timestamp at second resolution with a literal `Z`.
  pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
  }

  /// Reads a timestamp written by [`serialize`].
  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
  }
}

/// Serde adapter for optional timestamps; `null` and `""` both read as `None`.
mod optional_timestamp {
  use serde::{de::Error, Deserializer, Serializer};

  use super::*;

  /// Writes `null` or the timestamp in [`TIMESTAMP_FORMAT`].
  pub fn serialize<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    match value {
      Some(value) => serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string()),
      None => serializer.serialize_none(),
    }
  }

  /// Reads an optional timestamp written by [`serialize`].
  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
      Some(raw) if !raw.is_empty() => parse_timestamp(&raw)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}"))),
      _ => Ok(None),
    }
  }
}

//! Client implementation for PubMed through NCBI's E-utilities.
//!
//! A fetch is two calls: ESearch finds the PMIDs of matching articles published in the date
//! window, then one ESummary call retrieves their metadata. ESummary carries no abstracts, so
//! [`Paper::summary`] stays empty.
//!
//! NCBI asks every caller to identify itself with `tool` and `email` parameters; the client
//! cannot be built without a contact email.
//!
//! # Examples
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use scipaper::{
//!   clients::{FetchQuery, PubMedClient},
//!   config::PubMedConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let identity =
//!   PubMedConfig { email: Some("lab@example.org".to_string()), tool: "scipaper".to_string() };
//! let today = Utc::now().date_naive();
//! let query = FetchQuery {
//!   keywords:    vec!["DNA damage".to_string()],
//!   categories:  Vec::new(),
//!   start_date:  today - Duration::days(7),
//!   end_date:    today,
//!   max_results: 20,
//! };
//!
//! for paper in PubMedClient::new(&identity)?.fetch(&query).await? {
//!   println!("{}: {}", paper.id, paper.title);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use url::Url;

use super::*;
use crate::config::PubMedConfig;

/// ESearch response envelope.
#[derive(Debug, Deserialize)]
struct SearchResponse {
  /// The search result
  esearchresult: SearchResult,
}

/// The part of an ESearch result we use.
#[derive(Debug, Deserialize)]
struct SearchResult {
  /// Matching PMIDs, in the requested sort order
  #[serde(default)]
  idlist: Vec<String>,
}

/// ESummary response envelope.
///
/// `result` maps each PMID to its summary, next to a `uids` array, so it is decoded in two steps.
#[derive(Debug, Deserialize)]
struct SummaryResponse {
  /// Summaries keyed by PMID
  #[serde(default)]
  result: HashMap<String, serde_json::Value>,
}

/// One article summary.
///
/// Every field decodes leniently: a null or wrongly typed value leaves that field empty and the
/// rest of the article intact.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Summary {
  /// Article title
  #[serde(deserialize_with = "lenient")]
  title:      Option<String>,
  /// Author list
  #[serde(deserialize_with = "lenient_vec")]
  authors:    Vec<SummaryAuthor>,
  /// Loosely formatted publication date ("2025 Nov 6", "2025 Nov", "2025")
  #[serde(deserialize_with = "lenient")]
  pubdate:    Option<String>,
  /// Other identifiers of the article (DOI, PMC id, ...)
  #[serde(deserialize_with = "lenient_vec")]
  articleids: Vec<ArticleId>,
}

/// An author in a summary.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryAuthor {
  /// Display name, e.g. "Doe J"
  #[serde(deserialize_with = "lenient")]
  name: Option<String>,
}

/// An alternative identifier in a summary.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArticleId {
  /// Identifier kind ("doi", "pubmed", "pmc", ...)
  #[serde(deserialize_with = "lenient")]
  idtype: String,
  /// Identifier value
  #[serde(deserialize_with = "lenient")]
  value:  String,
}

impl Summary {
  /// Normalizes the summary of article `pmid`.
  fn into_paper(self, pmid: &str, now: DateTime<Utc>) -> Paper {
    let published = dates::parse_pubmed_date(self.pubdate.as_deref(), now);
    if published.fell_back {
      warn!("PubMed article {pmid} has unusable pubdate {:?}, using now", self.pubdate);
    }

    let doi = self
      .articleids
      .into_iter()
      .find(|id| id.idtype == "doi" && !id.value.trim().is_empty())
      .map(|id| id.value.trim().to_string());

    Paper {
      id: format!("PMID:{pmid}"),
      title: self.title.unwrap_or_default().trim().to_string(),
      authors: self
        .authors
        .into_iter()
        .filter_map(|author| author.name)
        .filter(|name| !name.trim().is_empty())
        .collect(),
      summary: String::new(),
      published: published.value,
      updated: None,
      link: format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"),
      categories: Vec::new(),
      source: Source::PubMed,
      doi,
      primary_category: None,
      matched_keywords: None,
    }
  }
}

/// Builds the ESearch term: every keyword as a title/abstract clause, OR-ed together.
///
/// ```
/// use scipaper::clients::pubmed::build_term;
///
/// assert_eq!(
///   build_term(&["aging", "DNA damage"]),
///   r#"aging[Title/Abstract] OR "DNA damage"[Title/Abstract]"#
/// );
/// ```
pub fn build_term<K: AsRef<str>>(keywords: &[K]) -> String {
  keywords
    .iter()
    .map(|keyword| keyword.as_ref().trim())
    .filter(|keyword| !keyword.is_empty())
    .map(|keyword| format!("{}[Title/Abstract]", quote_term(keyword)))
    .collect::<Vec<_>>()
    .join(" OR ")
}

/// Client for the E-utilities ESearch and ESummary endpoints.
pub struct PubMedClient {
  /// Internal web client used to connect to the API.
  client:   reqwest::Client,
  /// The base URL of the E-utilities.
  base_url: String,
  /// Value of the `tool` parameter
  tool:     String,
  /// Value of the `email` parameter
  email:    String,
}

impl PubMedClient {
  /// Creates a client identifying itself with `identity`, using the default timeout.
  ///
  /// # Errors
  ///
  /// Returns [`ScipaperError::Config`] when `identity` has no contact email.
  pub fn new(identity: &PubMedConfig) -> Result<Self, ScipaperError> {
    Self::with_timeout(identity, DEFAULT_TIMEOUT)
  }

  /// Creates a client whose requests time out after `timeout`.
  pub fn with_timeout(identity: &PubMedConfig, timeout: Duration) -> Result<Self, ScipaperError> {
    let email = identity.require_email()?.to_string();
    Ok(Self {
      client: http_client(timeout)?,
      base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
      tool: identity.tool.clone(),
      email,
    })
  }

  /// Points the client at a different E-utilities root.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// Searches PubMed for articles published in the query's date window.
  ///
  /// # Errors
  ///
  /// This function will return an error if:
  /// - Either request fails or returns a non-success status
  /// - Either response is not the expected JSON document
  pub async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Paper>, ScipaperError> {
    self.fetch_at(query, Utc::now()).await
  }

  /// [`Self::fetch`] with an explicit fetch time, used for date fallbacks.
  pub async fn fetch_at(
    &self,
    query: &FetchQuery,
    now: DateTime<Utc>,
  ) -> Result<Vec<Paper>, ScipaperError> {
    if query.terms().next().is_none() {
      debug!("No keywords, skipping PubMed");
      return Ok(Vec::new());
    }

    let pmids = self.search(query).await?;
    if pmids.is_empty() {
      info!("PubMed search matched nothing");
      return Ok(Vec::new());
    }

    let mut summaries = self.summarize(&pmids).await?;
    let mut papers = Vec::with_capacity(pmids.len());
    for pmid in &pmids {
      let Some(value) = summaries.remove(pmid) else {
        warn!("PubMed returned no summary for {pmid}, skipping");
        continue;
      };
      let summary = serde_json::from_value::<Summary>(value).unwrap_or_else(|e| {
        warn!("PubMed summary for {pmid} is not an object, keeping the PMID only: {e}");
        Summary::default()
      });
      papers.push(summary.into_paper(pmid, now));
    }

    info!("PubMed returned {} articles", papers.len());
    Ok(papers)
  }

  /// ESearch: PMIDs of matching articles, newest first.
  async fn search(&self, query: &FetchQuery) -> Result<Vec<String>, ScipaperError> {
    let term = build_term(&query.keywords);
    let retmax = query.max_results.to_string();
    let (mindate, maxdate) = (query.start(), query.end());
    let url = Url::parse_with_params(&format!("{}/esearch.fcgi", self.base_url), &[
      ("db", "pubmed"),
      ("term", term.as_str()),
      ("retmode", "json"),
      ("retmax", retmax.as_str()),
      ("sort", "pub_date"),
      ("mindate", mindate.as_str()),
      ("maxdate", maxdate.as_str()),
      ("datetype", "pdat"),
      ("tool", self.tool.as_str()),
      ("email", self.email.as_str()),
    ])?;
    debug!("Searching PubMed via: {url}");

    let text = self.client.get(url).send().await?.error_for_status()?.text().await?;
    trace!("ESearch response: {text}");
    let response: SearchResponse = serde_json::from_str(&text)?;
    Ok(response.esearchresult.idlist)
  }

  /// ESummary: raw summaries keyed by PMID.
  async fn summarize(
    &self,
    pmids: &[String],
  ) -> Result<HashMap<String, serde_json::Value>, ScipaperError> {
    let ids = pmids.join(",");
    let url = Url::parse_with_params(&format!("{}/esummary.fcgi", self.base_url), &[
      ("db", "pubmed"),
      ("id", ids.as_str()),
      ("retmode", "json"),
      ("tool", self.tool.as_str()),
      ("email", self.email.as_str()),
    ])?;
    debug!("Fetching PubMed summaries via: {url}");

    let text = self.client.get(url).send().await?.error_for_status()?.text().await?;
    trace!("ESummary response: {text}");
    let response: SummaryResponse = serde_json::from_str(&text)?;
    Ok(response.result)
  }
}

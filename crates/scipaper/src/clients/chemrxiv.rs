//! Client implementation for ChemRxiv, searched through the Crossref API.
//!
//! ChemRxiv has no search API of its own that we can use, but every ChemRxiv preprint is
//! registered with Crossref under the `10.26434` DOI prefix. This module queries Crossref's
//! works endpoint (https://api.crossref.org/works) filtered to that prefix and a publication
//! date window, and converts the Crossref work records into the common [`Paper`] structure.
//!
//! Crossref's free-text `query` does not treat `OR` as an operator, so the client issues one
//! search per keyword and stops once `max_results` works have been collected.

use url::Url;

use super::*;

/// DOI prefix under which ChemRxiv registers its preprints.
pub const CHEMRXIV_DOI_PREFIX: &str = "10.26434";

/// Largest page Crossref is asked for.
pub const ROWS_CAP: usize = 100;

/// Response structure from the Crossref works search.
#[derive(Debug, Deserialize)]
struct CrossrefResponse {
  /// The result page
  message: CrossrefPage,
}

/// A page of search results.
///
/// Works stay raw here and are decoded one at a time, see [`CrossrefWork::from_item`].
#[derive(Debug, Deserialize)]
struct CrossrefPage {
  /// Matching works
  #[serde(default)]
  items: Vec<serde_json::Value>,
}

/// Metadata about a work from Crossref.
///
/// Fields decode leniently: a null or wrongly typed value leaves that field empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct CrossrefWork {
  /// The work's DOI
  #[serde(rename = "DOI", deserialize_with = "lenient")]
  doi:              Option<String>,
  /// Titles (usually exactly one)
  #[serde(deserialize_with = "lenient_vec")]
  title:            Vec<String>,
  /// Authors with split names
  #[serde(deserialize_with = "lenient_vec")]
  author:           Vec<CrossrefAuthor>,
  /// Landing page URL
  #[serde(rename = "URL", deserialize_with = "lenient")]
  url:              Option<String>,
  /// Print publication date, if available
  #[serde(deserialize_with = "lenient")]
  published_print:  Option<CrossrefDate>,
  /// Online publication date, if available
  #[serde(deserialize_with = "lenient")]
  published_online: Option<CrossrefDate>,
  /// Creation date in Crossref's system
  #[serde(deserialize_with = "lenient")]
  created:          Option<CrossrefDate>,
  /// Deposit date in Crossref's system
  #[serde(deserialize_with = "lenient")]
  deposited:        Option<CrossrefDate>,
}

/// Author information from Crossref.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefAuthor {
  /// Author's given (first) name
  #[serde(deserialize_with = "lenient")]
  given:  Option<String>,
  /// Author's family (last) name
  #[serde(deserialize_with = "lenient")]
  family: Option<String>,
}

/// Date representation in Crossref's API.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefDate {
  /// Date parts in the format [[year, month, day]], where month and day are optional
  #[serde(rename = "date-parts", deserialize_with = "lenient")]
  date_parts: Vec<Vec<Option<i64>>>,
}

impl CrossrefWork {
  /// Decodes one raw item of a result page. An item that is not an object yields an empty work.
  fn from_item(item: serde_json::Value) -> Self {
    serde_json::from_value(item).unwrap_or_else(|e| {
      warn!("Crossref returned a malformed work, keeping an empty record: {e}");
      Self::default()
    })
  }

  /// The first usable date among print, online, creation and deposit dates, in that order.
  fn publication_date(&self) -> Option<DateTime<Utc>> {
    [&self.published_print, &self.published_online, &self.created, &self.deposited]
      .into_iter()
      .flatten()
      .find_map(|date| dates::parse_date_parts(&date.date_parts))
  }

  /// Normalizes the work.
  fn into_paper(self, now: DateTime<Utc>) -> Paper {
    let doi = self.doi.as_deref().map(str::trim).filter(|doi| !doi.is_empty()).map(String::from);
    let link = self
      .url
      .clone()
      .filter(|url| !url.is_empty())
      .or_else(|| doi.as_ref().map(|doi| format!("https://doi.org/{doi}")))
      .unwrap_or_default();
    let id = doi.as_ref().map(|doi| format!("doi:{doi}")).unwrap_or_else(|| link.clone());

    let published = match self.publication_date() {
      Some(date) => date,
      None => {
        warn!("ChemRxiv work {id} has no usable date, using now");
        dates::DateParse::fallback(now).value
      },
    };

    Paper {
      title: self.title.into_iter().next().unwrap_or_default().trim().to_string(),
      authors: self
        .author
        .into_iter()
        .filter_map(|author| {
          let name = format!(
            "{} {}",
            author.given.unwrap_or_default().trim(),
            author.family.unwrap_or_default().trim()
          );
          let name = name.trim();
          (!name.is_empty()).then(|| name.to_string())
        })
        .collect(),
      summary: String::new(),
      published,
      updated: None,
      link,
      categories: Vec::new(),
      source: Source::ChemRxiv,
      doi,
      primary_category: None,
      matched_keywords: None,
      id,
    }
  }
}

/// Client for ChemRxiv preprints via Crossref.
pub struct ChemRxivClient {
  /// Internal web client used to connect to the API.
  client:   reqwest::Client,
  /// The base URL to use for the client.
  base_url: String,
}

impl ChemRxivClient {
  /// Creates a new client with the default timeout.
  pub fn new() -> Result<Self, ScipaperError> { Self::with_timeout(DEFAULT_TIMEOUT) }

  /// Creates a new client whose requests time out after `timeout`.
  pub fn with_timeout(timeout: Duration) -> Result<Self, ScipaperError> {
    Ok(Self {
      client:   http_client(timeout)?,
      base_url: "https://api.crossref.org/works".to_string(),
    })
  }

  /// Points the client at a different works endpoint.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// Searches ChemRxiv preprints published in the query's date window, one keyword at a time.
  ///
  /// Each search asks for the remaining budget toward `max_results`, clamped to `1..=100`, and
  /// keywords are not searched once the budget is spent.
  ///
  /// # Errors
  ///
  /// This function will return an error if:
  /// - Any request fails or returns a non-success status
  /// - A response is not a Crossref works document
  pub async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Paper>, ScipaperError> {
    self.fetch_at(query, Utc::now()).await
  }

  /// [`Self::fetch`] with an explicit fetch time, used for date fallbacks.
  pub async fn fetch_at(
    &self,
    query: &FetchQuery,
    now: DateTime<Utc>,
  ) -> Result<Vec<Paper>, ScipaperError> {
    let filter = format!(
      "from-pub-date:{},until-pub-date:{},prefix:{CHEMRXIV_DOI_PREFIX}",
      query.start(),
      query.end()
    );

    let mut papers = Vec::new();
    for keyword in query.terms() {
      if papers.len() >= query.max_results {
        break;
      }
      let rows = (query.max_results - papers.len()).clamp(1, ROWS_CAP).to_string();
      let url = Url::parse_with_params(&self.base_url, &[
        ("rows", rows.as_str()),
        ("query", keyword),
        ("filter", filter.as_str()),
        ("sort", "published"),
        ("order", "desc"),
      ])?;
      debug!("Fetching from Crossref via: {url}");

      let text = self.client.get(url).send().await?.error_for_status()?.text().await?;
      trace!("Crossref response: {text}");
      let response: CrossrefResponse = serde_json::from_str(&text)?;

      let room = query.max_results - papers.len();
      papers.extend(
        response
          .message
          .items
          .into_iter()
          .take(room)
          .map(|item| CrossrefWork::from_item(item).into_paper(now)),
      );
    }

    info!("ChemRxiv returned {} works", papers.len());
    Ok(papers)
  }
}

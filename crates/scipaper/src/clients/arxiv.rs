//! Client implementation for searching arXiv.org.
//!
//! This module queries arXiv's Atom search API (http://export.arxiv.org/api/query) and converts
//! the feed entries to the common [`Paper`] format.
//!
//! The API has no date-range filter. The search is sorted by submission date, newest first, and
//! callers filter on [`Paper::published`] afterwards.
//!
//! # Examples
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use scipaper::clients::{ArxivClient, FetchQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let today = Utc::now().date_naive();
//! let query = FetchQuery {
//!   keywords:    vec!["aging".to_string(), "DNA damage".to_string()],
//!   categories:  vec!["q-bio.GN".to_string()],
//!   start_date:  today - Duration::days(7),
//!   end_date:    today,
//!   max_results: 100,
//! };
//!
//! for paper in ArxivClient::new()?.fetch(&query).await? {
//!   println!("{} ({})", paper.title, paper.published);
//! }
//! # Ok(())
//! # }
//! ```

use url::Url;

use super::*;

/// Largest page arXiv is asked for.
pub const MAX_RESULTS_CAP: usize = 300;

/// Internal representation of the arXiv API's Atom feed response.
#[derive(Debug, Deserialize)]
struct Feed {
  /// A `Feed` from arXiv may contain any number of `Entry`s
  #[serde(rename = "entry", default)]
  entries: Vec<Entry>,
}

/// Internal representation of a paper entry from arXiv's API response.
///
/// Everything except the identifier is optional here so that a sparse entry still yields a
/// paper with fallbacks instead of failing the whole feed.
#[derive(Debug, Deserialize)]
struct Entry {
  /// arXiv URL (e.g., "http://arxiv.org/abs/2301.07041v1")
  #[serde(default)]
  id:               String,
  /// Paper title (may contain LaTeX markup)
  #[serde(default)]
  title:            String,
  /// Paper abstract (may contain LaTeX markup)
  #[serde(default)]
  summary:          String,
  /// First version's submission time
  published:        Option<String>,
  /// Latest version's submission time
  updated:          Option<String>,
  /// List of paper authors
  #[serde(rename = "author", default)]
  authors:          Vec<Author>,
  /// Abstract page and PDF links
  #[serde(rename = "link", default)]
  links:            Vec<Link>,
  /// Subject classifications
  #[serde(rename = "category", default)]
  categories:       Vec<Category>,
  /// The primary subject classification
  #[serde(rename = "arxiv:primary_category", alias = "primary_category")]
  primary_category: Option<Category>,
  /// Journal DOI, when the authors supplied one
  #[serde(rename = "arxiv:doi", alias = "doi")]
  doi:              Option<String>,
}

/// Internal representation of an author from arXiv's API response.
#[derive(Debug, Deserialize)]
struct Author {
  /// Author's full name
  #[serde(default)]
  name: String,
}

/// An Atom `<link>` element.
#[derive(Debug, Deserialize)]
struct Link {
  /// Link target
  #[serde(rename = "@href")]
  href: Option<String>,
  /// Link relation (`alternate`, `related`)
  #[serde(rename = "@rel")]
  rel:  Option<String>,
}

/// An Atom `<category>` element.
#[derive(Debug, Deserialize)]
struct Category {
  /// Category code (e.g., "q-bio.GN")
  #[serde(rename = "@term")]
  term: Option<String>,
}

/// Builds the arXiv `search_query` expression.
///
/// Every keyword becomes a `ti:<kw> OR abs:<kw>` clause, quoted when it contains anything but
/// letters and digits, and the clauses are OR-ed together. Categories, when given, are OR-ed
/// into a second group AND-ed with the first.
///
/// ```
/// use scipaper::clients::arxiv::build_query;
///
/// assert_eq!(
///   build_query(&["aging", "DNA damage"], &["q-bio.GN"]),
///   r#"(ti:aging OR abs:aging OR ti:"DNA damage" OR abs:"DNA damage") AND (cat:q-bio.GN)"#
/// );
/// assert_eq!(build_query::<&str, &str>(&["aging"], &[]), "ti:aging OR abs:aging");
/// ```
pub fn build_query<K, C>(keywords: &[K], categories: &[C]) -> String
where
  K: AsRef<str>,
  C: AsRef<str>, {
  let keyword_part = keywords
    .iter()
    .map(|keyword| keyword.as_ref().trim())
    .filter(|keyword| !keyword.is_empty())
    .map(|keyword| {
      let term = quote_term(keyword);
      format!("ti:{term} OR abs:{term}")
    })
    .collect::<Vec<_>>()
    .join(" OR ");

  let category_part = categories
    .iter()
    .map(|category| category.as_ref().trim())
    .filter(|category| !category.is_empty())
    .map(|category| format!("cat:{category}"))
    .collect::<Vec<_>>()
    .join(" OR ");

  if category_part.is_empty() {
    keyword_part
  } else {
    format!("({keyword_part}) AND ({category_part})")
  }
}

/// Parses an Atom feed into papers, using `now` for entries with unusable dates.
pub fn parse_feed(xml: &str, now: DateTime<Utc>) -> Result<Vec<Paper>, ScipaperError> {
  let feed: Feed =
    from_str(xml).map_err(|e| ScipaperError::ApiError(format!("Failed to parse XML: {}", e)))?;
  Ok(feed.entries.into_iter().map(|entry| entry.into_paper(now)).collect())
}

impl Entry {
  /// Normalizes the entry.
  fn into_paper(self, now: DateTime<Utc>) -> Paper {
    let id = self.id.trim().to_string();

    let published = dates::parse_atom_date(self.published.as_deref(), now);
    if published.fell_back {
      warn!("arXiv entry {id} has unusable published date {:?}, using now", self.published);
    }
    let updated = self.updated.as_deref().and_then(|raw| {
      let parsed = dates::parse_atom_date(Some(raw), now);
      if parsed.fell_back {
        warn!("arXiv entry {id} has unusable updated date {raw:?}, dropping it");
        None
      } else {
        Some(parsed.value)
      }
    });

    let link = self
      .links
      .iter()
      .find(|link| link.rel.as_deref() == Some("alternate"))
      .or_else(|| self.links.first())
      .and_then(|link| link.href.clone())
      .unwrap_or_else(|| id.clone());

    Paper {
      title: self.title.trim().to_string(),
      authors: self
        .authors
        .into_iter()
        .map(|author| author.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect(),
      summary: self.summary.trim().to_string(),
      published: published.value,
      updated,
      link,
      categories: self
        .categories
        .into_iter()
        .filter_map(|category| category.term)
        .filter(|term| !term.is_empty())
        .collect(),
      source: Source::Arxiv,
      doi: self.doi.map(|doi| doi.trim().to_string()).filter(|doi| !doi.is_empty()),
      primary_category: self.primary_category.and_then(|category| category.term),
      matched_keywords: None,
      id,
    }
  }
}

/// Client for searching the arXiv API.
///
/// This client builds the search expression, performs the request and converts the Atom feed
/// to [`Paper`]s.
pub struct ArxivClient {
  /// Internal web client used to connect to the API.
  client:   reqwest::Client,
  /// The base URL to use for the client.
  base_url: String,
}

impl ArxivClient {
  /// Creates a new arXiv client with the default timeout.
  pub fn new() -> Result<Self, ScipaperError> { Self::with_timeout(DEFAULT_TIMEOUT) }

  /// Creates a new arXiv client whose requests time out after `timeout`.
  pub fn with_timeout(timeout: Duration) -> Result<Self, ScipaperError> {
    Ok(Self {
      client:   http_client(timeout)?,
      base_url: "https://export.arxiv.org/api/query".to_string(),
    })
  }

  /// Points the client at a different API endpoint.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// Searches arXiv for the query's keywords and categories.
  ///
  /// At most `max_results` entries are requested, clamped to `1..=300`. The query's date window
  /// is not applied here.
  ///
  /// # Errors
  ///
  /// This function will return an error if:
  /// - The network request fails or returns a non-success status
  /// - The response is not a parsable Atom feed
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
      debug!("No keywords, skipping arXiv");
      return Ok(Vec::new());
    }

    let search = build_query(&query.keywords, &query.categories);
    let max_results = query.max_results.clamp(1, MAX_RESULTS_CAP).to_string();
    let url = Url::parse_with_params(&self.base_url, &[
      ("search_query", search.as_str()),
      ("sortBy", "submittedDate"),
      ("sortOrder", "descending"),
      ("max_results", max_results.as_str()),
    ])?;

    debug!("Fetching from arXiv via: {url}");

    let response = self.client.get(url).send().await?.error_for_status()?.text().await?;
    trace!("arXiv response: {response}");

    let papers = parse_feed(&response, now)?;
    info!("arXiv returned {} entries", papers.len());
    Ok(papers)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use mockito::{Matcher, Server};

  use super::*;

  const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/abc</id>
  <updated>2025-01-15T00:00:00-05:00</updated>
  <entry>
    <id>http://arxiv.org/abs/2501.01234v2</id>
    <updated>2025-01-16T09:00:01Z</updated>
    <published>2025-01-14T18:59:59Z</published>
    <title>Aging clocks
  in mice</title>
    <summary>  Epigenetic clocks track senescence.
</summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Emmy Noether</name></author>
    <arxiv:doi>10.1000/clocks.1</arxiv:doi>
    <link href="http://arxiv.org/abs/2501.01234v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2501.01234v2" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="q-bio.GN" scheme="http://arxiv.org/schemas/atom"/>
    <category term="q-bio.GN" scheme="http://arxiv.org/schemas/atom"/>
    <category term="q-bio.CB" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2501.09999v1</id>
    <published>sometime last week</published>
    <title>Undated entry</title>
    <summary>No usable date.</summary>
    <author><name>Alan Turing</name></author>
  </entry>
</feed>"#;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap() }

  fn query() -> FetchQuery {
    FetchQuery {
      keywords:    vec!["aging".to_string(), "DNA damage".to_string()],
      categories:  vec!["q-bio.GN".to_string(), " ".to_string()],
      start_date:  NaiveDate::from_ymd_opt(2025, 1, 13).unwrap(),
      end_date:    NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
      max_results: 1000,
    }
  }

  #[test]
  fn test_build_query() {
    assert_eq!(
      build_query(&query().keywords, &query().categories),
      r#"(ti:aging OR abs:aging OR ti:"DNA damage" OR abs:"DNA damage") AND (cat:q-bio.GN)"#
    );
    assert_eq!(build_query(&["ddr", " "], &[] as &[&str]), "ti:ddr OR abs:ddr");
  }

  #[traced_test]
  #[test]
  fn test_parse_feed() -> anyhow::Result<()> {
    let papers = parse_feed(FEED, now())?;
    assert_eq!(papers.len(), 2);

    let clocks = &papers[0];
    assert_eq!(clocks.id, "http://arxiv.org/abs/2501.01234v2");
    assert_eq!(clocks.title, "Aging clocks\n  in mice");
    assert_eq!(clocks.summary, "Epigenetic clocks track senescence.");
    assert_eq!(clocks.authors, vec!["Ada Lovelace", "Emmy Noether"]);
    assert_eq!(clocks.published, Utc.with_ymd_and_hms(2025, 1, 14, 18, 59, 59).unwrap());
    assert_eq!(clocks.updated, Some(Utc.with_ymd_and_hms(2025, 1, 16, 9, 0, 1).unwrap()));
    assert_eq!(clocks.link, "http://arxiv.org/abs/2501.01234v2");
    assert_eq!(clocks.categories, vec!["q-bio.GN", "q-bio.CB"]);
    assert_eq!(clocks.primary_category.as_deref(), Some("q-bio.GN"));
    assert_eq!(clocks.doi.as_deref(), Some("10.1000/clocks.1"));
    assert_eq!(clocks.source, Source::Arxiv);
    assert!(clocks.matched_keywords.is_none());

    let undated = &papers[1];
    assert_eq!(undated.published, now());
    assert!(undated.updated.is_none());
    assert_eq!(undated.link, undated.id);
    assert!(undated.categories.is_empty());
    assert!(logs_contain("unusable published date"));
    Ok(())
  }

  #[test]
  fn test_parse_feed_with_interleaved_links() -> anyhow::Result<()> {
    // Entries with a journal DOI carry a `related` doi link ahead of the comment and
    // journal_ref, and the `alternate` and pdf links only after them.
    let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/cond-mat/0102536v1</id>
    <updated>2001-02-28T20:12:09Z</updated>
    <published>2001-02-28T20:12:09Z</published>
    <title>Impact of Electron-Electron Cusp on Configuration Interaction Energies</title>
    <summary>The effect of the electron-electron cusp on the convergence of CI energies.</summary>
    <author><name>David Prendergast</name><arxiv:affiliation>Cork</arxiv:affiliation></author>
    <author><name>M. Nolan</name></author>
    <arxiv:doi>10.1063/1.1383585</arxiv:doi>
    <link title="doi" href="http://dx.doi.org/10.1063/1.1383585" rel="related"/>
    <arxiv:comment>11 pages, 6 figures, 3 tables, LaTeX209, submitted to The Journal of Chemical Physics</arxiv:comment>
    <arxiv:journal_ref>J. Chem. Phys. 115, 1626 (2001)</arxiv:journal_ref>
    <link href="http://arxiv.org/abs/cond-mat/0102536v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/cond-mat/0102536v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cond-mat.str-el" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cond-mat.str-el" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    let papers = parse_feed(xml, now())?;
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].link, "http://arxiv.org/abs/cond-mat/0102536v1");
    assert_eq!(papers[0].doi.as_deref(), Some("10.1063/1.1383585"));
    assert_eq!(papers[0].authors, vec!["David Prendergast", "M. Nolan"]);
    assert_eq!(papers[0].primary_category.as_deref(), Some("cond-mat.str-el"));
    Ok(())
  }

  #[test]
  fn test_empty_feed() -> anyhow::Result<()> {
    let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>ArXiv Query</title></feed>"#;
    assert!(parse_feed(xml, now())?.is_empty());
    Ok(())
  }

  #[test]
  fn test_garbage_is_api_error() {
    assert!(matches!(parse_feed("<feed><entry>", now()), Err(ScipaperError::ApiError(_))));
  }

  #[tokio::test]
  async fn test_fetch_sends_search_and_cap() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("GET", "/api/query")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded(
          "search_query".into(),
          build_query(&query().keywords, &query().categories),
        ),
        Matcher::UrlEncoded("sortBy".into(), "submittedDate".into()),
        Matcher::UrlEncoded("sortOrder".into(), "descending".into()),
        Matcher::UrlEncoded("max_results".into(), "300".into()),
      ]))
      .with_status(200)
      .with_header("content-type", "application/atom+xml")
      .with_body(FEED)
      .create_async()
      .await;

    let client = ArxivClient::new()?.with_base_url(format!("{}/api/query", server.url()));
    let papers = client.fetch_at(&query(), now()).await?;

    mock.assert_async().await;
    assert_eq!(papers.len(), 2);
    Ok(())
  }

  #[tokio::test]
  async fn test_http_error_propagates() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("GET", "/api/query")
      .match_query(Matcher::Any)
      .with_status(503)
      .create_async()
      .await;

    let client = ArxivClient::new()?.with_base_url(format!("{}/api/query", server.url()));
    let result = client.fetch(&query()).await;
    assert!(matches!(result, Err(ScipaperError::Network(_))));
    Ok(())
  }

  #[tokio::test]
  async fn test_no_keywords_makes_no_request() -> anyhow::Result<()> {
    let client = ArxivClient::new()?.with_base_url("http://127.0.0.1:9/unreachable");
    let query = FetchQuery { keywords: vec![" ".to_string()], ..query() };
    assert!(client.fetch(&query).await?.is_empty());
    Ok(())
  }
}

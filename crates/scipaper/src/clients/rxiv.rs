//! Client implementation for the bioRxiv and medRxiv details API.
//!
//! Both servers share one API (https://api.biorxiv.org/details/{server}/{start}/{end}/{cursor})
//! that lists every preprint posted in a date window, one page at a time. The listing carries no
//! abstracts, so [`Paper::summary`] stays empty; fetching them would take one extra request per
//! preprint.

use super::*;

/// The two servers behind the details API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxivServer {
  /// biorxiv.org
  BioRxiv,
  /// medrxiv.org
  MedRxiv,
}

impl RxivServer {
  /// Server name as used in API paths.
  pub fn api_name(&self) -> &'static str {
    match self {
      RxivServer::BioRxiv => "biorxiv",
      RxivServer::MedRxiv => "medrxiv",
    }
  }

  /// The [`Source`] papers from this server are tagged with.
  pub fn source(&self) -> Source {
    match self {
      RxivServer::BioRxiv => Source::BioRxiv,
      RxivServer::MedRxiv => Source::MedRxiv,
    }
  }

  /// Landing page for the first version of a preprint.
  pub fn link(&self, doi: &str) -> String {
    match self {
      RxivServer::BioRxiv => format!("https://www.biorxiv.org/content/{doi}v1"),
      RxivServer::MedRxiv => format!("https://www.medrxiv.org/content/{doi}v1"),
    }
  }
}

/// One page of the details listing.
#[derive(Debug, Deserialize)]
struct DetailsPage {
  /// The preprints on this page; empty past the end of the listing
  #[serde(default)]
  collection: Vec<Item>,
}

/// A preprint in the details listing. Null or wrongly typed fields are left empty.
#[derive(Debug, Deserialize)]
struct Item {
  /// Preprint DOI (e.g., "10.1101/2024.01.23.576901")
  #[serde(default, deserialize_with = "lenient")]
  doi:     Option<String>,
  /// Preprint title
  #[serde(default, deserialize_with = "lenient")]
  title:   Option<String>,
  /// Authors as one string: "Last, F.; Last, F."
  #[serde(default, deserialize_with = "lenient")]
  authors: Option<String>,
  /// Posting date, `YYYY-MM-DD`
  #[serde(default, deserialize_with = "lenient")]
  date:    Option<String>,
}

impl Item {
  /// Normalizes the item.
  fn into_paper(self, server: RxivServer, now: DateTime<Utc>) -> Paper {
    let doi = self.doi.map(|doi| doi.trim().to_string()).filter(|doi| !doi.is_empty());
    let link = server.link(doi.as_deref().unwrap_or_default());
    let id = doi.as_ref().map(|doi| format!("doi:{doi}")).unwrap_or_else(|| link.clone());

    let published = dates::parse_rxiv_date(self.date.as_deref(), now);
    if published.fell_back {
      warn!("{} item {id} has unusable date {:?}, using now", server.source(), self.date);
    }

    Paper {
      title: self.title.unwrap_or_default().trim().to_string(),
      authors: self
        .authors
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect(),
      summary: String::new(),
      published: published.value,
      updated: None,
      link,
      categories: Vec::new(),
      source: server.source(),
      doi,
      primary_category: None,
      matched_keywords: None,
      id,
    }
  }
}

/// Client for one of the bioRxiv/medRxiv servers.
pub struct RxivClient {
  /// Internal web client used to connect to the API.
  client:   reqwest::Client,
  /// The base URL to use for the client.
  base_url: String,
  /// Which server to list
  server:   RxivServer,
}

impl RxivClient {
  /// Creates a client for `server` with the default timeout.
  pub fn new(server: RxivServer) -> Result<Self, ScipaperError> {
    Self::with_timeout(server, DEFAULT_TIMEOUT)
  }

  /// Creates a client for `server` whose requests time out after `timeout`.
  pub fn with_timeout(server: RxivServer, timeout: Duration) -> Result<Self, ScipaperError> {
    Ok(Self {
      client: http_client(timeout)?,
      base_url: "https://api.biorxiv.org".to_string(),
      server,
    })
  }

  /// Points the client at a different API host.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// The server this client lists.
  pub fn server(&self) -> RxivServer { self.server }

  /// Lists preprints posted between the query's start and end dates.
  ///
  /// Pages are requested with an increasing cursor until a page comes back empty or
  /// `max_results` preprints have been collected. Keywords and categories are not sent; the
  /// listing is filtered by the matcher afterwards.
  ///
  /// # Errors
  ///
  /// Returns an error if any page request fails or a page is not valid JSON.
  pub async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Paper>, ScipaperError> {
    self.fetch_at(query, Utc::now()).await
  }

  /// [`Self::fetch`] with an explicit fetch time, used for date fallbacks.
  pub async fn fetch_at(
    &self,
    query: &FetchQuery,
    now: DateTime<Utc>,
  ) -> Result<Vec<Paper>, ScipaperError> {
    let listing = format!(
      "{}/details/{}/{}/{}",
      self.base_url,
      self.server.api_name(),
      query.start(),
      query.end()
    );

    let mut papers = Vec::new();
    let mut cursor = 0;
    while papers.len() < query.max_results {
      let url = format!("{listing}/{cursor}");
      debug!("Fetching from {} via: {url}", self.server.source());

      let text = self.client.get(&url).send().await?.error_for_status()?.text().await?;
      trace!("{} response: {text}", self.server.source());
      let page: DetailsPage = serde_json::from_str(&text)?;

      if page.collection.is_empty() {
        break;
      }
      cursor += page.collection.len();

      let room = query.max_results - papers.len();
      papers.extend(
        page.collection.into_iter().take(room).map(|item| item.into_paper(self.server, now)),
      );
    }

    info!("{} returned {} preprints", self.server.source(), papers.len());
    Ok(papers)
  }
}

//! The harvest pipeline: fetch, filter, match and reduce.
//!
//! A harvest runs every enabled source one after another, in the fixed order of
//! [`Source::ALL`]. Each source's papers go through the same steps:
//!
//! 1. Papers published before the cutoff (`now - days_back`) are dropped.
//! 2. The [`KeywordMatcher`] records which keywords each paper satisfies.
//! 3. For ChemRxiv only, when `bio_only` is set, papers whose text has no biological vocabulary
//!    are dropped.
//!
//! The accumulated papers are then deduplicated and sorted, and papers without any matched
//! keyword are removed. The result is ready to be saved with [`crate::store::PaperStore`].
//!
//! A failing source aborts the whole harvest; the error names the source, see
//! [`ScipaperError::Fetch`].

use crate::{
  clients::{ArxivClient, ChemRxivClient, PubMedClient, RxivClient, RxivServer},
  dedup::dedupe_and_sort,
  matcher::{is_bio_context, KeywordMatcher},
};

use super::*;

/// One client per source, ready to harvest.
///
/// The fields are public so that individual clients can be re-pointed, e.g. with
/// `with_base_url`, before running [`Harvester::harvest`].
pub struct Harvester {
  /// arXiv client
  pub arxiv:    ArxivClient,
  /// bioRxiv client
  pub biorxiv:  RxivClient,
  /// medRxiv client
  pub medrxiv:  RxivClient,
  /// PubMed client; only present when PubMed is enabled, since it needs a contact email
  pub pubmed:   Option<PubMedClient>,
  /// ChemRxiv client
  pub chemrxiv: ChemRxivClient,
}

impl Harvester {
  /// Builds the clients for `config`, applying its HTTP timeout.
  ///
  /// # Errors
  ///
  /// Returns [`ScipaperError::Config`] when the configuration does not validate.
  pub fn from_config(config: &Config) -> Result<Self, ScipaperError> {
    config.validate()?;
    let timeout = config.http_timeout();
    let pubmed = if config.sources.pubmed {
      Some(PubMedClient::with_timeout(&config.pubmed, timeout)?)
    } else {
      None
    };

    Ok(Self {
      arxiv: ArxivClient::with_timeout(timeout)?,
      biorxiv: RxivClient::with_timeout(RxivServer::BioRxiv, timeout)?,
      medrxiv: RxivClient::with_timeout(RxivServer::MedRxiv, timeout)?,
      pubmed,
      chemrxiv: ChemRxivClient::with_timeout(timeout)?,
    })
  }

  /// Fetches raw papers from one source.
  pub async fn fetch_source(
    &self,
    source: Source,
    query: &FetchQuery,
    now: DateTime<Utc>,
  ) -> Result<Vec<Paper>, ScipaperError> {
    match source {
      Source::Arxiv => self.arxiv.fetch_at(query, now).await,
      Source::BioRxiv => self.biorxiv.fetch_at(query, now).await,
      Source::MedRxiv => self.medrxiv.fetch_at(query, now).await,
      Source::PubMed => match &self.pubmed {
        Some(client) => client.fetch_at(query, now).await,
        None => Err(ScipaperError::Config("PubMed client was not configured".to_string())),
      },
      Source::ChemRxiv => self.chemrxiv.fetch_at(query, now).await,
    }
  }

  /// Runs a full harvest for a run starting at `now`.
  ///
  /// # Errors
  ///
  /// Returns [`ScipaperError::Fetch`] wrapping the first source failure.
  pub async fn harvest(
    &self,
    config: &Config,
    now: DateTime<Utc>,
  ) -> Result<Vec<Paper>, ScipaperError> {
    let query = config.query(now)?;
    let cutoff = config.cutoff(now)?;
    let matcher = KeywordMatcher::new(&config.keywords);

    let mut collected = Vec::new();
    for source in config.sources.enabled() {
      let fetched =
        self.fetch_source(source, &query, now).await.map_err(|e| e.for_source(source))?;
      let fetched_count = fetched.len();

      let kept: Vec<Paper> = fetched
        .into_iter()
        .filter(|paper| paper.published >= cutoff)
        .filter_map(|mut paper| matcher.apply(&mut paper).then_some(paper))
        .filter(|paper| {
          source != Source::ChemRxiv || !config.bio_only || is_bio_context(&paper.text())
        })
        .collect();

      info!("{source}: kept {} of {fetched_count} fetched papers", kept.len());
      collected.extend(kept);
    }

    let papers: Vec<Paper> =
      dedupe_and_sort(collected).into_iter().filter(Paper::is_matched).collect();
    info!("Harvested {} papers", papers.len());
    Ok(papers)
  }
}

/// Harvests every enabled source in `config` for a run starting at `now`.
///
/// This is [`Harvester::from_config`] followed by [`Harvester::harvest`].
pub async fn harvest(config: &Config, now: DateTime<Utc>) -> Result<Vec<Paper>, ScipaperError> {
  Harvester::from_config(config)?.harvest(config, now).await
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use mockito::{Matcher, Server, ServerGuard};

  use super::*;

  /// Unroutable endpoint for sources that must not be contacted
  const NOWHERE: &str = "http://127.0.0.1:9";

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap() }

  fn config(yaml: &str) -> Config {
    let mut config = Config::from_yaml(yaml).unwrap();
    config.sources.arxiv = false;
    config
  }

  fn entry(id: &str, title: &str, published: &str) -> String {
    format!(
      "<entry><id>{id}</id><published>{published}</published><title>{title}</title>\
       <summary>Summary.</summary><author><name>A. Author</name></author></entry>"
    )
  }

  fn feed(entries: &[String]) -> String {
    format!(
      "<feed xmlns=\"http://www.w3.org/2005/Atom\" \
       xmlns:arxiv=\"http://arxiv.org/schemas/atom\">{}</feed>",
      entries.concat()
    )
  }

  fn harvester(server: &ServerGuard, config: &Config) -> Harvester {
    let mut harvester = Harvester::from_config(config).unwrap();
    harvester.arxiv =
      ArxivClient::new().unwrap().with_base_url(format!("{}/api/query", server.url()));
    harvester.biorxiv = RxivClient::new(RxivServer::BioRxiv).unwrap().with_base_url(server.url());
    harvester.medrxiv = RxivClient::new(RxivServer::MedRxiv).unwrap().with_base_url(NOWHERE);
    harvester.chemrxiv =
      ChemRxivClient::new().unwrap().with_base_url(format!("{}/works", server.url()));
    harvester
  }

  #[traced_test]
  #[tokio::test]
  async fn test_filters_matches_and_reduces() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let _arxiv = server
      .mock("GET", "/api/query")
      .match_query(Matcher::Any)
      .with_status(200)
      .with_body(feed(&[
        entry("http://arxiv.org/abs/1", "Aging clocks in mice", "2025-03-08T10:00:00Z"),
        entry("http://arxiv.org/abs/2", "Brain PAge prediction", "2025-03-09T10:00:00Z"),
        entry("http://arxiv.org/abs/3", "Senescence in 2019", "2025-02-01T10:00:00Z"),
      ]))
      .create_async()
      .await;
    let _biorxiv_first = server
      .mock("GET", "/details/biorxiv/2025-03-03/2025-03-10/0")
      .with_status(200)
      .with_body(
        serde_json::json!({ "collection": [
          { "doi": "10.1101/x", "title": "Senescent fibroblasts", "authors": "Doe, J.", "date": "2025-03-09" }
        ]})
        .to_string(),
      )
      .create_async()
      .await;
    let _biorxiv_end = server
      .mock("GET", "/details/biorxiv/2025-03-03/2025-03-10/1")
      .with_status(200)
      .with_body(r#"{"collection": []}"#)
      .create_async()
      .await;

    let mut config = config("keywords: [aging]\nsources:\n  biorxiv: true\n");
    config.sources.arxiv = true;
    let papers = harvester(&server, &config).harvest(&config, now()).await?;

    let ids: Vec<_> = papers.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["doi:10.1101/x", "http://arxiv.org/abs/1"]);
    assert!(papers.iter().all(|p| p.matched_keywords == Some(vec!["aging".to_string()])));
    assert!(logs_contain("arXiv: kept 1 of 3 fetched papers"));
    Ok(())
  }

  #[tokio::test]
  async fn test_chemrxiv_bio_gate() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let _works = server
      .mock("GET", "/works")
      .match_query(Matcher::Any)
      .with_status(200)
      .with_body(
        serde_json::json!({ "message": { "items": [
          { "DOI": "10.26434/bio", "title": ["Aging of mitochondria under oxidative stress"],
            "created": { "date-parts": [[2025, 3, 8]] } },
          { "DOI": "10.26434/mat", "title": ["Aging of perovskite films"],
            "created": { "date-parts": [[2025, 3, 7]] } }
        ]}})
        .to_string(),
      )
      .create_async()
      .await;

    let config = config("keywords: [aging]\nsources:\n  chemrxiv: true\n");
    let papers = harvester(&server, &config).harvest(&config, now()).await?;
    assert_eq!(papers.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["doi:10.26434/bio"]);

    let config = Config { bio_only: false, ..config };
    let papers = harvester(&server, &config).harvest(&config, now()).await?;
    assert_eq!(papers.len(), 2);
    Ok(())
  }

  #[tokio::test]
  async fn test_source_failure_names_the_source() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let _biorxiv = server
      .mock("GET", "/details/biorxiv/2025-03-03/2025-03-10/0")
      .with_status(502)
      .create_async()
      .await;

    let config = config("keywords: [aging]\nsources:\n  biorxiv: true\n");
    let result = harvester(&server, &config).harvest(&config, now()).await;
    match result {
      Err(ScipaperError::Fetch { origin, error }) => {
        assert_eq!(origin, Source::BioRxiv);
        assert!(error.is_transport_error());
      },
      other => panic!("expected a fetch error, got {other:?}"),
    }
    Ok(())
  }

  #[tokio::test]
  async fn test_no_enabled_sources() -> anyhow::Result<()> {
    let config = config("keywords: [aging]");
    assert!(harvest(&config, now()).await?.is_empty());
    Ok(())
  }

  #[tokio::test]
  async fn test_invalid_config_fails_before_fetching() {
    let config = config("sources:\n  pubmed: true\n");
    assert!(matches!(harvest(&config, now()).await, Err(ScipaperError::Config(_))));
  }
}

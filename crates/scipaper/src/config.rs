//! Run configuration.
//!
//! The configuration is a YAML document. Every key is optional; missing keys take the defaults
//! listed on each field.
//!
//! ```yaml
//! keywords: ["aging", "DDR", "DNA damage & Repair"]
//! categories: ["q-bio.GN", "q-bio.CB"]
//! days_back: 7
//! max_results: 100
//! site_data_path: site/data/papers.json
//! bio_only: true
//! sources:
//!   arxiv: true
//!   biorxiv: true
//!   pubmed: true
//! pubmed:
//!   email: lab@example.org
//! twitter:
//!   enabled: false
//!   hashtags: ["aging", "biology"]
//! ```

use std::time::Duration;

use super::*;

/// Largest accepted `days_back`, a century.
pub const MAX_DAYS_BACK: u32 = 36_500;

/// Everything a harvest run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Keywords to search for and to match against (default: none)
  pub keywords:          Vec<String>,
  /// arXiv categories to restrict the search to (default: none)
  pub categories:        Vec<String>,
  /// Size of the date window, counted back from now (default: 7)
  pub days_back:         u32,
  /// Per-source result cap (default: 100)
  pub max_results:       usize,
  /// Where the snapshot is written (default: `site/data/papers.json`)
  pub site_data_path:    PathBuf,
  /// Keep ChemRxiv results only when they read as biology (default: true)
  pub bio_only:          bool,
  /// Timeout applied to every HTTP call, in seconds (default: 30)
  pub http_timeout_secs: u64,
  /// Which sources to harvest
  pub sources:           SourcesConfig,
  /// PubMed E-utilities identification
  pub pubmed:            PubMedConfig,
  /// Options for the downstream posting component; not used by the harvest itself
  #[serde(alias = "posting")]
  pub twitter:           PostingConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      keywords:          Vec::new(),
      categories:        Vec::new(),
      days_back:         7,
      max_results:       100,
      site_data_path:    PathBuf::from("site/data/papers.json"),
      bio_only:          true,
      http_timeout_secs: 30,
      sources:           SourcesConfig::default(),
      pubmed:            PubMedConfig::default(),
      twitter:           PostingConfig::default(),
    }
  }
}

/// Per-source enable flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
  /// arXiv (default: true)
  pub arxiv:    bool,
  /// bioRxiv (default: false)
  pub biorxiv:  bool,
  /// medRxiv (default: false)
  pub medrxiv:  bool,
  /// PubMed (default: false)
  pub pubmed:   bool,
  /// ChemRxiv via Crossref (default: false)
  pub chemrxiv: bool,
}

impl Default for SourcesConfig {
  fn default() -> Self {
    Self { arxiv: true, biorxiv: false, medrxiv: false, pubmed: false, chemrxiv: false }
  }
}

impl SourcesConfig {
  /// Whether the given source is switched on.
  pub fn is_enabled(&self, source: Source) -> bool {
    match source {
      Source::Arxiv => self.arxiv,
      Source::BioRxiv => self.biorxiv,
      Source::MedRxiv => self.medrxiv,
      Source::PubMed => self.pubmed,
      Source::ChemRxiv => self.chemrxiv,
    }
  }

  /// Enabled sources in harvest order.
  pub fn enabled(&self) -> Vec<Source> {
    Source::ALL.into_iter().filter(|source| self.is_enabled(*source)).collect()
  }
}

/// Identification NCBI requires on every E-utilities call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubMedConfig {
  /// Contact email; required when PubMed is enabled
  pub email: Option<String>,
  /// Tool name (default: `scipaper`)
  pub tool:  String,
}

impl Default for PubMedConfig {
  fn default() -> Self { Self { email: None, tool: "scipaper".to_string() } }
}

impl PubMedConfig {
  /// The contact email, or a configuration error when it is missing or blank.
  pub fn require_email(&self) -> Result<&str, ScipaperError> {
    self.email.as_deref().map(str::trim).filter(|email| !email.is_empty()).ok_or_else(|| {
      ScipaperError::Config("PubMed requires a contact email (`pubmed.email`)".to_string())
    })
  }
}

/// Options consumed by the downstream posting component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
  /// Whether posting is switched on (default: false)
  pub enabled:   bool,
  /// Compose but don't send (default: true)
  pub dry_run:   bool,
  /// Fixed hashtags appended to each post (default: `arXiv`, `AI`)
  pub hashtags:  Vec<String>,
  /// Posts per run (default: 5)
  pub max_posts: usize,
}

impl Default for PostingConfig {
  fn default() -> Self {
    Self {
      enabled:   false,
      dry_run:   true,
      hashtags:  vec!["arXiv".to_string(), "AI".to_string()],
      max_posts: 5,
    }
  }
}

impl Config {
  /// Reads a YAML configuration file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ScipaperError> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::from_yaml(&text)
  }

  /// Parses a YAML configuration document. An empty document yields the defaults.
  pub fn from_yaml(text: &str) -> Result<Self, ScipaperError> {
    if text.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(text)?)
  }

  /// Default configuration path in the user's config directory.
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("scipaper").join("config.yaml")
  }

  /// Checks everything that must hold before any network call is made.
  pub fn validate(&self) -> Result<(), ScipaperError> {
    if self.days_back > MAX_DAYS_BACK {
      return Err(ScipaperError::Config(format!(
        "`days_back` must be at most {MAX_DAYS_BACK}, got {}",
        self.days_back
      )));
    }
    if self.max_results == 0 {
      return Err(ScipaperError::Config("`max_results` must be at least 1".to_string()));
    }
    if self.http_timeout_secs == 0 {
      return Err(ScipaperError::Config("`http_timeout_secs` must be at least 1".to_string()));
    }
    if self.sources.pubmed {
      self.pubmed.require_email()?;
    }
    Ok(())
  }

  /// The fixed timeout for every HTTP call.
  pub fn http_timeout(&self) -> Duration { Duration::from_secs(self.http_timeout_secs) }

  /// The earliest accepted `published` time for a run starting at `now`.
  ///
  /// # Errors
  ///
  /// Returns [`ScipaperError::Config`] when `days_back` reaches past the representable dates.
  pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ScipaperError> {
    now.checked_sub_signed(chrono::Duration::days(i64::from(self.days_back))).ok_or_else(|| {
      ScipaperError::Config(format!("`days_back` of {} is out of range", self.days_back))
    })
  }

  /// The fetch query for a run starting at `now`.
  pub fn query(&self, now: DateTime<Utc>) -> Result<FetchQuery, ScipaperError> {
    Ok(FetchQuery {
      keywords:    self.keywords.clone(),
      categories:  self.categories.clone(),
      start_date:  self.cutoff(now)?.date_naive(),
      end_date:    now.date_naive(),
      max_results: self.max_results,
    })
  }
}

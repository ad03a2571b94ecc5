//! JSON snapshot persistence for harvested papers.
//!
//! The snapshot is a JSON array of [`Paper`] objects. Older snapshots wrapped the array in an
//! object under a `papers` key; both shapes are accepted on load, and saving always writes the
//! bare array.

use super::*;

/// Either snapshot shape found on disk.
#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
  /// The current form: a bare array
  Bare(Vec<Paper>),
  /// The legacy form: `{"papers": [...]}`
  Wrapped {
    /// The wrapped array
    papers: Vec<Paper>,
  },
}

impl From<Snapshot> for Vec<Paper> {
  fn from(snapshot: Snapshot) -> Self {
    match snapshot {
      Snapshot::Bare(papers) | Snapshot::Wrapped { papers } => papers,
    }
  }
}

/// Handle on a snapshot file.
#[derive(Debug, Clone)]
pub struct PaperStore {
  /// Location of the snapshot
  path: PathBuf,
}

impl PaperStore {
  /// Creates a handle for the snapshot at `path`; nothing is read or created yet.
  pub fn new(path: impl AsRef<Path>) -> Self { Self { path: path.as_ref().to_path_buf() } }

  /// Default snapshot path in the user's data directory.
  pub fn default_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("scipaper").join("papers.json")
  }

  /// The snapshot location.
  pub fn path(&self) -> &Path { &self.path }

  /// Loads the snapshot.
  ///
  /// A missing file is an empty collection, not an error.
  pub fn load(&self) -> Result<Vec<Paper>, ScipaperError> {
    if !self.path.exists() {
      debug!("No snapshot at {}, starting empty", self.path.display());
      return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(&self.path)?;
    let snapshot: Snapshot = serde_json::from_str(&text)?;
    let papers: Vec<Paper> = snapshot.into();
    debug!("Loaded {} papers from {}", papers.len(), self.path.display());
    Ok(papers)
  }

  /// Writes the papers as a bare JSON array, creating missing parent directories.
  pub fn save(&self, papers: &[Paper]) -> Result<(), ScipaperError> {
    if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
      trace!("Creating parent directories: {}", parent.display());
      std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(papers)?;
    std::fs::write(&self.path, json)?;
    info!("Wrote {} papers to {}", papers.len(), self.path.display());
    Ok(())
  }

  /// Removes the snapshot file; returns whether there was one.
  pub fn remove(&self) -> Result<bool, ScipaperError> {
    if !self.path.exists() {
      return Ok(false);
    }
    std::fs::remove_file(&self.path)?;
    Ok(true)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use tempfile::tempdir;

  use super::*;

  /// A record with every optional field populated
  fn full_paper() -> Paper {
    Paper {
      id:               "http://arxiv.org/abs/2501.01234v2".to_string(),
      title:            "Senescence atlas: épigénétique".to_string(),
      authors:          vec!["Ada Lovelace".to_string(), "Emmy Noether".to_string()],
      summary:          "A summary with \"quotes\" and\nnewlines.".to_string(),
      published:        Utc.with_ymd_and_hms(2025, 1, 14, 18, 59, 59).unwrap(),
      updated:          Some(Utc.with_ymd_and_hms(2025, 1, 16, 9, 0, 1).unwrap()),
      link:             "http://arxiv.org/abs/2501.01234v2".to_string(),
      categories:       vec!["q-bio.CB".to_string(), "q-bio.GN".to_string()],
      source:           Source::Arxiv,
      doi:              Some("10.48550/arXiv.2501.01234".to_string()),
      primary_category: Some("q-bio.CB".to_string()),
      matched_keywords: Some(vec!["aging".to_string(), "senescence".to_string()]),
    }
  }

  #[test]
  fn test_missing_file_is_empty() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = PaperStore::new(dir.path().join("nope.json"));
    assert!(store.load()?.is_empty());
    Ok(())
  }

  #[test]
  fn test_round_trip_preserves_every_field() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = PaperStore::new(dir.path().join("nested").join("data").join("papers.json"));

    let mut minimal = crate::tests::paper("PMID:42", Source::PubMed, 2024, 12, 1);
    minimal.matched_keywords = Some(vec!["DDR".to_string()]);
    let papers = vec![full_paper(), minimal];

    store.save(&papers)?;
    assert!(store.path().exists());
    assert_eq!(store.load()?, papers);
    Ok(())
  }

  #[test]
  fn test_saves_bare_array() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = PaperStore::new(dir.path().join("papers.json"));
    store.save(&[full_paper()])?;

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(store.path())?)?;
    assert!(value.is_array());
    assert_eq!(value[0]["published"], "2025-01-14T18:59:59Z");
    assert_eq!(value[0]["updated"], "2025-01-16T09:00:01Z");
    Ok(())
  }

  #[test]
  fn test_loads_wrapped_legacy_form() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("papers.json");
    let wrapped = serde_json::json!({ "papers": [full_paper()] });
    std::fs::write(&path, serde_json::to_string(&wrapped)?)?;

    let store = PaperStore::new(&path);
    assert_eq!(store.load()?, vec![full_paper()]);

    // Re-saving normalizes to the bare form
    store.save(&store.load()?)?;
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert!(value.is_array());
    Ok(())
  }

  #[test]
  fn test_corrupt_snapshot_is_an_error() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("papers.json");
    std::fs::write(&path, "{ not json")?;
    assert!(matches!(PaperStore::new(&path).load(), Err(ScipaperError::Json(_))));
    Ok(())
  }

  #[test]
  fn test_remove() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = PaperStore::new(dir.path().join("papers.json"));
    assert!(!store.remove()?);
    store.save(&[])?;
    assert!(store.remove()?);
    assert!(!store.path().exists());
    Ok(())
  }
}

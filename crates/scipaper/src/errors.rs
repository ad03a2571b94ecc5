//! Error types for the scipaper library.
//!
//! This module provides a single error type covering the failure modes of the harvesting
//! pipeline:
//! - Transport failures talking to a source API
//! - Malformed response documents and snapshot files
//! - Configuration problems detected before any request is made
//! - Filesystem access
//!
//! # Examples
//!
//! ```no_run
//! use chrono::Utc;
//! use scipaper::{config::Config, errors::ScipaperError, pipeline};
//!
//! # async fn example() -> Result<(), ScipaperError> {
//! let config = Config::load("config.yaml")?;
//! match pipeline::harvest(&config, Utc::now()).await {
//!   Err(ScipaperError::Config(msg)) => println!("Fix your config: {msg}"),
//!   Err(ScipaperError::Fetch { origin, error }) => println!("{origin} failed: {error}"),
//!   Err(e) => println!("Other error: {e}"),
//!   Ok(papers) => println!("Collected {} papers", papers.len()),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

use crate::paper::Source;

/// Errors that can occur while fetching, filtering or persisting papers.
///
/// Transport errors are never retried. Per-item parse problems (a bad date, a missing
/// field) are not errors at all: fetchers recover from them with a documented fallback, see
/// [`crate::dates`].
#[derive(Error, Debug)]
pub enum ScipaperError {
  /// A network request failed.
  ///
  /// This covers connection failures, timeouts and non-success HTTP status codes returned
  /// by a source API.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// A JSON document (API response or snapshot file) could not be decoded or encoded.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// An API returned a document that could not be used at all.
  ///
  /// The string parameter describes what was wrong, for debugging.
  #[error("API error: {0}")]
  ApiError(String),

  /// Failed to build a request URL.
  #[error(transparent)]
  InvalidUrl(#[from] url::ParseError),

  /// The configuration is missing a required value or holds an unusable one.
  ///
  /// Raised before any network call is attempted.
  #[error("Configuration error: {0}")]
  Config(String),

  /// The configuration document is not valid YAML for [`crate::config::Config`].
  #[error(transparent)]
  ConfigFormat(#[from] serde_yaml::Error),

  /// The provided source name couldn't be parsed.
  ///
  /// The string parameter contains the rejected value.
  #[error("Invalid source type, see `scipaper::paper::Source`: {0}")]
  InvalidSource(String),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// Harvesting one particular source failed.
  ///
  /// The pipeline wraps every error raised while working on a source so that a failure on
  /// one source is never conflated with another source's result.
  #[error("{origin} fetch failed: {error}")]
  Fetch {
    /// The source that was being harvested
    origin: Source,
    /// The underlying failure
    error:  Box<ScipaperError>,
  },
}

impl ScipaperError {
  /// Wraps this error as a failure of the given source.
  pub fn for_source(self, origin: Source) -> Self {
    ScipaperError::Fetch { origin, error: Box::new(self) }
  }

  /// Checks if this error came from the transport layer, looking through [`Self::Fetch`].
  pub fn is_transport_error(&self) -> bool {
    match self {
      ScipaperError::Network(_) => true,
      ScipaperError::Fetch { error, .. } => error.is_transport_error(),
      _ => false,
    }
  }
}

//! A library for harvesting preprint and publication metadata from arXiv, bioRxiv, medRxiv,
//! PubMed and ChemRxiv, normalizing it into one [`Paper`] shape, filtering it by topical
//! keywords and persisting the result as a JSON snapshot.
//!
//! # Example
//! ```rust,no_run
//! use chrono::Utc;
//! use scipaper::{config::Config, pipeline, store::PaperStore};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!   let config = Config::load("config.yaml")?;
//!   config.validate()?;
//!
//!   let papers = pipeline::harvest(&config, Utc::now()).await?;
//!   PaperStore::new(&config.site_data_path).save(&papers)?;
//!
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{
  path::{Path, PathBuf},
  str::FromStr,
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod clients;
pub mod config;
pub mod dates;
pub mod dedup;
pub mod errors;
pub mod format;
pub mod matcher;
pub mod paper;
pub mod pipeline;
pub mod store;

use clients::FetchQuery;
use config::Config;
use errors::ScipaperError;
pub use paper::{Paper, Source};

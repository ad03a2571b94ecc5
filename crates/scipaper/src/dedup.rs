//! Cross-source deduplication and recency ordering.

use std::collections::HashMap;

use super::*;

/// Collapses papers sharing an `id` and orders the result newest first.
///
/// For each `id` the instance with the strictly latest `published` timestamp is kept; fields of
/// different instances are never merged. When several instances share the latest timestamp the
/// one encountered first wins, so the pipeline's fixed source order decides ties. The output is
/// sorted by `published` descending with a stable sort, which keeps equal timestamps in
/// first-seen order and makes the operation idempotent.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use scipaper::{dedup::dedupe_and_sort, paper::{Paper, Source}};
///
/// let older = Paper {
///   id:               "PMID:111".to_string(),
///   title:            "First sighting".to_string(),
///   authors:          Vec::new(),
///   summary:          String::new(),
///   published:        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
///   updated:          None,
///   link:             String::new(),
///   categories:       Vec::new(),
///   source:           Source::PubMed,
///   doi:              None,
///   primary_category: None,
///   matched_keywords: None,
/// };
/// let newer = Paper {
///   title: "Second sighting".to_string(),
///   published: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
///   ..older.clone()
/// };
///
/// let reduced = dedupe_and_sort(vec![older, newer]);
/// assert_eq!(reduced.len(), 1);
/// assert_eq!(reduced[0].title, "Second sighting");
/// ```
pub fn dedupe_and_sort(papers: impl IntoIterator<Item = Paper>) -> Vec<Paper> {
  let mut slots: HashMap<String, usize> = HashMap::new();
  let mut kept: Vec<Paper> = Vec::new();

  for paper in papers {
    match slots.get(&paper.id) {
      Some(&slot) =>
        if kept[slot].published < paper.published {
          trace!("Replacing {} with a newer instance", paper.id);
          kept[slot] = paper;
        },
      None => {
        slots.insert(paper.id.clone(), kept.len());
        kept.push(paper);
      },
    }
  }

  kept.sort_by(|a, b| b.published.cmp(&a.published));
  kept
}

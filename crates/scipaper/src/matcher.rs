//! Keyword matching with biology-aware rules.
//!
//! Plain substring matching is unusable for short biological keywords: "age" is found inside
//! "PAge", "ddr" inside "address". The matcher instead evaluates each configured keyword
//! against an ordered list of rules and stops at the first rule that applies to it:
//!
//! 1. `aging` / `ageing` match any whole word of aging, ageing, senescent, senescence.
//! 2. `ddr` / `dna damage response` match the acronym `DDR` or the spelled-out phrase.
//! 3. `dna damage` / `damage repair` match the phrase "dna damage", or the token "dna" together
//!    with the whole word "repair" anywhere in the text.
//! 4. Any keyword containing both "dna damage" and "repair" ("DNA damage & Repair") requires
//!    both to appear in the text independently.
//! 5. Anything else matches as a whole phrase on word boundaries.
//!
//! All comparisons are case-insensitive, and the rule order matters: rules 1 to 4 preempt the
//! generic rule for their keyword strings.
//!
//! # Examples
//!
//! ```
//! use scipaper::matcher::KeywordMatcher;
//!
//! let matcher = KeywordMatcher::new(["aging", "age"]);
//! assert_eq!(matcher.matches("Brain PAge prediction"), Vec::<String>::new());
//! assert_eq!(matcher.matches("Aging clocks in mice"), vec!["aging".to_string()]);
//! ```

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::*;

lazy_static! {
  static ref AGING: Regex = Regex::new(r"(?i)\b(?:aging|ageing|senescent|senescence)\b").unwrap();
  static ref DDR: Regex = Regex::new(r"(?i)\bddr\b|\bdna\s+damage\s+response\b").unwrap();
  static ref DNA_DAMAGE: Regex = Regex::new(r"(?i)\bdna\s+damage\b").unwrap();
  static ref REPAIR: Regex = Regex::new(r"(?i)\brepair\b").unwrap();
  static ref WORD: Regex = Regex::new(r"[a-zA-Z]+").unwrap();
}

/// Tokens that mark a text as biological; used to gate ChemRxiv results.
const BIO_TOKENS: &[&str] = &[
  "dna",
  "rna",
  "protein",
  "proteins",
  "gene",
  "genes",
  "genome",
  "genomic",
  "genetics",
  "cell",
  "cells",
  "cellular",
  "tissue",
  "organism",
  "mouse",
  "mice",
  "human",
  "yeast",
  "bacteria",
  "mitochondria",
  "chromatin",
  "chromosome",
  "repair",
  "biological",
];

/// How a single configured keyword is decided.
#[derive(Debug, Clone)]
enum Rule {
  /// Aging synonyms, rule 1
  Aging,
  /// DNA damage response acronym or phrase, rule 2
  DamageResponse,
  /// DNA damage phrase, or "dna" plus "repair", rule 3
  DnaDamage,
  /// Both "dna damage" and "repair" present, rule 4
  DamageAndRepair,
  /// Whole-phrase match on word boundaries, rule 5
  Phrase(Regex),
}

impl Rule {
  /// Picks the first rule that applies to `keyword`, which must already be trimmed.
  fn for_keyword(keyword: &str) -> Result<Self, regex::Error> {
    let lower = keyword.to_lowercase();
    Ok(match lower.as_str() {
      "aging" | "ageing" => Rule::Aging,
      "ddr" | "dna damage response" => Rule::DamageResponse,
      "dna damage" | "damage repair" => Rule::DnaDamage,
      l if l.contains("dna damage") && l.contains("repair") => Rule::DamageAndRepair,
      l => Rule::Phrase(Regex::new(&format!(r"(?i)\b{}\b", regex::escape(l)))?),
    })
  }

  /// Evaluates the rule against a text.
  fn is_satisfied(&self, text: &str, words: &HashSet<String>) -> bool {
    match self {
      Rule::Aging => AGING.is_match(text),
      Rule::DamageResponse => DDR.is_match(text),
      Rule::DnaDamage => DNA_DAMAGE.is_match(text) || (words.contains("dna") && REPAIR.is_match(text)),
      Rule::DamageAndRepair => DNA_DAMAGE.is_match(text) && REPAIR.is_match(text),
      Rule::Phrase(pattern) => pattern.is_match(text),
    }
  }
}

/// The set of lowercase alphabetic tokens in a text.
fn words(text: &str) -> HashSet<String> {
  WORD.find_iter(text).map(|m| m.as_str().to_lowercase()).collect()
}

/// Decides which configured keywords a paper satisfies.
///
/// Rules are resolved once per keyword at construction, so one matcher can be reused across
/// every paper of a run.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
  /// Configured keywords, as given, paired with their rule; blank keywords are dropped
  rules: Vec<(String, Rule)>,
}

impl KeywordMatcher {
  /// Builds a matcher for the given keywords.
  pub fn new<I, S>(keywords: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>, {
    let rules = keywords
      .into_iter()
      .filter_map(|keyword| {
        let keyword = keyword.as_ref();
        let trimmed = keyword.trim();
        if trimmed.is_empty() {
          return None;
        }
        match Rule::for_keyword(trimmed) {
          Ok(rule) => Some((keyword.to_string(), rule)),
          Err(e) => {
            warn!("Ignoring keyword {keyword:?}: {e}");
            None
          },
        }
      })
      .collect();
    Self { rules }
  }

  /// Returns the keywords satisfied by `text`, in configuration order.
  pub fn matches(&self, text: &str) -> Vec<String> {
    let words = words(text);
    self
      .rules
      .iter()
      .filter(|(_, rule)| rule.is_satisfied(text, &words))
      .map(|(keyword, _)| keyword.clone())
      .collect()
  }

  /// Returns the keywords satisfied by the paper's title and summary.
  pub fn match_paper(&self, paper: &Paper) -> Vec<String> { self.matches(&paper.text()) }

  /// Matches the paper and records the result.
  ///
  /// Sets [`Paper::matched_keywords`] when at least one keyword is satisfied and leaves it
  /// untouched otherwise. Returns whether the paper matched.
  pub fn apply(&self, paper: &mut Paper) -> bool {
    let hits = self.match_paper(paper);
    if hits.is_empty() {
      trace!("No keyword matched {}", paper.id);
      return false;
    }
    debug!("{} matched {:?}", paper.id, hits);
    paper.matched_keywords = Some(hits);
    true
  }
}

/// Whether the text contains at least one biological token as a whole word.
pub fn is_bio_context(text: &str) -> bool {
  let words = words(text);
  BIO_TOKENS.iter().any(|token| words.contains(*token))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn hits(keywords: &[&str], text: &str) -> Vec<String> {
    KeywordMatcher::new(keywords.iter().copied()).matches(text)
  }

  #[test]
  fn test_word_boundaries() {
    assert!(hits(&["age"], "Brain PAge prediction").is_empty());
    assert!(hits(&["aging"], "Brain PAge prediction").is_empty());
    assert_eq!(hits(&["aging"], "Aging clocks in mice"), vec!["aging"]);
    assert_eq!(hits(&["age"], "Brain age prediction"), vec!["age"]);
  }

  #[test]
  fn test_aging_synonyms() {
    assert_eq!(hits(&["ageing"], "Cellular senescence in fibroblasts"), vec!["ageing"]);
    assert_eq!(hits(&["Aging"], "Senescent cells accumulate"), vec!["Aging"]);
    assert!(hits(&["aging"], "Antisenescence compounds").is_empty());
  }

  #[test]
  fn test_ddr_synonym_group() {
    let keywords = ["DDR", "dna damage response"];
    assert_eq!(hits(&keywords, "ATM signalling in the DDR"), vec!["DDR", "dna damage response"]);
    assert_eq!(
      hits(&keywords, "The DNA   damage\nresponse in neurons"),
      vec!["DDR", "dna damage response"]
    );
    assert!(hits(&keywords, "Mail address validation").is_empty());
  }

  #[test]
  fn test_dna_damage_rule() {
    assert_eq!(hits(&["dna damage"], "Oxidative DNA damage in liver"), vec!["dna damage"]);
    assert_eq!(
      hits(&["damage repair"], "DNA polymerases and mismatch repair"),
      vec!["damage repair"]
    );
    // "dna" must be a whole token, "repair" a whole word
    assert!(hits(&["dna damage"], "cDNA libraries for repair").is_empty());
    assert!(hits(&["dna damage"], "DNA repairing enzymes").is_empty());
  }

  #[test]
  fn test_damage_and_repair_phrasings() {
    for keyword in ["DNA damage and Repair", "DNA damage & Repair"] {
      assert_eq!(hits(&[keyword], "DNA damage triggers repair pathways"), vec![keyword]);
      assert!(hits(&[keyword], "DNA repair without lesions").is_empty());
      assert!(hits(&[keyword], "DNA damage accumulates").is_empty());
    }
  }

  #[test]
  fn test_rule_order_preempts_phrase_rule() {
    // The generic rule would match "dna damage" here; rule 2 only accepts DDR or the phrase
    assert!(hits(&["dna damage response"], "DNA damage in yeast").is_empty());
    // The generic rule would reject this; rule 3 accepts dna + repair
    assert_eq!(hits(&["damage repair"], "dna strand repair"), vec!["damage repair"]);
  }

  #[test]
  fn test_phrase_rule_escapes_keyword() {
    assert_eq!(hits(&["c-Myc"], "c-myc amplification in tumours"), vec!["c-Myc"]);
    assert!(hits(&["p.53"], "p153 variants").is_empty());
    assert_eq!(hits(&["stem cell"], "Hematopoietic Stem Cell niches"), vec!["stem cell"]);
    assert!(hits(&["stem cell"], "stem cells").is_empty());
  }

  #[test]
  fn test_blank_keywords_are_ignored() {
    assert!(hits(&["", "   "], "anything at all").is_empty());
    assert_eq!(hits(&["  aging "], "aging"), vec!["  aging "]);
  }

  #[test]
  fn test_apply_sets_matched_keywords_once() {
    let matcher = KeywordMatcher::new(["aging"]);
    let mut paper = crate::tests::paper("a", Source::Arxiv, 2025, 1, 1);
    paper.title = "Aging clocks in mice".to_string();
    assert!(matcher.apply(&mut paper));
    assert_eq!(paper.matched_keywords, Some(vec!["aging".to_string()]));

    let mut other = crate::tests::paper("b", Source::BioRxiv, 2025, 1, 1);
    other.title = "Brain PAge prediction".to_string();
    assert!(!matcher.apply(&mut other));
    assert!(other.matched_keywords.is_none());
  }

  #[test]
  fn test_bio_context() {
    assert!(is_bio_context("Mitochondria under stress"));
    assert!(is_bio_context("Catalysis\nin human tissue"));
    assert!(!is_bio_context("Perovskite photovoltaics"));
    assert!(!is_bio_context("Genetically tuned polymers"));
  }
}

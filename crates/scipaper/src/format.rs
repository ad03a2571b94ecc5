//! Text formatting utilities for showing papers on a terminal.
//!
//! Titles from the sources often carry hard line breaks and runs of spaces, and can be far
//! longer than a terminal line. These helpers collapse whitespace and shorten text at word
//! boundaries.
//!
//! # Examples
//!
//! ```
//! use scipaper::format;
//!
//! let title = "Aging clocks\n  in  mice: a comparative study of epigenetic drift";
//!
//! assert_eq!(
//!   format::truncate_title(title, None),
//!   "Aging clocks in mice: a comparative study of epigenetic drift"
//! );
//! assert_eq!(format::truncate_title(title, Some(24)), "Aging clocks in mice:...");
//! ```

/// Default title width, in characters.
pub const DEFAULT_TITLE_WIDTH: usize = 100;

/// Marker appended to shortened text.
const ELLIPSIS: &str = "...";

/// Collapses whitespace in a title and shortens it to at most `max_chars` characters.
///
/// A shortened title ends in `...`, which counts toward the limit, and is cut at the last
/// word boundary that fits. A single word longer than the limit is cut mid-word. If `max_chars`
/// is `None`, [`DEFAULT_TITLE_WIDTH`] is used.
///
/// # Examples
///
/// ```
/// use scipaper::format;
///
/// assert_eq!(format::truncate_title("No    Extra    Spaces", None), "No Extra Spaces");
/// assert_eq!(format::truncate_title("Senescence", Some(8)), "Senes...");
/// ```
pub fn truncate_title(title: &str, max_chars: Option<usize>) -> String {
  let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");
  let max_chars = max_chars.unwrap_or(DEFAULT_TITLE_WIDTH);

  if collapsed.chars().count() <= max_chars {
    return collapsed;
  }

  let budget = max_chars.saturating_sub(ELLIPSIS.len());
  let mut result = String::new();
  for (i, word) in collapsed.split(' ').enumerate() {
    let needed = word.chars().count() + usize::from(i > 0);
    if result.chars().count() + needed > budget {
      if i == 0 {
        result.extend(word.chars().take(budget));
      }
      break;
    }
    if i > 0 {
      result.push(' ');
    }
    result.push_str(word);
  }

  result.push_str(ELLIPSIS);
  result
}

/// Joins author names for display, naming at most `max_names` before "et al.".
pub fn format_authors(authors: &[String], max_names: usize) -> String {
  match authors.len() {
    0 => "unknown authors".to_string(),
    n if n <= max_names => authors.join(", "),
    _ => format!("{} et al.", authors[..max_names].join(", ")),
  }
}

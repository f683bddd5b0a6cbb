//! Isolate the detail suffix (동/호, floor, unit label) of an address line.

use std::sync::LazyLock;

use regex::Regex;

/// A building house number such as `152` or `36-1`.
static HOUSE_NUMBER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\d+(?:-\d+)?$").unwrap());

/// Return the detail part of `tokens`, given the resolved standard address.
///
/// 1. Everything after the first house-number token.
/// 2. Otherwise, everything after the last token that overlaps a token of
///    the standard address.
/// 3. Otherwise, nothing.
pub fn extract_detail<S: AsRef<str>>(tokens: &[S], standard_address: &str) -> String {
  if let Some(pos) = tokens.iter().position(|t| HOUSE_NUMBER.is_match(t.as_ref())) {
    return join_from(tokens, pos + 1);
  }

  let std_tokens: Vec<&str> = standard_address.split_whitespace().collect();
  let overlaps = |token: &str| {
    std_tokens
      .iter()
      .any(|s| !token.is_empty() && (s.contains(token) || token.contains(s)))
  };

  match tokens.iter().rposition(|t| overlaps(t.as_ref())) {
    Some(pos) => join_from(tokens, pos + 1),
    None => String::new(),
  }
}

fn join_from<S: AsRef<str>>(tokens: &[S], start: usize) -> String {
  tokens
    .get(start..)
    .unwrap_or_default()
    .iter()
    .map(|t| t.as_ref())
    .collect::<Vec<&str>>()
    .join(" ")
}

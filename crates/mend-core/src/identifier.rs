//! Extraction of an identifier token embedded in free text.
//!
//! Identifier assertions are denormalized as `"Display Name: IDENTIFIER"`
//! strings, so the token must be fished out of the surrounding text. The
//! shape is fixed: four groups of four alphanumeric characters separated by
//! hyphens (the final character may be a checksum `X`).

use std::sync::LazyLock;

use regex::Regex;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"[A-Z0-9]{4}-[A-Z0-9]{4}-[A-Z0-9]{4}-[A-Z0-9]{4}")
    .expect("identifier pattern compiles")
});

/// Find the first identifier token in `text`, if any.
///
/// Pure function: no I/O, no normalization of the input. Callers decide what
/// to do with the surrounding text.
pub fn extract_identifier(text: &str) -> Option<&str> {
  IDENTIFIER.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_token_from_assertion_text() {
    assert_eq!(
      extract_identifier("Alan S. Orth: 0000-0002-1735-7458"),
      Some("0000-0002-1735-7458")
    );
  }

  #[test]
  fn extracts_token_with_checksum_x() {
    assert_eq!(
      extract_identifier("Jane Doe: 0000-0002-1825-009X"),
      Some("0000-0002-1825-009X")
    );
  }

  #[test]
  fn bare_token_extracts_whole_input() {
    assert_eq!(
      extract_identifier("0000-0002-1735-7458"),
      Some("0000-0002-1735-7458")
    );
  }

  #[test]
  fn missing_token_yields_none() {
    assert_eq!(extract_identifier("Alan S. Orth"), None);
    assert_eq!(extract_identifier(""), None);
  }

  #[test]
  fn lowercase_groups_are_not_tokens() {
    // The stored form is uppercase; lowercase input is a data problem the
    // operator should see, not something to silently accept.
    assert_eq!(extract_identifier("abcd-efgh-ijkl-mnop"), None);
  }

  #[test]
  fn short_groups_are_not_tokens() {
    assert_eq!(extract_identifier("000-0002-1735-7458"), None);
  }

  #[test]
  fn first_token_wins_when_several_present() {
    assert_eq!(
      extract_identifier("0000-0001-0000-0001 or 0000-0002-0000-0002"),
      Some("0000-0001-0000-0001")
    );
  }
}

//! Korean phone-number formatting, carried alongside each row.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneResult {
  pub original:     String,
  pub formatted:    String,
  pub was_modified: bool,
  /// `false` when the digits match no known numbering shape.
  pub valid:        bool,
}

/// Format a phone number into its dashed form.
///
/// Unrecognized numbers come back unchanged (trimmed) with `valid == false`.
pub fn format_phone(raw: &str) -> PhoneResult {
  let original = raw.to_owned();
  let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();

  let international =
    raw.trim_start().starts_with('+') || (digits.starts_with("82") && digits.len() >= 11);
  if international && let Some(rest) = digits.strip_prefix("82") {
    digits = format!("0{}", rest.trim_start_matches('0'));
  }

  let formatted = match split_digits(&digits) {
    Some(parts) => parts.join("-"),
    None => {
      let trimmed = raw.trim().to_owned();
      return PhoneResult {
        was_modified: trimmed != original,
        original,
        formatted: trimmed,
        valid: false,
      };
    }
  };

  PhoneResult {
    was_modified: formatted != original,
    original,
    formatted,
    valid: true,
  }
}

fn split_digits(d: &str) -> Option<Vec<&str>> {
  let len = d.len();
  let parts = if d.starts_with("02") {
    match len {
      9 => vec![&d[..2], &d[2..5], &d[5..]],
      10 => vec![&d[..2], &d[2..6], &d[6..]],
      _ => return None,
    }
  } else if d.starts_with("050") && len == 12 {
    vec![&d[..4], &d[4..8], &d[8..]]
  } else if d.starts_with('0') {
    match len {
      10 => vec![&d[..3], &d[3..6], &d[6..]],
      11 => vec![&d[..3], &d[3..7], &d[7..]],
      _ => return None,
    }
  } else if ["15", "16", "18"].iter().any(|p| d.starts_with(p)) && len == 8 {
    vec![&d[..4], &d[4..]]
  } else {
    return None;
  };
  Some(parts)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mobile_numbers() {
    let p = format_phone("01012345678");
    assert_eq!(p.formatted, "010-1234-5678");
    assert!(p.was_modified && p.valid);

    let same = format_phone("010-1234-5678");
    assert_eq!(same.formatted, "010-1234-5678");
    assert!(!same.was_modified);

    assert_eq!(format_phone("011 234 5678").formatted, "011-234-5678");
  }

  #[test]
  fn area_codes() {
    assert_eq!(format_phone("0212345678").formatted, "02-1234-5678");
    assert_eq!(format_phone("021234567").formatted, "02-123-4567");
    assert_eq!(format_phone("0311234567").formatted, "031-123-4567");
    assert_eq!(format_phone("07012345678").formatted, "070-1234-5678");
    assert_eq!(format_phone("050412345678").formatted, "0504-1234-5678");
  }

  #[test]
  fn international_prefix() {
    assert_eq!(format_phone("+82 10-1234-5678").formatted, "010-1234-5678");
    assert_eq!(format_phone("+82 (0)2 1234 5678").formatted, "02-1234-5678");
  }

  #[test]
  fn representative_numbers() {
    assert_eq!(format_phone("15881234").formatted, "1588-1234");
  }

  #[test]
  fn unrecognized_left_alone() {
    let p = format_phone(" 12345 ");
    assert_eq!(p.formatted, "12345");
    assert!(!p.valid);
    assert!(p.was_modified);
  }
}

//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Canonical form for deterministic answer comparison: trimmed,
/// lowercased, inner whitespace runs collapsed to single spaces.
pub fn normalize_answer(s: &str) -> String {
  s.split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    s.to_string()
  } else {
    let cut = s
      .char_indices()
      .take_while(|(i, _)| *i <= max)
      .last()
      .map(|(i, _)| i)
      .unwrap_or(0);
    format!("{}… ({} bytes total)", &s[..cut], s.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_fills_all_keys() {
    let out = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and y and x");
  }

  #[test]
  fn normalization_trims_cases_and_collapses() {
    assert_eq!(normalize_answer("  Past_Simple "), "past_simple");
    assert_eq!(normalize_answer("The   Cat\tSleeps"), "the cat sleeps");
  }

  #[test]
  fn truncation_keeps_short_strings_intact() {
    assert_eq!(trunc_for_log("short", 10), "short");
    let long = "x".repeat(300);
    let out = trunc_for_log(&long, 20);
    assert!(out.len() < long.len());
    assert!(out.contains("300 bytes total"));
  }
}

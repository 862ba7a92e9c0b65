//! Slug derivation helpers.
//!
//! # Responsibility
//! - Turn display names into url-safe lowercase slugs.
//! - Resolve collisions by numeric suffix within a caller-supplied
//!   occupancy check.
//!
//! # Invariants
//! - `slugify(slugify(x)) == slugify(x)`.
//! - Empty input falls back to a stable non-empty slug.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug pattern"));
static DASH_TRIM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^-+)|(-+$)").expect("valid trim pattern"));

/// Derives a lowercase dash-separated slug from free text.
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let dashed = NON_SLUG_RE.replace_all(&lowered, "-");
    let trimmed = DASH_TRIM_RE.replace_all(&dashed, "");
    if trimmed.is_empty() {
        "item".to_string()
    } else {
        trimmed.into_owned()
    }
}

/// Derives a slug that is free within the caller's scope.
///
/// `is_taken` is queried with each candidate; suffixes `-1`, `-2`, ...
/// are appended until a free candidate is found.
pub fn slugify_uniquely<E>(
    value: &str,
    mut is_taken: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    let base = slugify(value);
    if !is_taken(&base)? {
        return Ok(base);
    }
    let mut suffix = 1u64;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !is_taken(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{slugify, slugify_uniquely};
    use std::convert::Infallible;

    #[test]
    fn slugify_lowercases_and_collapses_separators() {
        assert_eq!(slugify("  Back Office / QA  "), "back-office-qa");
        assert_eq!(slugify("UX"), "ux");
        assert_eq!(slugify("***"), "item");
    }

    #[test]
    fn slugify_is_idempotent() {
        let first = slugify("Design & Research");
        assert_eq!(slugify(&first), first);
    }

    #[test]
    fn unique_slug_appends_numeric_suffixes() {
        let taken = ["acme", "acme-1"];
        let slug = slugify_uniquely::<Infallible>("Acme", |candidate| {
            Ok(taken.contains(&candidate))
        })
        .expect("infallible check");
        assert_eq!(slug, "acme-2");
    }
}

//! Article name repair
//!
//! Link targets, category names and titles arrive from the dump in a variety
//! of sloppy spellings (`"category: foo"`, `":Bar_ baz"`, lowercase first
//! letters). [`repair_name`] folds them onto one canonical form so that edge
//! files and annotations agree on a single name per article.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Canonicalizes a `category:` prefix, tolerating leading colon/space/underscore
/// junk so that repair stays idempotent.
static CATEGORY_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[\s_:]*category:[\s_]*(.)(.*)").unwrap());

static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").unwrap());

static LEADING_JUNK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s_:]+").unwrap());

/// Repair a raw article/link/category name.
///
/// Applies, in order: `Category:` prefix canonicalization, collapsing of
/// whitespace/underscore runs to a single `_`, stripping of any leading
/// whitespace/underscore/colon run, and uppercasing of the first character.
/// The result never contains a space and is stable under re-application.
pub fn repair_name(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    let name = CATEGORY_PREFIX_RE.replace(name, |caps: &Captures| {
        format!("Category:{}{}", caps[1].to_uppercase(), &caps[2])
    });
    let name = BLANK_RUN_RE.replace_all(&name, "_");
    let name = LEADING_JUNK_RE.replace(&name, "");

    uppercase_first(&name)
}

/// Uppercase the first letter, matching the wiki convention that titles are
/// case-insensitive in their first character only.
fn uppercase_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

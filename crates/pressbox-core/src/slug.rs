// SPDX-License-Identifier: Apache-2.0

pub const SLUG_MAX_LEN: usize = 160;

/// Returns true when `input` is already in canonical slug form: non-empty,
/// lowercase ASCII alphanumerics and hyphens, no leading/trailing or doubled
/// hyphen, within [`SLUG_MAX_LEN`].
#[must_use]
pub fn is_canonical_slug(input: &str) -> bool {
    if input.is_empty() || input.len() > SLUG_MAX_LEN {
        return false;
    }
    if input.starts_with('-') || input.ends_with('-') || input.contains("--") {
        return false;
    }
    input
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Canonicalizes arbitrary text into slug form. Uppercase folds to lowercase,
/// runs of non-alphanumeric characters collapse to a single hyphen, and the
/// result is trimmed of hyphens and truncated to [`SLUG_MAX_LEN`]. Returns
/// `None` when nothing slug-safe remains.
#[must_use]
pub fn canonical_slug(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out.truncate(SLUG_MAX_LEN);
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

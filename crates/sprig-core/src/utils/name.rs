//! Package name normalization.
//!
//! Registry metadata, manifests and user input spell the same package in
//! different ways (`My_Package`, `my.package`, `my-package`). Every name is
//! normalized before it is used as a key.

/// Normalize a package name: lower-case, with every run of `_`, `.` or
/// whitespace replaced by a single `-`. Existing dashes are kept as they are.
///
/// Idempotent: `normalize_name(&normalize_name(x)) == normalize_name(x)`.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator_run = false;

    for c in name.chars() {
        if is_separator(c) {
            if !in_separator_run {
                normalized.push('-');
                in_separator_run = true;
            }
        } else {
            normalized.extend(c.to_lowercase());
            in_separator_run = false;
        }
    }

    normalized
}

fn is_separator(c: char) -> bool {
    matches!(c, '_' | '.') || c.is_whitespace()
}

/// Check if this is a usable package name once normalized
pub fn is_valid_name(name: &str) -> bool {
    let normalized = normalize_name(name.trim());
    !normalized.is_empty()
        && normalized
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-')
        && !normalized.starts_with('-')
        && !normalized.ends_with('-')
}

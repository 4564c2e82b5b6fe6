//! Namespace resolution between the editable input and the fully qualified
//! path. When a managed root is configured the input never shows it and the
//! committed path always carries it.

pub mod debounce;

pub use debounce::{Debounce, Debouncer, Ticket};

use regex::Regex;
use std::sync::OnceLock;

/// Namespace path separator.
pub const SEPARATOR: char = '/';

static REPEATED_SEPARATORS: OnceLock<Option<Regex>> = OnceLock::new();

fn repeated_separators() -> Option<&'static Regex> {
    REPEATED_SEPARATORS
        .get_or_init(|| Regex::new(r"/{2,}").ok())
        .as_ref()
}

/// Normalizes a namespace path fragment: surrounding whitespace is trimmed,
/// repeated separators are collapsed and leading or trailing separators are
/// removed. Never fails; the worst case is an empty string.
#[must_use]
pub fn sanitize_path(path: &str) -> String {
    let trimmed = path.trim();
    let collapsed = repeated_separators().map_or_else(
        || trimmed.to_string(),
        |re| re.replace_all(trimmed, "/").into_owned(),
    );

    collapsed.trim_matches(SEPARATOR).to_string()
}

/// Returns the editable form of `namespace`.
///
/// Without a managed root this is the namespace unchanged. With one, the first
/// segment is dropped and the remainder is returned with a leading separator,
/// or an empty string when nothing follows the root.
///
/// Feeding the result back through [`full_namespace_from_input`] yields the
/// original only for canonical paths (no trailing or repeated separators);
/// anything else comes back sanitized.
#[must_use]
pub fn editable_namespace(namespace: &str, managed_root: Option<&str>) -> String {
    if managed_root.is_none() {
        return namespace.to_string();
    }

    match namespace.split_once(SEPARATOR) {
        Some((_, rest)) => format!("{SEPARATOR}{rest}"),
        None => String::new(),
    }
}

/// Rebuilds the fully qualified namespace from edited input using
/// [`sanitize_path`].
#[must_use]
pub fn full_namespace_from_input(value: &str, managed_root: Option<&str>) -> String {
    full_namespace_with(value, managed_root, sanitize_path)
}

/// Same as [`full_namespace_from_input`] with a caller supplied sanitizer.
pub fn full_namespace_with<F>(value: &str, managed_root: Option<&str>, sanitize: F) -> String
where
    F: Fn(&str) -> String,
{
    let stripped = sanitize(value);

    match managed_root {
        // an empty input under a managed root addresses the root itself
        Some(root) if stripped.is_empty() => root.to_string(),
        Some(root) => format!("{root}{SEPARATOR}{stripped}"),
        None => stripped,
    }
}

//! Type spelling cleanup.

/// Qualifier tokens removed from the front of a type spelling, in scan order.
const PREFIXES: [&str; 3] = ["struct ", "enum ", "const "];

/// Strip leading `struct `, `enum ` and `const ` tokens from a type spelling.
///
/// After each removal the scan restarts from the first candidate, so nested
/// qualifiers such as `const struct foo` reduce to `foo`.
pub fn strip_prefixes(spelling: &str) -> &str {
    let mut name = spelling;
    'scan: loop {
        for prefix in PREFIXES {
            if let Some(rest) = name.strip_prefix(prefix) {
                name = rest;
                continue 'scan;
            }
        }
        return name;
    }
}

//! Namespace handling for descriptor element and attribute names
//!
//! The event source reports resolved names in brace ("Clark") notation,
//! `{http://schemas.dmtf.org/ovf/envelope/1}VirtualSystem`, so that two
//! prefixes bound to the same URI produce the same name. Everything past the
//! event source only cares about the local part.

/// Remove the `{uri}` namespace part from a tag or attribute name
///
/// Names without a namespace are returned unchanged, which makes stripping
/// an already stripped name a no-op.
///
/// # Example
///
/// ```
/// use ovaimport::namespace::strip_namespace;
///
/// assert_eq!(
///     strip_namespace("{http://schemas.dmtf.org/ovf/envelope/1}Envelope"),
///     "Envelope"
/// );
/// assert_eq!(strip_namespace("Envelope"), "Envelope");
/// ```
pub fn strip_namespace(name: &str) -> &str {
    let Some(open) = name.find('{') else {
        return name;
    };
    match name[open..].find('}') {
        Some(close) => &name[open + close + 1..],
        None => name,
    }
}

/// Build the brace-notation name for a resolved local name
///
/// `namespace` is `None` for names that are not in any namespace.
pub fn clark_name(namespace: Option<&str>, local_name: &str) -> String {
    match namespace {
        Some(uri) => format!("{{{}}}{}", uri, local_name),
        None => local_name.to_string(),
    }
}

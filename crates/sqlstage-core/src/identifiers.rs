//! SQL identifier helpers.

use std::sync::OnceLock;

use regex::Regex;

fn plain_identifier() -> Option<&'static Regex> {
    static PLAIN: OnceLock<Option<Regex>> = OnceLock::new();
    PLAIN
        .get_or_init(|| match Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$") {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(error = %e, "Identifier pattern failed to compile, quoting everything");
                None
            }
        })
        .as_ref()
}

/// Whether `name` can be emitted unquoted (letters, digits and `_`, not starting with a digit).
pub fn is_plain_identifier(name: &str) -> bool {
    plain_identifier().is_some_and(|regex| regex.is_match(name))
}

/// Quote an identifier with double quotes, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Replace every character that is not alphanumeric or `_` with `_`.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() {
        out.push('_');
    }
    out
}

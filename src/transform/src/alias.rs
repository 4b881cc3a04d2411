//! `${field}` alias templates.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::row::Row;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(.*?)\}").expect("placeholder pattern is valid"));

/// Expand every `${field}` in `template` with the field's rendered value
/// from `sample`.
///
/// Placeholders naming a missing field, or containing whitespace, are left
/// verbatim. An empty template yields an empty label, which callers treat
/// as "no alias".
pub fn resolve_alias(template: &str, sample: &Row) -> String {
    if !template.contains("${") {
        return template.to_string();
    }

    PLACEHOLDER
        .replace_all(template, |captures: &Captures<'_>| {
            let name = &captures[1];
            match sample.get(name) {
                Some(value) if !name.chars().any(char::is_whitespace) => value.render(),
                _ => captures[0].to_string(),
            }
        })
        .into_owned()
}

//! Template rendering for scenario prompts
//!
//! Templates are plain text with two kinds of placeholder:
//! `{{#name}}...{{/name}}` keeps its body only when the field is filled in, and
//! `{{name}}` is replaced by the field's value. Names use `[A-Za-z0-9_-]`;
//! anything else is left as literal text.

use crate::models::{FieldValue, FormValues};
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn section_open_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{#([A-Za-z0-9_-]+)\}\}").expect("valid section pattern")
    })
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{([A-Za-z0-9_-]+)\}\}").expect("valid variable pattern")
    })
}

fn any_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{[#/]?([A-Za-z0-9_-]+)\}\}").expect("valid tag pattern")
    })
}

fn blank_run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\n\s*\n\s*\n").expect("valid blank-line pattern")
    })
}

fn closing_tag(name: &str) -> String {
    format!("{{{{/{}}}}}", name)
}

/// Render `template` against `values`.
///
/// Sections are resolved over the whole template before any variable is
/// substituted, so a variable inside a dropped section never appears and a
/// section test always sees the raw value. Runs of blank lines left behind by
/// dropped sections collapse to a single blank line and the result is trimmed.
pub fn render(template: &str, values: &FormValues) -> String {
    let resolved = resolve_sections(template, values);
    let interpolated = interpolate(&resolved, values);
    normalize(&interpolated)
}

/// Keep or drop every `{{#name}}...{{/name}}` span in one left-to-right pass.
///
/// A section ends at the first closing tag with the same name. An opening tag
/// with no such closing tag is not a section and stays in the text.
fn resolve_sections(template: &str, values: &FormValues) -> String {
    let mut out = String::with_capacity(template.len());
    let mut copied = 0;
    let mut search_from = 0;

    while let Some(caps) = section_open_pattern().captures_at(template, search_from) {
        let (Some(open), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let close = closing_tag(name.as_str());

        match template[open.end()..].find(&close) {
            Some(offset) => {
                let body_end = open.end() + offset;
                out.push_str(&template[copied..open.start()]);
                if values.get(name.as_str()).is_some_and(FieldValue::is_truthy) {
                    out.push_str(&template[open.end()..body_end]);
                }
                copied = body_end + close.len();
                search_from = copied;
            }
            // `{` is one byte, so this stays on a char boundary.
            None => search_from = open.start() + 1,
        }
    }

    out.push_str(&template[copied..]);
    out
}

fn interpolate(text: &str, values: &FormValues) -> String {
    variable_pattern()
        .replace_all(text, |caps: &Captures| {
            values
                .get(&caps[1])
                .map(FieldValue::to_text)
                .unwrap_or_default()
        })
        .into_owned()
}

fn normalize(text: &str) -> String {
    blank_run_pattern()
        .replace_all(text, "\n\n")
        .trim()
        .to_string()
}

/// Every field name a template mentions, through sections or variables.
pub fn referenced_fields(template: &str) -> BTreeSet<String> {
    any_tag_pattern()
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Names of opening section tags that rendering would leave in the text.
///
/// Follows the same scan as rendering: a tag with no later closing tag stays
/// literal, and so does any opening tag inside a section body, since the
/// body ends at the first closing tag of the outer section.
pub fn unclosed_sections(template: &str) -> Vec<String> {
    let mut leaked = Vec::new();
    let mut search_from = 0;

    while let Some(caps) = section_open_pattern().captures_at(template, search_from) {
        let (Some(open), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let close = closing_tag(name.as_str());

        match template[open.end()..].find(&close) {
            Some(offset) => {
                let body = &template[open.end()..open.end() + offset];
                leaked.extend(
                    section_open_pattern()
                        .captures_iter(body)
                        .map(|inner| inner[1].to_string()),
                );
                search_from = open.end() + offset + close.len();
            }
            None => {
                leaked.push(name.as_str().to_string());
                search_from = open.start() + 1;
            }
        }
    }

    leaked
}

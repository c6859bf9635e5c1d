//! Text and attribute helpers for writing field extractors
//!
//! All helpers return `None` instead of failing: a missing element is a
//! missing field, never an error.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::ParsedDocument;
use crate::harvest_engine::FieldValue;

/// Parse a CSS selector, returning `None` when it is invalid
#[must_use]
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            log::debug!(target: "listing_harvest::extract", "Invalid selector {css:?}: {e}");
            None
        }
    }
}

/// Concatenated text of an element with whitespace runs collapsed
#[must_use]
pub fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Text of the first match, `None` if absent or blank
#[must_use]
pub fn first_text(doc: &ParsedDocument, css: &str) -> Option<String> {
    doc.select_first(css)
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
}

/// Text of the `index`-th match, `None` if absent or blank
#[must_use]
pub fn nth_text(doc: &ParsedDocument, css: &str, index: usize) -> Option<String> {
    doc.select_all(css)
        .get(index)
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Text of the `inner_index`-th `inner` match inside the `outer_index`-th `outer` match
#[must_use]
pub fn nested_nth_text(
    doc: &ParsedDocument,
    outer: &str,
    outer_index: usize,
    inner: &str,
    inner_index: usize,
) -> Option<String> {
    let outer_el = *doc.select_all(outer).get(outer_index)?;
    let inner_sel = selector(inner)?;
    outer_el
        .select(&inner_sel)
        .nth(inner_index)
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
}

/// Text of every match in document order, blank entries dropped
#[must_use]
pub fn all_text(doc: &ParsedDocument, css: &str) -> Vec<String> {
    doc.select_all(css)
        .iter()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Text of every match joined by `separator`, `None` if nothing matched
#[must_use]
pub fn joined_text(doc: &ParsedDocument, css: &str, separator: &str) -> Option<String> {
    let parts = all_text(doc, css);
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(separator))
    }
}

/// Trimmed attribute of the first match
#[must_use]
pub fn first_attr(doc: &ParsedDocument, css: &str, attr: &str) -> Option<String> {
    doc.select_first(css)
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Serialize label/value rows into a JSON object string
///
/// Each `row` match contributes one entry keyed by the text of its `label`
/// child. Rows missing either part are skipped. With no rows at all the
/// result is `"{}"`, so the column is never null on a loaded page.
#[must_use]
pub fn labelled_pairs_json(doc: &ParsedDocument, row: &str, label: &str, value: &str) -> String {
    let (Some(label_sel), Some(value_sel)) = (selector(label), selector(value)) else {
        return "{}".to_string();
    };

    let mut pairs = BTreeMap::new();
    for row_el in doc.select_all(row) {
        let key = row_el.select(&label_sel).next().map(|el| element_text(&el));
        let val = row_el.select(&value_sel).next().map(|el| element_text(&el));
        if let (Some(key), Some(val)) = (key, val)
            && !key.is_empty()
        {
            pairs.insert(key, val);
        }
    }

    serde_json::to_string(&pairs).unwrap_or_else(|_| "{}".to_string())
}

/// Trim and collapse every whitespace run to a single space
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove all whitespace, including thousands-separator spaces in prices
#[must_use]
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Parse a number out of display text such as `"125 000"` or `"12,5"`
///
/// Whole numbers become `Integer`, anything with a fractional part becomes
/// `Number`. Returns `None` when no digits are present.
#[must_use]
pub fn parse_number(text: &str) -> Option<FieldValue> {
    let compact: String = strip_whitespace(text)
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if !compact.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = compact.replace(',', ".");
    if let Ok(i) = normalized.parse::<i64>() {
        return Some(FieldValue::Integer(i));
    }
    normalized.parse::<f64>().ok().map(FieldValue::Number)
}

/// Numeric value when the text is a number, otherwise the text itself
#[must_use]
pub fn number_or_text(text: String) -> FieldValue {
    let digits_only = text
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | ',' | '-'));
    match parse_number(&text) {
        Some(value) if digits_only => value,
        _ => FieldValue::Text(text),
    }
}

static COORDINATE_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(-?\d{1,3}(?:\.\d+)?)\s*,\s*(-?\d{1,3}(?:\.\d+)?)")
        .unwrap_or_else(|e| panic!("invalid coordinate pattern: {e}"))
});

/// First `lat,lng` pair in `text`, e.g. a map link's `q=40.4093,49.8671`
#[must_use]
pub fn coordinate_pair(text: &str) -> Option<(f64, f64)> {
    let caps = COORDINATE_PAIR.captures(text)?;
    let lat = caps.get(1)?.as_str().parse().ok()?;
    let lng = caps.get(2)?.as_str().parse().ok()?;
    Some((lat, lng))
}

/// Wrap optional text as a field value
#[must_use]
pub fn text_value(text: Option<String>) -> Option<FieldValue> {
    text.map(FieldValue::Text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <h1 class="title">  Flat   for sale </h1>
        <ul class="stats">
            <li><span>Created</span><span>12 May 2024</span></li>
            <li><span>Views</span><span>347</span></li>
        </ul>
        <div class="props">
            <div class="row"><label>Rooms</label><span>3</span></div>
            <div class="row"><label>Floor</label><span>5/9</span></div>
            <div class="row"><label></label><span>orphan</span></div>
        </div>
        <div class="desc"><p>Line one</p><p></p><p>Line two</p></div>
        <a class="phone" href=" tel:+994501234567 ">call</a>
    "#;

    #[test]
    fn first_text_collapses_whitespace() {
        let doc = ParsedDocument::parse(PAGE);
        assert_eq!(first_text(&doc, "h1.title").as_deref(), Some("Flat for sale"));
        assert_eq!(first_text(&doc, "h2"), None);
    }

    #[test]
    fn nested_nth_text_walks_both_levels() {
        let doc = ParsedDocument::parse(PAGE);
        assert_eq!(
            nested_nth_text(&doc, "ul.stats li", 1, "span", 1).as_deref(),
            Some("347")
        );
        assert_eq!(nested_nth_text(&doc, "ul.stats li", 4, "span", 1), None);
    }

    #[test]
    fn joined_text_skips_blank_paragraphs() {
        let doc = ParsedDocument::parse(PAGE);
        assert_eq!(
            joined_text(&doc, "div.desc p", "\n").as_deref(),
            Some("Line one\nLine two")
        );
        assert_eq!(joined_text(&doc, "div.none p", "\n"), None);
    }

    #[test]
    fn first_attr_is_trimmed() {
        let doc = ParsedDocument::parse(PAGE);
        assert_eq!(
            first_attr(&doc, "a.phone", "href").as_deref(),
            Some("tel:+994501234567")
        );
    }

    #[test]
    fn labelled_pairs_skip_rows_without_label() {
        let doc = ParsedDocument::parse(PAGE);
        let json = labelled_pairs_json(&doc, "div.row", "label", "span");
        let parsed: BTreeMap<String, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["Rooms"], "3");
        assert_eq!(parsed["Floor"], "5/9");
    }

    #[test]
    fn labelled_pairs_empty_object_when_no_rows() {
        let doc = ParsedDocument::parse("<p></p>");
        assert_eq!(labelled_pairs_json(&doc, "div.row", "label", "span"), "{}");
    }

    #[test]
    fn parse_number_handles_display_formats() {
        assert_eq!(parse_number("125 000"), Some(FieldValue::Integer(125_000)));
        assert_eq!(parse_number("12,5 AZN"), Some(FieldValue::Number(12.5)));
        assert_eq!(parse_number("Razılaşma yolu ilə"), None);
    }

    #[test]
    fn number_or_text_keeps_mixed_text() {
        assert_eq!(number_or_text("1 250".into()), FieldValue::Integer(1250));
        assert_eq!(number_or_text("5/9".into()), FieldValue::Text("5/9".into()));
        assert_eq!(
            number_or_text("12 May 2024".into()),
            FieldValue::Text("12 May 2024".into())
        );
    }

    #[test]
    fn coordinate_pair_reads_first_pair() {
        assert_eq!(
            coordinate_pair("https://maps.google.com/?q=40.4093,49.8671&z=15"),
            Some((40.4093, 49.8671))
        );
        assert_eq!(coordinate_pair("40.4093, -49.8"), Some((40.4093, -49.8)));
        assert_eq!(coordinate_pair("no map"), None);
    }

    #[test]
    fn strip_whitespace_removes_inner_spaces() {
        assert_eq!(strip_whitespace(" 1 250 000 "), "1250000");
    }
}

//! Read-only parsed page snapshot

use scraper::{ElementRef, Html, Selector};

use super::helpers::selector;

/// A parsed DOM snapshot taken from a browser session
///
/// Wraps a `scraper::Html` tree. It is not `Send`; it lives and dies on the
/// worker thread that took the snapshot.
pub struct ParsedDocument {
    html: Html,
}

impl ParsedDocument {
    #[must_use]
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    #[must_use]
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// First element matching `css`, or `None` if nothing matches or the
    /// selector does not parse
    #[must_use]
    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let sel = selector(css)?;
        self.html.select(&sel).next()
    }

    /// All elements matching `css` in document order
    #[must_use]
    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match selector(css) {
            Some(sel) => self.html.select(&sel).collect(),
            None => Vec::new(),
        }
    }

    /// Hrefs of listing anchors matching `css`, in document order
    ///
    /// A matched element contributes its own `href`, or the `href` of its
    /// first descendant anchor when it is a container such as a card.
    #[must_use]
    pub fn listing_hrefs(&self, css: &str) -> Vec<String> {
        let Some(sel) = selector(css) else {
            return Vec::new();
        };
        let Ok(anchor) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        self.html
            .select(&sel)
            .filter_map(|el| {
                el.value()
                    .attr("href")
                    .or_else(|| el.select(&anchor).next().and_then(|a| a.value().attr("href")))
                    .map(str::trim)
                    .filter(|href| !href.is_empty())
                    .map(str::to_string)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_hrefs_reads_own_or_descendant_anchor() {
        let doc = ParsedDocument::parse(
            r#"<div class="items-i"><a href="/items/1">one</a></div>
               <a class="items-i" href="/items/2">two</a>
               <div class="items-i">no link</div>"#,
        );
        assert_eq!(doc.listing_hrefs(".items-i"), vec!["/items/1", "/items/2"]);
    }

    #[test]
    fn invalid_selector_matches_nothing() {
        let doc = ParsedDocument::parse("<p>x</p>");
        assert!(doc.select_first("p[").is_none());
        assert!(doc.select_all("p[").is_empty());
    }
}

//! tap.az: infinite-scroll index, phone numbers behind `.show-phones`

use anyhow::Result;
use url::Url;

use super::{BuiltinSite, RevealInteraction, SiteDefaults, SiteProfile};
use crate::harvest_engine::{FieldValue, PaginationMode};
use crate::page_extractor::helpers::{
    coordinate_pair, first_attr, first_text, joined_text, labelled_pairs_json, nth_text,
    number_or_text, strip_whitespace, text_value,
};
use crate::page_extractor::{ExtractorSet, ParsedDocument};
use crate::utils::constants::DEFAULT_SCROLL_STALL_LIMIT;

pub const BASE_URL: &str = "https://tap.az";
pub const INDEX_URL: &str = "https://tap.az/elanlar";
pub const TARGET_COUNT: usize = 5000;
pub const MAX_CONCURRENT_JOBS: usize = 5;

const PRICE_BLOCK: &str = "div.product-price__i.product-price__i--bold";
const STATISTICS: &str = "span.product-info__statistics__i-text";

pub fn site() -> Result<BuiltinSite> {
    Ok(BuiltinSite {
        profile: profile()?,
        defaults: SiteDefaults {
            pagination: PaginationMode::scroll(
                INDEX_URL,
                Some(TARGET_COUNT),
                DEFAULT_SCROLL_STALL_LIMIT,
            ),
            max_concurrent_jobs: MAX_CONCURRENT_JOBS,
        },
    })
}

pub fn profile() -> Result<SiteProfile> {
    Ok(SiteProfile::new("tapaz", BASE_URL, "a.products-link")?
        .with_reveal(RevealInteraction::required(".show-phones", ".phone-numbers__i"))
        .with_extractors(extractors()))
}

pub fn extractors() -> ExtractorSet {
    ExtractorSet::new()
        .field("title", |doc| text_value(first_text(doc, "h1.product-title")))
        .field("phone_number", |doc| {
            first_attr(doc, "li.phone-numbers__i a", "href")
                .map(|href| href.replace("tel:", "").trim().to_string())
                .map(FieldValue::Text)
        })
        .field("owner_name", |doc| {
            text_value(first_text(doc, "span.product-shop__owner-name"))
        })
        .field("price", |doc| {
            first_text(doc, &format!("{PRICE_BLOCK} span.price-val"))
                .map(|price| number_or_text(strip_whitespace(&price)))
        })
        .field("currency", |doc| {
            text_value(first_text(doc, &format!("{PRICE_BLOCK} span.price-cur")))
        })
        .field("information", |doc| {
            Some(FieldValue::Text(labelled_pairs_json(
                doc,
                "div.product-properties__i",
                "label.product-properties__i-name",
                "span.product-properties__i-value",
            )))
        })
        .field("content", |doc| {
            text_value(joined_text(doc, "div.product-description__content p", "\n"))
        })
        .field("views", |doc| nth_text(doc, STATISTICS, 2).map(number_or_text))
        .field("created_date", |doc| text_value(nth_text(doc, STATISTICS, 1)))
        .field("latitude", |doc| map_coordinates(doc).map(|(lat, _)| FieldValue::Number(lat)))
        .field("longitude", |doc| map_coordinates(doc).map(|(_, lng)| FieldValue::Number(lng)))
}

/// Coordinates from the map link's `q=lat,lng` query parameter
fn map_coordinates(doc: &ParsedDocument) -> Option<(f64, f64)> {
    let href = first_attr(doc, "a.shop--location", "href")?;
    let url = Url::parse(BASE_URL).ok()?.join(&href).ok()?;
    let (_, q) = url.query_pairs().find(|(key, _)| key == "q")?;
    coordinate_pair(&q)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"
        <h1 class="product-title">Mənzil, 3 otaqlı</h1>
        <div class="product-price__i product-price__i--bold">
            <span class="price-val">125 000</span><span class="price-cur">AZN</span>
        </div>
        <span class="product-shop__owner-name">Rəşad</span>
        <ul><li class="phone-numbers__i"><a href="tel:+994 50 123 45 67">050</a></li></ul>
        <div class="product-properties__i">
            <label class="product-properties__i-name">Otaq sayı</label>
            <span class="product-properties__i-value">3</span>
        </div>
        <div class="product-description__content"><p>Təmirli</p><p>Metroya yaxın</p></div>
        <span class="product-info__statistics__i-text">Elanın nömrəsi: 1</span>
        <span class="product-info__statistics__i-text">Yeniləndi: 12.05.2024</span>
        <span class="product-info__statistics__i-text">347</span>
        <a class="shop--location" href="https://maps.google.com/?q=40.4093,49.8671">map</a>
    "#;

    #[test]
    fn extracts_full_detail_page() {
        let doc = ParsedDocument::parse(DETAIL);
        let fields = extractors().extract_all(&doc);
        let get = |name: &str| {
            fields
                .iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, v)| v.clone())
        };

        assert_eq!(get("title"), Some(FieldValue::Text("Mənzil, 3 otaqlı".into())));
        assert_eq!(get("phone_number"), Some(FieldValue::Text("+994 50 123 45 67".into())));
        assert_eq!(get("price"), Some(FieldValue::Integer(125_000)));
        assert_eq!(get("currency"), Some(FieldValue::Text("AZN".into())));
        assert_eq!(
            get("information"),
            Some(FieldValue::Text(r#"{"Otaq sayı":"3"}"#.into()))
        );
        assert_eq!(get("content"), Some(FieldValue::Text("Təmirli\nMetroya yaxın".into())));
        assert_eq!(get("views"), Some(FieldValue::Integer(347)));
        assert_eq!(
            get("created_date"),
            Some(FieldValue::Text("Yeniləndi: 12.05.2024".into()))
        );
        assert_eq!(get("latitude"), Some(FieldValue::Number(40.4093)));
        assert_eq!(get("longitude"), Some(FieldValue::Number(49.8671)));
    }

    #[test]
    fn missing_fields_are_null() {
        let doc = ParsedDocument::parse("<h1 class=\"product-title\">Only title</h1>");
        let fields = extractors().extract_all(&doc);
        let nulls = fields.iter().filter(|(_, v)| v.is_none()).count();
        // information always serializes, title is present
        assert_eq!(nulls, fields.len() - 2);
    }
}

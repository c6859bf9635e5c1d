//! lalafo.az: numbered index pages, 5s phone reveal, ids after the last dash

use std::time::Duration;

use anyhow::Result;

use super::{BuiltinSite, ListingIdStrategy, RevealInteraction, SiteDefaults, SiteProfile};
use crate::harvest_engine::{FieldValue, PaginationMode};
use crate::page_extractor::ExtractorSet;
use crate::page_extractor::helpers::{
    first_attr, first_text, labelled_pairs_json, nested_nth_text, number_or_text, text_value,
};

pub const BASE_URL: &str = "https://lalafo.az";
pub const INDEX_TEMPLATE: &str = "https://lalafo.az/?page={page}";
pub const FIRST_PAGE: u32 = 1;
pub const LAST_PAGE: u32 = 9999;
pub const MAX_CONCURRENT_JOBS: usize = 30;
pub const REVEAL_TIMEOUT: Duration = Duration::from_secs(5);

const AD_DATES: &str = "div.about-ad-info__date";

pub fn site() -> Result<BuiltinSite> {
    Ok(BuiltinSite {
        profile: profile()?,
        defaults: SiteDefaults {
            pagination: PaginationMode::counted(INDEX_TEMPLATE, FIRST_PAGE, LAST_PAGE),
            max_concurrent_jobs: MAX_CONCURRENT_JOBS,
        },
    })
}

pub fn profile() -> Result<SiteProfile> {
    Ok(SiteProfile::new("lalafo", BASE_URL, "a.lf-ad-tile__link")?
        .with_id_strategy(ListingIdStrategy::LastDashSegment)
        .with_reveal(
            RevealInteraction::required(".show-button", ".phone-item").with_timeout(REVEAL_TIMEOUT),
        )
        .with_extractors(extractors()))
}

pub fn extractors() -> ExtractorSet {
    ExtractorSet::new()
        .field("title", |doc| text_value(first_text(doc, "h1.ad-detail-title")))
        .field("phone_number", |doc| {
            first_attr(doc, "div.phone-number__wrap a", "href")
                .map(|href| href.replace("tel:", "").trim().to_string())
                .filter(|phone| !phone.is_empty())
                .map(FieldValue::Text)
        })
        .field("owner_name", |doc| text_value(first_text(doc, "span.userName-text")))
        .field("price", |doc| text_value(first_text(doc, "p.LFHeading")))
        .field("information", |doc| {
            Some(FieldValue::Text(labelled_pairs_json(
                doc,
                "ul.details-page__params li",
                "p",
                "a",
            )))
        })
        .field("content", |doc| {
            text_value(first_text(doc, "div.description__wrap span"))
        })
        .field("views", |doc| {
            first_text(doc, "div.impressions span").map(number_or_text)
        })
        .field("created_date", |doc| {
            text_value(nested_nth_text(doc, AD_DATES, 0, "span", 1))
        })
        .field("updated_date", |doc| {
            text_value(nested_nth_text(doc, AD_DATES, 1, "span", 1))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_extractor::ParsedDocument;

    #[test]
    fn listing_id_is_last_dash_segment() {
        let profile = profile().unwrap();
        let doc = ParsedDocument::parse(
            r#"<a class="lf-ad-tile__link" href="/baku/ads/iphone-13-pro-id-104823948">x</a>"#,
        );
        let refs = profile.scan_listings(&doc, 1);
        assert_eq!(refs[0].listing_id(), "104823948");
    }

    #[test]
    fn dates_come_from_second_span() {
        let doc = ParsedDocument::parse(
            r#"<div class="about-ad-info__date"><span>Yaradılıb:</span><span>01.03.2024</span></div>
               <div class="about-ad-info__date"><span>Yenilənib:</span><span>05.03.2024</span></div>"#,
        );
        let fields = extractors().extract_all(&doc);
        let get = |name: &str| fields.iter().find(|(n, _)| n == name).and_then(|(_, v)| v.clone());
        assert_eq!(get("created_date"), Some(FieldValue::Text("01.03.2024".into())));
        assert_eq!(get("updated_date"), Some(FieldValue::Text("05.03.2024".into())));
    }
}

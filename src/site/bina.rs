//! bina.az: numbered index pages, phones behind `.product-phones__btn-value`

use anyhow::Result;

use super::{BuiltinSite, RevealInteraction, SiteDefaults, SiteProfile};
use crate::harvest_engine::{FieldValue, PaginationMode};
use crate::page_extractor::ExtractorSet;
use crate::page_extractor::helpers::{
    first_attr, first_text, joined_text, labelled_pairs_json, nth_text, number_or_text,
    parse_number, strip_whitespace, text_value,
};

pub const BASE_URL: &str = "https://bina.az";
pub const INDEX_TEMPLATE: &str = "https://bina.az/alqi-satqi?page={page}";
pub const FIRST_PAGE: u32 = 1;
pub const LAST_PAGE: u32 = 199;
pub const MAX_CONCURRENT_JOBS: usize = 30;

const PRICE_BLOCK: &str = "div.product-price__i.product-price__i--bold";
const STATISTICS: &str = "span.product-statistics__i-text";

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
    Ok(SiteProfile::new("bina", BASE_URL, "div.items-i")?
        .with_reveal(RevealInteraction::required(
            ".product-phones__btn-value",
            ".product-phones__list-i",
        ))
        .with_extractors(extractors()))
}

pub fn extractors() -> ExtractorSet {
    ExtractorSet::new()
        .field("phone_number", |doc| {
            first_attr(doc, "div.product-phones__list-i a", "href").map(|href| {
                FieldValue::Text(strip_whitespace(&href.replace("tel:", "").replace('-', "")))
            })
        })
        .field("owner_name", |doc| {
            text_value(first_text(doc, "div.product-owner__info-name"))
        })
        .field("owner_category", |doc| {
            text_value(first_text(doc, "div.product-owner__info-region"))
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
        .field("latitude", |doc| {
            first_attr(doc, "#item_map", "data-lat").and_then(|v| parse_number(&v))
        })
        .field("longitude", |doc| {
            first_attr(doc, "#item_map", "data-lng").and_then(|v| parse_number(&v))
        })
        .field("content", |doc| {
            text_value(joined_text(doc, "div.product-description__content p", "\n"))
        })
        .field("updated_date", |doc| text_value(nth_text(doc, STATISTICS, 0)))
        .field("views", |doc| nth_text(doc, STATISTICS, 1).map(number_or_text))
}

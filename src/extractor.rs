//! Listing extraction from search result pages.
//!
//! Selectors are fixed to the markup the search page renders today. When the
//! markup changes, extraction degrades to empty fields or an empty page; it
//! never errors.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::data_models::ListingPreview;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e}"))
}

static CARD: Lazy<Selector> = Lazy::new(|| selector(".srp-results li.s-item"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a.s-item__link"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector(".s-item__title>span"));
static PRICE: Lazy<Selector> = Lazy::new(|| selector(".s-item__price"));
static SHIPPING: Lazy<Selector> = Lazy::new(|| selector(".s-item__shipping"));
static LIST_DATE: Lazy<Selector> = Lazy::new(|| selector(".s-item__listingDate span"));
static SUBTITLE: Lazy<Selector> = Lazy::new(|| selector(".s-item__subtitle"));
static CONDITION: Lazy<Selector> = Lazy::new(|| selector(".s-item__subtitle .SECONDARY_INFO"));
static PHOTO: Lazy<Selector> = Lazy::new(|| selector(".s-item__image img"));
static RATING: Lazy<Selector> = Lazy::new(|| selector(".s-item__reviews .clipped"));
static RATING_COUNT: Lazy<Selector> = Lazy::new(|| selector(".s-item__reviews-count span"));
static RESULT_COUNT: Lazy<Selector> =
    Lazy::new(|| selector(".srp-controls__count-heading>span"));

/// Returns every listing card on the page in document order. A page without
/// cards (past the last page, or no matches) yields an empty vec.
pub fn extract_listings(body: &str) -> Vec<ListingPreview> {
    let document = Html::parse_document(body);
    document.select(&CARD).map(extract_card).collect()
}

fn extract_card(card: ElementRef<'_>) -> ListingPreview {
    let url = first_attr(card, &LINK, "href");
    let url = url.split('?').next().unwrap_or_default().to_string();

    ListingPreview {
        url,
        title: first_text(card, &TITLE),
        price: first_text(card, &PRICE),
        shipping: first_text(card, &SHIPPING),
        list_date: first_text(card, &LIST_DATE),
        subtitles: all_text(card, &SUBTITLE),
        condition: first_text(card, &CONDITION),
        photo: first_attr(card, &PHOTO, "src"),
        rating: first_text(card, &RATING),
        rating_count: first_text(card, &RATING_COUNT),
    }
}

/// Advertised number of results ("1,234 results"), thousands separators
/// removed. `None` when the heading is absent or not a number.
pub fn extract_total_results(body: &str) -> Option<u64> {
    let document = Html::parse_document(body);
    let heading = document.root_element();
    let raw = first_text(heading, &RESULT_COUNT);
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    digits.trim().parse().ok()
}

/// ceil(total / items_per_page). Zero results still means one page.
pub fn page_ceiling(total_results: u64, items_per_page: u32) -> u64 {
    let per_page = u64::from(items_per_page.max(1));
    total_results.div_ceil(per_page).max(1)
}

// direct text children only, like `::text` in a css query
fn own_text(element: ElementRef<'_>) -> impl Iterator<Item = &str> {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .flat_map(own_text)
        .next()
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

fn all_text(scope: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    scope
        .select(selector)
        .flat_map(own_text)
        .map(str::to_string)
        .collect()
}

fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> String {
    scope
        .select(selector)
        .find_map(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

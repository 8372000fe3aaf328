//! Price-per-terabyte ranking layered on top of search results.
//!
//! Capacity grammar: the first `<digits>[.<digits>]` immediately followed
//! (optionally after one space) by `tb` or `gb`, case-insensitive, with no
//! letter or digit directly before the number or after the unit. GB values
//! are converted at 1000 GB per TB.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::data_models::ListingPreview;

static CAPACITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9a-z.])(\d+(?:\.\d+)?) ?(tb|gb)(?:$|[^0-9a-z])")
        .unwrap_or_else(|e| panic!("invalid capacity pattern: {e}"))
});
static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap_or_else(|e| panic!("invalid amount pattern: {e}"))
});

/// Capacity in terabytes parsed from a listing title.
pub fn parse_capacity_tb(title: &str) -> Option<f64> {
    let caps = CAPACITY.captures(title)?;
    let value: f64 = caps[1].parse().ok()?;
    if value <= 0.0 {
        return None;
    }
    match caps[2].to_ascii_lowercase().as_str() {
        "tb" => Some(value),
        _ => Some(value / 1000.0),
    }
}

/// First money amount in a price string. "$1,299.99" and
/// "$10.00 to $20.00" parse to 1299.99 and 10.0.
pub fn parse_price(text: &str) -> Option<f64> {
    let found = AMOUNT.find(text)?;
    found.as_str().replace(',', "").parse().ok()
}

/// Shipping cost; free or unlisted shipping counts as zero.
pub fn parse_shipping(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.to_lowercase().starts_with("free") {
        return Some(0.0);
    }
    parse_price(trimmed)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapacityFilter {
    /// Conditions to drop, compared case-insensitively.
    pub excluded_conditions: Vec<String>,
    /// Title substrings to drop, compared case-insensitively.
    pub excluded_title_terms: Vec<String>,
    /// Offers at or below this price per TB are treated as bogus.
    pub min_price_per_tb: f64,
}

impl Default for CapacityFilter {
    fn default() -> Self {
        Self {
            excluded_conditions: vec!["Parts Only".to_string()],
            excluded_title_terms: vec!["sas".to_string()],
            min_price_per_tb: 0.2,
        }
    }
}

impl CapacityFilter {
    fn accepts(&self, listing: &ListingPreview, price_per_tb: f64) -> bool {
        let title = listing.title.to_lowercase();
        let condition = listing.condition.to_lowercase();
        price_per_tb > self.min_price_per_tb
            && !self
                .excluded_conditions
                .iter()
                .any(|c| c.to_lowercase() == condition)
            && !self
                .excluded_title_terms
                .iter()
                .any(|t| title.contains(&t.to_lowercase()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CapacityOffer {
    pub title: String,
    pub price: String,
    pub size_tb: f64,
    pub price_per_tb: f64,
    pub link: String,
    pub condition: String,
}

impl CapacityOffer {
    pub fn from_listing(listing: &ListingPreview) -> Option<CapacityOffer> {
        let size_tb = parse_capacity_tb(&listing.title)?;
        let price = parse_price(&listing.price)?;
        let shipping = parse_shipping(&listing.shipping)?;
        Some(CapacityOffer {
            title: listing.title.clone(),
            price: listing.price.clone(),
            size_tb,
            price_per_tb: (price + shipping) / size_tb,
            link: listing.url.clone(),
            condition: listing.condition.clone(),
        })
    }
}

/// Offers with a readable capacity and price that pass `filter`, cheapest
/// per TB first.
pub fn rank_by_price_per_tb(
    listings: &[ListingPreview],
    filter: &CapacityFilter,
) -> Vec<CapacityOffer> {
    let mut offers: Vec<CapacityOffer> = listings
        .iter()
        .filter_map(|listing| {
            let offer = CapacityOffer::from_listing(listing);
            if offer.is_none() {
                log::debug!("no capacity or price in {:?}", listing.title);
            }
            offer.filter(|o| filter.accepts(listing, o.price_per_tb))
        })
        .collect();
    offers.sort_by(|a, b| a.price_per_tb.total_cmp(&b.price_per_tb));
    offers
}

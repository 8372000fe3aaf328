use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use reqwest::{Url, Version};
use serde::{Deserialize, Serialize};

use crate::errors::QueryError;

/// Largest page size the search page accepts.
pub const MAX_ITEMS_PER_PAGE: u32 = 240;
pub const DEFAULT_MAX_PAGES: u32 = 1000;

#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SortMode {
    BestMatch,
    EndingSoonest,
    #[default]
    NewlyListed,
}

impl SortMode {
    /// Value sent as the `_sop` query parameter.
    pub fn sort_code(self) -> u8 {
        match self {
            SortMode::BestMatch => 12,
            SortMode::EndingSoonest => 1,
            SortMode::NewlyListed => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::BestMatch => "best_match",
            SortMode::EndingSoonest => "ending_soonest",
            SortMode::NewlyListed => "newly_listed",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "best_match" => Ok(SortMode::BestMatch),
            "ending_soonest" => Ok(SortMode::EndingSoonest),
            "newly_listed" => Ok(SortMode::NewlyListed),
            other => Err(QueryError::UnknownSort(other.to_string())),
        }
    }
}

/// How the number of pages to fetch is decided once page 1 is in hand.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum PageCountPolicy {
    /// ceil(advertised results / items per page), clamped to `max_pages`.
    /// Falls back to `max_pages` when page 1 carries no usable count.
    #[default]
    Discover,
    /// Fetch exactly `max_pages` pages, ignoring the advertised count.
    #[value(alias = "cap")]
    CallerCap,
}

impl FromStr for PageCountPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discover" => Ok(PageCountPolicy::Discover),
            "cap" | "caller_cap" | "caller-cap" => Ok(PageCountPolicy::CallerCap),
            other => Err(format!("unknown page count policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    /// 0 searches all categories.
    pub category: u32,
    pub items_per_page: u32,
    pub sort: SortMode,
    pub max_pages: u32,
    /// Restrict to fixed-price, buy-it-now listings.
    pub buy_it_now_only: bool,
    pub page_count: PageCountPolicy,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>) -> SearchQuery {
        SearchQuery {
            keyword: keyword.into(),
            category: 0,
            items_per_page: MAX_ITEMS_PER_PAGE,
            sort: SortMode::default(),
            max_pages: DEFAULT_MAX_PAGES,
            buy_it_now_only: true,
            page_count: PageCountPolicy::default(),
        }
    }

    pub fn with_category(mut self, category: u32) -> Self {
        self.category = category;
        self
    }

    pub fn with_items_per_page(mut self, items_per_page: u32) -> Self {
        self.items_per_page = items_per_page;
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_buy_it_now_only(mut self, buy_it_now_only: bool) -> Self {
        self.buy_it_now_only = buy_it_now_only;
        self
    }

    pub fn with_page_count(mut self, page_count: PageCountPolicy) -> Self {
        self.page_count = page_count;
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.keyword.trim().is_empty() {
            return Err(QueryError::EmptyKeyword);
        }
        if self.items_per_page == 0 || self.items_per_page > MAX_ITEMS_PER_PAGE {
            return Err(QueryError::ItemsPerPage {
                got: self.items_per_page,
                max: MAX_ITEMS_PER_PAGE,
            });
        }
        if self.max_pages == 0 {
            return Err(QueryError::ZeroMaxPages);
        }
        Ok(())
    }

    /// Builds the search url for `page` (1-based) on top of `base`.
    pub fn page_request(&self, base: &Url, page: u32) -> PageRequest {
        let mut url = base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("_nkw", &self.keyword)
                .append_pair("_sacat", &self.category.to_string())
                .append_pair("_ipg", &self.items_per_page.to_string())
                .append_pair("_sop", &self.sort.sort_code().to_string())
                .append_pair("_pgn", &page.to_string());
            if self.buy_it_now_only {
                pairs.append_pair("LH_BIN", "1");
            }
        }
        PageRequest { page, url }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub url: Url,
}

/// A fetched page body, tagged with its page number since pages 2..N
/// complete in any order.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub page: u32,
    pub url: String,
    /// Protocol the response came back on.
    pub version: Version,
    pub body: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPreview {
    pub url: String,
    pub title: String,
    pub price: String,
    pub shipping: String,
    pub list_date: String,
    pub subtitles: Vec<String>,
    pub condition: String,
    pub photo: String,
    pub rating: String,
    pub rating_count: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub page: u32,
    pub url: String,
    pub reason: String,
}

/// Outcome of a run with per-page bookkeeping. `listings` has the same
/// content and order as the plain `run` result.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchReport {
    pub run_id: String,
    pub listings: Vec<ListingPreview>,
    /// Pages requested, page 1 included.
    pub page_count: u32,
    /// Advertised result total from page 1, when it was looked up and found.
    pub total_results: Option<u64>,
    /// Pages 2..N in the order they settled.
    pub completion_order: Vec<u32>,
    pub failures: Vec<PageFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SearchReport {
    pub fn pages_succeeded(&self) -> u32 {
        self.page_count - self.failures.len() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

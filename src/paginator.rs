use chrono::Utc;
use futures::stream::{self, StreamExt};
use nanoid::nanoid;
use reqwest::Url;

use crate::data_models::{
    ListingPreview, PageCountPolicy, PageFailure, PageRequest, SearchQuery, SearchReport,
};
use crate::errors::{QueryError, SearchError};
use crate::extractor::{extract_listings, extract_total_results, page_ceiling};
use crate::fetcher::PageSource;

/// Fetches page 1, decides how many pages exist, then fetches the rest
/// concurrently. Pages 2..N land in the output in the order they finish,
/// which is not page order. A failed page after the first is logged and
/// skipped; only a failed first page fails the run.
pub struct SearchPaginator<S> {
    source: S,
    base_url: Url,
    max_concurrency: Option<usize>,
}

/// How page count was settled for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    pub page_count: u32,
    pub total_results: Option<u64>,
}

impl<S: PageSource> SearchPaginator<S> {
    pub fn new(source: S, base_url: &str) -> Result<SearchPaginator<S>, QueryError> {
        let base_url = Url::parse(base_url).map_err(|e| QueryError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(SearchPaginator {
            source,
            base_url,
            max_concurrency: None,
        })
    }

    /// Caps how many of pages 2..N are in flight at once. `None` or zero
    /// means no cap.
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency.filter(|n| *n > 0);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn request_for(&self, query: &SearchQuery, page: u32) -> PageRequest {
        query.page_request(&self.base_url, page)
    }

    pub async fn run(&self, query: &SearchQuery) -> Result<Vec<ListingPreview>, SearchError> {
        Ok(self.run_with_report(query).await?.listings)
    }

    pub async fn run_with_report(&self, query: &SearchQuery) -> Result<SearchReport, SearchError> {
        query.validate()?;
        let run_id = nanoid!(8);
        let started_at = Utc::now();

        let first = self.request_for(query, 1);
        log::info!("[{run_id}] fetching page 1: {}", first.url);
        let first_page = self
            .source
            .fetch(&first)
            .await
            .map_err(|source| SearchError::FirstPage {
                url: first.url.to_string(),
                source,
            })?;

        let mut listings = extract_listings(&first_page.body);
        log::info!(
            "[{run_id}] page 1: {} listings over {:?}",
            listings.len(),
            first_page.version
        );

        let plan = resolve_page_count(query, &first_page.body);
        let mut failures = Vec::new();
        let mut completion_order = Vec::new();

        if plan.page_count > 1 {
            log::info!(
                "[{run_id}] fetching pages 2..={} (advertised results: {:?})",
                plan.page_count,
                plan.total_results
            );
            let requests: Vec<PageRequest> = (2..=plan.page_count)
                .map(|page| self.request_for(query, page))
                .collect();
            let in_flight = self.max_concurrency.unwrap_or(requests.len()).max(1);

            let mut settled = stream::iter(requests)
                .map(|request| async move {
                    let result = self.source.fetch(&request).await;
                    (request, result)
                })
                .buffer_unordered(in_flight);

            while let Some((request, result)) = settled.next().await {
                match result {
                    Ok(raw) => {
                        let page_listings = extract_listings(&raw.body);
                        log::debug!(
                            "[{run_id}] page {} ({}, {:?}): {} listings",
                            raw.page,
                            raw.url,
                            raw.version,
                            page_listings.len()
                        );
                        completion_order.push(raw.page);
                        listings.extend(page_listings);
                    }
                    Err(e) => {
                        let failure = PageFailure {
                            page: request.page,
                            url: request.url.to_string(),
                            reason: e.to_string(),
                        };
                        log::warn!(
                            "[{run_id}] failed to scrape search page {} ({}): {}",
                            failure.page,
                            failure.url,
                            failure.reason
                        );
                        completion_order.push(failure.page);
                        failures.push(failure);
                    }
                }
            }
        }

        log::info!(
            "[{run_id}] done: {} listings from {}/{} pages",
            listings.len(),
            plan.page_count - failures.len() as u32,
            plan.page_count
        );

        Ok(SearchReport {
            run_id,
            listings,
            page_count: plan.page_count,
            total_results: plan.total_results,
            completion_order,
            failures,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Decides how many pages a run covers, given page 1's body.
///
/// `max_pages == 1` skips the count lookup entirely. Otherwise
/// [`PageCountPolicy::Discover`] clamps the advertised page ceiling to
/// `max_pages` (falling back to `max_pages` when page 1 has no count), and
/// [`PageCountPolicy::CallerCap`] uses `max_pages` as is.
pub fn resolve_page_count(query: &SearchQuery, first_body: &str) -> PagePlan {
    if query.max_pages <= 1 {
        return PagePlan {
            page_count: 1,
            total_results: None,
        };
    }
    match query.page_count {
        PageCountPolicy::CallerCap => PagePlan {
            page_count: query.max_pages,
            total_results: None,
        },
        PageCountPolicy::Discover => match extract_total_results(first_body) {
            Some(total) => {
                let ceiling = page_ceiling(total, query.items_per_page);
                let page_count = ceiling.min(u64::from(query.max_pages)) as u32;
                PagePlan {
                    page_count,
                    total_results: Some(total),
                }
            }
            None => {
                log::warn!(
                    "no result count on page 1, falling back to max pages ({})",
                    query.max_pages
                );
                PagePlan {
                    page_count: query.max_pages,
                    total_results: None,
                }
            }
        },
    }
}

use thiserror::Error;

/// Failure of a single page request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Rejected search parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("search keyword cannot be empty")]
    EmptyKeyword,
    #[error("items per page must be between 1 and {max}, got {got}")]
    ItemsPerPage { got: u32, max: u32 },
    #[error("max pages must be at least 1")]
    ZeroMaxPages,
    #[error("invalid base url {url}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("unknown sort mode: {0}")]
    UnknownSort(String),
}

/// Errors that abort a whole search run. Only the first page can produce one;
/// failures of later pages are recorded per page instead.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    Query(#[from] QueryError),
    #[error("first page ({url}) could not be fetched: {source}")]
    FirstPage {
        url: String,
        #[source]
        source: FetchError,
    },
}

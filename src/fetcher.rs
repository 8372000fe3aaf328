use std::future::Future;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::config::FetcherConfig;
use crate::data_models::{PageRequest, RawPage};
use crate::errors::FetchError;

/// Anything that can turn a page request into a page body.
pub trait PageSource: Send + Sync {
    fn fetch(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<RawPage, FetchError>> + Send;
}

/// HTTP fetcher around one shared, connection-pooled client.
/// Clones share the same pool.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl PageFetcher {
    pub fn new(config: &FetcherConfig) -> Result<PageFetcher, FetchError> {
        let mut builder = reqwest::Client::builder();
        if !config.use_env_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .default_headers(Self::default_headers(config))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;
        Ok(PageFetcher {
            client,
            request_timeout: config.request_timeout,
        })
    }

    fn default_headers(config: &FetcherConfig) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let pairs = [
            (header::USER_AGENT, &config.user_agent),
            (header::ACCEPT, &config.accept),
            (header::ACCEPT_LANGUAGE, &config.accept_language),
            (header::ACCEPT_ENCODING, &config.accept_encoding),
        ];
        for (name, value) in pairs {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(e) => log::warn!("skipping invalid {name} header value: {e}"),
            }
        }
        headers
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<RawPage, FetchError> {
        let res = self
            .client
            .get(request.url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: request.url.to_string(),
            });
        }

        let version = res.version();
        let body = res.text().await.map_err(|e| self.classify(e))?;
        log::debug!(
            "fetched page {} over {:?}: {} bytes",
            request.page,
            version,
            body.len()
        );
        Ok(RawPage {
            page: request.page,
            url: request.url.to_string(),
            version,
            body,
        })
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.request_timeout)
        } else {
            FetchError::Http(e)
        }
    }
}

impl PageSource for PageFetcher {
    fn fetch(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<RawPage, FetchError>> + Send {
        self.fetch_page(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers_carry_browser_profile() {
        let config = FetcherConfig::default();
        let headers = PageFetcher::default_headers(&config);
        assert!(
            headers[header::USER_AGENT]
                .to_str()
                .unwrap()
                .starts_with("Mozilla/5.0")
        );
        assert_eq!(headers[header::ACCEPT_LANGUAGE], "en-US,en;q=0.9");
        assert_eq!(headers[header::ACCEPT_ENCODING], "gzip, deflate, br");
        assert!(headers.contains_key(header::ACCEPT));
    }

    #[test]
    fn test_invalid_header_value_is_skipped() {
        let config = FetcherConfig {
            user_agent: "bad\nagent".to_string(),
            ..FetcherConfig::default()
        };
        let headers = PageFetcher::default_headers(&config);
        assert!(!headers.contains_key(header::USER_AGENT));
        assert!(headers.contains_key(header::ACCEPT));
    }

    #[test]
    fn test_fetcher_builds_from_default_config() {
        assert!(PageFetcher::new(&FetcherConfig::default()).is_ok());
    }

    mod local_server {
        use super::*;
        use crate::data_models::SearchQuery;
        use reqwest::{Url, Version};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        /// Serves one connection: reads the request head, then writes
        /// `response` (or holds the socket open when `None`).
        pub async fn serve_once(response: Option<String>) -> Url {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                match response {
                    Some(response) => {
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    None => tokio::time::sleep(Duration::from_secs(5)).await,
                }
            });
            Url::parse(&format!("http://{addr}/sch/i.html")).unwrap()
        }

        pub fn http_response(status: &str, body: &str) -> String {
            format!(
                "HTTP/1.1 {status}\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            )
        }

        fn fetcher(request_timeout: Duration) -> PageFetcher {
            PageFetcher::new(&FetcherConfig {
                request_timeout,
                use_env_proxy: false,
                ..FetcherConfig::default()
            })
            .unwrap()
        }

        #[tokio::test]
        async fn test_success_carries_page_number_and_url() {
            let base = serve_once(Some(http_response("200 OK", "<html>listings</html>"))).await;
            let request = SearchQuery::new("ssd").page_request(&base, 4);

            let page = fetcher(Duration::from_secs(5))
                .fetch(&request)
                .await
                .unwrap();

            assert_eq!(page.page, 4);
            assert_eq!(page.url, request.url.to_string());
            assert!(page.url.contains("_pgn=4"));
            assert_eq!(page.version, Version::HTTP_11);
            assert_eq!(page.body, "<html>listings</html>");
        }

        #[tokio::test]
        async fn test_non_success_status_is_an_error() {
            let base = serve_once(Some(http_response("503 Service Unavailable", "busy"))).await;
            let request = SearchQuery::new("ssd").page_request(&base, 2);

            let err = fetcher(Duration::from_secs(5))
                .fetch(&request)
                .await
                .unwrap_err();

            match err {
                FetchError::Status { status, url } => {
                    assert_eq!(status, 503);
                    assert!(url.contains("_pgn=2"));
                }
                other => panic!("expected status error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_silent_server_times_out() {
            let base = serve_once(None).await;
            let request = SearchQuery::new("ssd").page_request(&base, 3);

            let err = fetcher(Duration::from_millis(100))
                .fetch(&request)
                .await
                .unwrap_err();

            assert!(
                matches!(err, FetchError::Timeout(d) if d == Duration::from_millis(100)),
                "expected timeout, got {err:?}"
            );
        }
    }
}

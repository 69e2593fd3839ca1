//! Offset/limit pagination over the free phone-numbers resource
//!
//! Pages are requested strictly one after another. The crawl stops on the
//! first page that is empty, short, or explicitly flagged as the last one.
//! A short page always stops the crawl, even if it claims `has_more: true`.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::extract::{extract_value, PHONE_NUMBER_FIELDS};
use super::fallback::{self, FallbackReport};
use super::normalize::normalize;
use super::phone::PhoneNumberSet;
use crate::api::error::ApiError;
use crate::api::http::ApiHttpClient;

/// Default page size
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Hard ceiling on pages per crawl, in case a server keeps returning full pages
pub const MAX_PAGES: usize = 10_000;

/// Offset/limit position of the next page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub offset: usize,
    pub limit: usize,
}

impl PaginationCursor {
    pub fn new(limit: usize) -> Self {
        Self {
            offset: 0,
            limit: limit.max(1),
        }
    }

    /// Move past a fully-sized page
    pub fn advance(&mut self) {
        self.offset += self.limit;
    }

    fn query_pairs(&self) -> [(String, String); 2] {
        [
            ("offset".to_string(), self.offset.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ]
    }
}

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Empty page, short page, or `has_more: false`
    Exhausted,
    /// 401 from the server
    Unauthorized,
    /// 404 from the server
    NotFound,
    /// [`MAX_PAGES`] reached
    PageCap,
}

/// Outcome of a single crawl over one resource URL
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub numbers: PhoneNumberSet,
    pub pages: usize,
    pub stop: StopReason,
}

/// Full result of fetching free numbers for one connection
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub url: String,
    pub numbers: PhoneNumberSet,
    pub pages: usize,
    pub stop: StopReason,
    /// Separate accumulation from the `/endpoints` fallback, if it ran
    pub fallback: Option<FallbackReport>,
    pub fetched_at: DateTime<Utc>,
}

impl FetchReport {
    /// Numbers from the primary crawl and the fallback together
    pub fn all_numbers(&self) -> PhoneNumberSet {
        let mut all = self.numbers.clone();
        if let Some(fallback) = &self.fallback {
            all.extend(fallback.numbers.clone());
        }
        all
    }

    pub fn is_unauthorized(&self) -> bool {
        self.stop == StopReason::Unauthorized
    }
}

/// Drives paginated GETs against one backend with one token
#[derive(Debug, Clone, Copy)]
pub struct PageFetcher<'a> {
    http: &'a ApiHttpClient,
    token: &'a str,
    page_limit: usize,
}

impl<'a> PageFetcher<'a> {
    pub fn new(http: &'a ApiHttpClient, token: &'a str, page_limit: usize) -> Self {
        Self {
            http,
            token,
            page_limit: page_limit.max(1),
        }
    }

    pub fn page_limit(&self) -> usize {
        self.page_limit
    }

    /// Fetch every page of `url`, falling back to `/endpoints` on a 404.
    ///
    /// 401 and 404 end the crawl without an error; the report carries
    /// whatever was collected. Other error statuses and transport failures
    /// are returned as errors.
    pub fn fetch_all(
        &self,
        url: &str,
        extra_query: &[(String, String)],
    ) -> Result<FetchReport, ApiError> {
        let outcome = self.crawl(url, extra_query, PHONE_NUMBER_FIELDS)?;

        let fallback = match outcome.stop {
            StopReason::NotFound => fallback::resolve(self, url),
            StopReason::Unauthorized => {
                warn!("Token rejected while fetching {}, stopping", url);
                None
            }
            _ => None,
        };

        let report = FetchReport {
            url: url.to_string(),
            numbers: outcome.numbers,
            pages: outcome.pages,
            stop: outcome.stop,
            fallback,
            fetched_at: Utc::now(),
        };
        info!(
            "Fetched {} numbers over {} page(s) from {}",
            report.all_numbers().len(),
            report.pages,
            url
        );
        Ok(report)
    }

    /// Paginate one URL, extracting values with `fields`
    pub(crate) fn crawl(
        &self,
        url: &str,
        extra_query: &[(String, String)],
        fields: &[&str],
    ) -> Result<CrawlOutcome, ApiError> {
        let mut cursor = PaginationCursor::new(self.page_limit);
        let mut numbers = PhoneNumberSet::new();
        let mut pages = 0;

        let stop = loop {
            if pages >= MAX_PAGES {
                warn!("Stopping {} after {} pages", url, pages);
                break StopReason::PageCap;
            }

            let mut query = extra_query.to_vec();
            query.extend(cursor.query_pairs());

            let response = self.http.get(url, Some(self.token), &query)?;
            match response.status {
                StatusCode::UNAUTHORIZED => break StopReason::Unauthorized,
                StatusCode::NOT_FOUND => break StopReason::NotFound,
                status if status.is_client_error() || status.is_server_error() => {
                    return Err(ApiError::from_status(status, &response.url, response.text));
                }
                _ => {}
            }

            let body = response.json().unwrap_or_else(|e| {
                warn!("Undecodable page at offset {}: {}", cursor.offset, e);
                Value::Null
            });
            let page = normalize(&body, cursor.limit);
            pages += 1;

            for item in &page.items {
                numbers.insert(&extract_value(item, fields));
            }
            debug!(
                "Page {}: {} items (total so far: {})",
                pages,
                page.items.len(),
                numbers.len()
            );

            if page.items.is_empty() || page.items.len() < cursor.limit || !page.has_more {
                break StopReason::Exhausted;
            }
            cursor.advance();
        };

        Ok(CrawlOutcome {
            numbers,
            pages,
            stop,
        })
    }
}

/// Resolve the phone-numbers URL for an API URL.
///
/// URLs already pointing at `/phone-numbers` are used as-is; anything else
/// is treated as a base URL.
pub fn phone_numbers_url(api_url: &str) -> String {
    if api_url.contains("/phone-numbers") {
        api_url.to_string()
    } else {
        format!("{}/phone-numbers", api_url.trim_end_matches('/'))
    }
}

/// Fetch all free phone numbers reachable from `api_url`
pub fn fetch_available_numbers(
    http: &ApiHttpClient,
    token: &str,
    api_url: &str,
    page_limit: usize,
) -> Result<FetchReport, ApiError> {
    let url = phone_numbers_url(api_url);
    let query = vec![("show_free_phone_numbers".to_string(), "true".to_string())];
    PageFetcher::new(http, token, page_limit).fetch_all(&url, &query)
}

//! `/endpoints` fallback for providers without a phone-numbers resource
//!
//! Some providers (tata_tele, for one) answer 404 on
//! `.../channels/v2v/providers/{provider}/connections/{id}/phone-numbers`.
//! Their numbers live under the sibling resource
//! `.../connections/{id}/endpoints`, without the provider segment.

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::extract::ENDPOINT_FIELDS;
use super::fetcher::PageFetcher;
use super::phone::PhoneNumberSet;

/// Path segment that marks a provider-scoped connection URL
pub const PROVIDER_SEGMENT: &str = "/channels/v2v/providers/";

/// Result of a fallback run against the `/endpoints` resource
#[derive(Debug, Clone, Default, Serialize)]
pub struct FallbackReport {
    pub url: String,
    pub numbers: PhoneNumberSet,
    pub pages: usize,
}

/// Rewrite a provider-scoped phone-numbers URL into its `/endpoints` sibling.
///
/// Returns `None` when the URL does not follow
/// `{prefix}/channels/v2v/providers/{p}/connections/{id}/phone-numbers`.
/// Any query string or fragment is dropped.
pub fn endpoints_fallback_url(primary_url: &str) -> Option<String> {
    let mut url = Url::parse(primary_url).ok()?;
    let path = url.path().to_string();
    let marker = path.find(PROVIDER_SEGMENT)?;
    let prefix = &path[..marker];
    let rest: Vec<&str> = path[marker + PROVIDER_SEGMENT.len()..].split('/').collect();

    let connection_id = match rest.as_slice() {
        [provider, "connections", connection_id, "phone-numbers"]
        | [provider, "connections", connection_id, "phone-numbers", ""]
            if !provider.is_empty() && !connection_id.is_empty() =>
        {
            *connection_id
        }
        _ => return None,
    };

    url.set_path(&format!("{prefix}/connections/{connection_id}/endpoints"));
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// Crawl the `/endpoints` sibling of `primary_url`.
///
/// Never fails: an unmatched URL, an error status or a transport failure
/// all yield an empty result.
pub fn resolve(fetcher: &PageFetcher<'_>, primary_url: &str) -> Option<FallbackReport> {
    let Some(url) = endpoints_fallback_url(primary_url) else {
        debug!("No /endpoints fallback for {}", primary_url);
        return None;
    };

    info!("Phone-numbers resource missing, falling back to {}", url);
    let query = vec![("show_free_endpoints".to_string(), "false".to_string())];

    match fetcher.crawl(&url, &query, ENDPOINT_FIELDS) {
        Ok(outcome) => Some(FallbackReport {
            url,
            numbers: outcome.numbers,
            pages: outcome.pages,
        }),
        Err(e) => {
            warn!("Fallback fetch from {} failed: {}", url, e);
            Some(FallbackReport {
                url,
                ..Default::default()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: &str = "https://api.example.com/api/app-authoring/orgs/acme/workspaces/ws-1/channels/v2v/providers/tata_tele/connections/conn-7/phone-numbers";

    #[test]
    fn test_rewrites_provider_url() {
        assert_eq!(
            endpoints_fallback_url(PRIMARY).as_deref(),
            Some("https://api.example.com/api/app-authoring/orgs/acme/workspaces/ws-1/connections/conn-7/endpoints")
        );
    }

    #[test]
    fn test_rewrite_is_exact_segment_removal() {
        let rewritten = endpoints_fallback_url(PRIMARY).expect("pattern matches");
        let expected = PRIMARY
            .replace("/channels/v2v/providers/tata_tele/", "/")
            .replace("/phone-numbers", "/endpoints");
        assert_eq!(rewritten, expected);
    }

    #[test]
    fn test_trailing_slash_and_query_are_tolerated() {
        let url = format!("{PRIMARY}/?show_free_phone_numbers=true");
        assert_eq!(
            endpoints_fallback_url(&url).as_deref(),
            Some("https://api.example.com/api/app-authoring/orgs/acme/workspaces/ws-1/connections/conn-7/endpoints")
        );
    }

    #[test]
    fn test_unmatched_urls() {
        assert!(endpoints_fallback_url("https://api.example.com/phone-numbers").is_none());
        assert!(endpoints_fallback_url(
            "https://h/x/channels/v2v/providers/exotel/connections//phone-numbers"
        )
        .is_none());
        assert!(endpoints_fallback_url(
            "https://h/x/channels/v2v/providers/exotel/connections/c1/numbers"
        )
        .is_none());
        assert!(endpoints_fallback_url("not a url").is_none());
    }
}

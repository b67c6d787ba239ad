//! Hop-by-hop redirect resolution with per-hop safety validation.
//!
//! Automatic redirect following is disabled so every hop passes the safety
//! policy before it is probed. Probes are header-only HEAD requests with a
//! fixed timeout. Many origins reject HEAD outright, so a non-timeout network
//! failure is treated as "no redirect, current URL is final" rather than an
//! error.

use axum::http::header::LOCATION;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::config::SafetyConfig;
use crate::errors::{Error, Result};
use crate::safety::network::SafetyPolicy;

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub final_url: Url,
    pub hops: usize,
}

pub struct UrlResolver {
    client: reqwest::Client,
    policy: Arc<dyn SafetyPolicy>,
    max_hops: usize,
    probe_timeout: Duration,
}

impl UrlResolver {
    pub fn new(policy: Arc<dyn SafetyPolicy>, config: &SafetyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Internal {
                operation: format!("build probe client: {e}"),
            })?;
        Ok(Self {
            client,
            policy,
            max_hops: config.max_redirect_hops,
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        })
    }

    /// Follow redirects from `start` until a non-redirect response, validating
    /// each hop. Resolution on a URL with zero redirects is idempotent: the
    /// output equals the input with `hops == 0`.
    #[instrument(skip(self), fields(url = %start), err)]
    pub async fn resolve(&self, start: Url) -> Result<ResolvedUrl> {
        let mut current = start;
        let mut hops = 0usize;

        loop {
            self.policy.check_url(&current).await?;

            let response = match self.client.head(current.clone()).timeout(self.probe_timeout).send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    // A timed-out probe says nothing about the URL's safety;
                    // it is an upstream availability failure.
                    return Err(Error::Internal {
                        operation: format!("probe of '{current}' timed out"),
                    });
                }
                Err(e) => {
                    // Origins that reject HEAD probes are tolerated; the
                    // current URL stands as final.
                    debug!("probe of '{current}' failed non-fatally: {e}");
                    return Ok(ResolvedUrl { final_url: current, hops });
                }
            };

            if !response.status().is_redirection() {
                return Ok(ResolvedUrl { final_url: current, hops });
            }

            let Some(location) = response.headers().get(LOCATION) else {
                // A 3xx without a location has nowhere to go
                return Ok(ResolvedUrl { final_url: current, hops });
            };

            let location = location.to_str().map_err(|_| Error::UnsafeUrl {
                reason: "redirect location header is not valid UTF-8".to_string(),
            })?;

            // Location may be relative; resolve against the current URL
            let next = current.join(location).map_err(|e| Error::UnsafeUrl {
                reason: format!("malformed redirect location '{location}': {e}"),
            })?;

            hops += 1;
            if hops >= self.max_hops {
                return Err(Error::UnsafeUrl {
                    reason: format!("redirect chain exceeded {} hops", self.max_hops),
                });
            }

            debug!("following redirect hop {hops}: {current} -> {next}");
            current = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::network::PublicNetworkPolicy;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(max_hops: usize) -> UrlResolver {
        let config = SafetyConfig {
            max_redirect_hops: max_hops,
            probe_timeout_secs: 5,
        };
        UrlResolver::new(Arc::new(PublicNetworkPolicy), &config).unwrap()
    }

    #[tokio::test]
    async fn zero_redirects_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let start: Url = format!("{}/article", server.uri()).parse().unwrap();
        let resolved = resolver(5).resolve(start.clone()).await.unwrap();
        assert_eq!(resolved.final_url, start);
        assert_eq!(resolved.hops, 0);
    }

    #[tokio::test]
    async fn follows_relative_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let start: Url = format!("{}/old", server.uri()).parse().unwrap();
        let resolved = resolver(5).resolve(start).await.unwrap();
        assert_eq!(resolved.final_url.path(), "/new");
        assert_eq!(resolved.hops, 1);
    }

    #[tokio::test]
    async fn chain_at_ceiling_fails_one_short_succeeds() {
        let server = MockServer::start().await;
        // /hop0 -> /hop1 -> ... -> /hop4 -> /done
        for i in 0..5 {
            Mock::given(method("HEAD"))
                .and(path(format!("/hop{i}")))
                .respond_with(ResponseTemplate::new(302).insert_header("location", format!("/hop{}", i + 1).as_str()))
                .mount(&server)
                .await;
        }
        Mock::given(method("HEAD"))
            .and(path("/hop5"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        // Five redirects with a ceiling of five: exceeded.
        let start: Url = format!("{}/hop0", server.uri()).parse().unwrap();
        let err = resolver(5).resolve(start).await.unwrap_err();
        assert!(matches!(err, Error::UnsafeUrl { .. }));

        // One hop shorter succeeds.
        let start: Url = format!("{}/hop1", server.uri()).parse().unwrap();
        let resolved = resolver(5).resolve(start).await.unwrap();
        assert_eq!(resolved.hops, 4);
        assert_eq!(resolved.final_url.path(), "/hop5");
    }

    #[tokio::test]
    async fn redirect_without_location_is_final() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/odd"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let start: Url = format!("{}/odd", server.uri()).parse().unwrap();
        let resolved = resolver(5).resolve(start.clone()).await.unwrap();
        assert_eq!(resolved.final_url, start);
        assert_eq!(resolved.hops, 0);
    }

    #[tokio::test]
    async fn probe_timeout_is_an_infrastructure_error() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let config = SafetyConfig {
            max_redirect_hops: 5,
            probe_timeout_secs: 1,
        };
        let resolver = UrlResolver::new(Arc::new(PublicNetworkPolicy), &config).unwrap();
        let start: Url = format!("{}/slow", server.uri()).parse().unwrap();
        let err = resolver.resolve(start).await.unwrap_err();
        assert!(matches!(err, Error::Internal { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn connection_refusal_is_final_not_an_error() {
        // Nothing listens here; the probe fails at the network level, which is
        // treated as "no redirect" rather than an error.
        let start: Url = "http://127.0.0.1:9/unreachable".parse().unwrap();
        let resolved = resolver(5).resolve(start.clone()).await.unwrap();
        assert_eq!(resolved.final_url, start);
        assert_eq!(resolved.hops, 0);
    }

    #[tokio::test]
    async fn policy_rejection_propagates() {
        use crate::safety::network::SafetyPolicy;
        use async_trait::async_trait;

        struct DenyAll;

        #[async_trait]
        impl SafetyPolicy for DenyAll {
            async fn check_url(&self, url: &Url) -> crate::errors::Result<()> {
                Err(Error::UnsafeUrl {
                    reason: format!("domain '{}' is blocked", url.host_str().unwrap_or_default()),
                })
            }
        }

        let config = SafetyConfig::default();
        let resolver = UrlResolver::new(Arc::new(DenyAll), &config).unwrap();
        let err = resolver.resolve("https://example.com/".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::UnsafeUrl { .. }));
    }
}

//! Cookie-carrying HTTP client with a fixed retry policy.
//!
//! Every request attaches the caller's cookie jar; every response's
//! `Set-Cookie` headers are merged into a copy of that jar, so the caller
//! always holds the union of what it sent and what the appliance added.

use std::collections::BTreeMap;

use reqwest::header::{self, HeaderMap};
use reqwest::{Client, Method, Response};
use tracing::{debug, warn};
use url::Url;

use crate::config::ExportConfig;
use crate::error::ExportError;

/// Total attempts per request, counting the first one. Retries fire on
/// network-level failures and on any status >= 400. There is no delay
/// between attempts; that is a known limitation of this policy.
pub const MAX_ATTEMPTS: u32 = 3;

/// Session cookies exchanged with the appliance.
///
/// Semantically a set keyed by cookie name; the map only fixes the order of
/// the rendered `Cookie` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Render the jar as a `Cookie` header value.
    pub fn to_header(&self) -> String {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        pairs.join("; ")
    }

    /// Return a copy of this jar with every acceptable `Set-Cookie` header
    /// from `headers` merged in. Existing entries are kept; entries set by
    /// the response win on name collisions.
    pub fn merged_with(&self, headers: &HeaderMap) -> CookieJar {
        let mut merged = self.clone();
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                debug!("discarding non-UTF-8 Set-Cookie header");
                continue;
            };
            match parse_simple_cookie(value) {
                Some((name, value)) => merged.insert(name, value),
                None => debug!(header = value, "discarding attribute-bearing Set-Cookie"),
            }
        }
        merged
    }
}

/// Accept a `Set-Cookie` value only when it is a bare `name=value` pair.
///
/// Values carrying `;`-delimited attributes (`Path=`, `Expires=`, ...) are
/// rejected; the appliance's session cookies arrive without attributes and
/// anything else is not worth carrying forward.
fn parse_simple_cookie(value: &str) -> Option<(&str, &str)> {
    if value.contains(';') {
        return None;
    }
    let (name, value) = value.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

/// HTTP client wrapper owning the retry policy for one job.
///
/// The policy is a per-instance value rather than process-wide client state,
/// so concurrent jobs in one process cannot race on it.
pub struct HttpClient {
    client: Client,
    max_attempts: u32,
}

impl HttpClient {
    pub fn new(config: &ExportConfig) -> Result<Self, ExportError> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if !config.connect_timeout.is_zero() {
            builder = builder.connect_timeout(config.connect_timeout);
        }
        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }

        Ok(Self {
            client: builder.build()?,
            max_attempts: MAX_ATTEMPTS,
        })
    }

    /// GET `url` with the jar attached. Returns the response together with a
    /// copy of the jar updated from the response's `Set-Cookie` headers.
    pub async fn get(
        &self,
        url: &Url,
        jar: &CookieJar,
    ) -> Result<(Response, CookieJar), ExportError> {
        let response = self
            .send_with_retry(url, "GET", || self.request(Method::GET, url, jar))
            .await?;
        let cookies = jar.merged_with(response.headers());
        Ok((response, cookies))
    }

    /// POST a form-encoded body to `url` with the jar attached.
    pub async fn post_form(
        &self,
        url: &Url,
        jar: &CookieJar,
        form: &[(&str, &str)],
    ) -> Result<(Response, CookieJar), ExportError> {
        let response = self
            .send_with_retry(url, "POST", || {
                self.request(Method::POST, url, jar).form(form)
            })
            .await?;
        let cookies = jar.merged_with(response.headers());
        Ok((response, cookies))
    }

    fn request(&self, method: Method, url: &Url, jar: &CookieJar) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, url.clone());
        if !jar.is_empty() {
            request = request.header(header::COOKIE, jar.to_header());
        }
        request
    }

    async fn send_with_retry<F>(
        &self,
        url: &Url,
        operation: &'static str,
        build: F,
    ) -> Result<Response, ExportError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_err = None;
        for attempt in 1..=self.max_attempts {
            match build().send().await {
                Ok(response) if response.status().as_u16() < 400 => {
                    if attempt > 1 {
                        debug!(attempt, url = %url, "request succeeded after retry");
                    }
                    return Ok(response);
                }
                Ok(response) => {
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        status = %response.status(),
                        url = %url,
                        "request returned an error status"
                    );
                    last_err = Some(ExportError::http_status(
                        response.status(),
                        url.as_str(),
                        operation,
                    ));
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        error = %e,
                        url = %url,
                        "request failed"
                    );
                    last_err = Some(ExportError::Network { source: e });
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| ExportError::configuration("retry loop made no attempts")))
    }
}

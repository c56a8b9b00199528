//! HTTP client wrapper for the Azure Resource Manager API.
//!
//! Handles bearer-token injection, pagination via `nextLink`, and ARM error
//! extraction. Calls are never retried: a failed call is terminal for the
//! request that issued it. Every call is bounded by the configured deadline.

use std::collections::HashSet;
use std::time::Duration;

use log::{debug, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use url::Url;

use crate::types::{ArmConfig, ArmError, ArmList, ArmResult, ArmToken, RawResponse};

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Same as [`SEGMENT`] but keeps `/`, for splicing whole resource ids.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode one path segment.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Percent-encode a slash-delimited path, keeping the slashes.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

/// HTTP client scoped to one subscription. Cloning is cheap; the connection
/// pool is shared.
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: Client,
    token: Option<ArmToken>,
    config: ArmConfig,
    subscription_id: String,
}

impl ArmClient {
    pub fn new(config: ArmConfig, subscription_id: impl Into<String>) -> ArmResult<Self> {
        for base in [&config.arm_base, &config.login_base] {
            Url::parse(base)
                .map_err(|e| ArmError::Config(format!("invalid base URL '{base}': {e}")))?;
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| ArmError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            token: None,
            config,
            subscription_id: subscription_id.into(),
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &ArmConfig {
        &self.config
    }

    /// A copy of this client that authenticates with `token`.
    pub fn with_token(&self, token: ArmToken) -> Self {
        Self {
            token: Some(token),
            ..self.clone()
        }
    }

    pub fn subscription_id(&self) -> ArmResult<&str> {
        Some(self.subscription_id.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ArmError::Config("subscription id not configured".into()))
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{arm_base}{path}`; `path` must start with `/`.
    pub fn arm_url(&self, path: &str) -> String {
        format!("{}{}", self.config.arm_base.trim_end_matches('/'), path)
    }

    /// Subscription-scoped URL.
    pub fn subscription_url(&self, suffix: &str) -> ArmResult<String> {
        let sub = encode_segment(self.subscription_id()?);
        Ok(self.arm_url(&format!("/subscriptions/{sub}{suffix}")))
    }

    /// Resource-group-scoped URL.
    pub fn resource_group_url(&self, rg: &str, suffix: &str) -> ArmResult<String> {
        self.subscription_url(&format!("/resourcegroups/{}{}", encode_segment(rg), suffix))
    }

    // ── Auth header builder ──────────────────────────────────────────

    fn auth_headers(&self) -> ArmResult<HeaderMap> {
        let token = self
            .token
            .as_ref()
            .filter(|t| !t.access_token.is_empty())
            .ok_or_else(|| ArmError::Auth {
                status: 401,
                message: "no bearer token acquired for this call".into(),
            })?;

        let mut headers = HeaderMap::new();
        let val = format!("Bearer {}", token.access_token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&val).map_err(|e| ArmError::Auth {
                status: 401,
                message: format!("Header value error: {e}"),
            })?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    // ── Core HTTP verbs ──────────────────────────────────────────────

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> ArmResult<T> {
        let empty: &[(&str, &str)] = &[];
        self.get_json_with_query(url, empty).await
    }

    pub async fn get_json_with_query<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(impl AsRef<str>, impl AsRef<str>)],
    ) -> ArmResult<T> {
        let headers = self.auth_headers()?;
        let query_pairs = pairs(query);
        debug!("ARM GET {}", url);

        let resp = self
            .http
            .get(url)
            .headers(headers)
            .query(&query_pairs)
            .send()
            .await
            .map_err(ArmError::from_reqwest)?;
        decode_json("GET", url, resp).await
    }

    pub async fn put_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(impl AsRef<str>, impl AsRef<str>)],
        body: &B,
    ) -> ArmResult<T> {
        let headers = self.auth_headers()?;
        let query_pairs = pairs(query);
        debug!("ARM PUT {}", url);

        let resp = self
            .http
            .put(url)
            .headers(headers)
            .query(&query_pairs)
            .json(body)
            .send()
            .await
            .map_err(ArmError::from_reqwest)?;
        decode_json("PUT", url, resp).await
    }

    /// POST whose reply is handed back verbatim, whatever its status.
    pub async fn post_raw<B: serde::Serialize>(
        &self,
        url: &str,
        query: &[(impl AsRef<str>, impl AsRef<str>)],
        body: &B,
    ) -> ArmResult<RawResponse> {
        let headers = self.auth_headers()?;
        let query_pairs = pairs(query);
        debug!("ARM POST {}", url);

        let resp = self
            .http
            .post(url)
            .headers(headers)
            .query(&query_pairs)
            .json(body)
            .send()
            .await
            .map_err(ArmError::from_reqwest)?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.map_err(ArmError::from_reqwest)?;
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    /// DELETE; returns the upstream status (200, 202 or 204) on success.
    pub async fn delete(
        &self,
        url: &str,
        query: &[(impl AsRef<str>, impl AsRef<str>)],
    ) -> ArmResult<u16> {
        let headers = self.auth_headers()?;
        let query_pairs = pairs(query);
        debug!("ARM DELETE {}", url);

        let resp = self
            .http
            .delete(url)
            .headers(headers)
            .query(&query_pairs)
            .send()
            .await
            .map_err(ArmError::from_reqwest)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(status.as_u16());
        }
        Err(upstream_error("DELETE", url, resp).await)
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Follow `nextLink` to collect **all** items from a paginated ARM list
    /// endpoint. Only the first request carries `query`; ARM bakes it into
    /// every `nextLink`.
    pub async fn get_all_pages<T: serde::de::DeserializeOwned>(
        &self,
        initial_url: &str,
        query: &[(impl AsRef<str>, impl AsRef<str>)],
    ) -> ArmResult<Vec<T>> {
        let first: ArmList<T> = self.get_json_with_query(initial_url, query).await?;
        let mut all = first.value;
        let mut next = first.next_link;
        let mut seen = HashSet::new();

        while let Some(url) = next.filter(|n| !n.is_empty()) {
            self.check_next_link(&url)?;
            if !seen.insert(url.clone()) {
                warn!("ARM paginate: nextLink repeats, stopping at {}", url);
                break;
            }
            debug!("ARM paginate: {}", url);
            let page: ArmList<T> = self.get_json(&url).await?;
            all.extend(page.value);
            next = page.next_link;
        }

        Ok(all)
    }

    /// A `nextLink` is only followed (with the bearer token) when it points
    /// at the configured ARM origin.
    fn check_next_link(&self, link: &str) -> ArmResult<()> {
        let same_origin = match (Url::parse(&self.config.arm_base), Url::parse(link)) {
            (Ok(base), Ok(next)) => base.origin() == next.origin(),
            _ => false,
        };
        if same_origin {
            Ok(())
        } else {
            warn!("ARM paginate: refusing nextLink outside {}", self.config.arm_base);
            Err(ArmError::Parse(format!(
                "nextLink '{link}' is outside {}",
                self.config.arm_base
            )))
        }
    }

    /// POST unauthenticated form data (used by the auth module for the token
    /// exchange).
    pub async fn post_form_unauthenticated<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        form: &[(impl AsRef<str>, impl AsRef<str>)],
    ) -> ArmResult<T> {
        let form_pairs = pairs(form);

        let resp = self
            .http
            .post(url)
            .form(&form_pairs)
            .send()
            .await
            .map_err(ArmError::from_reqwest)?;
        decode_json("POST", url, resp).await
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn pairs(query: &[(impl AsRef<str>, impl AsRef<str>)]) -> Vec<(&str, &str)> {
    query.iter().map(|(k, v)| (k.as_ref(), v.as_ref())).collect()
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    verb: &str,
    url: &str,
    resp: Response,
) -> ArmResult<T> {
    if resp.status().is_success() {
        let bytes = resp.bytes().await.map_err(ArmError::from_reqwest)?;
        return serde_json::from_slice(&bytes)
            .map_err(|e| ArmError::Parse(format!("JSON parse: {e}")));
    }
    Err(upstream_error(verb, url, resp).await)
}

async fn upstream_error(verb: &str, url: &str, resp: Response) -> ArmError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    warn!("ARM {} {} → {}", verb, url, status);
    ArmError::from_status(status, &body)
}

// ─── Tests ──────────────────────────────────────────────────────────

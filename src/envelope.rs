//! HTTP rendering of poll-trigger outcomes.
//!
//! - triggered: `200 OK`, the matched entity as body
//! - wait: `202 Accepted`, `{"triggerState": ...}` as body
//!
//! Both carry `Location` (the request URI with `triggerState` replaced) and
//! `x-ms-trigger-state`; a triggered response may add `Retry-After`.

use armc_triggers::TriggerResponse;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use url::form_urlencoded;

pub const TRIGGER_STATE_PARAM: &str = "triggerState";
pub const TRIGGER_STATE_HEADER: HeaderName = HeaderName::from_static("x-ms-trigger-state");

/// Absolute URL of the next poll: the request URI with `triggerState` set to
/// `state`, other query parameters kept in order.
pub fn next_poll_location(uri: &Uri, headers: &HeaderMap, state: &str) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (k, v) in form_urlencoded::parse(uri.query().unwrap_or("").as_bytes()) {
        if k != TRIGGER_STATE_PARAM {
            query.append_pair(&k, &v);
        }
    }
    query.append_pair(TRIGGER_STATE_PARAM, state);

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()));
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");

    match host {
        Some(host) => format!("{scheme}://{host}{}?{}", uri.path(), query.finish()),
        None => format!("{}?{}", uri.path(), query.finish()),
    }
}

pub fn render<T: Serialize>(outcome: TriggerResponse<T>, uri: &Uri, headers: &HeaderMap) -> Response {
    let state = outcome.state().to_string();
    let location = next_poll_location(uri, headers, &state);

    let mut response = match outcome {
        TriggerResponse::Triggered {
            body, retry_after, ..
        } => {
            let mut resp = (StatusCode::OK, Json(body)).into_response();
            if let Some(secs) = retry_after {
                resp.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            }
            resp
        }
        TriggerResponse::Wait { state } => (
            StatusCode::ACCEPTED,
            Json(json!({ TRIGGER_STATE_PARAM: state })),
        )
            .into_response(),
    };

    let out = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&location) {
        out.insert(header::LOCATION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&state) {
        out.insert(TRIGGER_STATE_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(host: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        h
    }

    #[test]
    fn location_replaces_trigger_state() {
        let uri: Uri = "/EventOccurs?triggerState=old&status=Failed".parse().unwrap();
        let loc = next_poll_location(&uri, &headers("conn.local:8080"), "2024-01-01T00:00:00Z");
        assert_eq!(
            loc,
            "http://conn.local:8080/EventOccurs?status=Failed&triggerState=2024-01-01T00%3A00%3A00Z"
        );
    }

    #[test]
    fn location_without_query_or_host() {
        let uri: Uri = "/MetricThreshold".parse().unwrap();
        assert_eq!(
            next_poll_location(&uri, &HeaderMap::new(), "1"),
            "/MetricThreshold?triggerState=1"
        );
    }

    #[test]
    fn location_keeps_encoded_resource_ids() {
        let uri: Uri = "/EventOccurs?resource=%2Fsubscriptions%2Fs&triggerState="
            .parse()
            .unwrap();
        let loc = next_poll_location(&uri, &headers("h"), "0");
        assert_eq!(loc, "http://h/EventOccurs?resource=%2Fsubscriptions%2Fs&triggerState=0");
    }

    #[tokio::test]
    async fn triggered_response_shape() {
        let uri: Uri = "/MetricThreshold?triggerState=0".parse().unwrap();
        let outcome = TriggerResponse::triggered(json!({"average": 3.0}), "1").poll_again_in(1);
        let resp = render(outcome, &uri, &headers("h"));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::RETRY_AFTER], "1");
        assert_eq!(resp.headers()[TRIGGER_STATE_HEADER], "1");
        assert_eq!(resp.headers()[header::LOCATION], "http://h/MetricThreshold?triggerState=1");
    }

    #[tokio::test]
    async fn wait_response_shape() {
        let uri: Uri = "/MetricThreshold?triggerState=1".parse().unwrap();
        let resp = render(TriggerResponse::<()>::wait("0"), &uri, &headers("h"));
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert!(resp.headers().get(header::RETRY_AFTER).is_none());
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"triggerState": "0"}));
    }
}

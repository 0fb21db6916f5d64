//! Tests for platform error classification and usage parsing.

use chrono::{TimeZone, Utc};
use plume_error::UpstreamError;
use plume_rate_limit::{ErrorClassifier, MetaClassifier, PlatformUsage, TwitterClassifier};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_twitter_429_is_rate_limit() {
    let err = UpstreamError::new("Too Many Requests").with_status(429);
    let classification = TwitterClassifier.classify(&err, now());

    assert!(classification.is_rate_limit);
    assert_eq!(classification.reset_at, None);
    assert_eq!(classification.usage, None);
}

#[test]
fn test_twitter_reset_header_parsed_as_epoch_seconds() {
    let reset = now().timestamp() + 300;
    let err = UpstreamError::new("Too Many Requests")
        .with_status(429)
        .with_header("X-Rate-Limit-Reset", reset.to_string())
        .with_header("x-rate-limit-remaining", "0");

    let classification = TwitterClassifier.classify(&err, now());

    assert_eq!(
        classification.reset_at.map(|at| at.timestamp()),
        Some(reset)
    );
    let usage = classification.usage.expect("usage from headers");
    assert_eq!(usage.remaining, Some(0));
    assert_eq!(usage.limit, None);
}

#[test]
fn test_twitter_message_mentioning_rate_limit() {
    let err = UpstreamError::new("Rate limit exceeded for this endpoint");
    assert!(TwitterClassifier.classify(&err, now()).is_rate_limit);

    let legacy = UpstreamError::new("something went wrong").with_code(88);
    assert!(TwitterClassifier.classify(&legacy, now()).is_rate_limit);
}

#[test]
fn test_twitter_server_error_is_transient() {
    let err = UpstreamError::new("Internal Server Error").with_status(500);
    let classification = TwitterClassifier.classify(&err, now());

    assert!(!classification.is_rate_limit);
    assert_eq!(classification.reset_at, None);
}

#[test]
fn test_meta_codes_are_rate_limits() {
    for code in [4, 17, 32, 613, 80001, 80004] {
        let err = UpstreamError::new("throttled").with_code(code);
        assert!(
            MetaClassifier.classify(&err, now()).is_rate_limit,
            "code {} should be a rate limit",
            code
        );
    }
}

#[test]
fn test_meta_other_codes_are_transient() {
    let err = UpstreamError::new("An unknown error has occurred.").with_code(1);
    assert!(!MetaClassifier.classify(&err, now()).is_rate_limit);

    // Meta does not rely on HTTP 429
    let err = UpstreamError::new("Service Unavailable").with_status(503);
    assert!(!MetaClassifier.classify(&err, now()).is_rate_limit);
}

#[test]
fn test_meta_message_phrasing() {
    let err = UpstreamError::new("(#17) User request limit reached");
    assert!(MetaClassifier.classify(&err, now()).is_rate_limit);
}

#[test]
fn test_meta_body_populates_code() {
    let body = json!({
        "error": {
            "message": "(#32) Page request limit reached",
            "type": "OAuthException",
            "code": 32,
            "error_subcode": 2446079,
            "fbtrace_id": "AbCdEf"
        }
    });
    let err = UpstreamError::new("HTTP 400: Bad Request")
        .with_status(400)
        .with_body(body);

    assert_eq!(err.code, Some(32));
    assert_eq!(err.subcode, Some(2446079));
    assert_eq!(err.message, "(#32) Page request limit reached");
    assert!(MetaClassifier.classify(&err, now()).is_rate_limit);
}

#[test]
fn test_meta_regain_access_estimate_sets_reset() {
    let header = json!({
        "1234567890": [{
            "type": "pages",
            "call_count": 100,
            "total_cputime": 30,
            "total_time": 45,
            "estimated_time_to_regain_access": 19
        }]
    })
    .to_string();
    let err = UpstreamError::new("Application request limit reached")
        .with_code(4)
        .with_header("x-business-use-case-usage", header);

    let classification = MetaClassifier.classify(&err, now());

    assert!(classification.is_rate_limit);
    assert_eq!(
        classification.reset_at,
        Some(now() + chrono::Duration::minutes(19))
    );
    let usage = classification.usage.expect("usage captured");
    assert_eq!(usage.call_count, Some(100.0));
    assert_eq!(usage.total_time, Some(45.0));
    assert_eq!(usage.estimated_minutes_to_regain_access, Some(19));
}

#[test]
fn test_meta_zero_estimate_falls_back_to_default() {
    let err = UpstreamError::new("Application request limit reached")
        .with_code(4)
        .with_header(
            "x-app-usage",
            r#"{"call_count":100,"total_time":10,"total_cputime":5}"#,
        );

    let classification = MetaClassifier.classify(&err, now());

    assert!(classification.is_rate_limit);
    assert_eq!(classification.reset_at, None);
    assert_eq!(
        classification.usage.and_then(|usage| usage.call_count),
        Some(100.0)
    );
}

#[test]
fn test_meta_usage_from_response_headers() {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-app-usage",
        HeaderValue::from_static(r#"{"call_count":28,"total_time":25,"total_cputime":12}"#),
    );
    headers.insert(
        "x-ad-account-usage",
        HeaderValue::from_static(r#"{"acc_id_util_pct":9.5,"reset_time_duration":90}"#),
    );

    let usage = PlatformUsage::from_meta_headers(&headers, now()).expect("usage parsed");

    assert_eq!(usage.call_count, Some(28.0));
    assert_eq!(usage.total_cputime, Some(12.0));
    assert_eq!(usage.estimated_minutes_to_regain_access, Some(2));
    assert_eq!(usage.observed_at, now());
}

#[test]
fn test_usage_absent_without_headers() {
    let headers = HeaderMap::new();
    assert!(PlatformUsage::from_meta_headers(&headers, now()).is_none());
    assert!(PlatformUsage::from_twitter_headers(&headers, now()).is_none());
}

#[test]
fn test_twitter_usage_from_response_headers() {
    let mut headers = HeaderMap::new();
    headers.insert("x-rate-limit-limit", HeaderValue::from_static("200"));
    headers.insert("x-rate-limit-remaining", HeaderValue::from_static("57"));

    let usage = PlatformUsage::from_twitter_headers(&headers, now()).expect("usage parsed");

    assert_eq!(usage.limit, Some(200));
    assert_eq!(usage.remaining, Some(57));
}

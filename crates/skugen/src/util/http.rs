// HTTP helpers for the chat-completion transport: headers, error bodies, content paths.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde_json::Value;

/// `Retry-After` as delay-seconds or an HTTP-date.
///
/// Negative, non-finite and past values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = raw.parse::<f64>() {
        return (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs));
    }

    let at = httpdate::parse_http_date(raw).ok()?;
    at.duration_since(std::time::SystemTime::now()).ok()
}

/// Follow a path of object keys and array indices (as decimal strings).
pub fn extract_json_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| match current {
        Value::Array(items) => items.get(key.parse::<usize>().ok()?),
        _ => current.get(*key),
    })
}

/// Human-readable message from an error body.
///
/// OpenAI-compatible servers put it at `error.message`; some send a bare
/// `error` string or a top-level `message`. Anything else falls back to the
/// raw body, trimmed.
pub fn parse_error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    [&["error", "message"][..], &["error"], &["message"]]
        .iter()
        .find_map(|path| extract_json_path(&json, path)?.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Assistant text of a non-streaming response: `choices[0].message.content`.
pub fn message_content(body: &Value) -> Option<&str> {
    extract_json_path(body, &["choices", "0", "message", "content"])?.as_str()
}

/// Assistant text of one streamed frame: `choices[0].delta.content`.
pub fn delta_content(frame: &Value) -> Option<&str> {
    extract_json_path(frame, &["choices", "0", "delta", "content"])?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(retry_after: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", retry_after.parse().unwrap());
        headers
    }

    #[test]
    fn test_retry_after_seconds() {
        assert_eq!(
            parse_retry_after(&headers("2")),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            parse_retry_after(&headers("0.5")),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_retry_after_rejects_garbage_and_negative() {
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
        assert_eq!(parse_retry_after(&headers("soon")), None);
        assert_eq!(parse_retry_after(&headers("-4")), None);
        assert_eq!(parse_retry_after(&headers("inf")), None);
    }

    #[test]
    fn test_retry_after_http_date() {
        let future = std::time::SystemTime::now() + Duration::from_secs(120);
        let parsed = parse_retry_after(&headers(&httpdate::fmt_http_date(future))).unwrap();
        assert!(parsed.as_secs() >= 115 && parsed.as_secs() <= 120);

        let past = std::time::SystemTime::now() - Duration::from_secs(120);
        assert_eq!(
            parse_retry_after(&headers(&httpdate::fmt_http_date(past))),
            None
        );
    }

    #[test]
    fn test_extract_json_path_walks_arrays() {
        let v = json!({"choices": [{"delta": {"content": "[{"}}]});
        assert_eq!(delta_content(&v), Some("[{"));
        assert_eq!(extract_json_path(&v, &["choices", "1"]), None);
        assert_eq!(extract_json_path(&v, &["choices", "x"]), None);
    }

    #[test]
    fn test_message_content() {
        let v = json!({"choices": [{"message": {"role": "assistant", "content": "[]"}}]});
        assert_eq!(message_content(&v), Some("[]"));
        assert_eq!(message_content(&json!({"choices": []})), None);
    }

    #[test]
    fn test_delta_without_content_is_none() {
        let v = json!({"choices": [{"delta": {"role": "assistant"}}]});
        assert_eq!(delta_content(&v), None);
    }

    #[test]
    fn test_parse_error_message_variants() {
        assert_eq!(
            parse_error_message(r#"{"error":{"message":"Authentication Fails","type":"auth"}}"#),
            "Authentication Fails"
        );
        assert_eq!(parse_error_message(r#"{"error":"quota"}"#), "quota");
        assert_eq!(parse_error_message(r#"{"message":"busy"}"#), "busy");
        assert_eq!(parse_error_message("  upstream down \n"), "upstream down");
        assert_eq!(parse_error_message(r#"{"detail":1}"#), r#"{"detail":1}"#);
    }
}

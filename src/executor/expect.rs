//! Response assertions

use serde_json::Value;

use crate::http::HttpResponse;
use crate::models::Expectations;

/// Check every expectation against the response, collecting all failures
pub fn check(expect: &Expectations, response: &HttpResponse) -> Vec<String> {
    let mut failures = Vec::new();

    if let Some(expected) = expect.status {
        if expected != response.status_code {
            failures.push(format!("expected {} got {}", expected, response.status_code));
        }
    }

    for needle in &expect.body_contains {
        if !response.body_contains(needle) {
            failures.push(format!("response body does not contain '{needle}'"));
        }
    }

    if !expect.json.is_empty() {
        match response.json() {
            Some(body) => {
                for (pointer, expected) in &expect.json {
                    check_json(&body, pointer, expected, &mut failures);
                }
            }
            None => failures.push("response body is not JSON".to_string()),
        }
    }

    for (name, expected) in &expect.headers {
        match response.get_header(name) {
            Some(actual) if header_matches(actual, expected) => {}
            Some(actual) => failures.push(format!(
                "header {name}: expected '{expected}' got '{actual}'"
            )),
            None => failures.push(format!("missing header {name}")),
        }
    }

    if let Some(limit) = expect.max_duration_ms {
        if response.duration_ms > limit {
            failures.push(format!(
                "took {}ms, limit {}ms",
                response.duration_ms, limit
            ));
        }
    }

    failures
}

fn check_json(body: &Value, pointer: &str, expected: &Value, failures: &mut Vec<String>) {
    match body.pointer(pointer) {
        Some(actual) if json_eq(actual, expected) => {}
        Some(actual) => failures.push(format!("{pointer}: expected {expected} got {actual}")),
        None => failures.push(format!("{pointer}: missing")),
    }
}

fn json_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(e)) => a == e || a.as_f64() == e.as_f64(),
        _ => actual == expected,
    }
}

/// Exact match, or a match on the media type ignoring parameters such as charset
fn header_matches(actual: &str, expected: &str) -> bool {
    if actual.eq_ignore_ascii_case(expected) {
        return true;
    }
    actual
        .split(';')
        .next()
        .map(|media| media.trim().eq_ignore_ascii_case(expected.trim()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn response(status: u16, body: &str) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/json; charset=utf-8".to_string(),
        );
        HttpResponse {
            status_code: status,
            headers,
            body: body.to_string(),
            duration_ms: 120,
            error: None,
        }
    }

    #[test]
    fn test_status_mismatch_message() {
        let expect = Expectations {
            status: Some(200),
            ..Default::default()
        };
        assert_eq!(
            check(&expect, &response(404, "")),
            vec!["expected 200 got 404"]
        );
        assert!(check(&expect, &response(200, "")).is_empty());
    }

    #[test]
    fn test_all_failures_collected() {
        let mut expect = Expectations {
            status: Some(200),
            body_contains: vec!["bukhari".to_string()],
            max_duration_ms: Some(100),
            ..Default::default()
        };
        expect.json.insert("/total".to_string(), json!(17));
        expect
            .headers
            .insert("Content-Type".to_string(), "text/html".to_string());

        let failures = check(&expect, &response(500, r#"{"total": 16}"#));
        assert_eq!(failures.len(), 5);
        assert_eq!(failures[0], "expected 200 got 500");
        assert_eq!(failures[2], "/total: expected 17 got 16");
        assert_eq!(failures[4], "took 120ms, limit 100ms");
    }

    #[test]
    fn test_json_and_headers_pass() {
        let mut expect = Expectations::default();
        expect.json.insert("/data/0/name".to_string(), json!("bukhari"));
        expect.headers.insert(
            "content-type".to_string(),
            "application/json".to_string(),
        );

        let body = r#"{"data": [{"name": "bukhari"}]}"#;
        assert!(check(&expect, &response(200, body)).is_empty());
    }

    #[test]
    fn test_non_json_body() {
        let mut expect = Expectations::default();
        expect.json.insert("/total".to_string(), json!(1));
        assert_eq!(
            check(&expect, &response(200, "<html>")),
            vec!["response body is not JSON"]
        );
    }
}

// src/body.rs
// Assert that a request body decodes to an expected JSON structure

use axum::body::to_bytes;
use axum::extract::Request;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A single difference between the expected and actual JSON
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    /// Location of the difference, e.g. `$.data.lorem` or `$.dolar[1]`
    pub path: String,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.expected, &self.actual) {
            (Some(expected), Some(actual)) => {
                write!(f, "{}: expected {expected}, got {actual}", self.path)
            }
            (Some(expected), None) => write!(f, "{}: missing, expected {expected}", self.path),
            (None, Some(actual)) => write!(f, "{}: unexpected {actual}", self.path),
            (None, None) => write!(f, "{}: differs", self.path),
        }
    }
}

/// Why a request body failed its assertion
#[derive(Error, Debug)]
pub enum AssertionFailure {
    #[error("failed to read request body: {0}")]
    ReadBody(String),

    #[error("request body is not valid JSON: {error}; body was {body:?}")]
    Decode {
        error: serde_json::Error,
        body: String,
    },

    #[error("expected value could not be serialized: {0}")]
    Expected(serde_json::Error),

    #[error("request body does not match expected:\n{}", format_mismatches(.0))]
    Mismatch(Vec<Mismatch>),
}

fn format_mismatches(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(|m| format!("  {m}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read `request`'s body and fail the calling test unless it matches `expected`.
///
/// The body is consumed. All differences are reported in a single panic
/// message so the failing field is named in the test output.
pub async fn assert_body<T>(expected: &T, request: Request)
where
    T: Serialize + ?Sized,
{
    if let Err(failure) = check_body(expected, request).await {
        panic!("{failure}");
    }
}

/// Like [`assert_body`], returning the failure instead of panicking
pub async fn check_body<T>(expected: &T, request: Request) -> Result<(), AssertionFailure>
where
    T: Serialize + ?Sized,
{
    let bytes = to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| AssertionFailure::ReadBody(e.to_string()))?;
    check_json(expected, &bytes)
}

/// Compare raw JSON bytes against `expected`
pub fn check_json<T>(expected: &T, body: &[u8]) -> Result<(), AssertionFailure>
where
    T: Serialize + ?Sized,
{
    let expected = serde_json::to_value(expected).map_err(AssertionFailure::Expected)?;
    let actual: Value =
        serde_json::from_slice(body).map_err(|error| AssertionFailure::Decode {
            error,
            body: String::from_utf8_lossy(body).into_owned(),
        })?;

    let mismatches = diff(&expected, &actual);
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(AssertionFailure::Mismatch(mismatches))
    }
}

/// Structural differences between two JSON values.
///
/// Objects compare without regard to key order. Numbers compare by value,
/// so `1` and `1.0` are equal.
pub fn diff(expected: &Value, actual: &Value) -> Vec<Mismatch> {
    let mut out = Vec::new();
    diff_at("$", expected, actual, &mut out);
    out
}

fn diff_at(path: &str, expected: &Value, actual: &Value, out: &mut Vec<Mismatch>) {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => {
            for (key, e_value) in e {
                let child = format!("{path}.{key}");
                match a.get(key) {
                    Some(a_value) => diff_at(&child, e_value, a_value, out),
                    None => out.push(Mismatch {
                        path: child,
                        expected: Some(e_value.clone()),
                        actual: None,
                    }),
                }
            }
            for (key, a_value) in a {
                if !e.contains_key(key) {
                    out.push(Mismatch {
                        path: format!("{path}.{key}"),
                        expected: None,
                        actual: Some(a_value.clone()),
                    });
                }
            }
        }
        (Value::Array(e), Value::Array(a)) if e.len() == a.len() => {
            for (i, (e_item, a_item)) in e.iter().zip(a).enumerate() {
                diff_at(&format!("{path}[{i}]"), e_item, a_item, out);
            }
        }
        (Value::Number(e), Value::Number(a)) => {
            let equal = match (e.as_i64(), a.as_i64(), e.as_u64(), a.as_u64()) {
                (Some(x), Some(y), _, _) => x == y,
                (_, _, Some(x), Some(y)) => x == y,
                _ => e.as_f64() == a.as_f64(),
            };
            if !equal {
                out.push(leaf(path, expected, actual));
            }
        }
        _ if expected == actual => {}
        _ => out.push(leaf(path, expected, actual)),
    }
}

fn leaf(path: &str, expected: &Value, actual: &Value) -> Mismatch {
    Mismatch {
        path: path.to_string(),
        expected: Some(expected.clone()),
        actual: Some(actual.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::json;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"{"data":{"lorem":"ipsum"},"dolar":["sit","amet"]}"#;

    fn sample_request() -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/v2/apps/")
            .body(Body::from(SAMPLE))
            .unwrap()
    }

    #[tokio::test]
    async fn test_assert_body_matches() {
        let expected = json!({
            "data": {"lorem": "ipsum"},
            "dolar": ["sit", "amet"],
        });
        assert_body(&expected, sample_request()).await;
    }

    #[tokio::test]
    async fn test_assert_body_accepts_typed_expected() {
        let mut expected: HashMap<&str, Value> = HashMap::new();
        expected.insert("data", json!({"lorem": "ipsum"}));
        expected.insert("dolar", json!(vec!["sit", "amet"]));
        assert_body(&expected, sample_request()).await;
    }

    #[tokio::test]
    #[should_panic(expected = "$.data.lorem")]
    async fn test_assert_body_panics_on_mismatch() {
        let expected = json!({
            "data": {"lorem": "dolor"},
            "dolar": ["sit", "amet"],
        });
        assert_body(&expected, sample_request()).await;
    }

    #[tokio::test]
    async fn test_check_body_reports_single_mismatch() {
        let expected = json!({
            "data": {"lorem": "dolor"},
            "dolar": ["sit", "amet"],
        });
        let err = check_body(&expected, sample_request()).await.unwrap_err();
        let AssertionFailure::Mismatch(mismatches) = err else {
            panic!("expected mismatch, got {err}");
        };
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].path, "$.data.lorem");
        assert_eq!(mismatches[0].expected, Some(json!("dolor")));
        assert_eq!(mismatches[0].actual, Some(json!("ipsum")));
    }

    #[test]
    fn test_check_json_decode_failure() {
        let err = check_json(&json!({}), b"not json").unwrap_err();
        assert!(matches!(err, AssertionFailure::Decode { .. }));
        assert!(err.to_string().contains("not json"));
    }

    #[test]
    fn test_diff_missing_and_extra_keys() {
        let mismatches = diff(&json!({"a": 1, "b": 2}), &json!({"a": 1, "c": 3}));
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].path, "$.b");
        assert!(mismatches[0].actual.is_none());
        assert_eq!(mismatches[1].path, "$.c");
        assert!(mismatches[1].expected.is_none());
    }

    #[test]
    fn test_diff_array_length_and_items() {
        assert_eq!(diff(&json!([1, 2]), &json!([1, 2, 3])).len(), 1);
        let mismatches = diff(&json!(["sit", "amet"]), &json!(["sit", "amat"]));
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].path, "$[1]");
    }

    #[test]
    fn test_diff_numbers_by_value() {
        assert!(diff(&json!(1), &json!(1.0)).is_empty());
        assert!(diff(&json!({"n": 100}), &json!({"n": 100.0})).is_empty());
        assert_eq!(diff(&json!(1), &json!(2)).len(), 1);
        assert_eq!(diff(&json!(1), &json!("1")).len(), 1);
    }

    #[test]
    fn test_mismatch_display() {
        let failure = AssertionFailure::Mismatch(vec![Mismatch {
            path: "$.data.lorem".to_string(),
            expected: Some(json!("dolor")),
            actual: Some(json!("ipsum")),
        }]);
        assert_eq!(
            failure.to_string(),
            "request body does not match expected:\n  $.data.lorem: expected \"dolor\", got \"ipsum\""
        );
    }
}

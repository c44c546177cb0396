//! `search_web` argument validation.
//!
//! Input is whatever the caller sent (usually an MCP `arguments` object). Every rule runs, so a
//! single error reports all bad fields at once.

use crate::{Focus, SearchRequest, DEFAULT_NUM_RESULTS, MAX_NUM_RESULTS, MIN_NUM_RESULTS};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }
}

fn render(vs: &[Violation]) -> String {
    vs.iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate raw `search_web` arguments and apply defaults.
///
/// `null` for an optional field is treated the same as the field being absent.
pub fn validate_search_args(input: &Value) -> Result<SearchRequest, ValidationError> {
    let Some(obj) = input.as_object() else {
        let message = if input.is_null() {
            "is required".to_string()
        } else {
            format!("expected an object, got {}", kind(input))
        };
        let field = if input.is_null() { "query" } else { "arguments" };
        return Err(ValidationError {
            violations: vec![Violation { field, message }],
        });
    };

    let mut violations = Vec::new();

    let query = match obj.get("query") {
        None | Some(Value::Null) => {
            violations.push(Violation {
                field: "query",
                message: "is required".to_string(),
            });
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            violations.push(Violation {
                field: "query",
                message: "cannot be empty".to_string(),
            });
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            violations.push(Violation {
                field: "query",
                message: format!("expected a string, got {}", kind(other)),
            });
            None
        }
    };

    let num_results = match obj.get("num_results") {
        None | Some(Value::Null) => Some(DEFAULT_NUM_RESULTS),
        Some(v) => match integral(v) {
            Some(n) if (i64::from(MIN_NUM_RESULTS)..=i64::from(MAX_NUM_RESULTS)).contains(&n) => {
                // In range, so the narrowing cannot fail.
                u8::try_from(n).ok()
            }
            Some(_) => {
                violations.push(Violation {
                    field: "num_results",
                    message: format!(
                        "must be between {MIN_NUM_RESULTS} and {MAX_NUM_RESULTS}, got {}",
                        describe(v)
                    ),
                });
                None
            }
            None => {
                violations.push(Violation {
                    field: "num_results",
                    message: format!("expected an integer, got {}", describe(v)),
                });
                None
            }
        },
    };

    let focus = match obj.get("focus") {
        None | Some(Value::Null) => Some(Focus::default()),
        Some(Value::String(s)) => match Focus::parse(s) {
            Some(f) => Some(f),
            None => {
                violations.push(Violation {
                    field: "focus",
                    message: format!(
                        "must be one of technical, development, general; got {s:?}"
                    ),
                });
                None
            }
        },
        Some(other) => {
            violations.push(Violation {
                field: "focus",
                message: format!("expected a string, got {}", kind(other)),
            });
            None
        }
    };

    match (query, num_results, focus) {
        (Some(q), Some(n), Some(f)) if violations.is_empty() => {
            Ok(SearchRequest::new_unchecked(q, n, f))
        }
        _ => Err(ValidationError { violations }),
    }
}

/// Integer value of a JSON number, accepting integral floats like `3.0`.
fn integral(v: &Value) -> Option<i64> {
    let Value::Number(n) = v else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_u64() {
        // Above i64::MAX: certainly out of range, but still an integer.
        return Some(i64::MAX);
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        Some(f as i64)
    } else {
        None
    }
}

fn describe(v: &Value) -> String {
    match v {
        Value::Number(n) => n.to_string(),
        other => kind(other).to_string(),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

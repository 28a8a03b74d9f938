//! Loose JSON recovery from free-form oracle text.
//!
//! Span search is bracket-balanced and aware of JSON strings and escapes, so braces
//! inside string values or surrounding prose do not cut a span short. When the balanced
//! span does not parse, the greedy span from the first opener to the last closer is
//! tried as well.

use serde_json::Value;

use crate::errors::MalformedResponse;

/// First JSON object embedded in `text`.
pub fn object(text: &str) -> Result<Value, MalformedResponse> {
    span(text, '{', '}', "object")
}

/// First JSON array embedded in `text`.
pub fn array(text: &str) -> Result<Value, MalformedResponse> {
    span(text, '[', ']', "array")
}

/// The whole body as JSON, tolerating a surrounding Markdown code fence.
pub fn whole(text: &str) -> Result<Value, MalformedResponse> {
    let body = strip_code_fence(text.trim());
    serde_json::from_str(body).map_err(|e| MalformedResponse::InvalidJson {
        message: e.to_string(),
    })
}

/// Direct parse first, then span search. Used for responses expected to be an object.
pub fn object_lenient(text: &str) -> Result<Value, MalformedResponse> {
    match whole(text) {
        Ok(v) if v.is_object() => Ok(v),
        _ => object(text),
    }
}

fn span(
    text: &str,
    open: char,
    close: char,
    expected: &'static str,
) -> Result<Value, MalformedResponse> {
    let start = text
        .find(open)
        .ok_or(MalformedResponse::NoJsonSpan { expected })?;

    let balanced = balanced_end(&text[start..], open, close).map(|end| &text[start..start + end]);
    let greedy = text.rfind(close).filter(|&end| end > start).map(|end| &text[start..=end]);

    let mut last_error = None;
    for candidate in [balanced, greedy].into_iter().flatten() {
        match serde_json::from_str::<Value>(candidate) {
            Ok(v) => return Ok(v),
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(match last_error {
        Some(message) => MalformedResponse::InvalidJson { message },
        None => MalformedResponse::NoJsonSpan { expected },
    })
}

/// Byte length of the balanced span starting at `text[0] == open`, if it closes.
fn balanced_end(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(idx + ch.len_utf8());
            }
        }
    }
    None
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the info string ("json") up to the first newline
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

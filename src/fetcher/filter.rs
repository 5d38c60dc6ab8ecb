//! Diagnostic extraction from upstream responses.
//!
//! A filter starting with `$` is a JSON path (`$.data.items[0].id`,
//! `$['odd key']`). Anything else is a regular expression matched against
//! the response re-serialized as compact JSON; the first capture group is
//! reported if present, else the whole match.

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid JSON path '{path}': {reason}")]
    Path { path: String, reason: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone)]
pub enum ResponseFilter {
    JsonPath { raw: String, segments: Vec<Segment> },
    Pattern(Regex),
}

impl ResponseFilter {
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let raw = raw.trim();
        if raw.starts_with('$') {
            let segments = parse_path(raw).map_err(|reason| FilterError::Path {
                path: raw.to_string(),
                reason,
            })?;
            Ok(ResponseFilter::JsonPath {
                raw: raw.to_string(),
                segments,
            })
        } else {
            Ok(ResponseFilter::Pattern(Regex::new(raw)?))
        }
    }

    /// Extract the filtered value, `None` when nothing matches.
    pub fn extract(&self, payload: &Value) -> Option<String> {
        match self {
            ResponseFilter::JsonPath { segments, .. } => {
                let mut current = payload;
                for segment in segments {
                    current = match segment {
                        Segment::Key(key) => current.get(key.as_str())?,
                        Segment::Index(idx) => current.get(*idx)?,
                    };
                }
                Some(match current {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            }
            ResponseFilter::Pattern(re) => {
                let text = payload.to_string();
                let captures = re.captures(&text)?;
                captures
                    .get(1)
                    .or_else(|| captures.get(0))
                    .map(|m| m.as_str().to_string())
            }
        }
    }

    pub fn describe(&self) -> &str {
        match self {
            ResponseFilter::JsonPath { raw, .. } => raw,
            ResponseFilter::Pattern(re) => re.as_str(),
        }
    }
}

fn parse_path(raw: &str) -> Result<Vec<Segment>, String> {
    let mut chars = raw.chars().skip(1).peekable();
    let mut segments = Vec::new();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                let mut key = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '[' {
                        break;
                    }
                    key.push(next);
                    chars.next();
                }
                if key.is_empty() {
                    return Err("empty key after '.'".to_string());
                }
                segments.push(Segment::Key(key));
            }
            '[' => {
                let mut inner = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(next);
                }
                if !closed {
                    return Err("unterminated '['".to_string());
                }
                segments.push(parse_bracket(inner.trim())?);
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(segments)
}

fn parse_bracket(inner: &str) -> Result<Segment, String> {
    let quoted = ['\'', '"']
        .iter()
        .find_map(|q| inner.strip_prefix(*q).and_then(|rest| rest.strip_suffix(*q)));
    if let Some(key) = quoted {
        return Ok(Segment::Key(key.to_string()));
    }
    inner
        .parse::<usize>()
        .map(Segment::Index)
        .map_err(|_| format!("'{}' is not an index or quoted key", inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "status": "ok",
            "data": { "items": [ { "id": "item_1", "value": 4.5 }, { "id": "item_2" } ] },
            "odd key": true
        })
    }

    #[test]
    fn test_json_path_lookup() {
        let filter = ResponseFilter::parse("$.data.items[1].id").unwrap();
        assert_eq!(filter.extract(&payload()).as_deref(), Some("item_2"));

        let filter = ResponseFilter::parse("$.data.items[0].value").unwrap();
        assert_eq!(filter.extract(&payload()).as_deref(), Some("4.5"));

        let filter = ResponseFilter::parse("$['odd key']").unwrap();
        assert_eq!(filter.extract(&payload()).as_deref(), Some("true"));
    }

    #[test]
    fn test_json_path_miss() {
        let filter = ResponseFilter::parse("$.data.items[7].id").unwrap();
        assert!(filter.extract(&payload()).is_none());
    }

    #[test]
    fn test_root_path_returns_whole_document() {
        let filter = ResponseFilter::parse("$").unwrap();
        assert!(filter.extract(&payload()).unwrap().contains("item_1"));
    }

    #[test]
    fn test_invalid_paths() {
        assert!(ResponseFilter::parse("$.").is_err());
        assert!(ResponseFilter::parse("$.a[0").is_err());
        assert!(ResponseFilter::parse("$.a[x]").is_err());
        assert!(ResponseFilter::parse("$a").is_err());
    }

    #[test]
    fn test_regex_capture_group() {
        let filter = ResponseFilter::parse(r#""status":"(\w+)""#).unwrap();
        assert_eq!(filter.extract(&payload()).as_deref(), Some("ok"));
    }

    #[test]
    fn test_regex_whole_match() {
        let filter = ResponseFilter::parse(r"item_\d").unwrap();
        assert_eq!(filter.extract(&payload()).as_deref(), Some("item_1"));
    }
}

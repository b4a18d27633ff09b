//! Path navigation
//!
//! Gets and sets values inside nested JSON containers via dot/bracket path
//! syntax: `.name` for key lookup, `["key"]` for quoted map keys, `[n]`
//! for array indexes, and `` [`query`] `` as an escape hatch to a
//! JSONPath-style lookup rooted at the current container.
//!
//! Navigation is a single-pass recursive descent: each step consumes one
//! segment and recurses on the remaining path until it is empty.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::settings;

/// One parsed path segment
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Named key/field lookup
    Key(String),
    /// Numeric array index
    Index(usize),
    /// JSONPath-style sub-lookup
    Query(String),
}

/// Resolve `path` inside `container`.
///
/// Honors the process-wide "skip missing" toggle: missing keys and
/// out-of-range indexes degrade to null instead of erroring.
pub fn get_value(container: &Value, path: &str) -> Result<Value> {
    get_value_with_options(container, path, settings::settings().skip_missing_paths)
}

/// [`get_value`] with an explicit skip-missing choice.
pub fn get_value_with_options(container: &Value, path: &str, skip_missing: bool) -> Result<Value> {
    if path.is_empty() {
        return Ok(container.clone());
    }
    let (segment, rest) = split_segment(path)?;
    let next = match &segment {
        Segment::Key(name) => match container {
            Value::Object(map) => match map.get(name) {
                Some(v) => v.clone(),
                None => return missing(path, skip_missing),
            },
            _ => return missing(path, skip_missing),
        },
        Segment::Index(idx) => match container {
            Value::Array(items) => match items.get(*idx) {
                Some(v) => v.clone(),
                None if skip_missing => return Ok(Value::Null),
                None => {
                    return Err(Error::IndexOutOfRange {
                        index: *idx,
                        len: items.len(),
                    });
                }
            },
            _ => {
                return Err(Error::NotAnArray {
                    path: path.to_string(),
                });
            }
        },
        Segment::Query(query) => lookup_query(container, query, skip_missing)?,
    };
    get_value_with_options(&next, rest, skip_missing)
}

/// Set `value` at `path` inside `container`.
///
/// The final segment inserts into an object or replaces an existing array
/// element; missing intermediate containers are an error (setting never
/// creates structure along the way).
pub fn set_value(container: &mut Value, path: &str, value: Value) -> Result<()> {
    if path.is_empty() {
        *container = value;
        return Ok(());
    }
    let (segment, rest) = split_segment(path)?;
    if rest.is_empty() {
        return match segment {
            Segment::Key(name) => match container {
                Value::Object(map) => {
                    map.insert(name, value);
                    Ok(())
                }
                _ => Err(Error::PathNotFound {
                    path: path.to_string(),
                }),
            },
            Segment::Index(idx) => match container {
                Value::Array(items) => {
                    let len = items.len();
                    match items.get_mut(idx) {
                        Some(slot) => {
                            *slot = value;
                            Ok(())
                        }
                        None => Err(Error::IndexOutOfRange { index: idx, len }),
                    }
                }
                _ => Err(Error::NotAnArray {
                    path: path.to_string(),
                }),
            },
            Segment::Query(_) => Err(Error::InvalidDirective {
                directive: path.to_string(),
                message: "cannot set through a query segment".to_string(),
            }),
        };
    }
    let child = match segment {
        Segment::Key(name) => match container {
            Value::Object(map) => map.get_mut(&name).ok_or_else(|| Error::PathNotFound {
                path: path.to_string(),
            })?,
            _ => {
                return Err(Error::PathNotFound {
                    path: path.to_string(),
                });
            }
        },
        Segment::Index(idx) => match container {
            Value::Array(items) => {
                let len = items.len();
                items
                    .get_mut(idx)
                    .ok_or(Error::IndexOutOfRange { index: idx, len })?
            }
            _ => {
                return Err(Error::NotAnArray {
                    path: path.to_string(),
                });
            }
        },
        Segment::Query(_) => {
            return Err(Error::InvalidDirective {
                directive: path.to_string(),
                message: "cannot set through a query segment".to_string(),
            });
        }
    };
    set_value(child, rest, value)
}

fn missing(path: &str, skip_missing: bool) -> Result<Value> {
    if skip_missing {
        Ok(Value::Null)
    } else {
        Err(Error::PathNotFound {
            path: path.to_string(),
        })
    }
}

/// Evaluate a backtick query against the container it was reached at.
///
/// The query is a JSONPath-style dotted/bracketed path with an optional
/// leading `$`, re-entering the regular navigator.
fn lookup_query(container: &Value, query: &str, skip_missing: bool) -> Result<Value> {
    let trimmed = query.trim();
    let rooted = trimmed.strip_prefix('$').unwrap_or(trimmed);
    if rooted.is_empty() {
        return Ok(container.clone());
    }
    if rooted.starts_with('.') || rooted.starts_with('[') {
        get_value_with_options(container, rooted, skip_missing)
    } else {
        get_value_with_options(container, &format!(".{rooted}"), skip_missing)
    }
}

fn unterminated(path: &str) -> Error {
    Error::InvalidDirective {
        directive: path.to_string(),
        message: "unterminated bracket segment".to_string(),
    }
}

fn split_segment(path: &str) -> Result<(Segment, &str)> {
    match path.as_bytes().first() {
        Some(b'.') => {
            let end = path[1..]
                .find(['.', '['])
                .map(|i| i + 1)
                .unwrap_or(path.len());
            let name = &path[1..end];
            if name.is_empty() {
                return Err(Error::InvalidDirective {
                    directive: path.to_string(),
                    message: "empty path segment".to_string(),
                });
            }
            Ok((Segment::Key(name.to_string()), &path[end..]))
        }
        Some(b'[') => split_bracket_segment(path),
        Some(_) => {
            // lenient bare leading name, as produced by resolver fallbacks
            let end = path.find(['.', '[']).unwrap_or(path.len());
            Ok((Segment::Key(path[..end].to_string()), &path[end..]))
        }
        None => Err(Error::InvalidDirective {
            directive: path.to_string(),
            message: "empty path".to_string(),
        }),
    }
}

fn split_bracket_segment(path: &str) -> Result<(Segment, &str)> {
    let inner = &path[1..];
    match inner.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let mut key = String::new();
            let mut escaped = false;
            let mut close = None;
            for (i, c) in inner.char_indices().skip(1) {
                if escaped {
                    key.push(c);
                    escaped = false;
                    continue;
                }
                if c == '\\' {
                    escaped = true;
                } else if c == quote {
                    close = Some(i);
                    break;
                } else {
                    key.push(c);
                }
            }
            let close = close.ok_or_else(|| unterminated(path))?;
            let rest = inner[close + 1..]
                .strip_prefix(']')
                .ok_or_else(|| unterminated(path))?;
            Ok((Segment::Key(key), rest))
        }
        Some('`') => {
            let close = inner[1..]
                .find('`')
                .map(|i| i + 1)
                .ok_or_else(|| unterminated(path))?;
            let query = inner[1..close].to_string();
            let rest = inner[close + 1..]
                .strip_prefix(']')
                .ok_or_else(|| unterminated(path))?;
            Ok((Segment::Query(query), rest))
        }
        _ => {
            let close = inner.find(']').ok_or_else(|| unterminated(path))?;
            let index_text = inner[..close].trim();
            let index = index_text.parse::<usize>().map_err(|_| Error::InvalidIndex {
                index: index_text.to_string(),
            })?;
            Ok((Segment::Index(index), &inner[close + 1..]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "customer": {
                "name": "Ada",
                "tags": ["vip", "beta"],
                "contact info": {"email": "ada@example.com"}
            },
            "total": 120
        })
    }

    #[test]
    fn test_get_by_object_key() {
        let c = sample();
        assert_eq!(get_value(&c, ".total").unwrap(), json!(120));
        assert_eq!(get_value(&c, ".customer.name").unwrap(), json!("Ada"));
    }

    #[test]
    fn test_get_by_quoted_map_key() {
        let c = sample();
        assert_eq!(
            get_value(&c, ".customer[\"contact info\"].email").unwrap(),
            json!("ada@example.com")
        );
        assert_eq!(
            get_value(&c, ".customer['contact info'].email").unwrap(),
            json!("ada@example.com")
        );
    }

    #[test]
    fn test_get_by_array_index() {
        let c = sample();
        assert_eq!(get_value(&c, ".customer.tags[1]").unwrap(), json!("beta"));
    }

    #[test]
    fn test_get_by_backtick_query() {
        let c = sample();
        assert_eq!(
            get_value(&c, "[`$.customer.tags[0]`]").unwrap(),
            json!("vip")
        );
        assert_eq!(get_value(&c, "[`customer.name`]").unwrap(), json!("Ada"));
    }

    #[test]
    fn test_get_missing_path_errors() {
        let c = sample();
        let err = get_value_with_options(&c, ".customer.age", false).unwrap_err();
        assert!(matches!(err, Error::PathNotFound { .. }));
    }

    #[test]
    fn test_get_missing_path_skipped() {
        let c = sample();
        assert_eq!(
            get_value_with_options(&c, ".customer.age", true).unwrap(),
            Value::Null
        );
        assert_eq!(
            get_value_with_options(&c, ".customer.tags[9]", true).unwrap(),
            Value::Null
        );
        // structural errors are never skipped
        assert!(get_value_with_options(&c, ".total[0]", true).is_err());
    }

    #[test]
    fn test_get_index_errors() {
        let c = sample();
        assert!(matches!(
            get_value_with_options(&c, ".customer.tags[5]", false).unwrap_err(),
            Error::IndexOutOfRange { index: 5, len: 2 }
        ));
        assert!(matches!(
            get_value(&c, ".customer.tags[x]").unwrap_err(),
            Error::InvalidIndex { .. }
        ));
        assert!(matches!(
            get_value(&c, ".total[0]").unwrap_err(),
            Error::NotAnArray { .. }
        ));
    }

    #[test]
    fn test_set_then_get_object_key() {
        let mut c = sample();
        set_value(&mut c, ".customer.name", json!("Grace")).unwrap();
        assert_eq!(get_value(&c, ".customer.name").unwrap(), json!("Grace"));

        // inserting a brand new key at the final segment is allowed
        set_value(&mut c, ".customer.age", json!(36)).unwrap();
        assert_eq!(get_value(&c, ".customer.age").unwrap(), json!(36));
    }

    #[test]
    fn test_set_then_get_quoted_key() {
        let mut c = sample();
        set_value(&mut c, ".customer[\"contact info\"]", json!("n/a")).unwrap();
        assert_eq!(
            get_value(&c, ".customer[\"contact info\"]").unwrap(),
            json!("n/a")
        );
    }

    #[test]
    fn test_set_then_get_array_index() {
        let mut c = sample();
        set_value(&mut c, ".customer.tags[0]", json!("gold")).unwrap();
        assert_eq!(get_value(&c, ".customer.tags[0]").unwrap(), json!("gold"));
    }

    #[test]
    fn test_set_does_not_create_intermediates() {
        let mut c = sample();
        let err = set_value(&mut c, ".billing.address", json!("x")).unwrap_err();
        assert!(matches!(err, Error::PathNotFound { .. }));
    }

    #[test]
    fn test_set_out_of_range_index_errors() {
        let mut c = sample();
        assert!(matches!(
            set_value(&mut c, ".customer.tags[7]", json!("x")).unwrap_err(),
            Error::IndexOutOfRange { .. }
        ));
    }

    #[test]
    fn test_unterminated_bracket_is_a_compile_error() {
        let c = sample();
        assert!(matches!(
            get_value(&c, ".customer[\"oops").unwrap_err(),
            Error::InvalidDirective { .. }
        ));
    }
}

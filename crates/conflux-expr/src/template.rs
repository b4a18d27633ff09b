//! Template span scanner
//!
//! Splits a template string into literal text and `{{ expr }}` spans.
//! Spans do not nest. An unterminated `{{` is not an error: the remainder
//! of the string, including the open marker, is literal text.

/// One raw (uncompiled) template span
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawPart {
    /// Verbatim text
    Literal(String),
    /// Expression source between `{{` and `}}`, trimmed
    Expr(String),
}

/// True when the string carries at least one template open marker.
pub(crate) fn has_template(source: &str) -> bool {
    source.contains("{{")
}

/// Split `source` into ordered raw spans.
pub(crate) fn scan(source: &str) -> Vec<RawPart> {
    let mut parts = Vec::new();
    let mut rest = source;
    loop {
        match rest.find("{{") {
            None => {
                if !rest.is_empty() {
                    parts.push(RawPart::Literal(rest.to_string()));
                }
                break;
            }
            Some(open) => {
                if open > 0 {
                    parts.push(RawPart::Literal(rest[..open].to_string()));
                }
                let after = &rest[open + 2..];
                match after.find("}}") {
                    None => {
                        // unterminated span: keep the marker as literal text
                        parts.push(RawPart::Literal(rest[open..].to_string()));
                        break;
                    }
                    Some(close) => {
                        parts.push(RawPart::Expr(after[..close].trim().to_string()));
                        rest = &after[close + 2..];
                    }
                }
            }
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_interleaves_literals_and_spans() {
        let parts = scan("{{1+1}} apples and {{2+2}} pears");
        assert_eq!(
            parts,
            vec![
                RawPart::Expr("1+1".to_string()),
                RawPart::Literal(" apples and ".to_string()),
                RawPart::Expr("2+2".to_string()),
                RawPart::Literal(" pears".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_no_spans() {
        assert_eq!(
            scan("plain text"),
            vec![RawPart::Literal("plain text".to_string())]
        );
    }

    #[test]
    fn test_scan_unterminated_open_is_literal() {
        assert_eq!(
            scan("count: {{ 1 + "),
            vec![
                RawPart::Literal("count: ".to_string()),
                RawPart::Literal("{{ 1 + ".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_trims_span_source() {
        assert_eq!(scan("{{  $.x  }}"), vec![RawPart::Expr("$.x".to_string())]);
    }
}

//! Parser for PostgreSQL one-dimensional array literals.
//!
//! `pg_stats.most_common_vals` and `histogram_bounds` are `anyarray`, which
//! the wire protocol cannot decode into a concrete Rust type. The catalog
//! query casts them to `text` and this module splits the literal back into
//! its elements.

/// Parse `{a,"b c",NULL}` into `[Some("a"), Some("b c"), None]`.
///
/// Returns `None` when the input is not a brace-delimited literal. Quoted
/// elements honor backslash escapes; an unquoted `NULL` is a SQL null.
pub fn parse_array_literal(literal: &str) -> Option<Vec<Option<String>>> {
    let inner = literal.trim().strip_prefix('{')?.strip_suffix('}')?;

    let mut elements = Vec::new();
    if inner.trim().is_empty() {
        return Some(elements);
    }

    let mut chars = inner.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        if chars.peek() == Some(&'"') {
            chars.next();
            let mut element = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            element.push(escaped);
                        }
                    }
                    '"' => break,
                    other => element.push(other),
                }
            }
            elements.push(Some(element));
            // Skip anything up to the next separator.
            for c in chars.by_ref() {
                if c == ',' {
                    break;
                }
            }
        } else {
            let mut element = String::new();
            for c in chars.by_ref() {
                if c == ',' {
                    break;
                }
                element.push(c);
            }
            let element = element.trim();
            if element.eq_ignore_ascii_case("NULL") {
                elements.push(None);
            } else {
                elements.push(Some(element.to_string()));
            }
        }

        if chars.peek().is_none() {
            break;
        }
    }

    Some(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_simple_elements() {
        assert_eq!(
            parse_array_literal("{PG-13,NC-17,R}"),
            Some(some(&["PG-13", "NC-17", "R"]))
        );
    }

    #[test]
    fn test_quoted_elements_with_spaces_and_commas() {
        assert_eq!(
            parse_array_literal(r#"{"New York","Paris, TX",Berlin}"#),
            Some(some(&["New York", "Paris, TX", "Berlin"]))
        );
    }

    #[test]
    fn test_escaped_quote_and_backslash() {
        assert_eq!(
            parse_array_literal(r#"{"say \"hi\"","a\\b"}"#),
            Some(some(&["say \"hi\"", "a\\b"]))
        );
    }

    #[test]
    fn test_null_and_empty_string() {
        assert_eq!(
            parse_array_literal(r#"{NULL,"",x}"#),
            Some(vec![None, Some(String::new()), Some("x".to_string())])
        );
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(parse_array_literal("{}"), Some(Vec::new()));
    }

    #[test]
    fn test_not_an_array() {
        assert_eq!(parse_array_literal("PG-13"), None);
        assert_eq!(parse_array_literal(""), None);
    }

    #[test]
    fn test_timestamps_are_quoted() {
        assert_eq!(
            parse_array_literal(r#"{"2006-02-15 04:34:33","2006-02-15 09:34:33"}"#),
            Some(some(&["2006-02-15 04:34:33", "2006-02-15 09:34:33"]))
        );
    }
}

//! Query grammar.
//!
//! ```text
//! query      := term { [AND | OR] term }
//! term       := [NOT] (field_expr | free_text)
//! field_expr := FIELD ":" value
//! ```
//!
//! Keywords are case-insensitive and a missing joiner means AND. Parentheses
//! must balance but are otherwise dropped: the filters come out as one flat
//! list that the executor folds left to right.

use crate::error::ParseError;
use crate::query::lexer::{Token, TokenKind, strip_quotes, tokenize};
use crate::query::types::{
    AgeComparison, AgeFilter, AgeUnit, Field, Filter, FilterValue, Joiner, Query,
};
use regex::Regex;
use std::sync::LazyLock;

static AGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([<>])(\d+)([dwmyDWMY])$").expect("age pattern is a valid regex")
});

/// Parse a query string
pub fn parse_query(input: &str) -> Result<Query, ParseError> {
    let tokens = tokenize(input)?;
    QueryParser::new(&tokens).parse()
}

struct QueryParser<'a> {
    tokens: &'a [Token],
    query: Query,
    pending_joiner: Option<(Joiner, &'a Token)>,
    pending_not: Option<&'a Token>,
    open_parens: Vec<&'a Token>,
}

impl<'a> QueryParser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            query: Query::default(),
            pending_joiner: None,
            pending_not: None,
            open_parens: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Query, ParseError> {
        for token in self.tokens {
            match token.kind {
                TokenKind::LParen => self.open_parens.push(token),
                TokenKind::RParen => {
                    if self.open_parens.pop().is_none() {
                        return Err(error("Unmatched closing parenthesis", token));
                    }
                }
                TokenKind::Word => self.word(token)?,
            }
        }

        if let Some(paren) = self.open_parens.first() {
            return Err(error("Unclosed parenthesis", paren));
        }
        if let Some(not) = self.pending_not {
            return Err(error("NOT without a following term", not));
        }
        if let Some((_, op)) = self.pending_joiner {
            return Err(error("Operator without a following term", op));
        }

        Ok(self.query)
    }

    fn word(&mut self, token: &'a Token) -> Result<(), ParseError> {
        if !token.is_quoted() {
            match token.text.to_ascii_uppercase().as_str() {
                "AND" => return self.joiner(Joiner::And, token),
                "OR" => return self.joiner(Joiner::Or, token),
                "NOT" => {
                    if self.pending_not.is_some() {
                        return Err(error("Repeated NOT", token));
                    }
                    self.pending_not = Some(token);
                    return Ok(());
                }
                _ => {}
            }
        }

        let mut filter = parse_term(token)?;
        if self.pending_not.take().is_some() {
            filter = filter.negate();
        }
        let joiner = self
            .pending_joiner
            .take()
            .map_or(Joiner::And, |(joiner, _)| joiner);
        self.query.push(joiner, filter);
        Ok(())
    }

    fn joiner(&mut self, joiner: Joiner, token: &'a Token) -> Result<(), ParseError> {
        if self.query.is_empty() {
            return Err(error("Operator without a preceding term", token));
        }
        if self.pending_joiner.is_some() {
            return Err(error("Consecutive operators", token));
        }
        if self.pending_not.is_some() {
            return Err(error("Operator after NOT", token));
        }
        self.pending_joiner = Some((joiner, token));
        Ok(())
    }
}

fn error(message: &str, token: &Token) -> ParseError {
    ParseError::new(message, &token.text, token.position)
}

/// Parse one term token into a filter
fn parse_term(token: &Token) -> Result<Filter, ParseError> {
    let text = token.text.as_str();

    if let Some((name, raw_value)) = split_field(text) {
        let field = Field::from_name(name).ok_or_else(|| error("Unknown field", token))?;
        let value = strip_quotes(raw_value);
        if value.trim().is_empty() {
            return Err(error("Missing value", token));
        }

        let value = match field {
            Field::Modified => FilterValue::Age(
                parse_age(value.trim()).ok_or_else(|| {
                    error("Invalid modified value (expected e.g. >7d or <2w)", token)
                })?,
            ),
            _ => FilterValue::Text(value.to_string()),
        };
        return Ok(Filter::new(field, value));
    }

    let phrase = strip_quotes(text);
    if phrase.trim().is_empty() {
        return Err(error("Empty phrase", token));
    }
    let mut filter = Filter::text(Field::Content, phrase);
    filter.free_text = true;
    Ok(filter)
}

/// `field:value` when the part before the first colon looks like a field
/// name. Anything else containing a colon (`http://…`, `12:30`) is free text.
fn split_field(text: &str) -> Option<(&str, &str)> {
    if text.starts_with(['"', '\'']) {
        return None;
    }
    let (name, value) = text.split_once(':')?;
    let identifier =
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic() || c == '_');
    if !identifier || value.starts_with("//") {
        return None;
    }
    Some((name, value))
}

fn parse_age(value: &str) -> Option<AgeFilter> {
    let caps = AGE_PATTERN.captures(value)?;
    let comparison = match &caps[1] {
        ">" => AgeComparison::Within,
        _ => AgeComparison::Before,
    };
    let amount = caps[2].parse::<i64>().ok()?;
    let unit = caps[3].chars().next().and_then(AgeUnit::from_suffix)?;
    Some(AgeFilter {
        comparison,
        amount,
        unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_filter(field: Field, value: &str) -> Filter {
        Filter::text(field, value)
    }

    #[test]
    fn test_empty_query() {
        let q = parse_query("   ").unwrap();
        assert!(q.is_empty());
        assert!(q.joiners.is_empty());
    }

    #[test]
    fn test_single_field() {
        let q = parse_query("tag:api").unwrap();
        assert_eq!(q.filters, vec![text_filter(Field::Tag, "api")]);
    }

    #[test]
    fn test_implicit_and() {
        let q = parse_query("tag:api type:prompt").unwrap();
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.joiners, vec![Joiner::And]);
    }

    #[test]
    fn test_explicit_joiners_case_insensitive() {
        let q = parse_query("tag:a or tag:b And tag:c").unwrap();
        assert_eq!(q.joiners, vec![Joiner::Or, Joiner::And]);
    }

    #[test]
    fn test_not_negates_next_term() {
        let q = parse_query("tag:api NOT tag:security").unwrap();
        assert!(!q.filters[0].negated);
        assert!(q.filters[1].negated);
        assert_eq!(q.joiners, vec![Joiner::And]);
    }

    #[test]
    fn test_field_names_case_insensitive() {
        let q = parse_query("TAG:api Name:Auth").unwrap();
        assert_eq!(q.filters[0].field, Field::Tag);
        assert_eq!(q.filters[1], text_filter(Field::Name, "Auth"));
    }

    #[test]
    fn test_quoted_value_stripped() {
        let q = parse_query("name:\"api prompt\" content:'error handling'").unwrap();
        assert_eq!(q.filters[0], text_filter(Field::Name, "api prompt"));
        assert_eq!(q.filters[1], text_filter(Field::Content, "error handling"));
    }

    #[test]
    fn test_free_text_becomes_content() {
        let q = parse_query("retry \"error handling\"").unwrap();
        assert_eq!(q.filters.len(), 2);
        assert!(q.filters.iter().all(|f| f.field == Field::Content && f.free_text));
        assert_eq!(q.free_text().collect::<Vec<_>>(), vec!["retry", "error handling"]);
    }

    #[test]
    fn test_quoted_keyword_is_free_text() {
        let q = parse_query("\"AND\"").unwrap();
        assert_eq!(q.filters[0].text_value(), Some("AND"));
    }

    #[test]
    fn test_url_is_free_text() {
        let q = parse_query("https://example.com 12:30").unwrap();
        assert_eq!(q.filters.len(), 2);
        assert!(q.filters.iter().all(|f| f.free_text));
    }

    #[test]
    fn test_unknown_field_names_token() {
        let err = parse_query("tag:api colour:red").unwrap_err();
        assert_eq!(err.token, "colour:red");
        assert_eq!(err.position, 8);
        assert!(err.message.contains("Unknown field"));
    }

    #[test]
    fn test_unknown_field_alone() {
        assert!(parse_query("foo:bar").is_err());
    }

    #[test]
    fn test_missing_value() {
        let err = parse_query("tag:").unwrap_err();
        assert_eq!(err.token, "tag:");
        assert!(parse_query("name:\"\"").is_err());
    }

    #[test]
    fn test_modified_values() {
        let q = parse_query("modified:>7d modified:<2W").unwrap();
        assert_eq!(
            q.filters[0].value,
            FilterValue::Age(AgeFilter {
                comparison: AgeComparison::Within,
                amount: 7,
                unit: AgeUnit::Days,
            })
        );
        assert_eq!(
            q.filters[1].value,
            FilterValue::Age(AgeFilter {
                comparison: AgeComparison::Before,
                amount: 2,
                unit: AgeUnit::Weeks,
            })
        );
    }

    #[test]
    fn test_invalid_modified() {
        for bad in [
            "modified:7d",
            "modified:>7",
            "modified:>7h",
            "modified:>-1d",
            "modified:>99999999999999999999d",
        ] {
            let err = parse_query(bad).unwrap_err();
            assert_eq!(err.token, bad);
        }
    }

    #[test]
    fn test_status_values_parse() {
        let q = parse_query("status:archived status:whatever").unwrap();
        assert_eq!(q.filters[1], text_filter(Field::Status, "whatever"));
        assert!(q.requires_archived());
    }

    #[test]
    fn test_trailing_operator() {
        let err = parse_query("tag:api AND").unwrap_err();
        assert_eq!(err.token, "AND");
        assert_eq!(err.position, 8);
    }

    #[test]
    fn test_leading_operator() {
        assert!(parse_query("OR tag:api").is_err());
    }

    #[test]
    fn test_consecutive_operators() {
        assert!(parse_query("tag:a AND OR tag:b").is_err());
    }

    #[test]
    fn test_dangling_not() {
        let err = parse_query("tag:a NOT").unwrap_err();
        assert_eq!(err.token, "NOT");
        assert!(parse_query("tag:a NOT OR tag:b").is_err());
        assert!(parse_query("NOT NOT tag:a").is_err());
    }

    #[test]
    fn test_leading_not() {
        let q = parse_query("NOT status:archived").unwrap();
        assert!(q.filters[0].negated);
    }

    #[test]
    fn test_parens_flattened() {
        let grouped = parse_query("(tag:a OR tag:b) AND type:prompt").unwrap();
        let flat = parse_query("tag:a OR tag:b AND type:prompt").unwrap();
        assert_eq!(grouped, flat);
    }

    #[test]
    fn test_unbalanced_parens() {
        let err = parse_query("(tag:a OR tag:b").unwrap_err();
        assert_eq!(err.position, 0);
        let err = parse_query("tag:a)").unwrap_err();
        assert_eq!(err.token, ")");
    }

    #[test]
    fn test_unterminated_quote_is_parse_error() {
        assert!(parse_query("name:\"api").is_err());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let input = "tag:api OR NOT name:x content:\"a b\" modified:>1y";
        assert_eq!(parse_query(input).unwrap(), parse_query(input).unwrap());
    }
}

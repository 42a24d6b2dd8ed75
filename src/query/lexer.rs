//! Query tokenizer.
//!
//! Splits on whitespace. A quoted section keeps its quotes and may contain
//! whitespace and parentheses; it opens at the start of a token or right
//! after a `:` (`name:"api prompt"`), so apostrophes inside words stay
//! literal. Parentheses outside quotes are tokens of their own.

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset in the input
    pub position: usize,
}

impl Token {
    fn word(text: String, position: usize) -> Self {
        Self {
            kind: TokenKind::Word,
            text,
            position,
        }
    }

    /// Whether the token starts with a quote character
    pub fn is_quoted(&self) -> bool {
        self.text.starts_with(['"', '\''])
    }
}

/// Tokenize a query string
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0;
    let mut quote: Option<char> = None;

    for (i, ch) in input.char_indices() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            c if c.is_whitespace() => flush(&mut tokens, &mut current, start),
            '(' | ')' => {
                flush(&mut tokens, &mut current, start);
                tokens.push(Token {
                    kind: if ch == '(' {
                        TokenKind::LParen
                    } else {
                        TokenKind::RParen
                    },
                    text: ch.to_string(),
                    position: i,
                });
            }
            '"' | '\'' if current.is_empty() || current.ends_with(':') => {
                if current.is_empty() {
                    start = i;
                }
                current.push(ch);
                quote = Some(ch);
            }
            _ => {
                if current.is_empty() {
                    start = i;
                }
                current.push(ch);
            }
        }
    }

    if quote.is_some() {
        return Err(ParseError::new("Unterminated quote", &input[start..], start));
    }
    flush(&mut tokens, &mut current, start);

    Ok(tokens)
}

fn flush(tokens: &mut Vec<Token>, current: &mut String, start: usize) {
    if !current.is_empty() {
        tokens.push(Token::word(std::mem::take(current), start));
    }
}

/// Remove one pair of matching surrounding quotes
pub fn strip_quotes(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_whitespace_split() {
        assert_eq!(
            texts("  tag:api   AND type:prompt "),
            vec!["tag:api", "AND", "type:prompt"]
        );
    }

    #[test]
    fn test_quoted_tokens_keep_quotes() {
        assert_eq!(
            texts("\"error handling\" 'two words'"),
            vec!["\"error handling\"", "'two words'"]
        );
    }

    #[test]
    fn test_quote_after_colon() {
        assert_eq!(
            texts("name:\"api (v2) prompt\" x"),
            vec!["name:\"api (v2) prompt\"", "x"]
        );
    }

    #[test]
    fn test_apostrophe_inside_word_is_literal() {
        assert_eq!(texts("don't panic"), vec!["don't", "panic"]);
    }

    #[test]
    fn test_parens_are_tokens() {
        let tokens = tokenize("(tag:a OR tag:b)").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LParen,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::RParen,
            ]
        );
        assert_eq!(tokens[4].position, 15);
    }

    #[test]
    fn test_positions_are_byte_offsets() {
        let tokens = tokenize("é tag:x").unwrap();
        assert_eq!(tokens[1].position, 3);
    }

    #[test]
    fn test_unterminated_quote() {
        let err = tokenize("tag:api \"error handling").unwrap_err();
        assert_eq!(err.position, 8);
        assert_eq!(err.token, "\"error handling");
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"a b\""), "a b");
        assert_eq!(strip_quotes("'x'"), "x");
        assert_eq!(strip_quotes("\"mismatch'"), "\"mismatch'");
        assert_eq!(strip_quotes("\""), "\"");
    }
}

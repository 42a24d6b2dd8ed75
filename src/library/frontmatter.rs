//! YAML front-matter for component files.
//!
//! A component may start with a block delimited by lines containing exactly
//! `---`. Everything after the closing delimiter is the Markdown body.

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

const DELIMITER: &str = "---";

/// Recognized front-matter keys; anything else is ignored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

/// A file split into its front-matter and body
#[derive(Debug, Clone, PartialEq)]
pub struct Document<'a> {
    pub front_matter: Option<FrontMatter>,
    pub body: &'a str,
}

/// Split `text` into front-matter and body.
///
/// Files without a leading `---` line are all body. An opening delimiter
/// without a closing one, or YAML that does not parse, is an error string
/// suitable for a load warning.
pub fn parse(text: &str) -> Result<Document<'_>, String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = text.split_inclusive('\n');
    let first = match lines.next() {
        Some(line) => line,
        None => {
            return Ok(Document {
                front_matter: None,
                body: text,
            });
        }
    };

    if first.trim_end_matches(['\r', '\n']) != DELIMITER {
        return Ok(Document {
            front_matter: None,
            body: text,
        });
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            let front_matter = parse_yaml(yaml)?;
            return Ok(Document {
                front_matter: Some(front_matter),
                body,
            });
        }
        offset += line.len();
    }

    Err("front-matter is missing its closing '---' line".to_string())
}

fn parse_yaml(yaml: &str) -> Result<FrontMatter, String> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    serde_yaml::from_str(yaml).map_err(|e| format!("invalid front-matter: {e}"))
}

/// Render a front-matter block followed by `body`, for new files
pub fn render(front_matter: &FrontMatter, body: &str) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(front_matter)?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n\n{body}"))
}

/// Accept a sequence, an inline `[a, b]` list, a single scalar, or null.
/// Non-string scalars (numbers, booleans) are kept in their YAML spelling.
pub(crate) fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(tags_from_value(&value))
}

fn tags_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_front_matter() {
        let doc = parse("# Title\n\nBody").unwrap();
        assert!(doc.front_matter.is_none());
        assert_eq!(doc.body, "# Title\n\nBody");
    }

    #[test]
    fn test_block_list_tags() {
        let doc = parse("---\nname: API Prompt\ntags:\n  - api\n  - v2\n---\nBody text\n").unwrap();
        let fm = doc.front_matter.unwrap();
        assert_eq!(fm.name.as_deref(), Some("API Prompt"));
        assert_eq!(fm.tags, vec!["api", "v2"]);
        assert_eq!(doc.body, "Body text\n");
    }

    #[test]
    fn test_inline_list_tags() {
        let doc = parse("---\ntags: [api, error-handling, 2024]\n---\n").unwrap();
        let fm = doc.front_matter.unwrap();
        assert_eq!(fm.tags, vec!["api", "error-handling", "2024"]);
        assert!(fm.name.is_none());
        assert_eq!(doc.body, "");
    }

    #[test]
    fn test_scalar_tag() {
        let doc = parse("---\ntags: security\n---\nx").unwrap();
        assert_eq!(doc.front_matter.unwrap().tags, vec!["security"]);
    }

    #[test]
    fn test_crlf_delimiters() {
        let doc = parse("---\r\nname: Win\r\n---\r\nBody\r\n").unwrap();
        assert_eq!(doc.front_matter.unwrap().name.as_deref(), Some("Win"));
        assert_eq!(doc.body, "Body\r\n");
    }

    #[test]
    fn test_unterminated_front_matter_is_error() {
        let err = parse("---\nname: Broken\nno closing line\n").unwrap_err();
        assert!(err.contains("closing"));
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        assert!(parse("---\nname: [unclosed\n---\nbody").is_err());
    }

    #[test]
    fn test_empty_front_matter() {
        let doc = parse("---\n---\nBody").unwrap();
        assert_eq!(doc.front_matter, Some(FrontMatter::default()));
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn test_render_parses_back() {
        let fm = FrontMatter {
            name: Some("Security Rules".to_string()),
            tags: vec!["security".to_string()],
        };
        let text = render(&fm, "Never log secrets.\n").unwrap();
        let doc = parse(&text).unwrap();
        assert_eq!(doc.front_matter, Some(fm));
        assert_eq!(doc.body.trim(), "Never log secrets.");
    }
}

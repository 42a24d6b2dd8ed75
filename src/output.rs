//! Rendering of search results and items for the terminal.

use crate::index::stats::LibraryStats;
use crate::index::types::Item;
use crate::query::types::{Field, Highlight, SearchHit};
use crate::search::GroupedResults;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Result format for `search` and `list`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Grouped, colored listing
    #[default]
    Text,
    Json,
    Yaml,
}

/// Serialized form of one hit
#[derive(Debug, Serialize)]
pub struct HitRecord<'a> {
    #[serde(flatten)]
    pub item: &'a Item,
    pub score: f32,
    pub highlights: &'a [Highlight],
}

impl<'a> From<&'a SearchHit> for HitRecord<'a> {
    fn from(hit: &'a SearchHit) -> Self {
        Self {
            item: &hit.item,
            score: hit.score,
            highlights: &hit.highlights,
        }
    }
}

pub fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print hits to stdout in the requested format
pub fn print_hits(hits: &[SearchHit], format: OutputFormat, color: bool) -> io::Result<()> {
    let mut out = stdout(color);
    match format {
        OutputFormat::Text => write_grouped(&mut out, &GroupedResults::from_hits(hits.to_vec())),
        OutputFormat::Json | OutputFormat::Yaml => write_records(&mut out, hits, format),
    }
}

/// JSON or YAML array of hit records, in ranked order
pub fn write_records<W: Write>(
    out: &mut W,
    hits: &[SearchHit],
    format: OutputFormat,
) -> io::Result<()> {
    let records: Vec<HitRecord<'_>> = hits.iter().map(HitRecord::from).collect();
    match format {
        OutputFormat::Yaml => {
            serde_yaml::to_writer(&mut *out, &records).map_err(io::Error::other)?;
        }
        _ => {
            serde_json::to_writer_pretty(&mut *out, &records)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Grouped text listing: one heading per kind, one line per hit
pub fn write_grouped<W: WriteColor>(out: &mut W, grouped: &GroupedResults) -> io::Result<()> {
    if grouped.is_empty() {
        writeln!(out, "No results.")?;
        return Ok(());
    }

    for (i, (heading, hits)) in grouped.groups().into_iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
        writeln!(out, "{heading} ({})", hits.len())?;
        out.reset()?;

        for hit in hits {
            write_hit_line(out, hit)?;
        }
    }
    Ok(())
}

fn write_hit_line<W: WriteColor>(out: &mut W, hit: &SearchHit) -> io::Result<()> {
    let item = &hit.item;

    write!(out, "  ")?;
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{}", item.name)?;
    out.reset()?;

    if !item.tags.is_empty() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(out, " [{}]", item.tags.join(", "))?;
        out.reset()?;
    }
    if item.archived {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        write!(out, " (archived)")?;
        out.reset()?;
    }

    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    writeln!(out, "  {}", item.path)?;
    out.reset()?;

    for highlight in hit.highlights.iter().filter(|h| h.field == Field::Content) {
        out.set_color(ColorSpec::new().set_dimmed(true))?;
        writeln!(out, "      {}", highlight.text)?;
        out.reset()?;
    }
    Ok(())
}

/// Metadata block followed by the raw file content
pub fn write_item<W: WriteColor>(
    out: &mut W,
    item: &Item,
    raw: &str,
    now: DateTime<Utc>,
) -> io::Result<()> {
    let field = |out: &mut W, label: &str, value: &str| -> io::Result<()> {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{label:>9}: ")?;
        out.reset()?;
        writeln!(out, "{value}")
    };

    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    writeln!(out, "{}", item.name)?;
    out.reset()?;

    field(out, "path", &item.path)?;
    field(out, "type", item.type_label())?;
    field(out, "tags", &item.tags.join(", "))?;
    let age = item.age_days(now);
    field(
        out,
        "modified",
        &format!("{} ({age}d ago)", item.modified.format("%Y-%m-%d %H:%M")),
    )?;
    field(out, "status", if item.archived { "archived" } else { "active" })?;
    field(out, "tokens", &format!("~{}", item.token_count))?;
    if item.is_component() {
        field(out, "used by", &format!("{} pipeline(s)", item.usage_count))?;
    }

    writeln!(out)?;
    write!(out, "{raw}")?;
    if !raw.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}

/// Stats as JSON or YAML; text goes through `stats::show_stats`
pub fn write_stats<W: Write>(
    out: &mut W,
    stats: &LibraryStats,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_writer(&mut *out, stats).map_err(io::Error::other),
        _ => {
            serde_json::to_writer_pretty(&mut *out, stats)?;
            writeln!(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::Subkind;
    use std::sync::Arc;
    use termcolor::Buffer;

    fn hits() -> Vec<SearchHit> {
        let now = Utc::now();
        vec![
            SearchHit {
                item: Arc::new(Item::pipeline(
                    "pipelines/api-pipeline.yaml",
                    "api-pipeline",
                    vec!["api".into()],
                    "components: []",
                    now,
                )),
                score: 3.5,
                highlights: Vec::new(),
            },
            SearchHit {
                item: Arc::new(Item::component(
                    Subkind::Prompts,
                    "components/prompts/api-prompt.md",
                    "API Prompt",
                    vec!["api".into(), "v2".into()],
                    "Handle errors.",
                    now,
                )),
                score: 2.0,
                highlights: vec![Highlight {
                    field: Field::Content,
                    text: "Handle errors.".into(),
                }],
            },
        ]
    }

    fn text(buffer: Buffer) -> String {
        String::from_utf8(buffer.into_inner()).unwrap()
    }

    #[test]
    fn test_grouped_text() {
        let mut buffer = Buffer::no_color();
        write_grouped(&mut buffer, &GroupedResults::from_hits(hits())).unwrap();
        let out = text(buffer);

        assert!(out.starts_with("Pipelines (1)\n"));
        assert!(out.contains("\nPrompts (1)\n"));
        assert!(out.contains("  API Prompt [api, v2]  components/prompts/api-prompt.md\n"));
        assert!(out.contains("      Handle errors.\n"));
    }

    #[test]
    fn test_empty_text() {
        let mut buffer = Buffer::no_color();
        write_grouped(&mut buffer, &GroupedResults::default()).unwrap();
        assert_eq!(text(buffer), "No results.\n");
    }

    #[test]
    fn test_json_records() {
        let mut out = Vec::new();
        write_records(&mut out, &hits(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["path"], "pipelines/api-pipeline.yaml");
        assert_eq!(records[0]["score"], 3.5);
        assert_eq!(records[1]["subkind"], "prompts");
        assert_eq!(records[1]["highlights"][0]["field"], "content");
        assert!(records[1].get("body").is_none());
    }

    #[test]
    fn test_yaml_records() {
        let mut out = Vec::new();
        write_records(&mut out, &hits(), OutputFormat::Yaml).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_slice(&out).unwrap();
        assert_eq!(value[1]["name"].as_str(), Some("API Prompt"));
    }

    #[test]
    fn test_write_item() {
        let hit = &hits()[1];
        let mut buffer = Buffer::no_color();
        write_item(&mut buffer, &hit.item, "---\nname: API Prompt\n---\nbody", Utc::now()).unwrap();
        let out = text(buffer);
        assert!(out.starts_with("API Prompt\n"));
        assert!(out.contains("     path: components/prompts/api-prompt.md\n"));
        assert!(out.contains("  used by: 0 pipeline(s)\n"));
        assert!(out.ends_with("body\n"));
    }
}

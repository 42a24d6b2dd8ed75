use super::frontmatter;
use super::{EntryKind, LibraryEntry};
use crate::error::{Error, Result};
use crate::index::types::Subkind;
use crate::utils::name_from_stem;
use chrono::{DateTime, Utc};

/// A Markdown component read from disk
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub subkind: Subkind,
    pub path: String,
    pub name: String,
    pub tags: Vec<String>,
    /// Markdown after the front-matter
    pub body: String,
    pub modified: DateTime<Utc>,
    pub archived: bool,
}

impl Component {
    /// Read and parse a component file
    pub fn load(entry: &LibraryEntry) -> Result<Self> {
        let raw = entry.read_to_string()?;
        let modified = entry.modified()?;
        Self::parse(entry, &raw, modified)
    }

    /// Parse component text already read from `entry`
    pub fn parse(entry: &LibraryEntry, raw: &str, modified: DateTime<Utc>) -> Result<Self> {
        let EntryKind::Component(subkind) = entry.kind else {
            return Err(Error::load(&entry.file, "not a component file"));
        };

        let doc = frontmatter::parse(raw).map_err(|message| Error::load(&entry.file, message))?;
        let front_matter = doc.front_matter.unwrap_or_default();

        let name = front_matter
            .name
            .filter(|n| !n.trim().is_empty())
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| name_from_stem(entry.stem()));

        Ok(Component {
            subkind,
            path: entry.path.clone(),
            name,
            tags: front_matter.tags,
            body: doc.body.to_string(),
            modified,
            archived: entry.archived,
        })
    }
}

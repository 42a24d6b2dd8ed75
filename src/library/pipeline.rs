use super::frontmatter::deserialize_tags;
use super::{ARCHIVE_DIR, COMPONENTS_DIR, EntryKind, LibraryEntry, PIPELINES_DIR};
use crate::error::{Error, Result};
use crate::index::types::Subkind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline YAML as authored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub components: Vec<PipelineEntry>,
}

/// One component reference inside a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEntry {
    #[serde(rename = "type")]
    pub subkind: Subkind,
    /// Relative to the pipelines directory, usually `../components/...`
    pub path: String,
    #[serde(default)]
    pub order: i64,
}

impl PipelineEntry {
    /// Logical library path this entry points at
    pub fn logical_path(&self) -> Option<String> {
        resolve_reference(&self.path)
    }
}

/// A loaded pipeline with its entries in composition order
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub path: String,
    pub name: String,
    pub tags: Vec<String>,
    pub entries: Vec<PipelineEntry>,
    /// The YAML text as read
    pub raw: String,
    pub modified: DateTime<Utc>,
    pub archived: bool,
}

impl Pipeline {
    pub fn load(entry: &LibraryEntry) -> Result<Self> {
        let raw = entry.read_to_string()?;
        let modified = entry.modified()?;
        Self::parse(entry, raw, modified)
    }

    pub fn parse(entry: &LibraryEntry, raw: String, modified: DateTime<Utc>) -> Result<Self> {
        if entry.kind != EntryKind::Pipeline {
            return Err(Error::load(&entry.file, "not a pipeline file"));
        }

        let doc: PipelineDocument = if raw.trim().is_empty() {
            PipelineDocument::default()
        } else {
            serde_yaml::from_str(&raw).map_err(|source| Error::Yaml {
                path: entry.file.clone(),
                source,
            })?
        };

        let name = doc
            .name
            .filter(|n| !n.trim().is_empty())
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| entry.stem().to_string());

        // sort_by_key is stable, so equal orders keep file position
        let mut entries = doc.components;
        entries.sort_by_key(|e| e.order);

        Ok(Pipeline {
            path: entry.path.clone(),
            name,
            tags: doc.tags,
            entries,
            raw,
            modified,
            archived: entry.archived,
        })
    }

    /// Logical paths of all resolvable references, in order
    pub fn referenced_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().filter_map(PipelineEntry::logical_path)
    }
}

/// Resolve a pipeline reference to a logical library path.
///
/// References are relative to the active `pipelines/` directory, so
/// `../components/prompts/a.md` becomes `components/prompts/a.md`. Paths
/// already rooted at `components/` or `archive/` are taken as logical.
/// Returns `None` for absolute paths or paths escaping the library root.
pub fn resolve_reference(reference: &str) -> Option<String> {
    let reference = reference.trim().replace('\\', "/");
    if reference.is_empty() || reference.starts_with('/') {
        return None;
    }

    let rooted = reference.starts_with(&format!("{COMPONENTS_DIR}/"))
        || reference.starts_with(&format!("{ARCHIVE_DIR}/"));
    let mut parts: Vec<&str> = if rooted { Vec::new() } else { vec![PIPELINES_DIR] };

    for segment in reference.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Pipeline file name for a display name: `API Review` -> `api-review.yaml`
pub fn file_name(slug: &str) -> String {
    format!("{slug}.yaml")
}

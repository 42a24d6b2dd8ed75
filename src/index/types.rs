use crate::utils::{estimate_tokens, normalize_tag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of an item within one index generation.
///
/// Ids are assigned in path order during a build and are meaningless once the
/// index is rebuilt.
pub type ItemId = u32;

/// Top-level item classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Pipeline,
    Component,
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Pipeline => "pipeline",
            ItemKind::Component => "component",
        }
    }
}

/// Component classification; also the directory name under `components/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subkind {
    #[serde(alias = "prompt")]
    Prompts,
    #[serde(alias = "context")]
    Contexts,
    #[serde(alias = "rule")]
    Rules,
}

impl Subkind {
    pub const ALL: [Subkind; 3] = [Subkind::Contexts, Subkind::Prompts, Subkind::Rules];

    /// Plural label, matching the directory name
    pub fn label(self) -> &'static str {
        match self {
            Subkind::Prompts => "prompts",
            Subkind::Contexts => "contexts",
            Subkind::Rules => "rules",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Subkind::Prompts => "prompt",
            Subkind::Contexts => "context",
            Subkind::Rules => "rule",
        }
    }

    /// Heading used when results are grouped
    pub fn title(self) -> &'static str {
        match self {
            Subkind::Prompts => "Prompts",
            Subkind::Contexts => "Contexts",
            Subkind::Rules => "Rules",
        }
    }
}

impl fmt::Display for Subkind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Subkind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prompt" | "prompts" => Ok(Subkind::Prompts),
            "context" | "contexts" => Ok(Subkind::Contexts),
            "rule" | "rules" => Ok(Subkind::Rules),
            other => Err(format!(
                "unknown component type '{other}' (expected prompts, contexts or rules)"
            )),
        }
    }
}

/// A searchable library record.
///
/// Pipelines and components share this one shape; the differences live in
/// `kind`/`subkind` and in which optional counters are meaningful.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub kind: ItemKind,
    pub subkind: Option<Subkind>,
    /// Logical path relative to the library root, `/`-separated
    pub path: String,
    pub name: String,
    /// Tags as authored; compare through `normalized_tags`
    pub tags: Vec<String>,
    #[serde(skip_serializing)]
    pub normalized_tags: Vec<String>,
    /// Name, tags and raw content joined; the only input to content matching
    #[serde(skip_serializing)]
    pub body: String,
    /// Raw file content as read from disk
    #[serde(skip_serializing)]
    pub content: String,
    pub modified: DateTime<Utc>,
    pub archived: bool,
    pub token_count: usize,
    /// Number of pipelines referencing this component
    pub usage_count: usize,
}

impl Item {
    pub fn component(
        subkind: Subkind,
        path: impl Into<String>,
        name: impl Into<String>,
        tags: Vec<String>,
        content: impl Into<String>,
        modified: DateTime<Utc>,
    ) -> Self {
        Self::assemble(
            ItemKind::Component,
            Some(subkind),
            path.into(),
            name.into(),
            tags,
            content.into(),
            modified,
        )
    }

    pub fn pipeline(
        path: impl Into<String>,
        name: impl Into<String>,
        tags: Vec<String>,
        content: impl Into<String>,
        modified: DateTime<Utc>,
    ) -> Self {
        Self::assemble(
            ItemKind::Pipeline,
            None,
            path.into(),
            name.into(),
            tags,
            content.into(),
            modified,
        )
    }

    fn assemble(
        kind: ItemKind,
        subkind: Option<Subkind>,
        path: String,
        name: String,
        tags: Vec<String>,
        content: String,
        modified: DateTime<Utc>,
    ) -> Self {
        let mut normalized_tags: Vec<String> = Vec::with_capacity(tags.len());
        for tag in &tags {
            let normalized = normalize_tag(tag);
            if !normalized.is_empty() && !normalized_tags.contains(&normalized) {
                normalized_tags.push(normalized);
            }
        }

        let body = format!("{name}\n{}\n{content}", tags.join(" "));
        let token_count = estimate_tokens(&body);

        Item {
            kind,
            subkind,
            path,
            name,
            tags,
            normalized_tags,
            body,
            content,
            modified,
            archived: false,
            token_count,
            usage_count: 0,
        }
    }

    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self
    }

    pub fn with_usage_count(mut self, usage_count: usize) -> Self {
        self.usage_count = usage_count;
        self
    }

    pub fn is_pipeline(&self) -> bool {
        self.kind == ItemKind::Pipeline
    }

    pub fn is_component(&self) -> bool {
        self.kind == ItemKind::Component
    }

    /// `prompts`, `contexts`, `rules` or `pipeline`
    pub fn type_label(&self) -> &'static str {
        match self.subkind {
            Some(sub) => sub.label(),
            None => self.kind.label(),
        }
    }

    /// Lowercased body, computed on demand for substring matching
    pub fn body_lower(&self) -> String {
        self.body.to_lowercase()
    }

    /// Whole days since last modification, never negative
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.modified).num_days().max(0)
    }
}

/// Capability view over a searchable record.
///
/// The evaluator and ranker only go through these getters, so any record
/// shape that can answer them is searchable.
pub trait Searchable {
    fn kind(&self) -> ItemKind;
    fn subkind(&self) -> Option<Subkind>;
    fn path(&self) -> &str;
    fn name(&self) -> &str;
    fn normalized_tags(&self) -> &[String];
    fn body(&self) -> &str;
    fn modified(&self) -> DateTime<Utc>;
    fn archived(&self) -> bool;
    fn usage_count(&self) -> usize;
}

impl Searchable for Item {
    fn kind(&self) -> ItemKind {
        self.kind
    }

    fn subkind(&self) -> Option<Subkind> {
        self.subkind
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn normalized_tags(&self) -> &[String] {
        &self.normalized_tags
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn archived(&self) -> bool {
        self.archived
    }

    fn usage_count(&self) -> usize {
        self.usage_count
    }
}

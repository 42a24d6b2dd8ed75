//! Turn library files into searchable items.

use crate::error::{Error, Result};
use crate::index::types::Item;
use crate::library::{ARCHIVE_DIR, Component, EntryKind, LibraryEntry, LibraryStore, Pipeline};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Items for one index generation, plus the files that failed to load
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub items: Vec<Item>,
    pub skipped: Vec<Error>,
}

/// Anything that can produce the items of a library.
///
/// The search engine rebuilds from its source whenever it needs a new index
/// generation. Per-item failures go into `skipped`; an `Err` aborts the
/// rebuild and keeps the previous generation.
pub trait ItemSource: Send + Sync {
    fn load(&self, include_archived: bool) -> Result<LoadOutcome>;
}

impl ItemSource for LibraryStore {
    fn load(&self, include_archived: bool) -> Result<LoadOutcome> {
        load_library(self, include_archived)
    }
}

/// Fixed set of items, for tests and benchmarks
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    items: Vec<Item>,
}

impl StaticSource {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }
}

impl ItemSource for StaticSource {
    fn load(&self, include_archived: bool) -> Result<LoadOutcome> {
        let items = self
            .items
            .iter()
            .filter(|item| include_archived || !item.archived)
            .cloned()
            .collect();
        Ok(LoadOutcome {
            items,
            skipped: Vec::new(),
        })
    }
}

enum Record {
    Component(Component),
    Pipeline(Pipeline),
}

fn load_record(entry: &LibraryEntry) -> Result<Record> {
    match entry.kind {
        EntryKind::Component(_) => Component::load(entry).map(Record::Component),
        EntryKind::Pipeline => Pipeline::load(entry).map(Record::Pipeline),
    }
}

/// Read every library file in parallel and convert to items
pub fn load_library(store: &LibraryStore, include_archived: bool) -> Result<LoadOutcome> {
    let entries = store.entries(include_archived)?;

    let results: Vec<Result<Record>> = entries.par_iter().map(load_record).collect();

    let mut records = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for result in results {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("skipping: {e}");
                skipped.push(e);
            }
        }
    }

    let usage = usage_counts(records.iter().filter_map(|r| match r {
        Record::Pipeline(p) if !p.archived => Some(p),
        _ => None,
    }));

    let items: Vec<Item> = records
        .into_iter()
        .map(|record| match record {
            Record::Component(c) => {
                let count = usage.get(active_path(&c.path)).copied().unwrap_or(0);
                component_item(c).with_usage_count(count)
            }
            Record::Pipeline(p) => pipeline_item(p),
        })
        .collect();

    debug!(
        items = items.len(),
        skipped = skipped.len(),
        include_archived,
        "loaded library"
    );
    Ok(LoadOutcome { items, skipped })
}

pub fn component_item(component: Component) -> Item {
    Item::component(
        component.subkind,
        component.path,
        component.name,
        component.tags,
        component.body,
        component.modified,
    )
    .with_archived(component.archived)
}

/// Pipelines are searched over their YAML text, so component paths match
pub fn pipeline_item(pipeline: Pipeline) -> Item {
    Item::pipeline(
        pipeline.path,
        pipeline.name,
        pipeline.tags,
        pipeline.raw,
        pipeline.modified,
    )
    .with_archived(pipeline.archived)
}

/// Number of pipelines referencing each logical component path.
/// A pipeline listing the same component twice counts once.
pub fn usage_counts<'a>(pipelines: impl Iterator<Item = &'a Pipeline>) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for pipeline in pipelines {
        let unique: HashSet<String> = pipeline.referenced_paths().collect();
        for path in unique {
            *counts.entry(path).or_insert(0) += 1;
        }
    }
    counts
}

/// Archived components are counted under the path they were archived from
fn active_path(path: &str) -> &str {
    path.strip_prefix(ARCHIVE_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::{ItemKind, Subkind};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn library() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "components/prompts/api-prompt.md",
            "---\nname: API Prompt\ntags: [api]\n---\nBody",
        );
        write(root, "components/rules/plain-rule.md", "No front-matter here");
        write(root, "components/rules/broken.md", "---\nname: [oops\n---\n");
        write(
            root,
            "pipelines/a.yaml",
            "components:\n\
             \x20 - type: prompts\n\
             \x20   path: ../components/prompts/api-prompt.md\n\
             \x20 - type: prompts\n\
             \x20   path: ../components/prompts/api-prompt.md\n",
        );
        write(
            root,
            "pipelines/b.yaml",
            "components:\n  - type: prompts\n    path: ../components/prompts/api-prompt.md\n",
        );
        write(
            root,
            "archive/pipelines/old.yaml",
            "components:\n  - type: rules\n    path: ../components/rules/plain-rule.md\n",
        );
        dir
    }

    #[test]
    fn test_load_skips_broken_files() {
        let dir = library();
        let store = LibraryStore::open(dir.path()).unwrap();
        let outcome = load_library(&store, false).unwrap();

        let paths: Vec<_> = outcome.items.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "components/prompts/api-prompt.md",
                "components/rules/plain-rule.md",
                "pipelines/a.yaml",
                "pipelines/b.yaml",
            ]
        );
        assert_eq!(outcome.skipped.len(), 1);
        assert!(matches!(outcome.skipped[0], Error::Load { .. }));
    }

    #[test]
    fn test_usage_counts_from_active_pipelines() {
        let dir = library();
        let store = LibraryStore::open(dir.path()).unwrap();
        let outcome = load_library(&store, true).unwrap();

        let find = |path: &str| outcome.items.iter().find(|i| i.path == path).unwrap();
        assert_eq!(find("components/prompts/api-prompt.md").usage_count, 2);
        // referenced only by an archived pipeline
        assert_eq!(find("components/rules/plain-rule.md").usage_count, 0);
        assert_eq!(find("pipelines/a.yaml").usage_count, 0);

        let archived = find("archive/pipelines/old.yaml");
        assert!(archived.archived);
        assert_eq!(archived.kind, ItemKind::Pipeline);
    }

    #[test]
    fn test_derived_name_is_searchable_text() {
        let dir = library();
        let store = LibraryStore::open(dir.path()).unwrap();
        let outcome = load_library(&store, false).unwrap();
        let plain = outcome
            .items
            .iter()
            .find(|i| i.path == "components/rules/plain-rule.md")
            .unwrap();
        assert_eq!(plain.name, "Plain Rule");
        assert_eq!(plain.subkind, Some(Subkind::Rules));
        assert!(plain.body.starts_with("Plain Rule"));
    }

    #[test]
    fn test_static_source_gates_archived() {
        let now = chrono::Utc::now();
        let source = StaticSource::new(vec![
            Item::pipeline("pipelines/a.yaml", "a", vec![], "", now),
            Item::pipeline("archive/pipelines/b.yaml", "b", vec![], "", now).with_archived(true),
        ]);
        assert_eq!(source.load(false).unwrap().items.len(), 1);
        assert_eq!(source.load(true).unwrap().items.len(), 2);
    }

    #[test]
    fn test_active_path() {
        assert_eq!(active_path("archive/components/rules/x.md"), "components/rules/x.md");
        assert_eq!(active_path("components/rules/x.md"), "components/rules/x.md");
    }
}

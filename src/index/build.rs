use crate::error::{Error, Result};
use crate::index::loader::ItemSource;
use crate::index::types::{Item, ItemId};
use crate::utils::extract_tokens;
use crate::utils::progress::spinner;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// One immutable index generation.
///
/// Items are addressed by `ItemId`, their position in `items`, which follows
/// path order. Every posting list is a roaring bitmap of ids.
#[derive(Debug)]
pub struct LibraryIndex {
    items: Vec<Arc<Item>>,
    by_path: HashMap<String, ItemId>,
    /// Normalized tag -> ids. Ordered so tag prefixes are a range scan.
    by_tag: BTreeMap<String, RoaringBitmap>,
    /// `pipeline`, `component`, `prompts`, `contexts`, `rules` -> ids
    by_kind: HashMap<&'static str, RoaringBitmap>,
    by_token: FxHashMap<String, RoaringBitmap>,
    archived: RoaringBitmap,
    include_archived: bool,
    built_at: DateTime<Utc>,
}

impl LibraryIndex {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn includes_archived(&self) -> bool {
        self.include_archived
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn item(&self, id: ItemId) -> Option<&Arc<Item>> {
        self.items.get(id as usize)
    }

    pub fn items(&self) -> &[Arc<Item>] {
        &self.items
    }

    pub fn id_of(&self, path: &str) -> Option<ItemId> {
        self.by_path.get(path).copied()
    }

    pub fn get(&self, path: &str) -> Option<&Arc<Item>> {
        self.id_of(path).and_then(|id| self.item(id))
    }

    pub fn all_ids(&self) -> RoaringBitmap {
        let mut ids = RoaringBitmap::new();
        ids.insert_range(0..self.items.len() as u32);
        ids
    }

    pub fn archived_ids(&self) -> &RoaringBitmap {
        &self.archived
    }

    pub fn active_ids(&self) -> RoaringBitmap {
        self.all_ids() - &self.archived
    }

    pub fn tag_exact(&self, tag: &str) -> RoaringBitmap {
        self.by_tag.get(tag).cloned().unwrap_or_default()
    }

    /// Ids carrying any tag that starts with `prefix`
    pub fn tag_prefix(&self, prefix: &str) -> RoaringBitmap {
        self.by_tag
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(tag, _)| tag.starts_with(prefix))
            .fold(RoaringBitmap::new(), |acc, (_, ids)| acc | ids)
    }

    pub fn kind_ids(&self, label: &str) -> RoaringBitmap {
        self.by_kind.get(label).cloned().unwrap_or_default()
    }

    pub fn token_ids(&self, token: &str) -> Option<&RoaringBitmap> {
        self.by_token.get(token)
    }

    /// Distinct normalized tags with the number of items carrying each
    pub fn tag_counts(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.by_tag.iter().map(|(tag, ids)| (tag.as_str(), ids.len()))
    }

    pub fn token_vocabulary(&self) -> usize {
        self.by_token.len()
    }
}

/// Summary of a build
#[derive(Debug)]
pub struct BuildReport {
    pub items: usize,
    /// Files that failed to load and were left out
    pub skipped: Vec<Error>,
    pub include_archived: bool,
    pub elapsed: Duration,
}

/// Builds `LibraryIndex` generations from an item source
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    include_archived: bool,
    show_progress: bool,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_archived(mut self, include: bool) -> Self {
        self.include_archived = include;
        self
    }

    /// Show a spinner on stderr while loading
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn build(&self, source: &dyn ItemSource) -> Result<(LibraryIndex, BuildReport)> {
        let start = Instant::now();
        let progress = spinner("Loading library...", !self.show_progress);

        let outcome = source.load(self.include_archived)?;
        if let Some(pb) = &progress {
            pb.set_message(format!("Indexing {} items...", outcome.items.len()));
        }
        let index = self.from_items(outcome.items)?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let report = BuildReport {
            items: index.len(),
            skipped: outcome.skipped,
            include_archived: self.include_archived,
            elapsed: start.elapsed(),
        };
        debug!(
            items = report.items,
            skipped = report.skipped.len(),
            include_archived = report.include_archived,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "index built"
        );
        Ok((index, report))
    }

    /// Index a set of items directly.
    ///
    /// Archived items are dropped unless the builder includes them. Ids follow
    /// path order; two items with the same path are an error.
    pub fn from_items(&self, items: Vec<Item>) -> Result<LibraryIndex> {
        let mut items: Vec<Item> = items
            .into_iter()
            .filter(|item| self.include_archived || !item.archived)
            .collect();
        items.sort_by(|a, b| a.path.cmp(&b.path));

        if items.len() > u32::MAX as usize {
            return Err(Error::Internal(format!(
                "{} items exceed the id space",
                items.len()
            )));
        }

        let mut by_path = HashMap::with_capacity(items.len());
        for (id, item) in items.iter().enumerate() {
            if by_path.insert(item.path.clone(), id as ItemId).is_some() {
                return Err(Error::Internal(format!("duplicate item path: {}", item.path)));
            }
        }

        // Tokenizing is the expensive part
        let token_sets: Vec<HashSet<String>> =
            items.par_iter().map(|item| extract_tokens(&item.body)).collect();

        let mut by_tag: BTreeMap<String, RoaringBitmap> = BTreeMap::new();
        let mut by_kind: HashMap<&'static str, RoaringBitmap> = HashMap::new();
        let mut by_token: FxHashMap<String, RoaringBitmap> = FxHashMap::default();
        let mut archived = RoaringBitmap::new();

        for (id, (item, tokens)) in items.iter().zip(token_sets).enumerate() {
            let id = id as ItemId;

            for tag in &item.normalized_tags {
                by_tag.entry(tag.clone()).or_default().insert(id);
            }

            by_kind.entry(item.kind.label()).or_default().insert(id);
            if let Some(subkind) = item.subkind {
                by_kind.entry(subkind.label()).or_default().insert(id);
            }

            for token in tokens {
                by_token.entry(token).or_default().insert(id);
            }

            if item.archived {
                archived.insert(id);
            }
        }

        Ok(LibraryIndex {
            items: items.into_iter().map(Arc::new).collect(),
            by_path,
            by_tag,
            by_kind,
            by_token,
            archived,
            include_archived: self.include_archived,
            built_at: Utc::now(),
        })
    }
}

//! Search façade.
//!
//! `SearchEngine` owns the current index generation and rebuilds it from its
//! `ItemSource` when needed. Searches clone the generation's `Arc` under a
//! read lock and evaluate without holding the lock. Rebuilds run outside the
//! lock and swap the finished generation in under the write lock, so a failed
//! rebuild leaves the previous generation in place.

pub mod projection;

pub use projection::{ComponentResults, GroupedResults};

use crate::error::Result;
use crate::index::build::{BuildReport, IndexBuilder, LibraryIndex};
use crate::index::loader::ItemSource;
use crate::index::types::{Item, ItemKind, Subkind};
use crate::query::executor::{EvalOptions, QueryExecutor};
use crate::query::parser::parse_query;
use crate::query::scorer::ScoringWeights;
use crate::query::types::{Query, SearchHit};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Lifecycle of the engine's index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Uninitialized,
    Ready {
        include_archived: bool,
        generation: u64,
        items: usize,
    },
}

/// Query entry point over one library
pub struct SearchEngine {
    source: Box<dyn ItemSource>,
    index: RwLock<Option<Arc<LibraryIndex>>>,
    generation: AtomicU64,
    searches: AtomicU64,
    weights: ScoringWeights,
    options: EvalOptions,
    show_progress: bool,
}

impl SearchEngine {
    pub fn new(source: impl ItemSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            index: RwLock::new(None),
            generation: AtomicU64::new(0),
            searches: AtomicU64::new(0),
            weights: ScoringWeights::default(),
            options: EvalOptions::default(),
            show_progress: false,
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    /// Show a spinner while building
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Parse and run a query
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query = parse_query(query)?;
        self.search_parsed(&query)
    }

    pub fn search_parsed(&self, query: &Query) -> Result<Vec<SearchHit>> {
        let start = Instant::now();
        let index = self.ensure_index(query.requires_archived())?;

        let hits = QueryExecutor::new(&index)
            .with_weights(self.weights.clone())
            .with_options(self.options)
            .execute(query);

        self.searches.fetch_add(1, Ordering::Relaxed);
        debug!(
            hits = hits.len(),
            generation = self.generation.load(Ordering::Relaxed),
            elapsed_us = start.elapsed().as_micros() as u64,
            "search"
        );
        Ok(hits)
    }

    /// Component hits split by subkind; an empty `subkinds` keeps all three
    pub fn search_components_by_kinds(
        &self,
        query: &str,
        subkinds: &[Subkind],
    ) -> Result<ComponentResults> {
        let hits = self.search(query)?;
        Ok(ComponentResults::from_hits(hits, subkinds))
    }

    pub fn search_pipelines(&self, query: &str) -> Result<Vec<SearchHit>> {
        let mut hits = self.search(query)?;
        hits.retain(|hit| hit.item.kind == ItemKind::Pipeline);
        Ok(hits)
    }

    /// Every hit grouped for display
    pub fn search_grouped(&self, query: &str) -> Result<GroupedResults> {
        Ok(GroupedResults::from_hits(self.search(query)?))
    }

    /// Current generation, building the first one if necessary.
    ///
    /// A generation without archived items is replaced by one with them
    /// when `require_archived` is set; one that has them is kept either way.
    pub fn ensure_index(&self, require_archived: bool) -> Result<Arc<LibraryIndex>> {
        {
            let guard = self.index.read();
            if let Some(index) = guard.as_ref()
                && satisfies(index, require_archived)
            {
                return Ok(Arc::clone(index));
            }
        }

        let (index, _) = self.build(require_archived)?;

        let mut guard = self.index.write();
        // Another caller may have installed a suitable generation meanwhile
        if let Some(current) = guard.as_ref()
            && satisfies(current, require_archived)
        {
            return Ok(Arc::clone(current));
        }
        let index = Arc::new(index);
        self.install(&mut guard, Arc::clone(&index));
        Ok(index)
    }

    /// Rebuild from the source, keeping the current archived setting
    pub fn refresh(&self) -> Result<BuildReport> {
        let include_archived = self
            .index
            .read()
            .as_ref()
            .is_some_and(|index| index.includes_archived());
        self.rebuild(include_archived)
    }

    /// Rebuild unconditionally
    pub fn rebuild(&self, include_archived: bool) -> Result<BuildReport> {
        let (index, report) = self.build(include_archived)?;
        let mut guard = self.index.write();
        self.install(&mut guard, Arc::new(index));
        info!(
            items = report.items,
            skipped = report.skipped.len(),
            include_archived,
            "index rebuilt"
        );
        Ok(report)
    }

    fn build(&self, include_archived: bool) -> Result<(LibraryIndex, BuildReport)> {
        IndexBuilder::new()
            .include_archived(include_archived)
            .show_progress(self.show_progress)
            .build(self.source.as_ref())
    }

    fn install(&self, slot: &mut Option<Arc<LibraryIndex>>, index: Arc<LibraryIndex>) {
        *slot = Some(index);
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    pub fn state(&self) -> IndexState {
        match self.index.read().as_ref() {
            None => IndexState::Uninitialized,
            Some(index) => IndexState::Ready {
                include_archived: index.includes_archived(),
                generation: self.generation.load(Ordering::Relaxed),
                items: index.len(),
            },
        }
    }

    /// Items in the current generation, zero before the first build
    pub fn item_count(&self) -> usize {
        self.index.read().as_ref().map_or(0, |index| index.len())
    }

    /// Look up an item by logical path in the current generation.
    ///
    /// Archived paths resolve only once a generation with archived items
    /// exists.
    pub fn get(&self, path: &str) -> Result<Option<Arc<Item>>> {
        let require_archived = path.starts_with(crate::library::ARCHIVE_DIR);
        let index = self.ensure_index(require_archived)?;
        Ok(index.get(path).cloned())
    }

    /// Current generation, if built
    pub fn index(&self) -> Option<Arc<LibraryIndex>> {
        self.index.read().clone()
    }

    pub fn searches_served(&self) -> u64 {
        self.searches.load(Ordering::Relaxed)
    }
}

fn satisfies(index: &LibraryIndex, require_archived: bool) -> bool {
    index.includes_archived() || !require_archived
}

use crate::index::types::Item;
use crate::library::{LibraryStore, compose};
use crate::query::types::{Field, SearchHit};
use crate::query::parse_query;
use crate::search::SearchEngine;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;
use tracing::warn;

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Search,
    Preview,
    Help,
}

/// Index loading state for background loading
pub enum IndexLoadState {
    /// First generation is building in the background
    Loading(Receiver<Result<usize, String>>),
    Ready,
    /// Build failed (error message stored in status_message)
    Failed,
}

/// Search execution state for non-blocking search
pub enum SearchState {
    Idle,
    Searching {
        query: String,
        receiver: Receiver<SearchResult>,
        start_time: Instant,
    },
}

/// Result from a background search
pub struct SearchResult {
    pub hits: Result<Vec<SearchHit>, String>,
    pub query: String,
}

/// Work the event loop has to do outside the app, with the terminal suspended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Edit(PathBuf),
}

/// LRU cache size for search results
const SEARCH_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(64).unwrap();

/// Application state
pub struct App {
    store: LibraryStore,
    engine: Arc<SearchEngine>,
    /// Where activation writes the composed text
    output_path: PathBuf,
    pub query: String,
    pub results: Vec<SearchHit>,
    pub selected: usize,
    pub mode: Mode,
    /// Previous mode before entering help (to return to)
    pub previous_mode: Mode,
    pub preview_scroll: usize,
    pub status_message: String,
    /// Pending key for vim multi-key commands (e.g., 'g' for 'gg')
    pub pending_key: Option<char>,
    /// Lowercased content terms of the last executed query, for preview marking
    pub content_terms: Vec<String>,
    load_state: IndexLoadState,
    search_state: SearchState,
    search_cache: LruCache<String, Vec<SearchHit>>,
    request: Option<Request>,
}

impl App {
    /// Create the app and start building the index in the background
    pub fn new(store: LibraryStore, engine: Arc<SearchEngine>, output_path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel();
        let engine_for_thread = Arc::clone(&engine);
        thread::spawn(move || {
            let result = engine_for_thread
                .ensure_index(false)
                .map(|index| index.len())
                .map_err(|e| e.to_string());
            let _ = tx.send(result);
        });

        Self {
            store,
            engine,
            output_path,
            query: String::new(),
            results: Vec::new(),
            selected: 0,
            mode: Mode::Search,
            previous_mode: Mode::Search,
            preview_scroll: 0,
            status_message: "Loading library...".to_string(),
            pending_key: None,
            content_terms: Vec::new(),
            load_state: IndexLoadState::Loading(rx),
            search_state: SearchState::Idle,
            search_cache: LruCache::new(SEARCH_CACHE_SIZE),
            request: None,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        self.store.root()
    }

    /// Check for background index load completion (call this in event loop)
    pub fn poll_index_load(&mut self) {
        let current_state = std::mem::replace(&mut self.load_state, IndexLoadState::Ready);

        match current_state {
            IndexLoadState::Loading(rx) => match rx.try_recv() {
                Ok(Ok(count)) => {
                    self.status_message = format!("{count} items indexed");
                    self.load_state = IndexLoadState::Ready;
                    // Show the whole library, or run the query given on the command line
                    self.execute_search();
                }
                Ok(Err(e)) => {
                    self.status_message = format!("Library load failed: {e}");
                    self.load_state = IndexLoadState::Failed;
                }
                Err(TryRecvError::Empty) => {
                    self.load_state = IndexLoadState::Loading(rx);
                }
                Err(TryRecvError::Disconnected) => {
                    self.status_message = "Index load thread terminated unexpectedly".to_string();
                    self.load_state = IndexLoadState::Failed;
                }
            },
            other => {
                self.load_state = other;
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load_state, IndexLoadState::Loading(_))
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.search_state, SearchState::Searching { .. })
    }

    /// Status bar text, prefixed while background work is running
    pub fn status_line(&self) -> String {
        let busy = if self.is_loading() {
            "[loading] "
        } else if self.is_searching() {
            "[searching] "
        } else {
            ""
        };
        format!("{busy}{}  ·  {}", self.status_message, self.root().display())
    }

    /// Poll for background search completion (call this in event loop)
    pub fn poll_search(&mut self) {
        let current_state = std::mem::replace(&mut self.search_state, SearchState::Idle);

        if let SearchState::Searching {
            query,
            receiver,
            start_time,
        } = current_state
        {
            match receiver.try_recv() {
                Ok(result) => {
                    // Only apply results if query still matches (user might have typed more)
                    if result.query == self.query {
                        self.apply_result(result, start_time);
                    }
                }
                Err(TryRecvError::Empty) => {
                    self.search_state = SearchState::Searching {
                        query,
                        receiver,
                        start_time,
                    };
                }
                Err(TryRecvError::Disconnected) => {
                    self.status_message = "Search thread terminated unexpectedly".to_string();
                }
            }
        }
    }

    fn apply_result(&mut self, result: SearchResult, start_time: Instant) {
        match result.hits {
            Ok(hits) => {
                self.status_message = format!(
                    "{} results ({:.1}ms)",
                    hits.len(),
                    start_time.elapsed().as_secs_f64() * 1000.0
                );
                self.search_cache.put(result.query, hits.clone());
                self.set_results(hits);
            }
            Err(e) => {
                self.status_message = format!("Error: {e}");
                self.results.clear();
            }
        }
    }

    fn set_results(&mut self, hits: Vec<SearchHit>) {
        self.results = hits;
        self.selected = 0;
        self.preview_scroll = 0;
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
        self.execute_search();
    }

    pub fn execute_search(&mut self) {
        if self.is_loading() {
            // Runs once the first generation is ready
            return;
        }

        self.content_terms = content_terms(&self.query);

        if let Some(cached) = self.search_cache.get(&self.query) {
            let hits = cached.clone();
            self.status_message = format!("{} results (cached)", hits.len());
            self.set_results(hits);
            return;
        }

        // Parse up front so syntax errors show without a thread round trip
        if let Err(e) = parse_query(&self.query) {
            self.status_message = format!("Query error: {e}");
            self.results.clear();
            self.search_state = SearchState::Idle;
            return;
        }

        self.results.clear();
        self.selected = 0;

        let (tx, rx) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        let query = self.query.clone();
        let query_for_thread = query.clone();

        self.status_message = "Searching...".to_string();
        self.search_state = SearchState::Searching {
            query,
            receiver: rx,
            start_time: Instant::now(),
        };

        thread::spawn(move || {
            let hits = engine.search(&query_for_thread).map_err(|e| e.to_string());
            let _ = tx.send(SearchResult {
                hits,
                query: query_for_thread,
            });
        });
    }

    pub fn select_next(&mut self) {
        if !self.results.is_empty() {
            self.selected = (self.selected + 1).min(self.results.len() - 1);
            self.preview_scroll = 0;
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.preview_scroll = 0;
        }
    }

    pub fn select_page_down(&mut self) {
        if !self.results.is_empty() {
            self.selected = (self.selected + 10).min(self.results.len() - 1);
            self.preview_scroll = 0;
        }
    }

    pub fn select_page_up(&mut self) {
        self.selected = self.selected.saturating_sub(10);
        self.preview_scroll = 0;
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.preview_scroll = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.results.len().saturating_sub(1);
        self.preview_scroll = 0;
    }

    pub fn toggle_preview(&mut self) {
        self.mode = match self.mode {
            Mode::Search => Mode::Preview,
            Mode::Preview => Mode::Search,
            Mode::Help => Mode::Help,
        };
    }

    pub fn show_help(&mut self) {
        if self.mode != Mode::Help {
            self.previous_mode = self.mode;
            self.mode = Mode::Help;
        }
    }

    pub fn hide_help(&mut self) {
        if self.mode == Mode::Help {
            self.mode = self.previous_mode;
        }
    }

    pub fn selected_item(&self) -> Option<&Arc<Item>> {
        self.results.get(self.selected).map(|hit| &hit.item)
    }

    pub fn scroll_preview_down(&mut self) {
        self.preview_scroll += 1;
    }

    pub fn scroll_preview_up(&mut self) {
        self.preview_scroll = self.preview_scroll.saturating_sub(1);
    }

    pub fn scroll_preview_page_down(&mut self) {
        self.preview_scroll += 20;
    }

    pub fn scroll_preview_page_up(&mut self) {
        self.preview_scroll = self.preview_scroll.saturating_sub(20);
    }

    pub fn scroll_preview_to_top(&mut self) {
        self.preview_scroll = 0;
    }

    pub fn scroll_preview_to_bottom(&mut self) {
        if let Some(item) = self.selected_item() {
            let line_count = item.content.lines().count();
            self.preview_scroll = line_count.saturating_sub(20);
        }
    }

    /// Ask the event loop to open the selected item in `$EDITOR`
    pub fn edit_selected(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        match self.store.resolve(&item.path) {
            Ok(file) => self.request = Some(Request::Edit(file)),
            Err(e) => self.status_message = format!("Cannot edit: {e}"),
        }
    }

    pub fn take_request(&mut self) -> Option<Request> {
        self.request.take()
    }

    /// Compose the selected item into the output file
    pub fn activate_selected(&mut self) {
        let Some(path) = self.selected_item().map(|item| item.path.clone()) else {
            return;
        };
        let result = compose::activate(&self.store, &path)
            .and_then(|composition| {
                compose::write_output(&self.output_path, &composition.text).map(|()| composition)
            });
        self.status_message = match result {
            Ok(composition) if composition.missing.is_empty() => {
                format!("Activated {path} -> {}", self.output_path.display())
            }
            Ok(composition) => format!(
                "Activated {path} -> {} ({} missing: {})",
                self.output_path.display(),
                composition.missing.len(),
                composition.missing.join(", ")
            ),
            Err(e) => format!("Activation failed: {e}"),
        };
    }

    /// Rebuild the index and re-run the current query
    pub fn reindex(&mut self) {
        self.search_cache.clear();
        match self.engine.refresh() {
            Ok(report) => {
                self.status_message = if report.skipped.is_empty() {
                    format!("Index rebuilt: {} items", report.items)
                } else {
                    format!(
                        "Index rebuilt: {} items, {} skipped",
                        report.items,
                        report.skipped.len()
                    )
                };
                self.execute_search();
            }
            Err(e) => {
                warn!(error = %e, "refresh failed");
                self.status_message = format!("Index rebuild failed: {e}");
            }
        }
    }

    /// Delete word backward from query (vim Ctrl+w)
    pub fn delete_word(&mut self) {
        while self.query.ends_with(' ') {
            self.query.pop();
        }
        while !self.query.is_empty() && !self.query.ends_with(' ') {
            self.query.pop();
        }
    }

    pub fn clear_pending_key(&mut self) {
        self.pending_key = None;
    }
}

/// Lowercased `content:` and free-text values of a query; empty when it does
/// not parse
fn content_terms(query: &str) -> Vec<String> {
    parse_query(query)
        .map(|q| {
            q.positive(Field::Content)
                .filter_map(|f| f.text_value())
                .map(|v| v.to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

/// Expand tabs to spaces with a tab width of 4
pub fn expand_tabs(s: &str) -> String {
    const TAB_WIDTH: usize = 4;

    let mut result = String::with_capacity(s.len());
    let mut column = 0;

    for c in s.chars() {
        match c {
            '\t' => {
                let spaces = TAB_WIDTH - (column % TAB_WIDTH);
                result.extend(std::iter::repeat_n(' ', spaces));
                column += spaces;
            }
            '\n' | '\r' => {
                result.push(c);
                column = 0;
            }
            _ => {
                result.push(c);
                column += 1;
            }
        }
    }

    result
}

//! Lookup session state
//!
//! Everything a front end tracks between keystrokes lives here as explicit
//! values: whether data is available, which view is shown, which record is
//! selected, and which query is the latest. Nothing is global.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, info};

use crate::browse;
use crate::error::Result;
use crate::fuzzy::{EngineConfig, FuzzyEngine, MatchResult};
use crate::loader::RecordSource;
use crate::record::Record;
use crate::store::{LoadStats, RecordStore};

/// Identifies one issued query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryTicket(u64);

/// Last-query-wins gate.
///
/// Issue a ticket when a query starts and pass its results through
/// [`QueryGate::accept`] when it completes; results of a query that has since
/// been superseded are dropped.
#[derive(Debug, Default)]
pub struct QueryGate {
    latest: AtomicU64,
}

impl QueryGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> QueryTicket {
        QueryTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// `Some(value)` if `ticket` is still the newest query.
    pub fn accept<T>(&self, ticket: QueryTicket, value: T) -> Option<T> {
        self.is_current(ticket).then_some(value)
    }
}

/// Whether records are available for lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataStatus {
    /// No load has completed yet
    Loading,
    Ready { records: usize, generation: u64 },
    /// The last load failed; stays until the next reload
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Single best match for typed input
    #[default]
    Search,
    /// Filterable listing of every record
    Browse,
}

/// Outcome of a single-result lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Blank query: show the prompt, not an error
    Prompt,
    Found(MatchResult),
    NotFound,
    NotReady,
    Unavailable { reason: String },
}

/// Store, engine and view state for one user session.
#[derive(Debug)]
pub struct LookupSession {
    store: RecordStore,
    engine: FuzzyEngine,
    gate: QueryGate,
    status: DataStatus,
    view: ViewMode,
    selected: Option<String>,
}

impl Default for LookupSession {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl LookupSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: RecordStore::with_normalization(config.normalization),
            engine: FuzzyEngine::with_config(config),
            gate: QueryGate::new(),
            status: DataStatus::Loading,
            view: ViewMode::default(),
            selected: None,
        }
    }

    /// Fetch from `source` and replace the record set.
    ///
    /// A failure marks the session unavailable until the next successful
    /// reload; it is returned as well so the caller can report it.
    pub fn reload(&mut self, source: &dyn RecordSource) -> Result<LoadStats> {
        self.status = DataStatus::Loading;
        let name = source.name();

        match source.load_records().and_then(|records| self.store.load(records)) {
            Ok(stats) => {
                info!(source = %name, records = stats.record_count, "session data ready");
                self.status = DataStatus::Ready {
                    records: stats.record_count,
                    generation: stats.generation,
                };
                if let Some(id) = &self.selected {
                    if self.store.find_by_id(id).is_none() {
                        self.selected = None;
                    }
                }
                Ok(stats)
            }
            Err(e) => {
                error!(source = %name, error = %e, "data unavailable");
                self.status = DataStatus::Unavailable {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Best match for `query`; a found record becomes the selection.
    pub fn lookup(&mut self, query: &str) -> Lookup {
        match &self.status {
            DataStatus::Loading => return Lookup::NotReady,
            DataStatus::Unavailable { reason } => {
                return Lookup::Unavailable {
                    reason: reason.clone(),
                }
            }
            DataStatus::Ready { .. } => {}
        }

        if query.trim().is_empty() {
            return Lookup::Prompt;
        }

        match self.engine.best_match(query, &self.store.all()) {
            Some(found) => {
                self.selected = Some(found.record.id.clone());
                Lookup::Found(found)
            }
            None => Lookup::NotFound,
        }
    }

    /// Up to `limit` ranked candidates; empty unless data is ready.
    pub fn search(&self, query: &str, limit: usize) -> Vec<MatchResult> {
        if !self.is_ready() {
            return Vec::new();
        }
        self.engine.search(query, &self.store.all(), limit)
    }

    /// Run a search under a fresh ticket, returning `None` if a newer query
    /// was issued before it completed.
    pub fn search_latest(&self, query: &str, limit: usize) -> Option<Vec<MatchResult>> {
        let ticket = self.gate.issue();
        let results = self.search(query, limit);
        self.gate.accept(ticket, results)
    }

    /// Browse listing filtered by `term`.
    pub fn browse(&self, term: &str) -> Vec<Record> {
        if !self.is_ready() {
            return Vec::new();
        }
        let snapshot = self.store.all();
        browse::filter_records(term, &snapshot)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Pick a record (e.g. from the browse listing) and switch to the
    /// search view to show it.
    pub fn select(&mut self, id: &str) -> Option<Record> {
        let record = self.store.find_by_id(id)?;
        self.selected = Some(record.id.clone());
        self.view = ViewMode::Search;
        Some(record)
    }

    pub fn selected(&self) -> Option<Record> {
        self.selected
            .as_deref()
            .and_then(|id| self.store.find_by_id(id))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn status(&self) -> &DataStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status, DataStatus::Ready { .. })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn engine(&self) -> &FuzzyEngine {
        &self.engine
    }

    pub fn gate(&self) -> &QueryGate {
        &self.gate
    }
}

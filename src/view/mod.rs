//! The property list screen: routes one result set to the table, virtualized
//! table or grid renderer, and keeps loading state, errors and row selection.

pub mod render;
pub mod selection;

pub use render::{GridRenderer, RenderMode, Renderer, TableRenderer, VirtualizedTableRenderer};
pub use selection::Selection;

use crate::error::QueryError;
use crate::filters::{FilterChip, PropertyFilters};
use crate::models::PropertyPage;
use crate::query::QueryExecutor;
use crate::sync::{FilterSnapshot, FilterSynchronizer};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

/// Result sets with more rows than this switch the table to its virtualized form
pub const DEFAULT_VIRTUALIZE_THRESHOLD: u64 = 100;

/// User-facing notification channel for failures
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

/// Notifier that reports through the log
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_error(&self, message: &str) {
        error!("{}", message);
    }
}

/// Layout the user picked; the table may still render virtualized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Table,
    Grid,
}

struct LoadResult {
    ticket: u64,
    load: Load,
}

enum Load {
    Page { page: PropertyPage, revalidating: bool },
    Refreshed(Result<PropertyPage, QueryError>),
    Failed(QueryError),
}

/// List screen state.
///
/// Loads run as background tasks and report back tagged with a ticket; only
/// the most recently issued ticket is applied, so a slow response for an
/// outdated filter set can never overwrite a newer one.
pub struct PropertyListView {
    sync: FilterSynchronizer,
    executor: QueryExecutor,
    notifier: Arc<dyn Notifier>,
    snapshots: watch::Receiver<FilterSnapshot>,
    requested: Option<FilterSnapshot>,
    latest_ticket: u64,
    results_tx: mpsc::UnboundedSender<LoadResult>,
    results_rx: mpsc::UnboundedReceiver<LoadResult>,
    result: Option<PropertyPage>,
    loading: bool,
    revalidating: bool,
    error: Option<String>,
    view_mode: ViewMode,
    virtualize_threshold: u64,
    selection: Selection,
    grid_columns: usize,
    viewport_rows: usize,
}

impl PropertyListView {
    pub fn new(sync: FilterSynchronizer, executor: QueryExecutor, notifier: Arc<dyn Notifier>) -> Self {
        let snapshots = sync.subscribe();
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        Self {
            sync,
            executor,
            notifier,
            snapshots,
            requested: None,
            latest_ticket: 0,
            results_tx,
            results_rx,
            result: None,
            loading: false,
            revalidating: false,
            error: None,
            view_mode: ViewMode::default(),
            virtualize_threshold: DEFAULT_VIRTUALIZE_THRESHOLD,
            selection: Selection::new(),
            grid_columns: 3,
            viewport_rows: 25,
        }
    }

    pub fn with_virtualize_threshold(mut self, threshold: u64) -> Self {
        self.virtualize_threshold = threshold;
        self
    }

    pub fn with_grid_columns(mut self, columns: usize) -> Self {
        self.grid_columns = columns.max(1);
        self
    }

    pub fn with_viewport_rows(mut self, rows: usize) -> Self {
        self.viewport_rows = rows.max(1);
        self
    }

    /// First load for the restored filters
    pub async fn open(&mut self) {
        self.snapshots.borrow_and_update();
        self.issue(self.sync.snapshot());
        self.settle().await;
    }

    // --- Filter entry points ---

    pub fn set_filters(&mut self, filters: PropertyFilters) {
        self.sync.set_filters(filters);
        self.poll_changes();
    }

    pub fn update_filters(&mut self, edit: impl FnOnce(&mut PropertyFilters)) {
        self.sync.update_filters(edit);
        self.poll_changes();
    }

    pub fn remove_chip(&mut self, chip: &FilterChip) {
        self.sync.remove_chip(chip);
        self.poll_changes();
    }

    pub fn set_page(&mut self, page: u32) {
        self.sync.set_page(page);
        self.poll_changes();
    }

    pub fn clear_all(&mut self) {
        self.sync.clear_all();
        self.poll_changes();
    }

    /// Search box keystroke. The load follows once the debounced commit lands;
    /// see [`wait_for_change`](Self::wait_for_change).
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn set_search_input(&mut self, text: impl Into<String>) {
        self.sync.set_search_input(text);
    }

    /// Wait for the next committed change (e.g. a debounced search) and issue its load
    pub async fn wait_for_change(&mut self) -> bool {
        if self.snapshots.changed().await.is_err() {
            return false;
        }
        let snapshot = self.snapshots.borrow_and_update().clone();
        self.on_snapshot(snapshot)
    }

    /// Issue a load if the committed state moved since the last request
    pub fn poll_changes(&mut self) -> bool {
        if !self.snapshots.has_changed().unwrap_or(false) {
            return false;
        }
        let snapshot = self.snapshots.borrow_and_update().clone();
        self.on_snapshot(snapshot)
    }

    /// Row selection only survives page changes
    fn on_snapshot(&mut self, snapshot: FilterSnapshot) -> bool {
        if let Some(previous) = &self.requested {
            if previous.filters == snapshot.filters && previous.page == snapshot.page {
                return false;
            }
            if previous.filters != snapshot.filters {
                self.selection.clear();
            }
        }
        self.issue(snapshot);
        true
    }

    /// Reload the current state, ignoring whether it changed
    pub async fn reload(&mut self) {
        self.issue(self.sync.snapshot());
        self.settle().await;
    }

    fn issue(&mut self, snapshot: FilterSnapshot) {
        self.latest_ticket += 1;
        let ticket = self.latest_ticket;
        self.loading = true;
        self.revalidating = false;

        let executor = self.executor.clone();
        let tx = self.results_tx.clone();
        let (filters, page) = (snapshot.filters.clone(), snapshot.page);
        self.requested = Some(snapshot);

        debug!(ticket, page, "issuing load");
        // Send errors mean the view is gone and nobody is waiting
        tokio::spawn(async move {
            match executor.query(&filters, page).await {
                Ok(outcome) => {
                    let revalidating = outcome.is_revalidating();
                    let load = Load::Page {
                        page: outcome.page,
                        revalidating,
                    };
                    if tx.send(LoadResult { ticket, load }).is_err() {
                        return;
                    }
                    if let Some(revalidation) = outcome.revalidation {
                        let load = Load::Refreshed(revalidation.finished().await);
                        let _ = tx.send(LoadResult { ticket, load });
                    }
                }
                Err(err) => {
                    let _ = tx.send(LoadResult {
                        ticket,
                        load: Load::Failed(err),
                    });
                }
            }
        });
    }

    /// Wait until the latest issued load has been applied
    pub async fn settle(&mut self) {
        self.poll_results();
        while self.loading {
            match self.results_rx.recv().await {
                Some(load) => self.apply(load),
                None => break,
            }
        }
    }

    /// Wait until a stale page being shown has been replaced by its refresh
    pub async fn wait_for_revalidation(&mut self) {
        self.poll_results();
        while self.loading || self.revalidating {
            match self.results_rx.recv().await {
                Some(load) => self.apply(load),
                None => break,
            }
        }
    }

    /// Apply whatever results already arrived, without waiting
    pub fn poll_results(&mut self) {
        while let Ok(load) = self.results_rx.try_recv() {
            self.apply(load);
        }
    }

    fn apply(&mut self, load: LoadResult) {
        if load.ticket != self.latest_ticket {
            debug!(ticket = load.ticket, latest = self.latest_ticket, "discarding stale response");
            return;
        }

        match load.load {
            Load::Page { page, revalidating } => {
                self.loading = false;
                self.revalidating = revalidating;
                self.result = Some(page);
                self.error = None;
            }
            Load::Refreshed(Ok(page)) => {
                debug!(ticket = load.ticket, "refreshed page replaces stale one");
                self.revalidating = false;
                self.result = Some(page);
            }
            Load::Refreshed(Err(err)) => {
                // The stale page stays on screen
                warn!("Keeping stale page: {}", err);
                self.revalidating = false;
                self.notifier.notify_error(&err.to_string());
            }
            Load::Failed(err) => {
                let message = err.to_string();
                self.notifier.notify_error(&message);
                self.loading = false;
                self.revalidating = false;
                self.error = Some(message);
            }
        }
    }

    // --- Presentation ---

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn render_mode(&self) -> RenderMode {
        match self.view_mode {
            ViewMode::Grid => RenderMode::Grid,
            ViewMode::Table => {
                let total = self.result.as_ref().map_or(0, |page| page.total);
                if total > self.virtualize_threshold {
                    RenderMode::VirtualizedTable
                } else {
                    RenderMode::Table
                }
            }
        }
    }

    pub fn render(&self) -> Vec<String> {
        let Some(page) = &self.result else {
            return match (&self.error, self.loading) {
                (Some(err), _) => vec![format!("Error: {}", err)],
                (None, true) => vec!["Loading...".to_string()],
                (None, false) => Vec::new(),
            };
        };
        if page.total == 0 {
            return vec!["No properties match these filters".to_string()];
        }

        match self.render_mode() {
            RenderMode::Table => TableRenderer.render(page, &self.selection),
            RenderMode::VirtualizedTable => {
                VirtualizedTableRenderer::new(self.viewport_rows).render(page, &self.selection)
            }
            RenderMode::Grid => GridRenderer {
                columns: self.grid_columns,
            }
            .render(page, &self.selection),
        }
    }

    // --- Selection ---

    pub fn toggle_selected(&mut self, id: &str) -> bool {
        self.selection.toggle(id)
    }

    pub fn select_page(&mut self) {
        if let Some(page) = &self.result {
            self.selection
                .select_all(page.data.iter().map(|item| item.id.as_str()));
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    // --- State ---

    pub fn result(&self) -> Option<&PropertyPage> {
        self.result.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_revalidating(&self) -> bool {
        self.revalidating
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn synchronizer(&self) -> &FilterSynchronizer {
        &self.sync
    }
}

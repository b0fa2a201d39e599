//! Single source of truth for the list's filters and page.
//!
//! Every change goes through [`FilterSynchronizer`], which rewrites the
//! address bar, keeps the saved preference in step and notifies subscribers.
//! State is restored from, in order: the URL, the saved preference, the
//! default `{search: "", status: ALL}`.

pub mod address_bar;
pub mod debounce;
pub mod preferences;

pub use address_bar::{AddressBar, MemoryAddressBar};
pub use debounce::Debouncer;
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};

use crate::filters::codec::{decode, decode_page, encode, encode_query, parse_query};
use crate::filters::{remove_chip, FilterChip, PropertyFilters};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Debounce window for free-text search
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Committed state as seen by subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSnapshot {
    pub filters: PropertyFilters,
    pub page: u32,
    /// Bumped on every committed change
    pub revision: u64,
}

struct State {
    snapshot: FilterSnapshot,
    /// Bumped whenever the filters are replaced; a debounced search scheduled
    /// under an older epoch is dropped instead of committed
    search_epoch: u64,
}

enum Commit {
    Filters,
    Page,
    Unchanged,
}

struct Shared {
    state: Mutex<State>,
    address_bar: Arc<dyn AddressBar>,
    preferences: Arc<dyn PreferenceStore>,
    tx: watch::Sender<FilterSnapshot>,
}

impl Shared {
    /// Apply `change`, then sync the URL, the preference entry and
    /// subscribers. All of it happens under the state lock, so commits from
    /// the debounce task and from the owner never interleave.
    fn commit(&self, change: impl FnOnce(&mut State) -> Commit) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let filters_changed = match change(&mut state) {
            Commit::Unchanged => return,
            Commit::Filters => true,
            Commit::Page => false,
        };
        state.snapshot.revision += 1;

        let snapshot = &state.snapshot;
        self.address_bar
            .replace_query(&encode_query(&snapshot.filters, snapshot.page));
        if filters_changed {
            persist(self.preferences.as_ref(), &snapshot.filters);
        }
        debug!(revision = snapshot.revision, page = snapshot.page, "filters committed");
        self.tx.send_replace(snapshot.clone());
    }

    fn edit_filters(&self, edit: impl FnOnce(&mut PropertyFilters)) {
        self.commit(|state| {
            edit(&mut state.snapshot.filters);
            state.snapshot.page = 1;
            state.search_epoch += 1;
            Commit::Filters
        });
    }

    fn set_page(&self, page: u32) {
        self.commit(|state| {
            state.snapshot.page = page.max(1);
            Commit::Page
        });
    }

    fn commit_search(&self, search: String, epoch: u64) {
        self.commit(|state| {
            if state.search_epoch != epoch {
                debug!("dropping search superseded by a filter change");
                return Commit::Unchanged;
            }
            if state.snapshot.filters.search == search {
                return Commit::Unchanged;
            }
            state.snapshot.filters.search = search;
            state.snapshot.page = 1;
            Commit::Filters
        });
    }

    fn search_epoch(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .search_epoch
    }
}

/// Owner of the filter and page state of one list view
pub struct FilterSynchronizer {
    shared: Arc<Shared>,
    search_input: String,
    debouncer: Debouncer,
}

impl FilterSynchronizer {
    /// Restore state for a new page view
    pub fn restore(
        address_bar: Arc<dyn AddressBar>,
        preferences: Arc<dyn PreferenceStore>,
        search_debounce: Duration,
    ) -> Self {
        let (filters, page) = initial_state(address_bar.as_ref(), preferences.as_ref());

        let canonical = encode_query(&filters, page);
        if canonical != address_bar.query() {
            address_bar.replace_query(&canonical);
        }

        let snapshot = FilterSnapshot {
            filters,
            page,
            revision: 0,
        };
        let (tx, _rx) = watch::channel(snapshot.clone());
        let search_input = snapshot.filters.search.clone();

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    snapshot,
                    search_epoch: 0,
                }),
                address_bar,
                preferences,
                tx,
            }),
            search_input,
            debouncer: Debouncer::new(search_debounce),
        }
    }

    pub fn snapshot(&self) -> FilterSnapshot {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    pub fn filters(&self) -> PropertyFilters {
        self.snapshot().filters
    }

    pub fn page(&self) -> u32 {
        self.snapshot().page
    }

    /// What the search box shows; may run ahead of the committed `search`
    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    /// Receiver that observes every committed change
    pub fn subscribe(&self) -> watch::Receiver<FilterSnapshot> {
        self.shared.tx.subscribe()
    }

    /// Replace the filters wholesale and go back to page 1
    pub fn set_filters(&mut self, filters: PropertyFilters) {
        self.update_filters(|current| *current = filters);
    }

    /// Edit the current filters in place, then commit like [`set_filters`](Self::set_filters)
    pub fn update_filters(&mut self, edit: impl FnOnce(&mut PropertyFilters)) {
        self.debouncer.cancel();
        self.shared.edit_filters(edit);
        self.search_input = self.filters().search;
    }

    /// Drop the constraint behind one chip
    pub fn remove_chip(&mut self, chip: &FilterChip) {
        self.update_filters(|current| *current = remove_chip(current, chip));
    }

    /// Echo `text` immediately and commit it as the search filter once typing
    /// pauses. A newer call supersedes a pending one, and so does any filter
    /// change made in the meantime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, since the debounce timer
    /// is a spawned task.
    pub fn set_search_input(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.search_input = text.clone();

        let epoch = self.shared.search_epoch();
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        self.debouncer.schedule(async move {
            // The synchronizer may have been torn down while we waited
            if let Some(shared) = shared.upgrade() {
                shared.commit_search(text, epoch);
            }
        });
    }

    /// Move to another page, keeping the filters
    pub fn set_page(&mut self, page: u32) {
        self.shared.set_page(page);
    }

    /// Back to the default filters on page 1. Committing the default also
    /// removes the saved preference.
    pub fn clear_all(&mut self) {
        self.set_filters(PropertyFilters::default());
    }

    /// A debounced search commit is still waiting
    pub fn has_pending_search(&self) -> bool {
        self.debouncer.is_pending()
    }
}

fn initial_state(address_bar: &dyn AddressBar, preferences: &dyn PreferenceStore) -> (PropertyFilters, u32) {
    let params = parse_query(&address_bar.query());
    let page = decode_page(&params);

    let from_url = decode(&params);
    if !encode(&from_url).is_empty() {
        debug!("restoring filters from the URL");
        return (from_url, page);
    }

    match load_saved(preferences) {
        Some(saved) => {
            debug!("restoring saved filters");
            (saved, page)
        }
        None => (PropertyFilters::default(), page),
    }
}

/// Saved filters, validated the same way as URL input. Any failure means
/// "no saved preference".
fn load_saved(preferences: &dyn PreferenceStore) -> Option<PropertyFilters> {
    let raw = match preferences.get() {
        Ok(raw) => raw?,
        Err(err) => {
            warn!("Ignoring saved filters: {}", err);
            return None;
        }
    };

    match serde_json::from_str::<PropertyFilters>(&raw) {
        Ok(saved) => Some(decode(&encode(&saved))),
        Err(err) => {
            warn!("Ignoring unparsable saved filters: {}", err);
            None
        }
    }
}

/// Save non-default filters; saving the default removes the entry instead
fn persist(preferences: &dyn PreferenceStore, filters: &PropertyFilters) {
    let result = if filters.is_default() {
        preferences.clear()
    } else {
        match serde_json::to_string(filters) {
            Ok(json) => preferences.set(&json),
            Err(err) => {
                warn!("Failed to serialize filters: {}", err);
                return;
            }
        }
    };

    if let Err(err) = result {
        warn!("Failed to save filters: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::StatusFilter;
    use crate::models::Amenity;

    struct Harness {
        address_bar: Arc<MemoryAddressBar>,
        preferences: Arc<MemoryPreferenceStore>,
    }

    impl Harness {
        fn new(query: &str) -> Self {
            Self {
                address_bar: Arc::new(MemoryAddressBar::with_query(query)),
                preferences: Arc::new(MemoryPreferenceStore::new()),
            }
        }

        fn restore(&self) -> FilterSynchronizer {
            FilterSynchronizer::restore(
                self.address_bar.clone(),
                self.preferences.clone(),
                SEARCH_DEBOUNCE,
            )
        }
    }

    #[test]
    fn url_wins_over_saved_preference() {
        let harness = Harness::new("status=HIDDEN&page=2");
        harness.preferences.set(r#"{"search":"old"}"#).unwrap();

        let sync = harness.restore();
        assert_eq!(sync.filters().status, StatusFilter::Hidden);
        assert_eq!(sync.filters().search, "");
        assert_eq!(sync.page(), 2);
    }

    #[test]
    fn saved_preference_used_without_url_filters() {
        let harness = Harness::new("");
        harness
            .preferences
            .set(r#"{"search":"lake","amenities":["hasPool"]}"#)
            .unwrap();

        let sync = harness.restore();
        assert_eq!(sync.filters().search, "lake");
        assert!(sync.filters().amenities.contains(&Amenity::HasPool));
        assert_eq!(sync.search_input(), "lake");
        assert_eq!(harness.address_bar.query(), "search=lake&amenities=hasPool");
    }

    #[test]
    fn corrupt_or_failing_preferences_fall_back_to_default() {
        let harness = Harness::new("");
        harness.preferences.set("{not json").unwrap();
        assert!(harness.restore().filters().is_default());

        harness.preferences.set(r#"{"status":"HIDDEN"}"#).unwrap();
        harness.preferences.set_simulate_error(true);
        assert!(harness.restore().filters().is_default());
    }

    #[test]
    fn saved_values_are_validated_like_url_input() {
        let harness = Harness::new("");
        harness
            .preferences
            .set(r#"{"minRooms":50,"maxRooms":4}"#)
            .unwrap();

        let filters = harness.restore().filters();
        assert_eq!(filters.min_rooms, None);
        assert_eq!(filters.max_rooms, Some(4));
    }

    #[test]
    fn set_filters_resets_page() {
        let harness = Harness::new("page=5");
        let mut sync = harness.restore();
        assert_eq!(sync.page(), 5);

        sync.set_filters(PropertyFilters::default().with_status(StatusFilter::Published));
        assert_eq!(sync.page(), 1);
        assert_eq!(harness.address_bar.query(), "status=PUBLISHED");
    }

    #[test]
    fn set_page_keeps_filters() {
        let harness = Harness::new("maxGuests=6");
        let mut sync = harness.restore();

        sync.set_page(3);
        assert_eq!(sync.filters().max_guests, Some(6));
        assert_eq!(harness.address_bar.query(), "maxGuests=6&page=3");
    }

    #[test]
    fn only_non_default_filters_are_saved() {
        let harness = Harness::new("");
        let mut sync = harness.restore();

        sync.update_filters(|f| f.policies.events_allowed = Some(false));
        assert_eq!(
            harness.preferences.snapshot().as_deref(),
            Some(r#"{"policies":{"eventsAllowed":false}}"#)
        );

        sync.set_filters(PropertyFilters::default());
        assert_eq!(harness.preferences.snapshot(), None);
    }

    #[test]
    fn clear_all_forgets_everything() {
        let harness = Harness::new("search=lake&status=HIDDEN&page=4");
        let mut sync = harness.restore();
        sync.update_filters(|f| f.min_price = Some(100));
        assert!(harness.preferences.snapshot().is_some());

        sync.clear_all();
        assert!(sync.filters().is_default());
        assert_eq!(sync.page(), 1);
        assert_eq!(sync.search_input(), "");
        assert_eq!(harness.preferences.snapshot(), None);
        assert_eq!(harness.address_bar.query(), "");

        // A new session without URL parameters starts from the default
        let fresh = Harness {
            address_bar: Arc::new(MemoryAddressBar::new()),
            preferences: harness.preferences.clone(),
        };
        let restored = fresh.restore().filters();
        assert_eq!(restored.search, "");
        assert_eq!(restored.status, StatusFilter::All);
    }

    #[test]
    fn removing_a_chip_commits() {
        let harness = Harness::new("amenities=hasPool,hasGym&page=2");
        let mut sync = harness.restore();

        sync.remove_chip(&FilterChip::Amenity(Amenity::HasGym));
        assert_eq!(harness.address_bar.query(), "amenities=hasPool");
        assert_eq!(sync.page(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_commits_once() {
        let harness = Harness::new("page=3");
        let mut sync = harness.restore();
        let start = sync.snapshot().revision;

        for text in ["a", "ab", "abc"] {
            sync.set_search_input(text);
            assert_eq!(sync.search_input(), text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(sync.filters().search, "");
        assert!(sync.has_pending_search());

        tokio::time::sleep(Duration::from_millis(400)).await;
        let snapshot = sync.snapshot();
        assert_eq!(snapshot.revision, start + 1);
        assert_eq!(snapshot.filters.search, "abc");
        assert_eq!(snapshot.page, 1);
        assert_eq!(harness.address_bar.query(), "search=abc");
    }

    #[tokio::test(start_paused = true)]
    async fn no_commit_after_teardown() {
        let harness = Harness::new("");
        let mut sync = harness.restore();
        let rx = sync.subscribe();

        sync.set_search_input("lake");
        drop(sync);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!rx.has_changed().unwrap_or(false));
        assert_eq!(harness.address_bar.query(), "");
        assert_eq!(harness.preferences.snapshot(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn set_filters_supersedes_pending_search() {
        let harness = Harness::new("");
        let mut sync = harness.restore();

        sync.set_search_input("lake");
        sync.set_filters(PropertyFilters::default().with_status(StatusFilter::Hidden));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sync.filters().search, "");
        assert_eq!(sync.search_input(), "");
    }

    #[test]
    fn search_scheduled_before_a_filter_change_is_dropped() {
        let harness = Harness::new("");
        let mut sync = harness.restore();

        // A debounced task that captured this epoch and was already past its
        // sleep when the filters changed
        let epoch = sync.shared.search_epoch();
        sync.set_filters(PropertyFilters::default().with_status(StatusFilter::Hidden));
        sync.shared.commit_search("lake".to_string(), epoch);

        assert_eq!(sync.filters().status, StatusFilter::Hidden);
        assert_eq!(sync.filters().search, "");
        assert_eq!(harness.address_bar.query(), "status=HIDDEN");
        assert_eq!(
            harness.preferences.snapshot().as_deref(),
            Some(r#"{"status":"HIDDEN"}"#)
        );
    }

    #[test]
    fn concurrent_commits_keep_url_and_state_in_step() {
        let harness = Harness::new("status=HIDDEN");
        let sync = harness.restore();
        let shared = sync.shared.as_ref();

        std::thread::scope(|scope| {
            for worker in 0..4u32 {
                scope.spawn(move || {
                    for page in 1..=50 {
                        if page % 10 == 0 {
                            shared.edit_filters(|f| f.max_guests = Some(worker + 1));
                        } else {
                            shared.set_page(worker * 50 + page);
                        }
                    }
                });
            }
        });

        let snapshot = sync.snapshot();
        assert_eq!(snapshot.revision, 200);
        assert_eq!(
            harness.address_bar.query(),
            encode_query(&snapshot.filters, snapshot.page)
        );
        assert_eq!(
            harness.preferences.snapshot(),
            Some(serde_json::to_string(&snapshot.filters).unwrap())
        );
    }

    #[test]
    #[should_panic]
    fn search_input_needs_a_runtime() {
        let mut sync = Harness::new("").restore();
        sync.set_search_input("lake");
    }

    #[tokio::test]
    async fn subscribers_see_commits() {
        let harness = Harness::new("");
        let mut sync = harness.restore();
        let mut rx = sync.subscribe();

        sync.set_page(2);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().page, 2);
    }
}

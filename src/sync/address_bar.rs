use std::sync::{Mutex, PoisonError};

/// The query-string part of the browser location.
///
/// Filter changes go through `replace_query`: they rewrite the current entry
/// instead of pushing a new one, so the back button leaves the list rather
/// than stepping through earlier filter combinations.
pub trait AddressBar: Send + Sync {
    /// Current query string without the leading `?`
    fn query(&self) -> String;

    /// Rewrite the current history entry
    fn replace_query(&self, query: &str);
}

/// In-memory address bar that records every rewrite
#[derive(Default)]
pub struct MemoryAddressBar {
    state: Mutex<AddressState>,
}

#[derive(Default)]
struct AddressState {
    current: String,
    replacements: usize,
}

impl MemoryAddressBar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start on a URL that already carries a query string
    pub fn with_query(query: &str) -> Self {
        Self {
            state: Mutex::new(AddressState {
                current: query.trim_start_matches('?').to_string(),
                replacements: 0,
            }),
        }
    }

    /// Number of times the query was rewritten
    pub fn replacements(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).replacements
    }
}

impl AddressBar for MemoryAddressBar {
    fn query(&self) -> String {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).current.clone()
    }

    fn replace_query(&self, query: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.current = query.to_string();
        state.replacements += 1;
    }
}

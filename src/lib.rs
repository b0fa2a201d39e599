//! Filtering, URL synchronization and paginated loading for the property
//! list of the house back office.

pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod query;
pub mod sync;
pub mod view;

pub use config::Config;
pub use error::{ConfigError, PreferenceError, QueryError};
pub use filters::{PropertyFilters, StatusFilter};
pub use models::{PropertyListItem, PropertyPage};
pub use query::{PropertySource, QueryExecutor};
pub use sync::FilterSynchronizer;
pub use view::{PropertyListView, ViewMode};

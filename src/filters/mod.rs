pub mod chips;
pub mod codec;

use crate::models::{Accessibility, Amenity, PropertyType, Service, UnknownTag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

pub use chips::{active_filter_count, chips, remove_chip, FilterChip};
pub use codec::{decode, decode_query, encode, encode_query, QueryParams};

/// Allowed values for the room range
pub const ROOM_BOUNDS: RangeInclusive<u32> = 1..=20;
/// Allowed values for the bathroom range, in 0.5 steps
pub const BATHROOM_BOUNDS: RangeInclusive<f64> = 1.0..=10.0;

/// Publication status constraint. `All` means unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusFilter {
    #[default]
    All,
    Published,
    Hidden,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "ALL",
            StatusFilter::Published => "PUBLISHED",
            StatusFilter::Hidden => "HIDDEN",
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, StatusFilter::All)
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALL" => Ok(StatusFilter::All),
            "PUBLISHED" => Ok(StatusFilter::Published),
            "HIDDEN" => Ok(StatusFilter::Hidden),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// House-rule constraints. `None` means unconstrained; `Some(false)` is a real
/// constraint ("must not allow").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Policies {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pets_allowed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_allowed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoking_allowed: Option<bool>,
}

impl Policies {
    pub fn is_empty(&self) -> bool {
        self.pets_allowed.is_none() && self.events_allowed.is_none() && self.smoking_allowed.is_none()
    }
}

/// Promotion flags. A present key is an active constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Promoted {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_on_website: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<bool>,
}

impl Promoted {
    pub fn is_empty(&self) -> bool {
        self.show_on_website.is_none() && self.highlight.is_none()
    }
}

/// The canonical filter state of the property list.
///
/// Every constraint is optional: `None`, an empty set, an empty `search` and
/// `StatusFilter::All` all mean "unconstrained". Values only enter this type
/// through [`codec::decode`], the preference store, or typed code, so nothing
/// downstream re-validates them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyFilters {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub search: String,
    #[serde(skip_serializing_if = "StatusFilter::is_all")]
    pub status: StatusFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub destination_ids: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_bathrooms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bathrooms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_guests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<i64>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub amenities: BTreeSet<Amenity>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub services: BTreeSet<Service>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub accessibility: BTreeSet<Accessibility>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub categories: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub accessibility_options: BTreeSet<String>,
    #[serde(skip_serializing_if = "Policies::is_empty")]
    pub policies: Policies,
    #[serde(skip_serializing_if = "Promoted::is_empty")]
    pub promoted: Promoted,
}

impl PropertyFilters {
    /// True for `{search: "", status: ALL}` with nothing else set
    pub fn is_default(&self) -> bool {
        *self == PropertyFilters::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }
}

/// Bathroom counts come in half steps inside [`BATHROOM_BOUNDS`]
pub fn is_valid_bathroom_count(value: f64) -> bool {
    value.is_finite() && BATHROOM_BOUNDS.contains(&value) && (value * 2.0).fract() == 0.0
}

//! Bidirectional mapping between [`PropertyFilters`] and the flat query
//! parameters of the list URL.
//!
//! Integers are decimal strings, booleans the literals `true`/`false`, and
//! sets comma-joined values. Set values are not escaped, so a value containing
//! a comma cannot round-trip; every built-in vocabulary avoids commas, and
//! free-form `categories` / `accessibilityOptions` values must too.
//!
//! Malformed values never reach the filter state: the key is dropped and the
//! field stays unset.

use super::{is_valid_bathroom_count, PropertyFilters, StatusFilter, ROOM_BOUNDS};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use tracing::debug;
use url::form_urlencoded;

/// Flat string-keyed query parameters
pub type QueryParams = BTreeMap<String, String>;

pub const SEARCH: &str = "search";
pub const STATUS: &str = "status";
pub const DESTINATION_ID: &str = "destinationId";
pub const DESTINATION_IDS: &str = "destinationIds";
pub const PROPERTY_TYPE: &str = "propertyType";
pub const MIN_ROOMS: &str = "minRooms";
pub const MAX_ROOMS: &str = "maxRooms";
pub const MIN_BATHROOMS: &str = "minBathrooms";
pub const MAX_BATHROOMS: &str = "maxBathrooms";
pub const MAX_GUESTS: &str = "maxGuests";
pub const MIN_PRICE: &str = "minPrice";
pub const MAX_PRICE: &str = "maxPrice";
pub const AMENITIES: &str = "amenities";
pub const SERVICES: &str = "services";
pub const ACCESSIBILITY: &str = "accessibility";
pub const CATEGORIES: &str = "categories";
pub const ACCESSIBILITY_OPTIONS: &str = "accessibilityOptions";
pub const PETS_ALLOWED: &str = "petsAllowed";
pub const EVENTS_ALLOWED: &str = "eventsAllowed";
pub const SMOKING_ALLOWED: &str = "smokingAllowed";
pub const SHOW_ON_WEBSITE: &str = "showOnWebsite";
pub const HIGHLIGHT: &str = "highlight";
pub const PAGE: &str = "page";

/// Every recognized key, in the order they appear in a rendered URL
pub const KEYS: &[&str] = &[
    SEARCH,
    STATUS,
    DESTINATION_ID,
    DESTINATION_IDS,
    PROPERTY_TYPE,
    MIN_ROOMS,
    MAX_ROOMS,
    MIN_BATHROOMS,
    MAX_BATHROOMS,
    MAX_GUESTS,
    MIN_PRICE,
    MAX_PRICE,
    AMENITIES,
    SERVICES,
    ACCESSIBILITY,
    CATEGORIES,
    ACCESSIBILITY_OPTIONS,
    PETS_ALLOWED,
    EVENTS_ALLOWED,
    SMOKING_ALLOWED,
    SHOW_ON_WEBSITE,
    HIGHLIGHT,
    PAGE,
];

/// Build filters from query parameters. Unknown keys are ignored.
pub fn decode(params: &QueryParams) -> PropertyFilters {
    let mut filters = PropertyFilters::default();

    if let Some(search) = params.get(SEARCH) {
        filters.search = search.clone();
    }
    filters.status = parse_with(params, STATUS, |v| StatusFilter::from_str(v).ok()).unwrap_or_default();
    filters.destination_id = params
        .get(DESTINATION_ID)
        .filter(|v| !v.trim().is_empty())
        .cloned();
    filters.destination_ids = parse_string_set(params, DESTINATION_IDS);
    filters.property_type = parse_with(params, PROPERTY_TYPE, |v| v.parse().ok());

    filters.min_rooms = parse_with(params, MIN_ROOMS, parse_room_count);
    filters.max_rooms = parse_with(params, MAX_ROOMS, parse_room_count);
    filters.min_bathrooms = parse_with(params, MIN_BATHROOMS, parse_bathroom_count);
    filters.max_bathrooms = parse_with(params, MAX_BATHROOMS, parse_bathroom_count);
    filters.max_guests = parse_with(params, MAX_GUESTS, |v| v.parse::<u32>().ok().filter(|g| *g > 0));
    filters.min_price = parse_with(params, MIN_PRICE, parse_price);
    filters.max_price = parse_with(params, MAX_PRICE, parse_price);

    filters.amenities = parse_tag_set(params, AMENITIES);
    filters.services = parse_tag_set(params, SERVICES);
    filters.accessibility = parse_tag_set(params, ACCESSIBILITY);
    filters.categories = parse_string_set(params, CATEGORIES);
    filters.accessibility_options = parse_string_set(params, ACCESSIBILITY_OPTIONS);

    filters.policies.pets_allowed = parse_with(params, PETS_ALLOWED, parse_bool);
    filters.policies.events_allowed = parse_with(params, EVENTS_ALLOWED, parse_bool);
    filters.policies.smoking_allowed = parse_with(params, SMOKING_ALLOWED, parse_bool);
    filters.promoted.show_on_website = parse_with(params, SHOW_ON_WEBSITE, parse_bool);
    filters.promoted.highlight = parse_with(params, HIGHLIGHT, parse_bool);

    filters
}

/// 1-based page from query parameters; anything unusable is page 1
pub fn decode_page(params: &QueryParams) -> u32 {
    parse_with(params, PAGE, |v| v.parse::<u32>().ok().filter(|p| *p >= 1)).unwrap_or(1)
}

/// Emit a key for every active constraint and nothing else
pub fn encode(filters: &PropertyFilters) -> QueryParams {
    let mut params = QueryParams::new();

    if !filters.search.is_empty() {
        params.insert(SEARCH.into(), filters.search.clone());
    }
    if !filters.status.is_all() {
        params.insert(STATUS.into(), filters.status.to_string());
    }
    if let Some(destination_id) = &filters.destination_id {
        params.insert(DESTINATION_ID.into(), destination_id.clone());
    }
    insert_set(&mut params, DESTINATION_IDS, filters.destination_ids.iter());
    if let Some(property_type) = filters.property_type {
        params.insert(PROPERTY_TYPE.into(), property_type.to_string());
    }

    insert_display(&mut params, MIN_ROOMS, filters.min_rooms);
    insert_display(&mut params, MAX_ROOMS, filters.max_rooms);
    insert_display(&mut params, MIN_BATHROOMS, filters.min_bathrooms);
    insert_display(&mut params, MAX_BATHROOMS, filters.max_bathrooms);
    insert_display(&mut params, MAX_GUESTS, filters.max_guests);
    insert_display(&mut params, MIN_PRICE, filters.min_price);
    insert_display(&mut params, MAX_PRICE, filters.max_price);

    insert_set(&mut params, AMENITIES, filters.amenities.iter());
    insert_set(&mut params, SERVICES, filters.services.iter());
    insert_set(&mut params, ACCESSIBILITY, filters.accessibility.iter());
    insert_set(&mut params, CATEGORIES, filters.categories.iter());
    insert_set(&mut params, ACCESSIBILITY_OPTIONS, filters.accessibility_options.iter());

    insert_display(&mut params, PETS_ALLOWED, filters.policies.pets_allowed);
    insert_display(&mut params, EVENTS_ALLOWED, filters.policies.events_allowed);
    insert_display(&mut params, SMOKING_ALLOWED, filters.policies.smoking_allowed);
    insert_display(&mut params, SHOW_ON_WEBSITE, filters.promoted.show_on_website);
    insert_display(&mut params, HIGHLIGHT, filters.promoted.highlight);

    params
}

/// Parse a raw query string (with or without the leading `?`) into filters and page
pub fn decode_query(query: &str) -> (PropertyFilters, u32) {
    let params = parse_query(query);
    (decode(&params), decode_page(&params))
}

/// Render filters and page as a query string, keys in [`KEYS`] order.
/// Page 1 is implied and never written.
pub fn encode_query(filters: &PropertyFilters, page: u32) -> String {
    let mut params = encode(filters);
    if page > 1 {
        params.insert(PAGE.into(), page.to_string());
    }
    render_query(&params)
}

/// Split a query string into parameters; a repeated key keeps its last value
pub fn parse_query(query: &str) -> QueryParams {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Percent-encode parameters; recognized keys first in canonical order, then the rest
pub fn render_query(params: &QueryParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for key in KEYS {
        if let Some(value) = params.get(*key) {
            serializer.append_pair(key, value);
        }
    }
    for (key, value) in params.iter().filter(|(k, _)| !KEYS.contains(&k.as_str())) {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn parse_with<T>(params: &QueryParams, key: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let raw = params.get(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        debug!(key, value = %raw, "dropping malformed filter parameter");
    }
    parsed
}

fn parse_room_count(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|r| ROOM_BOUNDS.contains(r))
}

fn parse_bathroom_count(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|b| is_valid_bathroom_count(*b))
}

fn parse_price(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().filter(|p| *p >= 0)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn split_set(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|v| !v.is_empty())
}

fn parse_tag_set<T: FromStr + Ord>(params: &QueryParams, key: &str) -> BTreeSet<T> {
    let Some(raw) = params.get(key) else {
        return BTreeSet::new();
    };
    split_set(raw)
        .filter_map(|value| match value.parse::<T>() {
            Ok(tag) => Some(tag),
            Err(_) => {
                debug!(key, value, "dropping unknown tag");
                None
            }
        })
        .collect()
}

fn parse_string_set(params: &QueryParams, key: &str) -> BTreeSet<String> {
    params
        .get(key)
        .map(|raw| split_set(raw).map(str::to_string).collect())
        .unwrap_or_default()
}

fn insert_display<T: ToString>(params: &mut QueryParams, key: &str, value: Option<T>) {
    if let Some(value) = value {
        params.insert(key.to_string(), value.to_string());
    }
}

fn insert_set<T: ToString>(params: &mut QueryParams, key: &str, values: impl Iterator<Item = T>) {
    let joined = values.map(|v| v.to_string()).collect::<Vec<_>>().join(",");
    if !joined.is_empty() {
        params.insert(key.to_string(), joined);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amenity, PropertyType, Service};

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn decodes_every_kind_of_field() {
        let filters = decode(&params(&[
            ("search", "sea view"),
            ("status", "PUBLISHED"),
            ("destinationIds", "d1,d2"),
            ("propertyType", "VILLA"),
            ("minRooms", "3"),
            ("maxRooms", "8"),
            ("minBathrooms", "1.5"),
            ("maxGuests", "10"),
            ("maxPrice", "5000"),
            ("amenities", "hasPool,hasGym"),
            ("services", "concierge"),
            ("petsAllowed", "false"),
            ("highlight", "true"),
        ]));

        assert_eq!(filters.search, "sea view");
        assert_eq!(filters.status, StatusFilter::Published);
        assert_eq!(filters.destination_ids.len(), 2);
        assert_eq!(filters.property_type, Some(PropertyType::Villa));
        assert_eq!(filters.min_rooms, Some(3));
        assert_eq!(filters.max_rooms, Some(8));
        assert_eq!(filters.min_bathrooms, Some(1.5));
        assert_eq!(filters.max_guests, Some(10));
        assert_eq!(filters.max_price, Some(5000));
        assert!(filters.amenities.contains(&Amenity::HasPool));
        assert!(filters.amenities.contains(&Amenity::HasGym));
        assert!(filters.services.contains(&Service::Concierge));
        assert_eq!(filters.policies.pets_allowed, Some(false));
        assert_eq!(filters.policies.events_allowed, None);
        assert_eq!(filters.promoted.highlight, Some(true));
        assert_eq!(filters.promoted.show_on_website, None);
    }

    #[test]
    fn malformed_values_leave_fields_unset() {
        let filters = decode(&params(&[
            ("status", "ARCHIVED"),
            ("minRooms", "three"),
            ("maxRooms", "99"),
            ("minBathrooms", "1.25"),
            ("minPrice", "-5"),
            ("maxPrice", "NaN"),
            ("petsAllowed", "yes"),
            ("amenities", "hasPool,hasMoat"),
            ("services", "nope"),
            ("propertyType", "igloo"),
        ]));

        assert_eq!(filters.status, StatusFilter::All);
        assert_eq!(filters.min_rooms, None);
        assert_eq!(filters.max_rooms, None);
        assert_eq!(filters.min_bathrooms, None);
        assert_eq!(filters.min_price, None);
        assert_eq!(filters.max_price, None);
        assert_eq!(filters.policies.pets_allowed, None);
        assert_eq!(filters.amenities.len(), 1);
        assert!(filters.services.is_empty());
        assert_eq!(filters.property_type, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let filters = decode(&params(&[("utm_source", "mail"), ("sort", "price")]));
        assert!(filters.is_default());
    }

    #[test]
    fn encode_omits_inactive_fields() {
        let mut filters = PropertyFilters::default();
        filters.policies.smoking_allowed = Some(false);
        filters.min_price = Some(0);

        let encoded = encode(&filters);
        assert_eq!(
            encoded,
            params(&[("smokingAllowed", "false"), ("minPrice", "0")])
        );
        assert!(encode(&PropertyFilters::default()).is_empty());
    }

    #[test]
    fn encoding_is_stable_after_a_decode() {
        let once = encode(&decode(&params(&[
            ("search", "lake"),
            ("amenities", "hasGym, hasPool"),
            ("minBathrooms", "2.0"),
            ("categories", "luxury,family"),
            ("showOnWebsite", "false"),
        ])));
        let twice = encode(&decode(&once));

        assert_eq!(once, twice);
        assert_eq!(once["minBathrooms"], "2");
        assert_eq!(once["amenities"], "hasPool,hasGym");
    }

    #[test]
    fn every_key_survives_encode_decode_encode() {
        let input = params(&[
            ("search", "lake view"),
            ("status", "HIDDEN"),
            ("destinationId", "dest-alps"),
            ("destinationIds", "d2,d1"),
            ("propertyType", "CASTLE"),
            ("minRooms", "2"),
            ("maxRooms", "9"),
            ("minBathrooms", "1.5"),
            ("maxBathrooms", "3.0"),
            ("maxGuests", "12"),
            ("minPrice", "100"),
            ("maxPrice", "900"),
            ("amenities", "hasSeaView,hasPool"),
            ("services", "security,concierge"),
            ("accessibility", "wheelchairAccessible"),
            ("categories", "luxury,family"),
            ("accessibilityOptions", "ramp"),
            ("petsAllowed", "true"),
            ("eventsAllowed", "false"),
            ("smokingAllowed", "false"),
            ("showOnWebsite", "false"),
            ("highlight", "true"),
        ]);
        let filters = decode(&input);
        let once = encode(&filters);

        assert_eq!(once.len(), KEYS.len() - 1);
        assert!(KEYS.iter().filter(|k| **k != PAGE).all(|k| once.contains_key(*k)));
        assert_eq!(encode(&decode(&once)), once);
        assert_eq!(decode(&once), filters);

        assert_eq!(once[MAX_BATHROOMS], "3");
        assert_eq!(once[DESTINATION_IDS], "d1,d2");
        assert_eq!(once[EVENTS_ALLOWED], "false");
        assert_eq!(once[PROPERTY_TYPE], "CASTLE");
    }

    #[test]
    fn query_string_round_trip_with_page() {
        let mut filters = PropertyFilters::default().with_search("villa & co");
        filters.max_rooms = Some(6);

        let query = encode_query(&filters, 3);
        assert_eq!(query, "search=villa+%26+co&maxRooms=6&page=3");

        let (decoded, page) = decode_query(&format!("?{query}"));
        assert_eq!(decoded, filters);
        assert_eq!(page, 3);
    }

    #[test]
    fn page_one_is_implied() {
        assert_eq!(encode_query(&PropertyFilters::default(), 1), "");
        assert_eq!(decode_page(&params(&[("page", "0")])), 1);
        assert_eq!(decode_page(&params(&[("page", "x")])), 1);
        assert_eq!(decode_page(&params(&[])), 1);
    }
}

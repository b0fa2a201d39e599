use super::{PropertyFilters, StatusFilter};
use crate::models::{Accessibility, Amenity, PropertyType, Service};
use std::fmt;

/// One removable constraint, as shown in the chip row above the list
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChip {
    Status(StatusFilter),
    Destination(String),
    DestinationIn(String),
    PropertyType(PropertyType),
    Rooms { min: Option<u32>, max: Option<u32> },
    Bathrooms { min: Option<f64>, max: Option<f64> },
    MaxGuests(u32),
    Price { min: Option<i64>, max: Option<i64> },
    Amenity(Amenity),
    Service(Service),
    Accessibility(Accessibility),
    Category(String),
    AccessibilityOption(String),
    PetsAllowed(bool),
    EventsAllowed(bool),
    SmokingAllowed(bool),
    ShowOnWebsite(bool),
    Highlight(bool),
}

impl fmt::Display for FilterChip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterChip::Status(status) => write!(f, "Status: {status}"),
            FilterChip::Destination(id) | FilterChip::DestinationIn(id) => {
                write!(f, "Destination: {id}")
            }
            FilterChip::PropertyType(kind) => write!(f, "Type: {kind}"),
            FilterChip::Rooms { min, max } => write!(f, "Rooms: {}", range_label(min, max)),
            FilterChip::Bathrooms { min, max } => {
                write!(f, "Bathrooms: {}", range_label(min, max))
            }
            FilterChip::MaxGuests(guests) => write!(f, "Up to {guests} guests"),
            FilterChip::Price { min, max } => write!(f, "Price: {}", range_label(min, max)),
            FilterChip::Amenity(tag) => write!(f, "{tag}"),
            FilterChip::Service(tag) => write!(f, "{tag}"),
            FilterChip::Accessibility(tag) => write!(f, "{tag}"),
            FilterChip::Category(tag) | FilterChip::AccessibilityOption(tag) => write!(f, "{tag}"),
            FilterChip::PetsAllowed(v) => write!(f, "Pets {}", allowed_label(*v)),
            FilterChip::EventsAllowed(v) => write!(f, "Events {}", allowed_label(*v)),
            FilterChip::SmokingAllowed(v) => write!(f, "Smoking {}", allowed_label(*v)),
            FilterChip::ShowOnWebsite(true) => f.write_str("On website"),
            FilterChip::ShowOnWebsite(false) => f.write_str("Not on website"),
            FilterChip::Highlight(true) => f.write_str("Highlighted"),
            FilterChip::Highlight(false) => f.write_str("Not highlighted"),
        }
    }
}

fn range_label<T: fmt::Display>(min: &Option<T>, max: &Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{min}-{max}"),
        (Some(min), None) => format!("{min}+"),
        (None, Some(max)) => format!("up to {max}"),
        (None, None) => "any".to_string(),
    }
}

fn allowed_label(allowed: bool) -> &'static str {
    if allowed {
        "allowed"
    } else {
        "not allowed"
    }
}

/// All chips for the active constraints. Free-text search has its own input
/// and never becomes a chip.
pub fn chips(filters: &PropertyFilters) -> Vec<FilterChip> {
    let mut chips = Vec::new();

    if !filters.status.is_all() {
        chips.push(FilterChip::Status(filters.status));
    }
    if let Some(id) = &filters.destination_id {
        chips.push(FilterChip::Destination(id.clone()));
    }
    chips.extend(filters.destination_ids.iter().cloned().map(FilterChip::DestinationIn));
    if let Some(kind) = filters.property_type {
        chips.push(FilterChip::PropertyType(kind));
    }
    if filters.min_rooms.is_some() || filters.max_rooms.is_some() {
        chips.push(FilterChip::Rooms {
            min: filters.min_rooms,
            max: filters.max_rooms,
        });
    }
    if filters.min_bathrooms.is_some() || filters.max_bathrooms.is_some() {
        chips.push(FilterChip::Bathrooms {
            min: filters.min_bathrooms,
            max: filters.max_bathrooms,
        });
    }
    if let Some(guests) = filters.max_guests {
        chips.push(FilterChip::MaxGuests(guests));
    }
    if filters.min_price.is_some() || filters.max_price.is_some() {
        chips.push(FilterChip::Price {
            min: filters.min_price,
            max: filters.max_price,
        });
    }
    chips.extend(filters.amenities.iter().copied().map(FilterChip::Amenity));
    chips.extend(filters.services.iter().copied().map(FilterChip::Service));
    chips.extend(filters.accessibility.iter().copied().map(FilterChip::Accessibility));
    chips.extend(filters.categories.iter().cloned().map(FilterChip::Category));
    chips.extend(
        filters
            .accessibility_options
            .iter()
            .cloned()
            .map(FilterChip::AccessibilityOption),
    );
    chips.extend(filters.policies.pets_allowed.map(FilterChip::PetsAllowed));
    chips.extend(filters.policies.events_allowed.map(FilterChip::EventsAllowed));
    chips.extend(filters.policies.smoking_allowed.map(FilterChip::SmokingAllowed));
    chips.extend(filters.promoted.show_on_website.map(FilterChip::ShowOnWebsite));
    chips.extend(filters.promoted.highlight.map(FilterChip::Highlight));

    chips
}

/// Copy of `filters` without the constraint behind `chip`
pub fn remove_chip(filters: &PropertyFilters, chip: &FilterChip) -> PropertyFilters {
    let mut next = filters.clone();
    match chip {
        FilterChip::Status(_) => next.status = StatusFilter::All,
        FilterChip::Destination(_) => next.destination_id = None,
        FilterChip::DestinationIn(id) => {
            next.destination_ids.remove(id);
        }
        FilterChip::PropertyType(_) => next.property_type = None,
        FilterChip::Rooms { .. } => {
            next.min_rooms = None;
            next.max_rooms = None;
        }
        FilterChip::Bathrooms { .. } => {
            next.min_bathrooms = None;
            next.max_bathrooms = None;
        }
        FilterChip::MaxGuests(_) => next.max_guests = None,
        FilterChip::Price { .. } => {
            next.min_price = None;
            next.max_price = None;
        }
        FilterChip::Amenity(tag) => {
            next.amenities.remove(tag);
        }
        FilterChip::Service(tag) => {
            next.services.remove(tag);
        }
        FilterChip::Accessibility(tag) => {
            next.accessibility.remove(tag);
        }
        FilterChip::Category(tag) => {
            next.categories.remove(tag);
        }
        FilterChip::AccessibilityOption(tag) => {
            next.accessibility_options.remove(tag);
        }
        FilterChip::PetsAllowed(_) => next.policies.pets_allowed = None,
        FilterChip::EventsAllowed(_) => next.policies.events_allowed = None,
        FilterChip::SmokingAllowed(_) => next.policies.smoking_allowed = None,
        FilterChip::ShowOnWebsite(_) => next.promoted.show_on_website = None,
        FilterChip::Highlight(_) => next.promoted.highlight = None,
    }
    next
}

/// Number shown on the filter button badge.
///
/// One unit per constraint group: each scalar, each range, each non-empty
/// set (however many values it holds) and each policy or promotion flag.
pub fn active_filter_count(filters: &PropertyFilters) -> usize {
    let groups = [
        !filters.status.is_all(),
        filters.destination_id.is_some(),
        !filters.destination_ids.is_empty(),
        filters.property_type.is_some(),
        filters.min_rooms.is_some() || filters.max_rooms.is_some(),
        filters.min_bathrooms.is_some() || filters.max_bathrooms.is_some(),
        filters.max_guests.is_some(),
        filters.min_price.is_some() || filters.max_price.is_some(),
        !filters.amenities.is_empty(),
        !filters.services.is_empty(),
        !filters.accessibility.is_empty(),
        !filters.categories.is_empty(),
        !filters.accessibility_options.is_empty(),
        filters.policies.pets_allowed.is_some(),
        filters.policies.events_allowed.is_some(),
        filters.policies.smoking_allowed.is_some(),
        filters.promoted.show_on_website.is_some(),
        filters.promoted.highlight.is_some(),
    ];
    groups.into_iter().filter(|active| *active).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rooms_and_amenities() -> PropertyFilters {
        let mut filters = PropertyFilters::default();
        filters.min_rooms = Some(3);
        filters.max_rooms = Some(8);
        filters.amenities.insert(Amenity::HasPool);
        filters.amenities.insert(Amenity::HasGym);
        filters
    }

    #[test]
    fn range_and_amenity_set_count_as_two() {
        assert_eq!(active_filter_count(&rooms_and_amenities()), 2);
    }

    #[test]
    fn search_and_default_status_do_not_count() {
        let filters = PropertyFilters::default().with_search("chalet");
        assert_eq!(active_filter_count(&filters), 0);
        assert!(chips(&filters).is_empty());
    }

    #[test]
    fn false_policy_counts() {
        let mut filters = PropertyFilters::default();
        filters.policies.pets_allowed = Some(false);
        assert_eq!(active_filter_count(&filters), 1);
        assert_eq!(chips(&filters), vec![FilterChip::PetsAllowed(false)]);
        assert_eq!(chips(&filters)[0].to_string(), "Pets not allowed");
    }

    #[test]
    fn one_chip_per_amenity() {
        let chips = chips(&rooms_and_amenities());
        assert_eq!(
            chips,
            vec![
                FilterChip::Rooms {
                    min: Some(3),
                    max: Some(8)
                },
                FilterChip::Amenity(Amenity::HasPool),
                FilterChip::Amenity(Amenity::HasGym),
            ]
        );
        assert_eq!(chips[0].to_string(), "Rooms: 3-8");
    }

    #[test]
    fn removing_a_chip_drops_only_that_constraint() {
        let filters = rooms_and_amenities();

        let without_pool = remove_chip(&filters, &FilterChip::Amenity(Amenity::HasPool));
        assert_eq!(without_pool.amenities.len(), 1);
        assert_eq!(without_pool.min_rooms, Some(3));

        let without_rooms = remove_chip(&filters, &FilterChip::Rooms { min: None, max: None });
        assert_eq!(without_rooms.min_rooms, None);
        assert_eq!(without_rooms.max_rooms, None);
        assert_eq!(without_rooms.amenities.len(), 2);
    }

    #[test]
    fn removing_every_chip_restores_default() {
        let mut filters = rooms_and_amenities().with_status(StatusFilter::Hidden);
        filters.promoted.highlight = Some(true);

        for chip in chips(&filters) {
            filters = remove_chip(&filters, &chip);
        }
        assert!(filters.is_default());
    }
}

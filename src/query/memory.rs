use crate::filters::{PropertyFilters, StatusFilter};
use crate::models::{PropertyListItem, PropertyPage, PropertyStatus};
use crate::query::traits::PropertySource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Property source over a fixed set of records held in memory
pub struct MemorySource {
    items: Vec<PropertyListItem>,
}

impl MemorySource {
    pub fn new(items: Vec<PropertyListItem>) -> Self {
        Self { items }
    }

    /// Load records from a JSON array of property list items
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read property data from {}", path.display()))?;
        let items: Vec<PropertyListItem> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse property data in {}", path.display()))?;

        info!("Loaded {} properties from {}", items.len(), path.display());
        Ok(Self::new(items))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl PropertySource for MemorySource {
    async fn fetch(
        &self,
        filters: &PropertyFilters,
        page: u32,
        page_size: u32,
    ) -> Result<PropertyPage> {
        let mut matched: Vec<PropertyListItem> = self
            .items
            .iter()
            .filter(|item| matches(filters, item))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        debug!("{} of {} properties match", matched.len(), self.items.len());
        Ok(PropertyPage::paginate(matched, page, page_size))
    }

    fn source_name(&self) -> &'static str {
        "memory"
    }
}

/// Whether a record satisfies every active constraint.
///
/// Constraints AND together; values inside one tag set OR together.
pub fn matches(filters: &PropertyFilters, item: &PropertyListItem) -> bool {
    let search = filters.search.trim();
    if !search.is_empty() && !item.name.to_lowercase().contains(&search.to_lowercase()) {
        return false;
    }

    let status_ok = match filters.status {
        StatusFilter::All => true,
        StatusFilter::Published => item.status == PropertyStatus::Published,
        StatusFilter::Hidden => item.status == PropertyStatus::Hidden,
    };
    if !status_ok {
        return false;
    }

    if let Some(id) = &filters.destination_id {
        if &item.destination_id != id {
            return false;
        }
    }
    if !filters.destination_ids.is_empty() && !filters.destination_ids.contains(&item.destination_id) {
        return false;
    }
    if let Some(kind) = filters.property_type {
        if item.property_type != kind {
            return false;
        }
    }

    if !in_range(item.rooms, filters.min_rooms, filters.max_rooms)
        || !in_range(item.bathrooms, filters.min_bathrooms, filters.max_bathrooms)
        || !in_range(item.max_guests, None, filters.max_guests)
        || !in_range(item.price, filters.min_price, filters.max_price)
    {
        return false;
    }

    if !any_of(&filters.amenities, &item.amenities)
        || !any_of(&filters.services, &item.services)
        || !any_of(&filters.accessibility, &item.accessibility)
        || !any_of(&filters.categories, &item.categories)
        || !any_of(&filters.accessibility_options, &item.accessibility_options)
    {
        return false;
    }

    flag_matches(filters.policies.pets_allowed, item.pets_allowed)
        && flag_matches(filters.policies.events_allowed, item.events_allowed)
        && flag_matches(filters.policies.smoking_allowed, item.smoking_allowed)
        && flag_matches(filters.promoted.show_on_website, item.show_on_website)
        && flag_matches(filters.promoted.highlight, item.highlight)
}

fn in_range<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

fn any_of<T: Ord>(wanted: &BTreeSet<T>, present: &BTreeSet<T>) -> bool {
    wanted.is_empty() || wanted.iter().any(|tag| present.contains(tag))
}

fn flag_matches(wanted: Option<bool>, actual: bool) -> bool {
    wanted.map_or(true, |wanted| wanted == actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::house;
    use crate::models::{Amenity, PropertyType};

    fn catalogue() -> MemorySource {
        let mut lake = house("h1", "Lake Lodge");
        lake.property_type = PropertyType::Lodge;
        lake.rooms = 3;
        lake.amenities.insert(Amenity::HasPool);
        lake.pets_allowed = true;

        let mut villa = house("h2", "Sea Villa");
        villa.property_type = PropertyType::Villa;
        villa.destination_id = "dest-coast".to_string();
        villa.rooms = 8;
        villa.max_guests = 16;
        villa.amenities.insert(Amenity::HasGym);

        let mut hidden = house("h3", "Hidden Chalet");
        hidden.status = PropertyStatus::Hidden;
        hidden.rooms = 12;
        hidden.show_on_website = false;

        MemorySource::new(vec![villa, hidden, lake])
    }

    async fn names(filters: &PropertyFilters) -> Vec<String> {
        catalogue()
            .fetch(filters, 1, 20)
            .await
            .unwrap()
            .data
            .into_iter()
            .map(|item| item.name)
            .collect()
    }

    #[tokio::test]
    async fn no_filters_lists_everything_by_name() {
        assert_eq!(
            names(&PropertyFilters::default()).await,
            vec!["Hidden Chalet", "Lake Lodge", "Sea Villa"]
        );
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let filters = PropertyFilters::default().with_search("VILLA");
        assert_eq!(names(&filters).await, vec!["Sea Villa"]);
    }

    #[tokio::test]
    async fn status_and_ranges() {
        let mut filters = PropertyFilters::default().with_status(StatusFilter::Published);
        filters.min_rooms = Some(3);
        filters.max_rooms = Some(8);
        assert_eq!(names(&filters).await, vec!["Lake Lodge", "Sea Villa"]);

        filters.max_guests = Some(10);
        assert_eq!(names(&filters).await, vec!["Lake Lodge"]);
    }

    #[tokio::test]
    async fn amenities_or_within_set() {
        let mut filters = PropertyFilters::default();
        filters.amenities.insert(Amenity::HasPool);
        filters.amenities.insert(Amenity::HasGym);
        assert_eq!(names(&filters).await, vec!["Lake Lodge", "Sea Villa"]);
    }

    #[tokio::test]
    async fn false_flags_are_real_constraints() {
        let mut filters = PropertyFilters::default();
        filters.policies.pets_allowed = Some(false);
        assert_eq!(names(&filters).await, vec!["Hidden Chalet", "Sea Villa"]);

        let mut filters = PropertyFilters::default();
        filters.promoted.show_on_website = Some(false);
        assert_eq!(names(&filters).await, vec!["Hidden Chalet"]);
    }

    #[tokio::test]
    async fn unknown_destination_is_an_empty_page() {
        let filters = PropertyFilters {
            destination_id: Some("nonexistent".to_string()),
            ..Default::default()
        };
        let page = catalogue().fetch(&filters, 1, 20).await.unwrap();
        assert_eq!(page, PropertyPage::empty());
    }

    #[tokio::test]
    async fn destination_set_scopes_results() {
        let mut filters = PropertyFilters::default();
        filters.destination_ids.insert("dest-coast".to_string());
        assert_eq!(names(&filters).await, vec!["Sea Villa"]);
    }

    #[test]
    fn loads_records_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("houses.json");
        let json = serde_json::to_string(&vec![house("h1", "Lake Lodge")]).unwrap();
        std::fs::write(&path, json).unwrap();

        let source = MemorySource::from_json_file(&path).unwrap();
        assert_eq!(source.len(), 1);

        std::fs::write(&path, "not json").unwrap();
        assert!(MemorySource::from_json_file(&path).is_err());
    }
}

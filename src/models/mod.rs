use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A tag string that does not belong to the vocabulary it was parsed against
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tag `{0}`")]
pub struct UnknownTag(pub String);

/// Declares a closed vocabulary with stable wire strings shared by serde,
/// the query-string codec and the renderers.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownTag;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(UnknownTag(s.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Kind of building a house record describes
    PropertyType {
        Villa => "VILLA",
        Apartment => "APARTMENT",
        House => "HOUSE",
        Condo => "CONDO",
        Castle => "CASTLE",
        Chalet => "CHALET",
        Lodge => "LODGE",
    }
}

wire_enum! {
    /// Publication state of a house record
    PropertyStatus {
        Published => "PUBLISHED",
        Hidden => "HIDDEN",
    }
}

wire_enum! {
    /// On-site amenities
    Amenity {
        HasPool => "hasPool",
        HasGym => "hasGym",
        HasSpa => "hasSpa",
        HasSauna => "hasSauna",
        HasJacuzzi => "hasJacuzzi",
        HasTennisCourt => "hasTennisCourt",
        HasGarden => "hasGarden",
        HasBbq => "hasBbq",
        HasParking => "hasParking",
        HasWifi => "hasWifi",
        HasAirConditioning => "hasAirConditioning",
        HasFireplace => "hasFireplace",
        HasElevator => "hasElevator",
        HasSeaView => "hasSeaView",
    }
}

wire_enum! {
    /// Services bookable with a stay
    Service {
        Concierge => "concierge",
        Housekeeping => "housekeeping",
        PrivateChef => "privateChef",
        AirportTransfer => "airportTransfer",
        Babysitting => "babysitting",
        Security => "security",
        CarRental => "carRental",
        GroceryDelivery => "groceryDelivery",
    }
}

wire_enum! {
    /// Accessibility features
    Accessibility {
        WheelchairAccessible => "wheelchairAccessible",
        StepFreeEntrance => "stepFreeEntrance",
        GroundFloorBedroom => "groundFloorBedroom",
        AccessibleBathroom => "accessibleBathroom",
        ElevatorAccess => "elevatorAccess",
        WideDoorways => "wideDoorways",
    }
}

/// One row of the property list, as returned by a property source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyListItem {
    pub id: String,
    pub name: String,
    pub status: PropertyStatus,
    pub destination_id: String,
    pub destination_name: String,
    pub property_type: PropertyType,
    pub rooms: u32,
    pub bathrooms: f64,
    pub max_guests: u32,
    pub price: i64,
    #[serde(default)]
    pub amenities: BTreeSet<Amenity>,
    #[serde(default)]
    pub services: BTreeSet<Service>,
    #[serde(default)]
    pub accessibility: BTreeSet<Accessibility>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub accessibility_options: BTreeSet<String>,
    #[serde(default)]
    pub pets_allowed: bool,
    #[serde(default)]
    pub events_allowed: bool,
    #[serde(default)]
    pub smoking_allowed: bool,
    #[serde(default)]
    pub show_on_website: bool,
    #[serde(default)]
    pub highlight: bool,
    pub updated_at: DateTime<Utc>,
}

/// One page of a filtered property listing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPage {
    pub data: Vec<PropertyListItem>,
    pub total: u64,
    pub total_pages: u32,
}

impl PropertyPage {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cut a 1-based page out of an already filtered and ordered result set.
    /// Pages past the end yield no rows but keep the real totals.
    pub fn paginate(items: Vec<PropertyListItem>, page: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let total = items.len() as u64;
        let total_pages = total.div_ceil(page_size as u64) as u32;
        let start = (page.max(1) as usize - 1).saturating_mul(page_size as usize);

        let data = items
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        Self {
            data,
            total,
            total_pages,
        }
    }
}

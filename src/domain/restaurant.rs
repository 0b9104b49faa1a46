use serde::{Deserialize, Serialize};

// Categories the owner form offers when registering a restaurant.
pub const RESTAURANT_CATEGORIES: [&str; 13] = [
    "KOREAN",
    "CHINESE",
    "JAPANESE",
    "WESTERN",
    "ITALIAN",
    "FRENCH",
    "SPANISH",
    "AMERICAN",
    "ASIAN",
    "VIETNAMESE",
    "THAI",
    "INDIAN",
    "FUSION",
];

/// Read-only restaurant projection fetched per view. The remaining table
/// count is a snapshot; the server stays the only capacity authority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub max_table_count: i64,
    // None when the backend left it out; unknown never counts as full.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_table_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waitlist_count: Option<i64>,
}

impl Restaurant {
    pub fn is_full(&self) -> bool {
        self.remaining_table_count == Some(0)
    }
}

// Filters for the restaurant list. Empty values are left out of the query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub name: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
}

// Payload sent when an owner registers a restaurant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRestaurant {
    pub name: String,
    pub address: String,
    pub max_table_count: i64,
    pub category: String,
}

// Reservation confirmation shown to the user after a successful submit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationReceipt {
    pub reservation_id: i64,
    pub status: String,
    pub reservation_time: String,
}

// Distinct categories in first-seen order, for the list filter.
pub fn unique_categories(restaurants: &[Restaurant]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for restaurant in restaurants {
        if !categories.contains(&restaurant.category) {
            categories.push(restaurant.category.clone());
        }
    }
    categories
}

pub fn available_only(restaurants: &[Restaurant]) -> Vec<Restaurant> {
    restaurants
        .iter()
        .filter(|restaurant| !restaurant.is_full())
        .cloned()
        .collect()
}

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

use crate::domain::{
    ApiGateway, ClientError, HttpMethod, NewRestaurant, Restaurant, SearchParams,
};
use crate::interface_adapters::protocol::{RESTAURANTS_PATH, json_body, restaurant_path};

// Restaurant catalog: search, detail and owner registration.
pub struct RestaurantCatalog {
    gateway: Arc<dyn ApiGateway>,
}

impl RestaurantCatalog {
    pub fn new(gateway: Arc<dyn ApiGateway>) -> Self {
        Self { gateway }
    }

    pub async fn search(&self, params: &SearchParams) -> Result<Vec<Restaurant>, ClientError> {
        let path = search_path(params);
        let response = self
            .gateway
            .send(HttpMethod::Get, &path, None, None)
            .await
            .inspect_err(|err| error!(path = %path, error = %err, "restaurant search failed"))?;

        // Paged endpoints wrap the list in `content`.
        let body = response.into_body();
        let list = match body {
            Value::Object(mut fields) if fields.contains_key("content") => {
                fields.remove("content").unwrap_or(Value::Null)
            }
            other => other,
        };
        parse(list)
    }

    pub async fn get(&self, restaurant_id: i64) -> Result<Restaurant, ClientError> {
        let path = restaurant_path(restaurant_id);
        let response = self
            .gateway
            .send(HttpMethod::Get, &path, None, None)
            .await
            .inspect_err(|err| error!(path = %path, error = %err, "restaurant lookup failed"))?;
        parse(response.into_body())
    }

    // Returns whatever the backend echoes for the created restaurant.
    pub async fn add(&self, restaurant: &NewRestaurant) -> Result<Value, ClientError> {
        let response = self
            .gateway
            .send(
                HttpMethod::Post,
                RESTAURANTS_PATH,
                Some(json_body(restaurant)),
                None,
            )
            .await
            .inspect_err(|err| error!(error = %err, "adding restaurant failed"))?;
        Ok(response.into_body())
    }
}

/// Restaurant list path with the non-empty filters appended as a
/// percent-encoded query string.
pub fn search_path(params: &SearchParams) -> String {
    let filters = [
        ("name", &params.name),
        ("category", &params.category),
        ("address", &params.address),
    ];

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in filters {
        if let Some(value) = value.as_deref().filter(|value| !value.is_empty()) {
            query.append_pair(key, value);
            any = true;
        }
    }

    if any {
        format!("{RESTAURANTS_PATH}?{}", query.finish())
    } else {
        RESTAURANTS_PATH.to_string()
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|err| ClientError::UnexpectedResponse(err.to_string()))
}

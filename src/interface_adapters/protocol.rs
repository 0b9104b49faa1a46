use serde::Serialize;
use serde_json::Value;

pub const SIGNUP_PATH: &str = "/api/auth/signup";
pub const SIGNIN_PATH: &str = "/api/auth/signin";
pub const ME_PATH: &str = "/api/auth/me";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const RESTAURANTS_PATH: &str = "/api/restaurants";

pub fn restaurant_path(restaurant_id: i64) -> String {
    format!("{RESTAURANTS_PATH}/{restaurant_id}")
}

pub fn reservation_path(restaurant_id: i64) -> String {
    format!("/api/v3/reservations/{restaurant_id}")
}

// Request payload for sign-in.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

// Sign-up form input. The role travels as `memberType` on the wire.
#[derive(Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub role: String,
}

// Request payload for sign-up.
#[derive(Serialize)]
pub struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(rename = "memberType")]
    pub member_type: &'a str,
}

impl<'a> From<&'a Registration> for SignUpRequest<'a> {
    fn from(registration: &'a Registration) -> Self {
        Self {
            email: &registration.email,
            password: &registration.password,
            member_type: &registration.role,
        }
    }
}

// Request payload for creating a reservation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest<'a> {
    pub reservation_time: &'a str,
}

// Serialize a request payload for the gateway. Plain field structs cannot
// fail to serialize, so a failure would only ever produce `null`.
pub fn json_body<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_registration_is_sent_then_role_maps_to_member_type() {
        let registration = Registration {
            email: "owner@example.com".to_string(),
            password: "secret".to_string(),
            role: "OWNER".to_string(),
        };

        let body = json_body(&SignUpRequest::from(&registration));

        assert_eq!(body["memberType"], "OWNER");
        assert!(body.get("role").is_none());
    }

    #[test]
    fn when_reservation_request_is_sent_then_uses_camel_case_field() {
        let body = json_body(&CreateReservationRequest {
            reservation_time: "2025-03-15 23:37:42",
        });

        assert_eq!(body["reservationTime"], "2025-03-15 23:37:42");
    }

    #[test]
    fn when_building_paths_then_ids_are_embedded() {
        assert_eq!(restaurant_path(9), "/api/restaurants/9");
        assert_eq!(reservation_path(9), "/api/v3/reservations/9");
    }
}

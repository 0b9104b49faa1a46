// Domain layer: identity, session, and reservation types plus the ports
// the use cases depend on.

pub mod claims;
pub mod errors;
pub mod ports;
pub mod restaurant;
pub mod session;

pub use claims::{NormalizedUser, Role, TokenClaims};
pub use errors::{AuthError, ClientError, DecodeError, ReservationError};
pub use ports::{ApiGateway, ApiResponse, Clock, HttpMethod, KeyValueStorage, Navigator};
pub use restaurant::{
    NewRestaurant, RESTAURANT_CATEGORIES, ReservationReceipt, Restaurant, SearchParams,
    available_only, unique_categories,
};
pub use session::{EXPIRY_WARNING_SECONDS, SessionSnapshot, SessionStatus, format_remaining};

// Use cases layer: session lifecycle, access policy, and reservation workflows.

pub mod auth_session;
pub mod reservation_flow;
pub mod restaurants;
pub mod route_guard;
pub mod session_store;
pub mod token_codec;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_session::AuthSessionManager;
pub use reservation_flow::{DisplayClock, ReservationFlow, build_reservation_time};
pub use restaurants::RestaurantCatalog;
pub use route_guard::{AccessPolicy, GuardDecision, RouteGuard, evaluate, policy_for};
pub use session_store::SessionStore;
pub use token_codec::TokenCodec;

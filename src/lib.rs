pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use frameworks::cli::run;
pub use interface_adapters::clients::ApiClient;
pub use use_cases::{AuthSessionManager, ReservationFlow, RestaurantCatalog, RouteGuard};

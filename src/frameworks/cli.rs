// Framework bootstrap for the command-line client: runtime init, component
// wiring, and one command per page of the web client.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use tracing::{error, warn};

use crate::domain::{
    ApiGateway, AuthError, ClientError, Clock, KeyValueStorage, Navigator, NewRestaurant,
    RESTAURANT_CATEGORIES, Restaurant, SearchParams, SessionSnapshot, SessionStatus,
    available_only, format_remaining, unique_categories,
};
use crate::frameworks::config;
use crate::interface_adapters::clients::ApiClient;
use crate::interface_adapters::clock::SystemClock;
use crate::interface_adapters::navigator::TerminalNavigator;
use crate::interface_adapters::protocol::{Credentials, Registration};
use crate::interface_adapters::storage::{FileStorage, MemoryStorage};
use crate::use_cases::route_guard::{HOME_PATH, LOGIN_PATH, SIGNUP_PATH};
use crate::use_cases::{
    AuthSessionManager, GuardDecision, ReservationFlow, RestaurantCatalog, RouteGuard,
    SessionStore,
};

const RESTAURANTS_PAGE: &str = "/restaurants";
const NEW_RESTAURANT_PAGE: &str = "/owner/restaurants/new";

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("{page} is not available in the current session; continue at {target}")]
    Redirected { page: String, target: String },
    #[error("access denied: {page} is for restaurant owners")]
    AccessDenied { page: String },
    #[error("no email given and none remembered; pass one explicitly")]
    MissingEmail,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "reservation-client", about = "Restaurant reservation client")]
struct Cli {
    // Overrides RESERVATION_API_URL.
    #[arg(long)]
    api_url: Option<String>,

    // Overrides RESERVATION_SESSION_DIR.
    #[arg(long)]
    session_dir: Option<PathBuf>,

    // Overrides RESERVATION_OFFSET_MINUTES.
    #[arg(long)]
    offset_minutes: Option<i64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in; falls back to the remembered email.
    Login {
        email: Option<String>,
        #[arg(long, env = "RESERVATION_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        remember: bool,
    },
    Logout,
    Signup {
        email: String,
        #[arg(long, env = "RESERVATION_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "USER")]
        role: String,
    },
    /// Show the session; `--watch` follows the expiry countdown.
    Status {
        #[arg(long)]
        watch: bool,
    },
    Restaurants {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        available: bool,
    },
    /// Reservation view for one restaurant; `--watch` keeps the time preview ticking.
    Restaurant {
        id: i64,
        #[arg(long)]
        watch: bool,
    },
    AddRestaurant {
        name: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        max_table_count: i64,
        #[arg(long, value_parser = PossibleValuesParser::new(RESTAURANT_CATEGORIES))]
        category: String,
    },
    Reserve {
        id: i64,
    },
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run() -> ExitCode {
    init_runtime();
    let cli = Cli::parse();

    let app = App::build(&cli);
    app.manager.init().await;
    let result = app.execute(cli.command).await;
    app.manager.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

struct App {
    manager: Arc<AuthSessionManager>,
    navigator: Arc<TerminalNavigator>,
    guard: Arc<RouteGuard>,
    catalog: RestaurantCatalog,
    flow: ReservationFlow,
}

impl App {
    fn build(cli: &Cli) -> Self {
        let storage: Arc<dyn KeyValueStorage> =
            match cli.session_dir.clone().or_else(config::session_dir) {
                Some(dir) => Arc::new(FileStorage::new(dir)),
                None => {
                    warn!("no session directory available; session will not persist");
                    Arc::new(MemoryStorage::new())
                }
            };
        let store = SessionStore::new(storage);

        let base_url = cli.api_url.clone().unwrap_or_else(config::api_base_url);
        let gateway: Arc<dyn ApiGateway> = Arc::new(ApiClient::new(base_url, store.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let manager = Arc::new(AuthSessionManager::new(
            gateway.clone(),
            store.clone(),
            clock.clone(),
        ));
        let navigator = Arc::new(TerminalNavigator::new(HOME_PATH));
        let guard = Arc::new(RouteGuard::new(navigator.clone(), store));
        let offset_minutes = cli
            .offset_minutes
            .unwrap_or_else(config::reservation_offset_minutes);

        Self {
            manager,
            navigator,
            guard,
            catalog: RestaurantCatalog::new(gateway.clone()),
            flow: ReservationFlow::new(gateway, clock).with_offset_minutes(offset_minutes),
        }
    }

    // Moves to `page` and applies its access policy.
    fn enter(&self, page: &str) -> Result<(), CliError> {
        self.navigator.navigate(page);
        match self.guard.enforce_path(page, &self.manager.snapshot()) {
            // init() has resolved the session before any command runs.
            GuardDecision::Render | GuardDecision::Pending => Ok(()),
            GuardDecision::Redirect(target) => {
                Err(redirect_error(page, target, &self.manager.snapshot()))
            }
            GuardDecision::AccessDenied => Err(CliError::AccessDenied {
                page: page.to_string(),
            }),
        }
    }

    async fn execute(&self, command: Command) -> Result<(), CliError> {
        match command {
            Command::Login {
                email,
                password,
                remember,
            } => {
                self.enter(LOGIN_PATH)?;
                let email = email
                    .or_else(|| self.manager.remembered_email())
                    .ok_or(CliError::MissingEmail)?;
                let user = self
                    .manager
                    .login(&Credentials { email, password }, remember)
                    .await?;
                let destination = self.guard.take_post_login_destination();
                self.navigator.navigate(&destination);
                println!(
                    "signed in as {}",
                    user.email.as_deref().unwrap_or(&user.name)
                );
            }
            Command::Logout => {
                self.manager.logout().await?;
                println!("signed out");
            }
            Command::Signup {
                email,
                password,
                role,
            } => {
                self.enter(SIGNUP_PATH)?;
                let result = self
                    .manager
                    .register(&Registration {
                        email,
                        password,
                        role,
                    })
                    .await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Command::Status { watch } => {
                print_status(&self.manager.snapshot());
                if watch {
                    self.watch_status().await;
                }
            }
            Command::Restaurants {
                name,
                category,
                address,
                available,
            } => {
                self.enter(RESTAURANTS_PAGE)?;
                let params = SearchParams {
                    name,
                    category,
                    address,
                };
                let mut restaurants = self.catalog.search(&params).await?;
                if available {
                    restaurants = available_only(&restaurants);
                }
                println!("categories: {}", unique_categories(&restaurants).join(", "));
                for restaurant in &restaurants {
                    println!("{}", describe(restaurant));
                }
            }
            Command::Restaurant { id, watch } => {
                let page = reservation_page(id);
                self.enter(&page)?;
                let restaurant = self.flow.load_restaurant(id).await?;
                println!("{}", describe(&restaurant));
                if let Some(description) = &restaurant.description {
                    println!("{description}");
                }
                if !self.flow.can_submit(id) {
                    println!("no tables left");
                }
                self.watch_reservation_time(&page, watch).await;
            }
            Command::AddRestaurant {
                name,
                address,
                max_table_count,
                category,
            } => {
                self.enter(NEW_RESTAURANT_PAGE)?;
                let created = self
                    .catalog
                    .add(&NewRestaurant {
                        name,
                        address,
                        max_table_count,
                        category,
                    })
                    .await?;
                println!("{}", serde_json::to_string_pretty(&created)?);
            }
            Command::Reserve { id } => {
                self.enter(&reservation_page(id))?;
                let restaurant = self.flow.load_restaurant(id).await?;
                let receipt = self.flow.submit(id).await?;
                println!(
                    "reservation #{} at {} for {}: {}",
                    receipt.reservation_id,
                    restaurant.name,
                    receipt.reservation_time,
                    receipt.status
                );
            }
        }
        Ok(())
    }

    async fn watch_status(&self) {
        let mut updates = self.manager.subscribe();
        updates.borrow_and_update();
        if !self.manager.snapshot().is_authenticated() {
            return;
        }

        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    print_status(&snapshot);
                    if !snapshot.is_authenticated() {
                        return;
                    }
                }
                _ = tokio::signal::ctrl_c() => return,
            }
        }
    }

    // Prints the "now + offset" preview; with `follow` it keeps ticking until
    // interrupted or until the guard moves the user off `page`.
    async fn watch_reservation_time(&self, page: &str, follow: bool) {
        let display = self.flow.display_clock();
        println!(
            "reservation time ({} min from now): {}",
            self.flow.offset_minutes(),
            display.current()
        );
        if !follow {
            return;
        }

        let follower = {
            let guard = self.guard.clone();
            let location = self.navigator.subscribe();
            let session = self.manager.subscribe();
            tokio::spawn(async move { guard.follow(location, session).await })
        };

        let mut preview = display.subscribe();
        let mut location = self.navigator.subscribe();
        loop {
            tokio::select! {
                changed = preview.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    println!("reservation time: {}", *preview.borrow_and_update());
                }
                changed = location.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = location.borrow_and_update().clone();
                    if current != page {
                        println!("session ended; continue at {current}");
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        follower.abort();
    }
}

// A login redirect caused by a lapsed token is reported as such.
fn redirect_error(page: &str, target: String, snapshot: &SessionSnapshot) -> CliError {
    if snapshot.expired && target == LOGIN_PATH {
        return CliError::Client(ClientError::Auth(AuthError::SessionExpired));
    }
    CliError::Redirected {
        page: page.to_string(),
        target,
    }
}

fn reservation_page(restaurant_id: i64) -> String {
    format!("/reservation/{restaurant_id}")
}

fn describe(restaurant: &Restaurant) -> String {
    let remaining = restaurant
        .remaining_table_count
        .map_or_else(|| "?".to_string(), |count| count.to_string());
    let mut line = format!(
        "#{} {} [{}] {} - {}/{} tables left",
        restaurant.id,
        restaurant.name,
        restaurant.category,
        restaurant.address,
        remaining,
        restaurant.max_table_count
    );
    if let Some(rating) = restaurant.rating {
        line.push_str(&format!(", rated {rating:.1}"));
    }
    if let Some(waitlist) = restaurant.waitlist_count.filter(|count| *count > 0) {
        line.push_str(&format!(", {waitlist} waiting"));
    }
    line
}

fn print_status(snapshot: &SessionSnapshot) {
    match (snapshot.status, &snapshot.user) {
        (SessionStatus::Authenticated | SessionStatus::Expiring, Some(user)) => {
            let who = user.email.as_deref().unwrap_or(&user.name);
            let role = user.role.as_deref().unwrap_or("no role");
            let remaining = snapshot
                .remaining_seconds
                .map(format_remaining)
                .unwrap_or_else(|| "no expiry".to_string());
            let marker = if snapshot.status == SessionStatus::Expiring {
                " (expiring soon)"
            } else {
                ""
            };
            println!("signed in as {who} [{role}], session {remaining}{marker}");
        }
        _ if snapshot.expired => println!("signed out: session expired"),
        _ => println!("signed out"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_expired_session_is_sent_to_login_then_error_says_session_expired() {
        let err = redirect_error(
            "/reservation/4",
            LOGIN_PATH.to_string(),
            &SessionSnapshot::expired(),
        );

        assert!(matches!(
            err,
            CliError::Client(ClientError::Auth(AuthError::SessionExpired))
        ));
        assert_eq!(err.to_string(), "session expired");
    }

    #[test]
    fn when_anonymous_session_is_sent_to_login_then_redirect_is_reported() {
        let err = redirect_error(
            "/reservation/4",
            LOGIN_PATH.to_string(),
            &SessionSnapshot::anonymous(),
        );

        assert!(matches!(
            err,
            CliError::Redirected { ref target, .. } if target == LOGIN_PATH
        ));
    }
}

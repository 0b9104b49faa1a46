use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::domain::{
    ApiGateway, ClientError, Clock, HttpMethod, ReservationError, ReservationReceipt, Restaurant,
};
use crate::interface_adapters::protocol::{CreateReservationRequest, json_body, reservation_path};
use crate::use_cases::restaurants::RestaurantCatalog;

pub const DEFAULT_OFFSET_MINUTES: i64 = 10;
pub const RESERVATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local wall-clock time `offset_minutes` from `now`, formatted the way the
/// backend parses it: zero-padded, space separated, no zone suffix.
pub fn build_reservation_time(now: NaiveDateTime, offset_minutes: i64) -> String {
    TimeDelta::try_minutes(offset_minutes)
        .and_then(|offset| now.checked_add_signed(offset))
        .unwrap_or(now)
        .format(RESERVATION_TIME_FORMAT)
        .to_string()
}

pub struct ReservationFlow {
    gateway: Arc<dyn ApiGateway>,
    catalog: RestaurantCatalog,
    clock: Arc<dyn Clock>,
    offset_minutes: i64,
    // Last remainingTableCount seen per restaurant.
    remaining: Mutex<HashMap<i64, i64>>,
    in_flight: Mutex<HashSet<i64>>,
}

impl ReservationFlow {
    pub fn new(gateway: Arc<dyn ApiGateway>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog: RestaurantCatalog::new(gateway.clone()),
            gateway,
            clock,
            offset_minutes: DEFAULT_OFFSET_MINUTES,
            remaining: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_offset_minutes(mut self, offset_minutes: i64) -> Self {
        self.offset_minutes = offset_minutes;
        self
    }

    pub fn offset_minutes(&self) -> i64 {
        self.offset_minutes
    }

    // Fetches the restaurant for the reservation view and records its
    // remaining table count for the submit guard.
    pub async fn load_restaurant(&self, restaurant_id: i64) -> Result<Restaurant, ClientError> {
        let restaurant = self.catalog.get(restaurant_id).await?;
        self.observe(&restaurant);
        Ok(restaurant)
    }

    pub fn observe(&self, restaurant: &Restaurant) {
        if let Ok(mut remaining) = self.remaining.lock() {
            match restaurant.remaining_table_count {
                Some(count) => remaining.insert(restaurant.id, count),
                None => remaining.remove(&restaurant.id),
            };
        }
    }

    pub fn can_submit(&self, restaurant_id: i64) -> bool {
        !self.last_known_full(restaurant_id) && !self.is_in_flight(restaurant_id)
    }

    /// Posts a reservation for `reservation_time`. No client-side seat
    /// accounting and no retry; the backend decides.
    pub async fn create_reservation(
        &self,
        restaurant_id: i64,
        reservation_time: &str,
    ) -> Result<ReservationReceipt, ClientError> {
        let path = reservation_path(restaurant_id);
        let body = json_body(&CreateReservationRequest { reservation_time });

        let response = self
            .gateway
            .send(HttpMethod::Post, &path, Some(body), None)
            .await
            .inspect_err(|err| error!(path = %path, error = %err, "creating reservation failed"))?;

        let receipt: ReservationReceipt = serde_json::from_value(response.into_body())
            .map_err(|err| ClientError::UnexpectedResponse(err.to_string()))?;
        info!(
            reservation_id = receipt.reservation_id,
            status = %receipt.status,
            "reservation created"
        );
        Ok(receipt)
    }

    // Submit control: reservation time is computed at press time.
    pub async fn submit(&self, restaurant_id: i64) -> Result<ReservationReceipt, ClientError> {
        if self.last_known_full(restaurant_id) {
            return Err(ReservationError::NoTablesLeft(restaurant_id).into());
        }
        let _in_flight = InFlight::claim(&self.in_flight, restaurant_id)
            .ok_or(ReservationError::SubmissionInFlight(restaurant_id))?;

        let reservation_time = build_reservation_time(self.clock.now_local(), self.offset_minutes);
        self.create_reservation(restaurant_id, &reservation_time)
            .await
    }

    pub fn display_clock(&self) -> DisplayClock {
        DisplayClock::start(self.clock.clone(), self.offset_minutes)
    }

    fn last_known_full(&self, restaurant_id: i64) -> bool {
        self.remaining
            .lock()
            .map(|remaining| remaining.get(&restaurant_id) == Some(&0))
            .unwrap_or(false)
    }

    fn is_in_flight(&self, restaurant_id: i64) -> bool {
        self.in_flight
            .lock()
            .map(|in_flight| in_flight.contains(&restaurant_id))
            .unwrap_or(false)
    }
}

// Marks a restaurant as having a submission in flight until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<i64>>,
    restaurant_id: i64,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a Mutex<HashSet<i64>>, restaurant_id: i64) -> Option<Self> {
        let mut guard = set.lock().ok()?;
        if !guard.insert(restaurant_id) {
            return None;
        }
        drop(guard);
        Some(Self { set, restaurant_id })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.set.lock() {
            guard.remove(&self.restaurant_id);
        }
    }
}

/// Once-a-second "now + offset" preview for the reservation view. The
/// ticking task is aborted when the handle is dropped.
pub struct DisplayClock {
    rx: watch::Receiver<String>,
    task: JoinHandle<()>,
}

impl DisplayClock {
    pub fn start(clock: Arc<dyn Clock>, offset_minutes: i64) -> Self {
        let (tx, rx) = watch::channel(build_reservation_time(clock.now_local(), offset_minutes));
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.tick().await;
            loop {
                interval.tick().await;
                let preview = build_reservation_time(clock.now_local(), offset_minutes);
                if tx.send(preview).is_err() {
                    break;
                }
            }
        });
        Self { rx, task }
    }

    pub fn current(&self) -> String {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.rx.clone()
    }
}

impl Drop for DisplayClock {
    fn drop(&mut self) {
        self.task.abort();
    }
}

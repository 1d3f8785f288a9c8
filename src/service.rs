// Booking service: runs the collector → calculator → validator → builder pipeline
// and hands the result to the rental API.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, BookingConfirmation, RentalApi};
use crate::policy::{BookingPolicy, PolicyError};
use crate::pricing::{PriceCalculator, PricedBooking};
use crate::rate_cache::{CacheConfig, RateSheetCache};
use crate::rate_sheet::RateSheet;
use crate::request::BookingRequest;
use crate::selection::BookingSelection;
use crate::validation::{BookingError, BookingValidator};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct BookingService<A: RentalApi> {
    api: Arc<A>,
    cache: RateSheetCache,
    validator: BookingValidator,
    policy: BookingPolicy,
    // Number of booking requests currently in flight
    in_flight: AtomicUsize,
}

impl<A: RentalApi> BookingService<A> {
    pub fn new(api: Arc<A>, policy: BookingPolicy) -> Result<Self, PolicyError> {
        Self::with_cache(api, policy, CacheConfig::default())
    }

    pub fn with_cache(
        api: Arc<A>,
        policy: BookingPolicy,
        cache_config: CacheConfig,
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            api,
            cache: RateSheetCache::new(cache_config),
            validator: BookingValidator::new(&policy)?,
            policy,
            in_flight: AtomicUsize::new(0),
        })
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &RateSheetCache {
        &self.cache
    }

    // True while a booking request is in flight; callers disable their submit control on it
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn rate_sheet(&self, car_id: &str) -> Result<RateSheet, ApiError> {
        if let Some(rates) = self.cache.get(car_id) {
            return Ok(rates);
        }

        let rates = self.api.fetch_rate_sheet(car_id).await?;
        self.cache.store(car_id, rates.clone(), None);
        Ok(rates)
    }

    pub async fn quote(
        &self,
        car_id: &str,
        selection: &BookingSelection,
    ) -> Result<PricedBooking, ApiError> {
        let rates = self.rate_sheet(car_id).await?;
        Ok(PriceCalculator::price(selection, &rates))
    }

    // Pure part of the pipeline, for callers that already hold the rate sheet
    pub fn prepare_with(
        &self,
        car_id: Option<&str>,
        selection: &BookingSelection,
        rates: &RateSheet,
        now: DateTime<Utc>,
    ) -> Result<BookingRequest, BookingError> {
        let priced = PriceCalculator::price(selection, rates);
        let validated = self.validator.validate(car_id, selection, &priced, now)?;
        Ok(BookingRequest::build(validated))
    }

    pub async fn prepare(
        &self,
        car_id: Option<&str>,
        selection: &BookingSelection,
        now: DateTime<Utc>,
    ) -> Result<BookingRequest, BookingError> {
        // Input problems are reported before any rate lookup
        self.validator.check_schedule(car_id, selection, now)?;
        let car_id = car_id.map(str::trim).unwrap_or_default();

        // Users only ever see the validator's messages; lookup failures surface as pricing failures
        let rates = match self.rate_sheet(car_id).await {
            Ok(rates) => rates,
            Err(error) => {
                warn!(car_id, %error, "Rate lookup failed");
                return Err(BookingError::PricingFailure);
            }
        };
        self.prepare_with(Some(car_id), selection, &rates, now)
    }

    // Sends the request once. No retries and no de-duplication: a second call
    // while one is pending goes through as well, so callers watch is_submitting.
    pub async fn submit(&self, request: &BookingRequest) -> Result<BookingConfirmation, ApiError> {
        let _submitting = SubmittingGuard::enter(&self.in_flight);

        match self.api.create_booking(request).await {
            Ok(confirmation) => {
                info!(
                    booking_id = %confirmation.booking_id,
                    total_cost = request.total_cost,
                    "Booking submitted"
                );
                Ok(confirmation)
            }
            Err(error) => {
                warn!(car_id = %request.car_id, %error, "Booking submission failed");
                Err(error)
            }
        }
    }

    pub async fn book(
        &self,
        car_id: Option<&str>,
        selection: &BookingSelection,
        now: DateTime<Utc>,
    ) -> Result<BookingConfirmation, ServiceError> {
        let request = self.prepare(car_id, selection, now).await?;
        Ok(self.submit(&request).await?)
    }
}

// Counts one submission in flight until dropped, on every exit path including a dropped future
struct SubmittingGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl<'a> SubmittingGuard<'a> {
    fn enter(in_flight: &'a AtomicUsize) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self { in_flight }
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_api::MockRentalApi;
    use crate::selection::{AddOn, Hour};
    use chrono::{NaiveDate, TimeZone};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 14, 9, 0, 0).unwrap()
    }

    fn selection(start: u32, end: u32) -> BookingSelection {
        BookingSelection::new(
            NaiveDate::from_ymd_opt(2030, 3, 20),
            Hour::new(start).unwrap(),
            Hour::new(end).unwrap(),
        )
    }

    async fn service() -> (Arc<MockRentalApi>, BookingService<MockRentalApi>) {
        let api = Arc::new(MockRentalApi::new());
        api.add_car("car-1", RateSheet::new(20.0)).await;
        api.add_car("car-broken", RateSheet::new(0.0)).await;
        let service = BookingService::new(Arc::clone(&api), BookingPolicy::default()).unwrap();
        (api, service)
    }

    #[tokio::test]
    async fn test_quote_uses_cached_rate_sheet() {
        let (api, service) = service().await;

        let first = assert_ok!(service.quote("car-1", &selection(8, 10)).await);
        let second = assert_ok!(
            service
                .quote("car-1", &selection(8, 12).with_add_on(AddOn::Insurance))
                .await
        );

        assert_eq!(first.total_cost, 40.0);
        assert_eq!(second.total_cost, 140.0);
        assert_eq!(api.rate_lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unpriceable_car_is_refetched() {
        let (api, service) = service().await;

        let quote = assert_ok!(service.quote("car-broken", &selection(8, 10)).await);
        assert_eq!(quote.total_cost, 0.0);
        let _ = service.quote("car-broken", &selection(8, 10)).await;
        assert_eq!(api.rate_lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_book_end_to_end() {
        let (api, service) = service().await;

        let chosen = selection(10, 13).with_add_on(AddOn::ChildSeat);
        let confirmation = assert_ok!(service.book(Some("car-1"), &chosen, now()).await);
        assert_eq!(confirmation.booking_id, "booking-1");

        let bookings = api.bookings.lock().await;
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].total_cost, 90.0);
        assert_eq!(
            bookings[0].start_time,
            Utc.with_ymd_and_hms(2030, 3, 20, 10, 0, 0).unwrap()
        );
        assert!(bookings[0].add_ons.child_seat);
        assert!(!service.is_submitting());
    }

    #[tokio::test]
    async fn test_validation_failures_never_reach_the_api() {
        let (api, service) = service().await;

        let result = service.book(None, &selection(8, 10), now()).await;
        assert!(matches!(
            result,
            Err(ServiceError::Booking(BookingError::MissingInformation))
        ));

        let result = service.book(Some("car-1"), &selection(12, 10), now()).await;
        assert!(matches!(
            result,
            Err(ServiceError::Booking(BookingError::EndNotAfterStart))
        ));

        let result = service.book(Some("car-broken"), &selection(8, 10), now()).await;
        assert!(matches!(
            result,
            Err(ServiceError::Booking(BookingError::PricingFailure))
        ));

        assert!(api.bookings.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_car_is_a_pricing_failure() {
        let (_, service) = service().await;
        let result = service.prepare(Some("car-404"), &selection(8, 10), now()).await;
        assert_eq!(result, Err(BookingError::PricingFailure));
    }

    #[tokio::test]
    async fn test_malformed_vehicle_rate_through_strict_decode() {
        let (api, service) = service().await;
        api.add_vehicle_json("car-junk", r#"{"pricePerHour": "abc"}"#).await;

        // Range rule still reports first, and the rate is never looked up for it
        let result = service.prepare(Some("car-junk"), &selection(12, 10), now()).await;
        assert_eq!(result, Err(BookingError::EndNotAfterStart));
        assert_eq!(api.rate_lookups.load(Ordering::SeqCst), 0);

        let result = service.book(Some("car-junk"), &selection(8, 10), now()).await;
        match result {
            Err(ServiceError::Booking(error)) => {
                assert_eq!(error, BookingError::PricingFailure);
                assert_eq!(
                    error.to_string(),
                    "Cannot calculate booking cost, please try again or contact support"
                );
            }
            other => panic!("Expected a pricing failure, got {:?}", other),
        }
        assert!(api.bookings.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_strictly_decoded_vehicle_books() {
        let (api, service) = service().await;
        api.add_vehicle_json("car-7", r#"{"_id": "car-7", "pricePerHour": "25.50 USD"}"#)
            .await;

        let confirmation = assert_ok!(service.book(Some("car-7"), &selection(8, 10), now()).await);
        assert_eq!(confirmation.booking_id, "booking-1");
        assert_eq!(api.bookings.lock().await[0].total_cost, 51.0);
    }

    #[tokio::test]
    async fn test_failed_submission_is_not_retried() {
        let (api, service) = service().await;
        api.fail_next_bookings(1);

        let request = assert_ok!(service.prepare(Some("car-1"), &selection(8, 9), now()).await);
        assert!(service.submit(&request).await.is_err());
        assert!(api.bookings.lock().await.is_empty());
        assert!(!service.is_submitting(), "Flag must drop after a failure");

        assert_ok!(service.submit(&request).await);
        assert_eq!(api.bookings.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_submitting_flag_while_in_flight() {
        let (api, service) = service().await;
        api.set_delay(100);
        let service = Arc::new(service);

        let request = assert_ok!(service.prepare(Some("car-1"), &selection(8, 9), now()).await);
        let pending = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.submit(&request).await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(service.is_submitting());

        assert_ok!(pending.await.unwrap());
        assert!(!service.is_submitting());
    }

    #[tokio::test]
    async fn test_overlapping_submissions_keep_flag_raised() {
        let (api, service) = service().await;
        let service = Arc::new(service);
        let request = assert_ok!(service.prepare(Some("car-1"), &selection(8, 9), now()).await);

        api.set_delay(50);
        let first = {
            let service = Arc::clone(&service);
            let request = request.clone();
            tokio::spawn(async move { service.submit(&request).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // The delay is read when each call starts
        api.set_delay(200);
        let second = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.submit(&request).await })
        };

        assert_ok!(first.await.unwrap());
        assert!(!second.is_finished());
        assert!(service.is_submitting(), "Second request is still in flight");

        assert_ok!(second.await.unwrap());
        assert!(!service.is_submitting());
    }

    #[tokio::test]
    async fn test_cancelled_submission_lowers_flag() {
        let (api, service) = service().await;
        api.set_delay(200);

        let request = assert_ok!(service.prepare(Some("car-1"), &selection(8, 9), now()).await);
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), service.submit(&request)).await;

        assert!(timed_out.is_err());
        assert!(!service.is_submitting());
    }
}

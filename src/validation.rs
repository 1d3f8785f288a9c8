// Booking validator: decides whether a priced selection may be submitted
// Rules run in a fixed order and the first failure wins.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use thiserror::Error;
use tracing::warn;

use crate::policy::{BookingPolicy, PolicyError};
use crate::pricing::PricedBooking;
use crate::request::hour_on_date;
use crate::selection::{AddOns, BookingSelection, Hour};

// User-facing validation failures, one per rule
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Missing required booking information")]
    MissingInformation,

    #[error("End time must be after start time")]
    EndNotAfterStart,

    #[error("Booking must be scheduled in the future")]
    NotInFuture,

    #[error("Cannot calculate booking cost, please try again or contact support")]
    PricingFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // The user still has to fill something in
    InputIncomplete,
    // The user picked something inconsistent and has to change it
    InputInvalid,
    // Rate data upstream is broken; nothing the user can fix
    PricingFailure,
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::MissingInformation => ErrorKind::InputIncomplete,
            BookingError::EndNotAfterStart | BookingError::NotInFuture => ErrorKind::InputInvalid,
            BookingError::PricingFailure => ErrorKind::PricingFailure,
        }
    }

    pub fn is_user_input(&self) -> bool {
        self.kind() != ErrorKind::PricingFailure
    }
}

// A selection that passed every rule. Only BookingValidator can create one,
// so the request builder never sees an unchecked selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    car_id: String,
    date: NaiveDate,
    start_hour: Hour,
    end_hour: Hour,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    add_ons: AddOns,
    total_cost: f64,
}

impl ValidatedBooking {
    pub fn car_id(&self) -> &str {
        &self.car_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start_hour(&self) -> Hour {
        self.start_hour
    }

    pub fn end_hour(&self) -> Hour {
        self.end_hour
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    pub fn add_ons(&self) -> AddOns {
        self.add_ons
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }
}

// Output of the rules that need no price
struct Schedule<'a> {
    car_id: &'a str,
    date: NaiveDate,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BookingValidator {
    offset: FixedOffset,
}

impl BookingValidator {
    pub fn new(policy: &BookingPolicy) -> Result<Self, PolicyError> {
        Ok(Self {
            offset: policy.offset()?,
        })
    }

    pub fn validate(
        &self,
        car_id: Option<&str>,
        selection: &BookingSelection,
        priced: &PricedBooking,
        now: DateTime<Utc>,
    ) -> Result<ValidatedBooking, BookingError> {
        let schedule = self
            .schedule(car_id, selection, now)
            .map_err(|error| rejected(car_id, error))?;

        if !priced.is_computable() {
            return Err(rejected(car_id, BookingError::PricingFailure));
        }

        Ok(ValidatedBooking {
            car_id: schedule.car_id.to_string(),
            date: schedule.date,
            start_hour: selection.start_hour,
            end_hour: selection.end_hour,
            starts_at: schedule.starts_at,
            ends_at: schedule.ends_at,
            add_ons: selection.add_ons,
            total_cost: priced.total_cost,
        })
    }

    // Rules 1-3 only, for callers that want to reject input before looking up a price
    pub fn check_schedule(
        &self,
        car_id: Option<&str>,
        selection: &BookingSelection,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        self.schedule(car_id, selection, now)
            .map(|_| ())
            .map_err(|error| rejected(car_id, error))
    }

    fn schedule<'a>(
        &self,
        car_id: Option<&'a str>,
        selection: &BookingSelection,
        now: DateTime<Utc>,
    ) -> Result<Schedule<'a>, BookingError> {
        let car_id = car_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(BookingError::MissingInformation)?;
        let date = selection.date.ok_or(BookingError::MissingInformation)?;

        if !selection.has_valid_range() {
            return Err(BookingError::EndNotAfterStart);
        }

        // A date that can't be placed on the UTC timeline is as good as no date
        let starts_at = hour_on_date(date, selection.start_hour, self.offset)
            .ok_or(BookingError::MissingInformation)?;
        let ends_at = hour_on_date(date, selection.end_hour, self.offset)
            .ok_or(BookingError::MissingInformation)?;

        if starts_at <= now {
            return Err(BookingError::NotInFuture);
        }

        Ok(Schedule {
            car_id,
            date,
            starts_at,
            ends_at,
        })
    }
}

fn rejected(car_id: Option<&str>, error: BookingError) -> BookingError {
    warn!(car_id = ?car_id, kind = ?error.kind(), "Booking rejected: {}", error);
    error
}

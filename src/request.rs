// Booking request builder: the payload handed to the booking-creation API

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::selection::{AddOns, Hour};
use crate::validation::ValidatedBooking;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub car_id: String,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub add_ons: AddOns,
    pub total_cost: f64,
}

impl BookingRequest {
    // Only reachable with a ValidatedBooking, so an unchecked selection can't get here
    pub fn build(booking: ValidatedBooking) -> Self {
        Self {
            start_time: booking.starts_at(),
            end_time: booking.ends_at(),
            car_id: booking.car_id().to_string(),
            date: booking.date(),
            add_ons: booking.add_ons(),
            total_cost: booking.total_cost(),
        }
    }

    // Start and end as wall-clock times at the given offset
    pub fn local_window(&self, offset: FixedOffset) -> (NaiveDateTime, NaiveDateTime) {
        (
            self.start_time.with_timezone(&offset).naive_local(),
            self.end_time.with_timezone(&offset).naive_local(),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// UTC instant of `hour` o'clock on `date` for a wall clock at `offset`, minutes zeroed.
// None when the date sits too close to the edge of the calendar to be placed.
pub fn hour_on_date(date: NaiveDate, hour: Hour, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let utc = date
        .and_time(NaiveTime::MIN)
        .checked_add_signed(Duration::hours(i64::from(hour.value())))?
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))?;
    Some(Utc.from_utc_datetime(&utc))
}

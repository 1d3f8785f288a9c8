// Price calculator: turns a booking selection and a vehicle rate sheet into a cost
// Pure function over its inputs; a total of exactly zero means "not computable".

use serde::Serialize;
use tracing::debug;

use crate::rate_sheet::RateSheet;
use crate::selection::BookingSelection;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedBooking {
    pub duration_hours: u32,
    pub base_cost: f64,
    pub add_on_cost: f64,
    pub total_cost: f64,
}

impl PricedBooking {
    // Sentinel for selections that cannot be priced yet
    pub fn not_computable() -> Self {
        Self {
            duration_hours: 0,
            base_cost: 0.0,
            add_on_cost: 0.0,
            total_cost: 0.0,
        }
    }

    pub fn is_computable(&self) -> bool {
        self.total_cost.is_finite() && self.total_cost > 0.0
    }
}

pub struct PriceCalculator;

impl PriceCalculator {
    pub fn price(selection: &BookingSelection, rates: &RateSheet) -> PricedBooking {
        let hourly_rate = rates.hourly_rate;
        if !hourly_rate.is_finite() || hourly_rate <= 0.0 {
            debug!(hourly_rate, "Rate sheet is not priceable");
            return PricedBooking::not_computable();
        }

        if selection.date.is_none() || !selection.has_valid_range() {
            debug!(
                date = ?selection.date,
                start = selection.start_hour.value(),
                end = selection.end_hour.value(),
                "Selection is incomplete or has an empty range"
            );
            return PricedBooking::not_computable();
        }

        let duration_hours = Self::duration_hours(selection);
        let hours = f64::from(duration_hours);

        let base_cost = hourly_rate * hours;
        if !base_cost.is_finite() || base_cost < 0.0 {
            debug!(base_cost, "Base cost is not a usable number");
            return PricedBooking::not_computable();
        }

        let add_on_cost: f64 = selection
            .add_ons
            .active()
            .map(|add_on| rates.add_on_rates.rate(add_on) * hours)
            .sum();

        let total_cost = round_half_up(base_cost + add_on_cost);
        debug!(
            hourly_rate,
            duration_hours, base_cost, add_on_cost, total_cost, "Priced booking selection"
        );

        if !total_cost.is_finite() || total_cost < 0.0 {
            return PricedBooking::not_computable();
        }

        PricedBooking {
            duration_hours,
            base_cost,
            add_on_cost,
            total_cost,
        }
    }

    // Whole hours between start and end, never less than one
    pub fn duration_hours(selection: &BookingSelection) -> u32 {
        u32::try_from(selection.hour_span().max(1)).unwrap_or(1)
    }
}

// Two decimals, halves up. The epsilon nudge makes 40.005 (stored as 40.00499…) round up
pub fn round_half_up(amount: f64) -> f64 {
    let scaled = amount * 100.0 * (1.0 + f64::EPSILON);
    scaled.round() / 100.0
}

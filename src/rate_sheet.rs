// Rate sheet: per-vehicle pricing data read from the vehicle lookup API
// Vehicle documents arrive with loosely typed rate fields, so coercion lives here
// and the pricing code only ever sees an f64.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::selection::AddOn;

#[derive(Error, Debug)]
pub enum RateSheetError {
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid hourly rate: {0}")]
    InvalidRate(String),
}

// Field names the vehicle API has used for the hourly price, in lookup order
pub const RATE_FIELDS: [&str; 5] = [
    "hourlyRate",
    "pricePerHour",
    "price_per_hour",
    "hourly_rate",
    "price",
];

// Hourly surcharge per add-on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddOnRates {
    pub insurance: f64,
    pub gps: f64,
    pub child_seat: f64,
}

impl Default for AddOnRates {
    fn default() -> Self {
        Self {
            insurance: 15.0,
            gps: 5.0,
            child_seat: 10.0,
        }
    }
}

impl AddOnRates {
    pub fn rate(&self, add_on: AddOn) -> f64 {
        match add_on {
            AddOn::Insurance => self.insurance,
            AddOn::Gps => self.gps,
            AddOn::ChildSeat => self.child_seat,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateSheet {
    pub hourly_rate: f64,
    pub add_on_rates: AddOnRates,
}

impl RateSheet {
    pub fn new(hourly_rate: f64) -> Self {
        Self {
            hourly_rate,
            add_on_rates: AddOnRates::default(),
        }
    }

    pub fn with_add_on_rates(mut self, add_on_rates: AddOnRates) -> Self {
        self.add_on_rates = add_on_rates;
        self
    }

    // Lenient: a missing or unreadable rate becomes 0.0, which prices as not computable
    pub fn from_vehicle(vehicle: &Value) -> Self {
        let raw = RATE_FIELDS.iter().find_map(|field| vehicle.get(*field));
        let hourly_rate = match raw {
            Some(raw) => coerce_rate(raw),
            None => {
                warn!("Vehicle document has no hourly rate field");
                0.0
            }
        };
        Self::new(hourly_rate)
    }

    // Strict: the whole document is rejected unless the rate is finite and positive
    pub fn parse_vehicle(json: &str) -> Result<Self, RateSheetError> {
        let record: VehicleRecord = serde_json::from_str(json)?;
        Ok(record.into())
    }

    pub fn is_priceable(&self) -> bool {
        self.hourly_rate.is_finite() && self.hourly_rate > 0.0
    }
}

// Typed view of the vehicle lookup response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    #[serde(
        alias = "pricePerHour",
        alias = "price_per_hour",
        alias = "hourly_rate",
        alias = "price",
        deserialize_with = "deserialize_positive_rate"
    )]
    pub hourly_rate: f64,
    #[serde(default)]
    pub add_on_rates: Option<AddOnRates>,
}

impl From<VehicleRecord> for RateSheet {
    fn from(record: VehicleRecord) -> Self {
        Self {
            hourly_rate: record.hourly_rate,
            add_on_rates: record.add_on_rates.unwrap_or_default(),
        }
    }
}

fn deserialize_positive_rate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let rate = coerce_rate(&raw);
    if rate > 0.0 {
        Ok(rate)
    } else {
        Err(serde::de::Error::custom(RateSheetError::InvalidRate(
            raw.to_string(),
        )))
    }
}

// Strings keep only digits, '.' and '-'; non-strings are stringified first.
// Anything that isn't a finite positive number comes back as 0.0
pub fn coerce_rate(raw: &Value) -> f64 {
    let parsed = match raw {
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => parse_numeric(text),
        Value::Null | Value::Bool(_) => f64::NAN,
        other => parse_numeric(&other.to_string()),
    };

    if parsed.is_finite() && parsed > 0.0 {
        parsed
    } else {
        warn!(raw = %raw, "Hourly rate did not coerce to a positive number");
        0.0
    }
}

// Strips everything but digits, '.', '-' and parses the longest numeric prefix
fn parse_numeric(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    (1..=cleaned.len())
        .rev()
        .find_map(|end| cleaned[..end].parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

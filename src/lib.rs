// Booking core for the car rental app: pricing, validation and request building

pub mod api;
pub mod notifications;
pub mod policy;
pub mod pricing;
pub mod rate_cache;
pub mod rate_sheet;
pub mod request;
pub mod selection;
pub mod service;
pub mod validation;

// Re-export key types for convenience
pub use api::{ApiError, BookingConfirmation, ClientConfig, ClientError, HttpRentalApi, RentalApi};
pub use notifications::{ConnectionPool, Connector, PooledConnection};
pub use policy::{BookingPolicy, PolicyError};
pub use pricing::{round_half_up, PriceCalculator, PricedBooking};
pub use rate_cache::{CacheConfig, CacheStatsReport, RateSheetCache};
pub use rate_sheet::{coerce_rate, AddOnRates, RateSheet, RateSheetError};
pub use request::BookingRequest;
pub use selection::{AddOn, AddOns, BookingSelection, Hour, SelectionError};
pub use service::{BookingService, ServiceError};
pub use validation::{BookingError, BookingValidator, ErrorKind, ValidatedBooking};

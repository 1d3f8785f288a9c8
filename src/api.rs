// Rental API client: the HTTP collaborator behind vehicle lookups and booking creation
// Requests are sent once; retry policy is left to whoever drives the client.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::rate_sheet::{RateSheet, RateSheetError};
use crate::request::BookingRequest;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Invalid rate sheet for car {car_id}: {source}")]
    InvalidRateSheet {
        car_id: String,
        #[source]
        source: RateSheetError,
    },
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

pub const BASE_URL_VAR: &str = "RENTAL_API_BASE_URL";
pub const API_KEY_VAR: &str = "RENTAL_API_KEY";
pub const TIMEOUT_VAR: &str = "RENTAL_API_TIMEOUT_MS";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl ClientConfig {
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Environment access is injected so configuration parsing stays testable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(BASE_URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ClientError::ConfigError(format!("{} is not set", BASE_URL_VAR)))?;

        let timeout_ms = match lookup(TIMEOUT_VAR) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ClientError::ConfigError(format!("{} must be a number, got {:?}", TIMEOUT_VAR, raw))
            })?,
            None => Self::DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: lookup(API_KEY_VAR).filter(|key| !key.is_empty()),
            timeout_ms,
        })
    }
}

// What the booking API answers once a reservation is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    #[serde(alias = "_id")]
    pub booking_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[async_trait]
pub trait RentalApi: Send + Sync + 'static {
    // Look up a vehicle and extract its pricing data
    async fn fetch_rate_sheet(&self, car_id: &str) -> Result<RateSheet, ApiError>;

    // Create a reservation from a validated, priced request
    async fn create_booking(&self, request: &BookingRequest)
        -> Result<BookingConfirmation, ApiError>;
}

// Strict decode of a vehicle document, shared by every client that reads raw bodies
pub fn decode_rate_sheet(car_id: &str, body: &str) -> Result<RateSheet, ApiError> {
    RateSheet::parse_vehicle(body).map_err(|source| ApiError::InvalidRateSheet {
        car_id: car_id.to_string(),
        source,
    })
}

pub struct HttpRentalApi {
    config: ClientConfig,
    base_url: Url,
    http: reqwest::Client,
}

impl HttpRentalApi {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.base_url.is_empty() {
            return Err(ClientError::ConfigError("base_url is empty".to_string()));
        }
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::ConfigError(format!("base_url {:?}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::ConfigError(format!(
                "base_url {:?} cannot hold a path",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            config,
            base_url,
            http,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // Segments are percent-encoded, so ids with '/', '?' or '#' stay inside one segment
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(ApiError::ApiResponseError {
                status_code: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.config.timeout_ms)
        } else {
            ApiError::NetworkError(error.to_string())
        }
    }
}

#[async_trait]
impl RentalApi for HttpRentalApi {
    async fn fetch_rate_sheet(&self, car_id: &str) -> Result<RateSheet, ApiError> {
        let url = self.url(&["cars", car_id]);
        debug!(%url, "Fetching vehicle");

        let body = self.send(self.http.get(url)).await?;
        decode_rate_sheet(car_id, &body)
    }

    async fn create_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingConfirmation, ApiError> {
        let url = self.url(&["bookings"]);
        let body = self.send(self.http.post(url).json(request)).await?;

        let confirmation: BookingConfirmation =
            serde_json::from_str(&body).map_err(|e| ApiError::DecodeError(e.to_string()))?;
        info!(
            booking_id = %confirmation.booking_id,
            car_id = %request.car_id,
            "Booking created"
        );
        Ok(confirmation)
    }
}

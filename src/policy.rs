// Booking policy: business settings shared by the pipeline stages

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid UTC offset: {0} seconds")]
    InvalidOffset(i32),
}

// Configuration for the booking pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookingPolicy {
    // Offset of the rental location's wall clock; selected hours are read in it
    pub utc_offset_seconds: i32,
}

impl BookingPolicy {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let policy: BookingPolicy = serde_json::from_str(json)?;
        policy.offset()?;
        Ok(policy)
    }

    pub fn with_utc_offset(mut self, seconds: i32) -> Result<Self, PolicyError> {
        self.utc_offset_seconds = seconds;
        self.offset()?;
        Ok(self)
    }

    pub fn offset(&self) -> Result<FixedOffset, PolicyError> {
        FixedOffset::east_opt(self.utc_offset_seconds)
            .ok_or(PolicyError::InvalidOffset(self.utc_offset_seconds))
    }
}

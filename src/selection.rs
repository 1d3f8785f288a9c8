// Booking selection: the user's in-progress choice of date, hours and add-ons
// Everything here is transient UI state; nothing is validated beyond the hour grid

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Hour {0} is outside the booking grid (8..=22)")]
    HourOutOfGrid(u32),
}

// 24-hour clock, 8 to 22 inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Hour(u32);

impl Hour {
    pub const FIRST: u32 = 8;
    pub const LAST: u32 = 22;

    pub fn new(hour: u32) -> Result<Self, SelectionError> {
        if (Self::FIRST..=Self::LAST).contains(&hour) {
            Ok(Self(hour))
        } else {
            Err(SelectionError::HourOutOfGrid(hour))
        }
    }

    pub fn value(self) -> u32 {
        self.0
    }

    // Every selectable hour, ascending
    pub fn grid() -> impl Iterator<Item = Hour> {
        (Self::FIRST..=Self::LAST).map(Hour)
    }

    // Hours that can close a booking opened at `start`
    pub fn end_options(start: Hour) -> impl Iterator<Item = Hour> {
        Self::grid().filter(move |hour| *hour > start)
    }
}

impl TryFrom<u32> for Hour {
    type Error = SelectionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Hour::new(value)
    }
}

impl From<Hour> for u32 {
    fn from(hour: Hour) -> Self {
        hour.0
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

// Optional hourly-rated services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddOn {
    Insurance,
    Gps,
    ChildSeat,
}

impl AddOn {
    pub const ALL: [AddOn; 3] = [AddOn::Insurance, AddOn::Gps, AddOn::ChildSeat];

    pub fn name(self) -> &'static str {
        match self {
            AddOn::Insurance => "insurance",
            AddOn::Gps => "gps",
            AddOn::ChildSeat => "childSeat",
        }
    }
}

// Full snapshot: inactive flags are serialized too
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOns {
    pub insurance: bool,
    pub gps: bool,
    pub child_seat: bool,
}

impl AddOns {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_active(&self, add_on: AddOn) -> bool {
        match add_on {
            AddOn::Insurance => self.insurance,
            AddOn::Gps => self.gps,
            AddOn::ChildSeat => self.child_seat,
        }
    }

    pub fn set(&mut self, add_on: AddOn, active: bool) {
        match add_on {
            AddOn::Insurance => self.insurance = active,
            AddOn::Gps => self.gps = active,
            AddOn::ChildSeat => self.child_seat = active,
        }
    }

    pub fn toggle(&mut self, add_on: AddOn) {
        let active = self.is_active(add_on);
        self.set(add_on, !active);
    }

    pub fn active(&self) -> impl Iterator<Item = AddOn> + '_ {
        AddOn::ALL.into_iter().filter(|add_on| self.is_active(*add_on))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingSelection {
    pub date: Option<NaiveDate>,
    pub start_hour: Hour,
    pub end_hour: Hour,
    pub add_ons: AddOns,
}

impl BookingSelection {
    pub fn new(date: Option<NaiveDate>, start_hour: Hour, end_hour: Hour) -> Self {
        Self {
            date,
            start_hour,
            end_hour,
            add_ons: AddOns::none(),
        }
    }

    pub fn with_add_on(mut self, add_on: AddOn) -> Self {
        self.add_ons.set(add_on, true);
        self
    }

    // Raw hour difference; may be zero or negative while the user is still picking
    pub fn hour_span(&self) -> i64 {
        i64::from(self.end_hour.value()) - i64::from(self.start_hour.value())
    }

    pub fn has_valid_range(&self) -> bool {
        self.start_hour < self.end_hour
    }
}

use std::fmt::Display;

use serde::Serialize;

use crate::normalize::{country_key, normalize};

pub const NO_AVAILABILITY: &str = "No availability";
pub const WAITLIST_OPEN: &str = "Waitlist Open";

/// Availability texts that never describe a bookable slot.
pub const SENTINELS: [&str; 2] = [NO_AVAILABILITY, WAITLIST_OPEN];

/// One table row of the availability page that carries a country label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityRow {
    pub country_label: String,
    pub country_key: String,
    pub earliest_availability: String,
}

impl AvailabilityRow {
    pub fn new(country_label: impl Into<String>, earliest_availability: impl Into<String>) -> Self {
        let country_label = country_label.into();
        Self {
            country_key: country_key(&country_label),
            country_label,
            earliest_availability: earliest_availability.into(),
        }
    }

    pub fn has_open_slot(&self) -> bool {
        !self.earliest_availability.is_empty()
            && !SENTINELS.contains(&self.earliest_availability.as_str())
    }
}

impl Display for AvailabilityRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let earliest = if self.earliest_availability.is_empty() {
            "-"
        } else {
            self.earliest_availability.as_str()
        };
        write!(f, "{:<24} {}", normalize(&self.country_label), earliest)
    }
}

/// An alert about an open slot. Only built for rows with a real date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    pub country: String,
    pub city: String,
    pub earliest_availability: String,
    pub source_url: String,
}

impl NotificationEvent {
    pub fn from_row(row: &AvailabilityRow, city: &str, source_url: &str) -> Option<Self> {
        if !row.has_open_slot() {
            return None;
        }
        Some(Self {
            country: normalize(&row.country_label),
            city: city.to_string(),
            earliest_availability: row.earliest_availability.clone(),
            source_url: source_url.to_string(),
        })
    }
}

//! Data models for the apartment climate client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FetchError, SampleClock};

// ---

/// Opaque identifier of a sensor installation, taken from a scanned QR code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApartmentId(String);

impl ApartmentId {
    // ---
    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical reading shown to the user. Temperature is in Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    // ---
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
}

/// One sample from the `ListSensorValues` history endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListSensorValue {
    // ---
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Hum")]
    pub hum: f64,
    #[serde(rename = "Temp")]
    pub temp: f64,
}

/// Current reading embedded in the `InstalledCheck` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorInfo {
    // ---
    pub date: String,
    pub humidity: f64,
    pub temp: f64,
    #[serde(default)]
    pub rssi: Option<i32>,
}

/// Installation status for one apartment.
///
/// Only `sensor_info` feeds reading selection; the rest is carried for logging.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstalledCheck {
    // ---
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub sensor_id: Option<String>,
    #[serde(default)]
    pub temp_low: Option<f64>,
    #[serde(default)]
    pub temp_high: Option<f64>,
    #[serde(default)]
    pub sensor_info: Option<SensorInfo>,
}

/// Normalization into [`SensorReading`]
impl ListSensorValue {
    // ---
    pub fn to_reading(&self, clock: &SampleClock) -> Result<SensorReading, FetchError> {
        Ok(SensorReading {
            timestamp: clock.normalize(&self.date)?,
            temperature: self.temp,
            humidity: self.hum,
        })
    }
}

impl SensorInfo {
    // ---
    pub fn to_reading(&self, clock: &SampleClock) -> Result<SensorReading, FetchError> {
        Ok(SensorReading {
            timestamp: clock.normalize(&self.date)?,
            temperature: self.temp,
            humidity: self.humidity,
        })
    }
}

/// The single durable record. An empty `guid` means no apartment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    // ---
    pub apartment: StoredApartment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredApartment {
    pub guid: String,
}

impl PersistedState {
    // ---
    pub fn with_apartment(apartment: &ApartmentId) -> Self {
        Self {
            apartment: StoredApartment {
                guid: apartment.as_str().to_string(),
            },
        }
    }

    pub fn apartment_id(&self) -> Option<ApartmentId> {
        // ---
        let guid = self.apartment.guid.trim();
        if guid.is_empty() {
            None
        } else {
            Some(ApartmentId::new(guid))
        }
    }
}

/// Display unit for temperatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Unit {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl Unit {
    // ---
    pub fn convert(&self, celsius: f64) -> f64 {
        match self {
            Unit::Celsius => celsius,
            Unit::Fahrenheit => (celsius * 9.0 / 5.0) + 32.0,
            Unit::Kelvin => celsius + 273.15,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::Celsius => "C",
            Unit::Fahrenheit => "F",
            Unit::Kelvin => "K",
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(Unit::Celsius),
            "f" | "fahrenheit" => Ok(Unit::Fahrenheit),
            "k" | "kelvin" => Ok(Unit::Kelvin),
            other => Err(format!("unknown unit '{other}', expected c, f or k")),
        }
    }
}

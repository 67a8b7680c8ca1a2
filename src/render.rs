//! Text rendering of the four screens.

use chrono_tz::Tz;

use crate::{Screen, Unit};

pub const NO_APARTMENT_TEXT: &str = "Scan QR with button below";

/// How readings are presented.
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub unit: Unit,
    /// Zone the reading's timestamp is shown in.
    pub timezone: Tz,
}

impl Default for View {
    fn default() -> Self {
        Self {
            unit: Unit::Celsius,
            timezone: chrono_tz::Europe::Stockholm,
        }
    }
}

/// Render `screen` as the lines shown to the user.
pub fn render(screen: &Screen, view: &View) -> String {
    // ---
    match screen {
        Screen::Loading => "Loading...".to_string(),
        Screen::NoApartment => NO_APARTMENT_TEXT.to_string(),
        Screen::Scanning => "Point the camera at the apartment's QR code".to_string(),
        Screen::ShowingReading { apartment, reading } => {
            let local = reading.timestamp.with_timezone(&view.timezone);
            format!(
                "{:.1} {}\nHumidity {:.0}%\nUpdated {}\nApartment {}",
                view.unit.convert(reading.temperature),
                view.unit.suffix(),
                reading.humidity,
                local.format("%Y-%m-%d %H:%M"),
                apartment
            )
        }
    }
}

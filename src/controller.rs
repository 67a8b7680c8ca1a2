//! Screen state machine.
//!
//! The controller owns no I/O. It consumes [`Event`]s and returns the
//! [`Effect`]s the driver must perform; completions come back as further
//! events. The visible [`Screen`] is derived from the controller's fields on
//! every call, never stored.
//!
//! Fetches are tagged with a generation number. Only the completion matching
//! the current generation is applied, so a slow fetch for a replaced
//! apartment can never overwrite the newer state.

use tracing::{debug, info, warn};

use crate::{
    ApartmentId, FetchError, PersistedState, ScanError, SensorReading, StoreError,
};

// ---

/// What the user currently sees.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Loading,
    NoApartment,
    Scanning,
    ShowingReading {
        apartment: ApartmentId,
        reading: SensorReading,
    },
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started,
    StoreLoaded(Result<PersistedState, StoreError>),
    ScanRequested,
    ScanFinished(Result<ApartmentId, ScanError>),
    FetchFinished {
        generation: u64,
        apartment: ApartmentId,
        result: Result<SensorReading, FetchError>,
    },
    ResetRequested,
}

/// Work the driver performs on the controller's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadStore,
    PersistApartment(ApartmentId),
    ClearStore,
    OpenScanner,
    FetchReading {
        generation: u64,
        apartment: ApartmentId,
    },
}

#[derive(Debug, Default)]
pub struct Controller {
    // ---
    apartment: Option<ApartmentId>,
    reading: Option<SensorReading>,
    store_loading: bool,
    scanner_open: bool,
    in_flight: Option<u64>,
    generation: u64,
}

impl Controller {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        // ---
        if self.store_loading || self.in_flight.is_some() {
            return Screen::Loading;
        }
        if self.scanner_open {
            return Screen::Scanning;
        }
        match (&self.apartment, &self.reading) {
            (Some(apartment), Some(reading)) => Screen::ShowingReading {
                apartment: apartment.clone(),
                reading: *reading,
            },
            _ => Screen::NoApartment,
        }
    }

    pub fn apartment(&self) -> Option<&ApartmentId> {
        self.apartment.as_ref()
    }

    /// Generation of the most recently started fetch.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn on_event(&mut self, event: Event) -> Vec<Effect> {
        // ---
        match event {
            Event::Started => self.on_started(),
            Event::StoreLoaded(result) => self.on_store_loaded(result),
            Event::ScanRequested => self.on_scan_requested(),
            Event::ScanFinished(result) => self.on_scan_finished(result),
            Event::FetchFinished {
                generation,
                apartment,
                result,
            } => self.on_fetch_finished(generation, apartment, result),
            Event::ResetRequested => self.on_reset_requested(),
        }
    }

    fn on_started(&mut self) -> Vec<Effect> {
        // ---
        if self.store_loading {
            debug!("Already loading the store, ignoring start");
            return Vec::new();
        }
        self.store_loading = true;
        vec![Effect::LoadStore]
    }

    fn on_store_loaded(&mut self, result: Result<PersistedState, StoreError>) -> Vec<Effect> {
        // ---
        self.store_loading = false;
        match result {
            Ok(state) => match state.apartment_id() {
                Some(apartment) => {
                    info!("Restored apartment {}", apartment);
                    vec![self.begin_fetch(apartment)]
                }
                None => {
                    info!("Stored record has no apartment");
                    Vec::new()
                }
            },
            Err(StoreError::NotInitialized) => {
                info!("No apartment stored yet");
                Vec::new()
            }
            Err(StoreError::Corrupted(reason)) => {
                warn!("Stored record corrupted, clearing it: {}", reason);
                vec![Effect::ClearStore]
            }
            Err(e) => {
                warn!("Failed to load store: {}", e);
                Vec::new()
            }
        }
    }

    fn on_scan_requested(&mut self) -> Vec<Effect> {
        // ---
        match self.screen() {
            Screen::NoApartment | Screen::ShowingReading { .. } => {
                self.scanner_open = true;
                vec![Effect::OpenScanner]
            }
            screen => {
                debug!("Ignoring scan request while {:?}", screen);
                Vec::new()
            }
        }
    }

    fn on_scan_finished(&mut self, result: Result<ApartmentId, ScanError>) -> Vec<Effect> {
        // ---
        if !self.scanner_open {
            debug!("Ignoring scan result with no scanner open");
            return Vec::new();
        }
        self.scanner_open = false;

        match result {
            Ok(apartment) => {
                let persist = Effect::PersistApartment(apartment.clone());
                vec![persist, self.begin_fetch(apartment)]
            }
            Err(e) => {
                info!("Scanner closed: {}", e);
                Vec::new()
            }
        }
    }

    fn on_fetch_finished(
        &mut self,
        generation: u64,
        apartment: ApartmentId,
        result: Result<SensorReading, FetchError>,
    ) -> Vec<Effect> {
        // ---
        if self.in_flight != Some(generation) || self.apartment.as_ref() != Some(&apartment) {
            debug!(
                "Discarding stale fetch #{} for apartment {} (current #{})",
                generation, apartment, self.generation
            );
            return Vec::new();
        }
        self.in_flight = None;

        match result {
            Ok(reading) => self.reading = Some(reading),
            Err(e) => {
                warn!("Failed to fetch reading for apartment {}: {}", apartment, e);
                self.reading = None;
            }
        }
        Vec::new()
    }

    fn on_reset_requested(&mut self) -> Vec<Effect> {
        // ---
        if self.store_loading || self.scanner_open {
            debug!("Ignoring reset while {:?}", self.screen());
            return Vec::new();
        }
        info!("Resetting apartment");
        self.apartment = None;
        self.reading = None;
        self.in_flight = None;
        vec![Effect::ClearStore]
    }

    /// Switch to `apartment` and start a fetch that supersedes any other.
    fn begin_fetch(&mut self, apartment: ApartmentId) -> Effect {
        // ---
        self.generation += 1;
        self.in_flight = Some(self.generation);
        self.apartment = Some(apartment.clone());
        self.reading = None;
        Effect::FetchReading {
            generation: self.generation,
            apartment,
        }
    }
}

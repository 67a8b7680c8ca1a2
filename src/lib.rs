//! Apartment climate client.
//!
//! Scan the QR code on an apartment's sensor installation, then show the
//! freshest temperature and humidity reported for it by the remote sensor
//! service.
//!
//! Modules are siblings that only talk through the re-exports below (EMBP):
//! - `models`, `timestamp` – reading types and date normalization
//! - `sensor_client`, `reconcile` – the two-endpoint fetch and freshest-reading choice
//! - `store` – the persisted apartment record over a key-value capability
//! - `scanner` – QR payload validation over a camera capability
//! - `controller` – the screen state machine
//! - `app` – async driver executing controller effects
//! - `render` – text rendering of the current screen

pub mod app;
pub mod config;
pub mod controller;
pub mod errors;
pub mod models;
pub mod reconcile;
pub mod render;
pub mod scanner;
pub mod sensor_client;
pub mod store;
pub mod timestamp;

pub use app::App;
pub use config::Config;
pub use controller::{Controller, Effect, Event, Screen};
pub use errors::{FetchError, ScanError, StoreError};
pub use models::{
    ApartmentId, InstalledCheck, ListSensorValue, PersistedState, SensorInfo, SensorReading,
    StoredApartment, Unit,
};
pub use render::{render, View};
pub use scanner::{Camera, Frame, QueuedCamera, Scanner, Symbology};
pub use sensor_client::{EgainClient, SensorApi};
pub use store::{FileKeyValue, KeyValue, MemoryKeyValue, Store};
pub use timestamp::{SampleClock, TimestampCorrection};

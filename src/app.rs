//! Async driver that connects the [`Controller`] to the real collaborators.
//!
//! Store and scanner effects are awaited inline. Fetches run on spawned tasks
//! and report back through an unbounded channel; call [`App::next_completion`]
//! and [`App::dispatch`] to apply them.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{
    ApartmentId, Camera, Controller, Effect, Event, KeyValue, PersistedState, Scanner, Screen,
    SensorApi, Store,
};

// ---

pub struct App<A, K, C> {
    // ---
    controller: Controller,
    api: Arc<A>,
    store: Store<K>,
    scanner: Scanner,
    camera: C,
    completions_tx: mpsc::UnboundedSender<Event>,
    completions_rx: mpsc::UnboundedReceiver<Event>,
}

impl<A, K, C> App<A, K, C>
where
    A: SensorApi,
    K: KeyValue,
    C: Camera,
{
    // ---
    pub fn new(api: A, store: Store<K>, scanner: Scanner, camera: C) -> Self {
        // ---
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            controller: Controller::new(),
            api: Arc::new(api),
            store,
            scanner,
            camera,
            completions_tx,
            completions_rx,
        }
    }

    pub fn screen(&self) -> Screen {
        self.controller.screen()
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    /// Apply `event` and every event its effects produce inline.
    pub async fn dispatch(&mut self, event: Event) {
        // ---
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            for effect in self.controller.on_event(event) {
                if let Some(next) = self.execute(effect).await {
                    pending.push_back(next);
                }
            }
        }
    }

    /// Wait for the next background fetch to finish.
    pub async fn next_completion(&mut self) -> Option<Event> {
        self.completions_rx.recv().await
    }

    /// Dispatch completions until nothing is loading.
    pub async fn settle(&mut self) {
        // ---
        while self.screen() == Screen::Loading {
            match self.next_completion().await {
                Some(event) => self.dispatch(event).await,
                None => break,
            }
        }
    }

    async fn execute(&mut self, effect: Effect) -> Option<Event> {
        // ---
        debug!("Executing {:?}", effect);
        match effect {
            Effect::LoadStore => Some(Event::StoreLoaded(self.store.load().await)),
            Effect::PersistApartment(apartment) => {
                let state = PersistedState::with_apartment(&apartment);
                if let Err(e) = self.store.store(&state).await {
                    error!("Failed to persist apartment {}: {}", apartment, e);
                }
                None
            }
            Effect::ClearStore => {
                if let Err(e) = self.store.clear().await {
                    error!("Failed to clear store: {}", e);
                }
                None
            }
            Effect::OpenScanner => {
                Some(Event::ScanFinished(self.scanner.scan(&mut self.camera).await))
            }
            Effect::FetchReading {
                generation,
                apartment,
            } => {
                self.spawn_fetch(generation, apartment);
                None
            }
        }
    }

    fn spawn_fetch(&self, generation: u64, apartment: ApartmentId) {
        // ---
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_latest_reading(&apartment).await;
            let event = Event::FetchFinished {
                generation,
                apartment,
                result,
            };
            if tx.send(event).is_err() {
                debug!("App dropped before fetch #{} finished", generation);
            }
        });
    }
}

use std::sync::Arc;

use formats::EraDefinition;
use layers::LoadedLayer;
use tokio::sync::RwLock;
use tracing::debug;

use crate::fetch::ArchiveFetcher;
use crate::loader::{LoadOutcome, load_layers};
use crate::request::LoadTicket;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    Committed,
    /// The ticket was superseded or the store was torn down.
    Discarded,
}

/// Holder of the last committed layer list.
///
/// A load pass takes a ticket first and commits with it when done. Issuing
/// a new ticket invalidates every earlier one, so a slow pass can never
/// overwrite the result of a newer one.
#[derive(Debug, Default)]
pub struct LayerStore {
    generation: u64,
    in_flight: Option<LoadTicket>,
    torn_down: bool,
    layers: Vec<LoadedLayer>,
    error: Option<String>,
}

pub type SharedLayerStore = Arc<RwLock<LayerStore>>;

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedLayerStore {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        let ticket = LoadTicket(self.generation);
        self.in_flight = Some(ticket);
        ticket
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        !self.torn_down && ticket.0 == self.generation
    }

    /// A failed pass keeps the previous layers and records its message.
    pub fn commit(&mut self, ticket: LoadTicket, outcome: LoadOutcome) -> CommitStatus {
        if !self.is_current(ticket) {
            debug!(
                "discarding load #{} (current #{}, torn down: {})",
                ticket.0, self.generation, self.torn_down
            );
            return CommitStatus::Discarded;
        }
        self.in_flight = None;
        match outcome {
            LoadOutcome::Loaded(layers) => {
                self.layers = layers;
                self.error = None;
            }
            LoadOutcome::Failed(msg) => self.error = Some(msg),
        }
        CommitStatus::Committed
    }

    /// After teardown no commit is ever accepted.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.in_flight = None;
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn layers(&self) -> &[LoadedLayer] {
        &self.layers
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Runs one load pass against a shared store. The lock is not held while
/// loading.
pub async fn reload(
    store: &RwLock<LayerStore>,
    fetcher: &dyn ArchiveFetcher,
    defs: &[EraDefinition],
) -> CommitStatus {
    let ticket = store.write().await.begin_load();
    let outcome = load_layers(fetcher, defs).await;
    store.write().await.commit(ticket, outcome)
}

//! A list session: one orchestrator wired to one store.
//!
//! Hosts that do not bring their own store use a [`Session`]. Store actions are applied as soon
//! as the orchestrator dispatches them; `FETCH_DATA` actions are handed back to the host, which
//! runs them and reports each result through [`Session::complete`].

use crate::command::UiCommand;
use crate::config::CoreConfig;
use crate::dispatch::{Action, RecordingDispatcher};
use crate::orchestrator::{ListOrchestrator, ListView, Outcome};
use crate::store::{FetchCompletion, Resolution, Store, StoreSnapshot};
use std::sync::Arc;

#[derive(Debug)]
pub struct Session {
    orchestrator: ListOrchestrator,
    store: Store,
}

/// Result of handling one event in a [`Session`].
#[derive(Debug)]
pub struct Handled {
    pub outcome: Outcome,
    /// Fetches the host must run.
    pub fetches: Vec<Action>,
}

impl Session {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let store = Store::new(&cfg);
        Self {
            orchestrator: ListOrchestrator::new(cfg),
            store,
        }
    }

    pub fn orchestrator(&self) -> &ListOrchestrator {
        &self.orchestrator
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        self.store.snapshot()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn handle(&mut self, event: &UiCommand) -> Handled {
        let mut dispatcher = RecordingDispatcher::new();
        let outcome = self
            .orchestrator
            .handle(event, self.store.snapshot(), &mut dispatcher);

        let mut fetches = Vec::new();
        for action in dispatcher.take() {
            self.store.apply(&action);
            if action.is_fetch() {
                fetches.push(action);
            }
        }

        Handled { outcome, fetches }
    }

    pub fn complete(&mut self, completion: FetchCompletion) -> Resolution {
        self.store.resolve(completion)
    }

    pub fn view(&self) -> ListView {
        self.orchestrator.view(self.store.snapshot())
    }
}

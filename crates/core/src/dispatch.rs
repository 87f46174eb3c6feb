//! The dispatch channel seam.
//!
//! The orchestrator never talks to the store or the fetch effect directly. It emits [`Action`]s
//! through a [`Dispatcher`] handed to it by the host, which decides whether the action mutates
//! the store, starts a fetch, or both.

use crate::filter::{FilterColumn, FilterValue};
use crate::query::FetchParams;
use crate::{ListError, ListResult};
use pview_types::{PageLength, PageNumber};
use pview_uuid::RequestId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which remote list a fetch targets. Also names the store slot the result lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchType {
    Patient,
    Race,
    Gender,
    Ethnicity,
    PatientCond,
    PatientDrug,
    PatientVisit,
}

impl FetchType {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchType::Patient => "patient",
            FetchType::Race => "race",
            FetchType::Gender => "gender",
            FetchType::Ethnicity => "ethnicity",
            FetchType::PatientCond => "patientCond",
            FetchType::PatientDrug => "patientDrug",
            FetchType::PatientVisit => "patientVisit",
        }
    }

    /// Reference lists feed filter domains and are fetched once on mount.
    pub fn is_reference_list(self) -> bool {
        matches!(
            self,
            FetchType::Race | FetchType::Gender | FetchType::Ethnicity
        )
    }

    /// Detail lists are fetched per patient and carry the patient id.
    pub fn is_detail_list(self) -> bool {
        matches!(
            self,
            FetchType::PatientCond | FetchType::PatientDrug | FetchType::PatientVisit
        )
    }
}

impl fmt::Display for FetchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchType {
    type Err = ListError;

    fn from_str(s: &str) -> ListResult<Self> {
        match s {
            "patient" => Ok(FetchType::Patient),
            "race" => Ok(FetchType::Race),
            "gender" => Ok(FetchType::Gender),
            "ethnicity" => Ok(FetchType::Ethnicity),
            "patientCond" => Ok(FetchType::PatientCond),
            "patientDrug" => Ok(FetchType::PatientDrug),
            "patientVisit" => Ok(FetchType::PatientVisit),
            other => Err(ListError::InvalidInput(format!("unknown fetch type '{other}'"))),
        }
    }
}

/// An action on the dispatch channel.
///
/// `FETCH_DATA` asks the fetch effect for a list; the other variants mutate the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    FetchData {
        fetch_type: FetchType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<FetchParams>,
        request_id: RequestId,
    },
    SetFilter {
        column: FilterColumn,
        value: Option<FilterValue>,
    },
    SetPage {
        page: PageNumber,
    },
    SetPageLength {
        length: PageLength,
    },
    /// Page and length together, so no observer sees a new length paired with an old page.
    SetPagination {
        page: PageNumber,
        length: PageLength,
    },
}

impl Action {
    pub fn is_fetch(&self) -> bool {
        matches!(self, Action::FetchData { .. })
    }

    /// Serializes the action in its wire form.
    pub fn to_json(&self) -> ListResult<String> {
        serde_json::to_string(self).map_err(ListError::Serialization)
    }
}

/// Request-emission capability injected into the orchestrator.
///
/// Each UI event produces one batch. A batch is delivered whole or not at all: an
/// implementation that cannot accept every action must return an error without delivering
/// any of them, so no observer sees a fetch without the store update it was issued with.
pub trait Dispatcher {
    fn dispatch_batch(&mut self, actions: Vec<Action>) -> ListResult<()>;

    fn dispatch(&mut self, action: Action) -> ListResult<()> {
        self.dispatch_batch(vec![action])
    }
}

impl<D: Dispatcher + ?Sized> Dispatcher for &mut D {
    fn dispatch_batch(&mut self, actions: Vec<Action>) -> ListResult<()> {
        (**self).dispatch_batch(actions)
    }
}

/// Dispatcher that keeps every action in memory.
///
/// Hosts drain it after each interaction; tests inspect it.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    actions: Vec<Action>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// The `FETCH_DATA` actions recorded so far.
    pub fn fetches(&self) -> Vec<&Action> {
        self.actions.iter().filter(|a| a.is_fetch()).collect()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch_batch(&mut self, actions: Vec<Action>) -> ListResult<()> {
        tracing::trace!(?actions, "recorded batch");
        self.actions.extend(actions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pview_uuid::RequestIdGenerator;

    #[test]
    fn fetch_type_round_trips_wire_names() {
        for fetch_type in [
            FetchType::Patient,
            FetchType::Race,
            FetchType::PatientCond,
            FetchType::PatientVisit,
        ] {
            let parsed: FetchType = fetch_type.as_str().parse().expect("known fetch type");
            assert_eq!(parsed, fetch_type);
        }
        assert!("visits".parse::<FetchType>().is_err());
    }

    #[test]
    fn fetch_action_serializes_in_wire_shape() {
        let mut ids = RequestIdGenerator::new();
        let action = Action::FetchData {
            fetch_type: FetchType::Race,
            id: None,
            params: None,
            request_id: ids.next_id(),
        };

        let json: serde_json::Value =
            serde_json::from_str(&action.to_json().expect("serialize")).expect("valid json");
        assert_eq!(json["type"], "FETCH_DATA");
        assert_eq!(json["fetchType"], "race");
        assert!(json.get("id").is_none());
        assert!(json.get("params").is_none());
        assert!(json["requestId"].as_str().is_some_and(|id| id.starts_with("r1-")));
    }

    #[test]
    fn set_pagination_carries_page_and_length_together() {
        let action = Action::SetPagination {
            page: PageNumber::FIRST,
            length: PageLength::new(20).expect("positive"),
        };
        let json: serde_json::Value =
            serde_json::from_str(&action.to_json().expect("serialize")).expect("valid json");
        assert_eq!(json, serde_json::json!({"type": "SET_PAGINATION", "page": 1, "length": 20}));
    }

    #[test]
    fn recording_dispatcher_separates_fetches() {
        let mut ids = RequestIdGenerator::new();
        let mut dispatcher = RecordingDispatcher::new();
        dispatcher
            .dispatch_batch(vec![
                Action::SetPage {
                    page: PageNumber::FIRST,
                },
                Action::FetchData {
                    fetch_type: FetchType::Patient,
                    id: None,
                    params: None,
                    request_id: ids.next_id(),
                },
            ])
            .expect("recording never fails");

        assert_eq!(dispatcher.actions().len(), 2);
        assert_eq!(dispatcher.fetches().len(), 1);
        assert_eq!(dispatcher.take().len(), 2);
        assert!(dispatcher.actions().is_empty());
    }
}

//! The external store's read surface and a reducer for it.
//!
//! The orchestrator only ever sees a `&StoreSnapshot`. The [`Store`] applies store-mutation
//! actions and fetch completions to the snapshot.
//!
//! ## Stale completions
//!
//! Fetches can complete in any order. Each `FETCH_DATA` carries a request id, and the store
//! remembers the latest id it saw dispatched for every fetch type. A completion is applied only
//! when its id is that latest one; completions of superseded requests are dropped. Without this,
//! a slow response to an old query could overwrite the rows of a newer one.

use crate::config::CoreConfig;
use crate::detail::{ClinicalRecord, ConditionListBody, DrugListBody, VisitListBody};
use crate::dispatch::{Action, FetchType};
use crate::filter::{FilterColumn, FilterValue, ReferenceData};
use crate::rows::RowSet;
use crate::{ListError, ListResult};
use pview_types::{PageLength, PageNumber};
use pview_uuid::RequestId;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// `state.patient.pagination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub page: PageNumber,
    pub length: PageLength,
}

/// `state.api`: the last applied result of every fetch type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiState {
    pub patient: Option<RowSet>,
    pub race: Option<Vec<String>>,
    pub gender: Option<Vec<String>>,
    pub ethnicity: Option<Vec<String>>,
    pub patient_cond: Option<Vec<ClinicalRecord>>,
    pub patient_drug: Option<Vec<ClinicalRecord>>,
    pub patient_visit: Option<Vec<ClinicalRecord>>,
}

/// Read-only view of the store handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub api: ApiState,
    pub pagination: PaginationState,
    pub filters: BTreeMap<FilterColumn, FilterValue>,
}

impl StoreSnapshot {
    pub fn new(pagination: PaginationState) -> Self {
        Self {
            api: ApiState::default(),
            pagination,
            filters: BTreeMap::new(),
        }
    }

    /// Reference lists for the filter descriptor builder. Unfetched lists are empty.
    pub fn reference_data(&self) -> ReferenceData {
        ReferenceData {
            gender: self.api.gender.clone().unwrap_or_default(),
            race: self.api.race.clone().unwrap_or_default(),
            ethnicity: self.api.ethnicity.clone().unwrap_or_default(),
        }
    }

    /// `totalLength` of the fetched patient list, if it has been fetched.
    pub fn total_length(&self) -> Option<u64> {
        self.api.patient.as_ref().map(RowSet::total_length)
    }
}

/// A resolved fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPayload {
    Patient(RowSet),
    Race(Vec<String>),
    Gender(Vec<String>),
    Ethnicity(Vec<String>),
    PatientCond(Vec<ClinicalRecord>),
    PatientDrug(Vec<ClinicalRecord>),
    PatientVisit(Vec<ClinicalRecord>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RaceBody {
    race_list: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenderBody {
    gender_list: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EthnicityBody {
    ethnicity_list: Vec<String>,
}

impl FetchPayload {
    pub fn fetch_type(&self) -> FetchType {
        match self {
            FetchPayload::Patient(_) => FetchType::Patient,
            FetchPayload::Race(_) => FetchType::Race,
            FetchPayload::Gender(_) => FetchType::Gender,
            FetchPayload::Ethnicity(_) => FetchType::Ethnicity,
            FetchPayload::PatientCond(_) => FetchType::PatientCond,
            FetchPayload::PatientDrug(_) => FetchType::PatientDrug,
            FetchPayload::PatientVisit(_) => FetchType::PatientVisit,
        }
    }

    /// Parses a fetch effect's JSON response for `fetch_type`.
    ///
    /// Reference lists arrive as `{ "raceList": [...] }` and so on; detail lists as
    /// `{ "conditionList" | "drugList" | "visitList": [...] }`.
    pub fn from_json(fetch_type: FetchType, value: serde_json::Value) -> ListResult<Self> {
        Ok(match fetch_type {
            FetchType::Patient => FetchPayload::Patient(parse_body(fetch_type, value)?),
            FetchType::Race => {
                FetchPayload::Race(parse_body::<RaceBody>(fetch_type, value)?.race_list)
            }
            FetchType::Gender => {
                FetchPayload::Gender(parse_body::<GenderBody>(fetch_type, value)?.gender_list)
            }
            FetchType::Ethnicity => FetchPayload::Ethnicity(
                parse_body::<EthnicityBody>(fetch_type, value)?.ethnicity_list,
            ),
            FetchType::PatientCond => FetchPayload::PatientCond(
                parse_body::<ConditionListBody>(fetch_type, value)?.condition_list,
            ),
            FetchType::PatientDrug => {
                FetchPayload::PatientDrug(parse_body::<DrugListBody>(fetch_type, value)?.drug_list)
            }
            FetchType::PatientVisit => FetchPayload::PatientVisit(
                parse_body::<VisitListBody>(fetch_type, value)?.visit_list,
            ),
        })
    }
}

fn parse_body<T: DeserializeOwned>(fetch_type: FetchType, value: serde_json::Value) -> ListResult<T> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(body) => Ok(body),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            Err(ListError::Payload {
                fetch_type: fetch_type.to_string(),
                message: format!("at {path}: {source}"),
            })
        }
    }
}

/// A fetch effect's answer to one `FETCH_DATA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCompletion {
    pub request_id: RequestId,
    pub payload: FetchPayload,
}

/// What the store did with a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// A newer request for the same fetch type was dispatched after this one.
    Superseded,
    /// No request with this id was ever dispatched.
    Unknown,
}

/// Reducer over a [`StoreSnapshot`].
#[derive(Debug)]
pub struct Store {
    snapshot: StoreSnapshot,
    latest: HashMap<FetchType, RequestId>,
    pending: HashMap<FetchType, RequestId>,
}

impl Store {
    /// An empty store at page 1 with the configured default length.
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            snapshot: StoreSnapshot::new(PaginationState {
                page: PageNumber::FIRST,
                length: cfg.default_length(),
            }),
            latest: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    /// Applies one dispatched action.
    pub fn apply(&mut self, action: &Action) {
        match action {
            Action::FetchData {
                fetch_type,
                request_id,
                ..
            } => {
                if let Some(previous) = self.pending.get(fetch_type) {
                    tracing::debug!(
                        fetch_type = %fetch_type,
                        superseded = %previous,
                        in_flight_since = %previous.issued_at(),
                        by = %request_id,
                        "superseding in-flight fetch"
                    );
                }
                self.latest.insert(*fetch_type, request_id.clone());
                self.pending.insert(*fetch_type, request_id.clone());
            }
            Action::SetFilter { column, value } => match value {
                Some(value) => {
                    self.snapshot.filters.insert(*column, value.clone());
                }
                None => {
                    self.snapshot.filters.remove(column);
                }
            },
            Action::SetPage { page } => self.snapshot.pagination.page = *page,
            Action::SetPageLength { length } => self.snapshot.pagination.length = *length,
            Action::SetPagination { page, length } => {
                self.snapshot.pagination = PaginationState {
                    page: *page,
                    length: *length,
                };
            }
        }
    }

    /// Applies a completion if it answers the latest request for its fetch type.
    pub fn resolve(&mut self, completion: FetchCompletion) -> Resolution {
        let fetch_type = completion.payload.fetch_type();

        match self.latest.get(&fetch_type) {
            Some(latest) if *latest == completion.request_id => {}
            Some(latest) if latest.supersedes(&completion.request_id) => {
                tracing::debug!(
                    fetch_type = %fetch_type,
                    stale = %completion.request_id,
                    issued_at = %completion.request_id.issued_at(),
                    latest = %latest,
                    "dropping superseded fetch completion"
                );
                return Resolution::Superseded;
            }
            _ => {
                tracing::warn!(
                    fetch_type = %fetch_type,
                    request_id = %completion.request_id,
                    "dropping completion for a request that was never dispatched"
                );
                return Resolution::Unknown;
            }
        }

        self.pending.remove(&fetch_type);
        let api = &mut self.snapshot.api;
        match completion.payload {
            FetchPayload::Patient(rows) => api.patient = Some(rows),
            FetchPayload::Race(list) => api.race = Some(list),
            FetchPayload::Gender(list) => api.gender = Some(list),
            FetchPayload::Ethnicity(list) => api.ethnicity = Some(list),
            FetchPayload::PatientCond(list) => api.patient_cond = Some(list),
            FetchPayload::PatientDrug(list) => api.patient_drug = Some(list),
            FetchPayload::PatientVisit(list) => api.patient_visit = Some(list),
        }
        Resolution::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::PatientRow;
    use pview_uuid::RequestIdGenerator;

    fn fetch(fetch_type: FetchType, request_id: &RequestId) -> Action {
        Action::FetchData {
            fetch_type,
            id: None,
            params: None,
            request_id: request_id.clone(),
        }
    }

    fn rows(total: u64) -> FetchPayload {
        FetchPayload::Patient(RowSet::new(Vec::<PatientRow>::new(), total))
    }

    #[test]
    fn set_pagination_updates_page_and_length_together() {
        let mut store = Store::new(&CoreConfig::default());
        store.apply(&Action::SetPage {
            page: PageNumber::new(5).expect("positive"),
        });
        store.apply(&Action::SetPagination {
            page: PageNumber::FIRST,
            length: PageLength::new(20).expect("positive"),
        });

        let pagination = store.snapshot().pagination;
        assert_eq!(pagination.page, PageNumber::FIRST);
        assert_eq!(pagination.length.get(), 20);
    }

    #[test]
    fn set_filter_inserts_and_clears() {
        let mut store = Store::new(&CoreConfig::default());
        store.apply(&Action::SetFilter {
            column: FilterColumn::Race,
            value: Some(FilterValue::Choice("asian".into())),
        });
        assert_eq!(store.snapshot().filters.len(), 1);

        store.apply(&Action::SetFilter {
            column: FilterColumn::Race,
            value: None,
        });
        assert!(store.snapshot().filters.is_empty());
    }

    #[test]
    fn out_of_order_completion_is_dropped() {
        let mut ids = RequestIdGenerator::new();
        let mut store = Store::new(&CoreConfig::default());
        let older = ids.next_id();
        let newer = ids.next_id();
        store.apply(&fetch(FetchType::Patient, &older));
        store.apply(&fetch(FetchType::Patient, &newer));

        let applied = store.resolve(FetchCompletion {
            request_id: newer,
            payload: rows(20),
        });
        assert_eq!(applied, Resolution::Applied);
        assert!(!store.pending.contains_key(&FetchType::Patient));

        let stale = store.resolve(FetchCompletion {
            request_id: older,
            payload: rows(10),
        });
        assert_eq!(stale, Resolution::Superseded);
        assert_eq!(store.snapshot().total_length(), Some(20));
    }

    #[test]
    fn fetch_types_are_tracked_independently() {
        let mut ids = RequestIdGenerator::new();
        let mut store = Store::new(&CoreConfig::default());
        let patient = ids.next_id();
        let race = ids.next_id();
        store.apply(&fetch(FetchType::Patient, &patient));
        store.apply(&fetch(FetchType::Race, &race));

        let resolution = store.resolve(FetchCompletion {
            request_id: patient,
            payload: rows(3),
        });
        assert_eq!(resolution, Resolution::Applied);
        assert!(store.pending.contains_key(&FetchType::Race));
    }

    #[test]
    fn undispatched_completion_is_dropped() {
        let mut ids = RequestIdGenerator::new();
        let mut store = Store::new(&CoreConfig::default());
        let resolution = store.resolve(FetchCompletion {
            request_id: ids.next_id(),
            payload: FetchPayload::Race(vec!["asian".into()]),
        });
        assert_eq!(resolution, Resolution::Unknown);
        assert_eq!(store.snapshot().api.race, None);
    }

    #[test]
    fn payload_parses_reference_list_shape() {
        let payload = FetchPayload::from_json(
            FetchType::Gender,
            serde_json::json!({"genderList": ["M", "F"]}),
        )
        .expect("valid gender list");
        assert_eq!(payload, FetchPayload::Gender(vec!["M".into(), "F".into()]));
    }

    #[test]
    fn payload_mismatch_reports_path() {
        let err = FetchPayload::from_json(
            FetchType::Patient,
            serde_json::json!({"patient": {"list": [{"age": "old"}]}, "totalLength": 1}),
        )
        .expect_err("age must be a number");
        assert!(matches!(
            err,
            ListError::Payload { fetch_type, message }
                if fetch_type == "patient" && message.contains("patient.list[0].age")
        ));
    }

    #[test]
    fn reference_data_defaults_to_empty_lists() {
        let store = Store::new(&CoreConfig::default());
        assert_eq!(store.snapshot().reference_data(), ReferenceData::default());
        assert_eq!(store.snapshot().total_length(), None);
    }
}

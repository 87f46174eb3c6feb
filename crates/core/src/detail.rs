//! Per-patient drill-down.
//!
//! Opening a patient fetches its conditions, drugs and visits as three independent lists.
//! Selecting a visit narrows the condition and drug lists to that visit.

use crate::dispatch::{Action, FetchType};
use crate::rows::opt_id;
use pview_types::NonEmptyText;
use pview_uuid::RequestIdGenerator;
use serde::{Deserialize, Serialize};

/// A condition, drug or visit record. Only the visit id is interpreted; every other field is
/// passed through for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    #[serde(
        rename = "visitID",
        default,
        deserialize_with = "opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub visit_id: Option<String>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConditionListBody {
    // The upstream API spells this key `conditonList`.
    #[serde(alias = "conditonList")]
    pub condition_list: Vec<ClinicalRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DrugListBody {
    pub drug_list: Vec<ClinicalRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VisitListBody {
    pub visit_list: Vec<ClinicalRecord>,
}

/// The three detail fetches for one patient. An empty id yields none.
pub fn detail_fetches(id: &str, ids: &mut RequestIdGenerator) -> Vec<Action> {
    let Ok(id) = NonEmptyText::new(id) else {
        return Vec::new();
    };

    [
        FetchType::PatientCond,
        FetchType::PatientDrug,
        FetchType::PatientVisit,
    ]
    .into_iter()
    .map(|fetch_type| Action::FetchData {
        fetch_type,
        id: Some(id.to_string()),
        params: None,
        request_id: ids.next_id(),
    })
    .collect()
}

/// Conditions and drugs recorded during one visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecords {
    pub visit_id: String,
    pub conditions: Vec<ClinicalRecord>,
    pub drugs: Vec<ClinicalRecord>,
}

/// Row-expansion summary of a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub visit_count: usize,
    pub condition_list: Vec<ClinicalRecord>,
}

pub fn summarize(visits: &[ClinicalRecord], conditions: &[ClinicalRecord]) -> PatientSummary {
    PatientSummary {
        visit_count: visits.len(),
        condition_list: conditions.to_vec(),
    }
}

/// Local state of the detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailView {
    patient_id: Option<NonEmptyText>,
    selected_visit: Option<String>,
}

impl DetailView {
    /// Switches to another patient. Any selected visit belonged to the previous one.
    pub fn open(&mut self, patient_id: NonEmptyText) {
        self.patient_id = Some(patient_id);
        self.selected_visit = None;
    }

    pub fn patient_id(&self) -> Option<&NonEmptyText> {
        self.patient_id.as_ref()
    }

    pub fn selected_visit(&self) -> Option<&str> {
        self.selected_visit.as_deref()
    }

    /// Selects a visit if it is in `visits`. Returns whether the selection changed.
    pub fn select_visit(&mut self, visit_id: &str, visits: &[ClinicalRecord]) -> bool {
        let visit_id = visit_id.trim();
        let known = visits
            .iter()
            .any(|v| v.visit_id.as_deref() == Some(visit_id));
        if !known || self.selected_visit.as_deref() == Some(visit_id) {
            return false;
        }
        self.selected_visit = Some(visit_id.to_string());
        true
    }

    /// The records of the selected visit, or `None` when no visit is selected.
    pub fn visit_records(
        &self,
        conditions: &[ClinicalRecord],
        drugs: &[ClinicalRecord],
    ) -> Option<VisitRecords> {
        let visit_id = self.selected_visit.as_deref()?;
        let of_visit = |records: &[ClinicalRecord]| {
            records
                .iter()
                .filter(|r| r.visit_id.as_deref() == Some(visit_id))
                .cloned()
                .collect::<Vec<_>>()
        };

        Some(VisitRecords {
            visit_id: visit_id.to_string(),
            conditions: of_visit(conditions),
            drugs: of_visit(drugs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> ClinicalRecord {
        serde_json::from_str(json).expect("valid record")
    }

    #[test]
    fn detail_fetches_cover_three_lists() {
        let mut ids = RequestIdGenerator::new();
        let actions = detail_fetches("1001", &mut ids);

        let types: Vec<_> = actions
            .iter()
            .map(|a| match a {
                Action::FetchData { fetch_type, id, .. } => {
                    assert_eq!(id.as_deref(), Some("1001"));
                    *fetch_type
                }
                other => panic!("expected FETCH_DATA, got {other:?}"),
            })
            .collect();
        assert_eq!(
            types,
            vec![
                FetchType::PatientCond,
                FetchType::PatientDrug,
                FetchType::PatientVisit
            ]
        );
    }

    #[test]
    fn detail_fetches_skip_empty_id() {
        let mut ids = RequestIdGenerator::new();
        assert!(detail_fetches("  ", &mut ids).is_empty());
        assert_eq!(ids.last_sequence(), 0);
    }

    #[test]
    fn condition_list_accepts_upstream_spelling() {
        let body: ConditionListBody =
            serde_json::from_str(r#"{"conditonList": [{"visitID": 7, "name": "flu"}]}"#)
                .expect("valid body");
        assert_eq!(body.condition_list[0].visit_id.as_deref(), Some("7"));
        assert_eq!(body.condition_list[0].fields["name"], "flu");
    }

    #[test]
    fn selecting_a_visit_narrows_records() {
        let visits = vec![record(r#"{"visitID": "v1"}"#), record(r#"{"visitID": "v2"}"#)];
        let conditions = vec![
            record(r#"{"visitID": "v1", "name": "flu"}"#),
            record(r#"{"visitID": "v2", "name": "cough"}"#),
        ];
        let drugs = vec![record(r#"{"visitID": "v2", "name": "syrup"}"#)];

        let mut view = DetailView::default();
        view.open(NonEmptyText::new("1001").expect("non-empty"));
        assert!(view.visit_records(&conditions, &drugs).is_none());

        assert!(view.select_visit("v2", &visits));
        let records = view
            .visit_records(&conditions, &drugs)
            .expect("visit selected");
        assert_eq!(records.conditions.len(), 1);
        assert_eq!(records.conditions[0].fields["name"], "cough");
        assert_eq!(records.drugs.len(), 1);
    }

    #[test]
    fn unknown_visit_is_ignored() {
        let visits = vec![record(r#"{"visitID": "v1"}"#)];
        let mut view = DetailView::default();
        assert!(!view.select_visit("v9", &visits));
        assert_eq!(view.selected_visit(), None);
    }

    #[test]
    fn opening_another_patient_clears_visit() {
        let visits = vec![record(r#"{"visitID": "v1"}"#)];
        let mut view = DetailView::default();
        view.open(NonEmptyText::new("a").expect("non-empty"));
        view.select_visit("v1", &visits);
        view.open(NonEmptyText::new("b").expect("non-empty"));
        assert_eq!(view.selected_visit(), None);
    }

    #[test]
    fn summary_counts_visits() {
        let visits = vec![record(r#"{"visitID": "v1"}"#), record(r#"{"visitID": "v2"}"#)];
        let summary = summarize(&visits, &[]);
        assert_eq!(summary.visit_count, 2);
        assert!(summary.condition_list.is_empty());
    }
}

//! In-process fetch effect backed by a fixture.
//!
//! The fixture answers `FETCH_DATA` the way the remote API does: the patient list is filtered,
//! ordered and paged on the "server", reference lists and detail lists are returned whole. All
//! answers are JSON in the API's wire shape and go through [`FetchPayload::from_json`].

use anyhow::Context;
use pview_core::dispatch::{Action, FetchType};
use pview_core::query::FetchParams;
use pview_core::rows::PatientRow;
use pview_core::store::FetchPayload;
use serde::Deserialize;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetail {
    #[serde(default)]
    pub condition_list: Vec<Value>,
    #[serde(default)]
    pub drug_list: Vec<Value>,
    #[serde(default)]
    pub visit_list: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub patients: Vec<PatientRow>,
    #[serde(default)]
    pub race_list: Vec<String>,
    #[serde(default)]
    pub gender_list: Vec<String>,
    #[serde(default)]
    pub ethnicity_list: Vec<String>,
    /// Detail lists keyed by person id.
    #[serde(default)]
    pub details: BTreeMap<String, PatientDetail>,
}

const GENDERS: [&str; 2] = ["M", "F"];
const RACES: [&str; 4] = ["asian", "black", "white", "other"];
const ETHNICITIES: [&str; 2] = ["hispanic", "nonhispanic"];

impl Fixture {
    /// Load a fixture from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("fixture {} is not valid", path.display()))
    }

    /// A deterministic fixture of `count` patients, for runs without a fixture file.
    pub fn generated(count: u32) -> Self {
        let patients = (1..=count)
            .map(|n| {
                let i = n as usize;
                let age = 18 + (n * 7) % 70;
                PatientRow {
                    person_id: Some(n.to_string()),
                    gender: Some(GENDERS[i % GENDERS.len()].to_string()),
                    birth_datetime: Some(format!("{}-01-01", 2025 - age)),
                    age: Some(age),
                    race: Some(RACES[i % RACES.len()].to_string()),
                    ethnicity: Some(ETHNICITIES[i % ETHNICITIES.len()].to_string()),
                    is_death: Some(n % 7 == 0),
                }
            })
            .collect();

        Self {
            patients,
            race_list: RACES.iter().map(|s| s.to_string()).collect(),
            gender_list: GENDERS.iter().map(|s| s.to_string()).collect(),
            ethnicity_list: ETHNICITIES.iter().map(|s| s.to_string()).collect(),
            details: BTreeMap::new(),
        }
    }

    /// Answers a `FETCH_DATA` action. Other actions have no response.
    pub fn respond(&self, action: &Action) -> anyhow::Result<Option<(FetchType, Value)>> {
        let Action::FetchData {
            fetch_type, id, params, ..
        } = action
        else {
            return Ok(None);
        };

        if fetch_type.is_detail_list() && id.is_none() {
            anyhow::bail!("{fetch_type} fetch without a patient id");
        }

        let detail = || {
            id.as_deref()
                .and_then(|id| self.details.get(id))
                .cloned()
                .unwrap_or_default()
        };

        let body = match fetch_type {
            FetchType::Patient => {
                let params = params
                    .as_ref()
                    .context("patient fetch without paging parameters")?;
                self.patient_page(params)
            }
            FetchType::Race => json!({ "raceList": self.race_list }),
            FetchType::Gender => json!({ "genderList": self.gender_list }),
            FetchType::Ethnicity => json!({ "ethnicityList": self.ethnicity_list }),
            FetchType::PatientCond => json!({ "conditionList": detail().condition_list }),
            FetchType::PatientDrug => json!({ "drugList": detail().drug_list }),
            FetchType::PatientVisit => json!({ "visitList": detail().visit_list }),
        };

        Ok(Some((*fetch_type, body)))
    }

    /// Answers and parses a `FETCH_DATA` action in one step.
    pub fn payload(&self, action: &Action) -> anyhow::Result<Option<FetchPayload>> {
        match self.respond(action)? {
            Some((fetch_type, body)) => Ok(Some(FetchPayload::from_json(fetch_type, body)?)),
            None => Ok(None),
        }
    }

    fn patient_page(&self, params: &FetchParams) -> Value {
        let mut matching: Vec<&PatientRow> = self
            .patients
            .iter()
            .filter(|row| matches_params(row, params))
            .collect();

        if let Some(column) = params.order_column.as_deref() {
            matching.sort_by(|a, b| compare_by(column, a, b));
            if params.order_desc == Some(true) {
                matching.reverse();
            }
        }

        let length = params.length.get() as usize;
        let skip = (params.page.get() as usize - 1) * length;
        let page: Vec<&PatientRow> = matching.iter().skip(skip).take(length).copied().collect();

        json!({
            "patient": { "list": page },
            "totalLength": matching.len(),
        })
    }
}

fn matches_params(row: &PatientRow, params: &FetchParams) -> bool {
    params.filters.iter().all(|(key, value)| match key.as_str() {
        "gender" => row.gender.as_deref() == value.as_str(),
        "race" => row.race.as_deref() == value.as_str(),
        "ethnicity" => row.ethnicity.as_deref() == value.as_str(),
        "isDeath" => row.is_death == value.as_bool(),
        "age_min" => row
            .age
            .zip(value.as_u64())
            .is_some_and(|(age, min)| u64::from(age) >= min),
        "age_max" => row
            .age
            .zip(value.as_u64())
            .is_some_and(|(age, max)| u64::from(age) <= max),
        _ => true,
    })
}

fn compare_by(column: &str, a: &PatientRow, b: &PatientRow) -> Ordering {
    match column {
        "gender" => a.gender.cmp(&b.gender),
        "birth" => a.birth_datetime.cmp(&b.birth_datetime),
        "race" => a.race.cmp(&b.race),
        "ethnicity" => a.ethnicity.cmp(&b.ethnicity),
        "death" => a.is_death.cmp(&b.is_death),
        _ => id_key(a).cmp(&id_key(b)),
    }
}

// Numeric ids order numerically, the rest after them as text.
fn id_key(row: &PatientRow) -> (Option<i64>, Option<&str>) {
    let id = row.person_id.as_deref();
    (id.and_then(|id| id.parse().ok()), id)
}

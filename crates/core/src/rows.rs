//! Fetched patient rows and the client-side row filter.
//!
//! The store owns the fetched [`RowSet`]. The core only reads it: [`filter_rows`] produces a new,
//! narrowed list for rendering and never touches the fetched rows.

use crate::filter::{FilterColumn, FilterValue};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One row of the patient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRow {
    #[serde(rename = "personID", default, deserialize_with = "opt_id")]
    pub person_id: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_datetime: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub is_death: Option<bool>,
}

/// The `patient` fetch result: `{ "patient": { "list": [...] }, "totalLength": n }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSet {
    patient: PatientListBody,
    #[serde(rename = "totalLength")]
    total_length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PatientListBody {
    list: Vec<PatientRow>,
}

impl RowSet {
    pub fn new(rows: Vec<PatientRow>, total_length: u64) -> Self {
        Self {
            patient: PatientListBody { list: rows },
            total_length,
        }
    }

    pub fn rows(&self) -> &[PatientRow] {
        &self.patient.list
    }

    /// Total number of rows matching the query on the server, across all pages.
    pub fn total_length(&self) -> u64 {
        self.total_length
    }
}

/// Narrows fetched rows before display.
///
/// Drops rows without a person id, drops repeated person ids (the first occurrence wins) and
/// drops rows whose known values contradict an active filter. Idempotent: filtering the output
/// again returns it unchanged.
pub fn filter_rows(
    rows: &[PatientRow],
    filters: &BTreeMap<FilterColumn, FilterValue>,
) -> Vec<PatientRow> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| {
            row.person_id
                .as_deref()
                .is_some_and(|id| !id.trim().is_empty())
        })
        .filter(|row| filters.iter().all(|(column, value)| matches_filter(row, *column, value)))
        .filter(|row| seen.insert(row.person_id.clone()))
        .cloned()
        .collect()
}

/// A row matches unless one of its known values contradicts the filter. Unknown values pass.
fn matches_filter(row: &PatientRow, column: FilterColumn, value: &FilterValue) -> bool {
    match (column, value) {
        (FilterColumn::Gender, FilterValue::Choice(wanted)) => known_equals(&row.gender, wanted),
        (FilterColumn::Race, FilterValue::Choice(wanted)) => known_equals(&row.race, wanted),
        (FilterColumn::Ethnicity, FilterValue::Choice(wanted)) => {
            known_equals(&row.ethnicity, wanted)
        }
        (FilterColumn::IsDeath, FilterValue::Flag(wanted)) => {
            row.is_death.map_or(true, |d| d == *wanted)
        }
        (FilterColumn::Age, FilterValue::AgeRange { min, max }) => {
            row.age.map_or(true, |age| (*min..=*max).contains(&age))
        }
        _ => true,
    }
}

fn known_equals(field: &Option<String>, wanted: &str) -> bool {
    field.as_deref().map_or(true, |v| v == wanted)
}

/// Accepts an identifier sent either as a JSON string or a JSON number.
pub(crate) fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    }))
}

//! Filter descriptor building.
//!
//! A [`FilterDescriptor`] describes the editable filter control for one patient column: what
//! kind of widget it is, which values it offers, the value currently committed, and how a
//! submit or reset turns into a store update. Building a descriptor never fetches anything;
//! the orchestrator decides when a committed value triggers a fetch.
//!
//! The age filter has two bounds. They always travel as one [`FilterValue::AgeRange`], so a
//! request can never carry one bound without the other.

use crate::constants::{AGE_BOUND_LABELS, AGE_MAX_PARAM, AGE_MIN_PARAM, DEATH_STATUS_LABELS};
use crate::dispatch::Action;
use crate::{ListError, ListResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of filterable patient columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterColumn {
    Gender,
    Age,
    Race,
    Ethnicity,
    IsDeath,
}

impl FilterColumn {
    pub const ALL: [FilterColumn; 5] = [
        FilterColumn::Gender,
        FilterColumn::Age,
        FilterColumn::Race,
        FilterColumn::Ethnicity,
        FilterColumn::IsDeath,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterColumn::Gender => "gender",
            FilterColumn::Age => "age",
            FilterColumn::Race => "race",
            FilterColumn::Ethnicity => "ethnicity",
            FilterColumn::IsDeath => "isDeath",
        }
    }

    /// Resolves a column id from a filter click. Unknown ids are `None`, not an error.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == id.trim())
    }

    pub fn widget_kind(self) -> WidgetKind {
        match self {
            FilterColumn::Age => WidgetKind::NumberRange,
            _ => WidgetKind::Radio,
        }
    }
}

impl fmt::Display for FilterColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetKind {
    Radio,
    NumberRange,
}

/// A committed filter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FilterValue {
    /// Equality on a categorical column.
    Choice(String),
    /// Equality on a boolean-like column.
    Flag(bool),
    /// Inclusive age bounds, always committed together.
    AgeRange { min: u32, max: u32 },
}

impl FilterValue {
    /// The request parameters this value projects to for `column`.
    pub fn wire_entries(&self, column: FilterColumn) -> Vec<(String, serde_json::Value)> {
        match self {
            FilterValue::Choice(value) => {
                vec![(column.as_str().to_string(), serde_json::Value::from(value.as_str()))]
            }
            FilterValue::Flag(flag) => {
                vec![(column.as_str().to_string(), serde_json::Value::Bool(*flag))]
            }
            FilterValue::AgeRange { min, max } => vec![
                (AGE_MIN_PARAM.to_string(), serde_json::Value::from(*min)),
                (AGE_MAX_PARAM.to_string(), serde_json::Value::from(*max)),
            ],
        }
    }
}

/// Reference lists fetched on mount, keyed by column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceData {
    pub gender: Vec<String>,
    pub race: Vec<String>,
    pub ethnicity: Vec<String>,
}

impl ReferenceData {
    fn list(&self, column: FilterColumn) -> &[String] {
        match column {
            FilterColumn::Gender => self.gender.as_slice(),
            FilterColumn::Race => self.race.as_slice(),
            FilterColumn::Ethnicity => self.ethnicity.as_slice(),
            FilterColumn::Age | FilterColumn::IsDeath => &[],
        }
    }
}

/// The candidate values a filter widget offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FilterDomain {
    /// Categorical values from a reference list.
    Choices { values: Vec<String> },
    /// Display labels mapped to the truth value they stand for.
    Flags { labels: Vec<(String, bool)> },
    /// Labels of the lower and upper bound inputs.
    Bounds { min_label: String, max_label: String },
}

/// What the user entered before pressing submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterInput {
    /// A radio selection, by label.
    Selection(String),
    /// The two age inputs. Either may be missing, which is rejected on submit.
    Bounds { min: Option<u32>, max: Option<u32> },
}

impl FilterInput {
    /// Parses a raw submit value for `column`.
    ///
    /// Radio columns take the selected label. The age column takes `"<min>,<max>"`; a side may be
    /// left empty (`"20,"`), which [`FilterDescriptor::submit`] then rejects.
    pub fn parse(column: FilterColumn, raw: &str) -> ListResult<Self> {
        match column.widget_kind() {
            WidgetKind::Radio => Ok(FilterInput::Selection(raw.trim().to_string())),
            WidgetKind::NumberRange => {
                let (min, max) = raw.split_once(',').unwrap_or((raw, ""));
                Ok(FilterInput::Bounds {
                    min: parse_bound(min)?,
                    max: parse_bound(max)?,
                })
            }
        }
    }
}

fn parse_bound(raw: &str) -> ListResult<Option<u32>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| ListError::MalformedEvent(format!("age bound '{raw}' is not a number")))
}

/// The store update produced by a submit or reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCommit {
    pub column: FilterColumn,
    pub value: Option<FilterValue>,
}

impl FilterCommit {
    pub fn to_action(&self) -> Action {
        Action::SetFilter {
            column: self.column,
            value: self.value.clone(),
        }
    }
}

/// The editable filter control for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    column: FilterColumn,
    widget: WidgetKind,
    domain: FilterDomain,
    current: Option<FilterValue>,
}

impl FilterDescriptor {
    pub fn column(&self) -> FilterColumn {
        self.column
    }

    pub fn widget_kind(&self) -> WidgetKind {
        self.widget
    }

    pub fn domain(&self) -> &FilterDomain {
        &self.domain
    }

    /// The value committed for this column when the descriptor was built, if any.
    pub fn current_value(&self) -> Option<&FilterValue> {
        self.current.as_ref()
    }

    /// The labels of the domain, in widget order.
    pub fn domain_values(&self) -> Vec<&str> {
        match &self.domain {
            FilterDomain::Choices { values } => values.iter().map(String::as_str).collect(),
            FilterDomain::Flags { labels } => labels.iter().map(|(l, _)| l.as_str()).collect(),
            FilterDomain::Bounds {
                min_label,
                max_label,
            } => vec![min_label.as_str(), max_label.as_str()],
        }
    }

    pub fn with_current(mut self, current: Option<FilterValue>) -> Self {
        self.current = current;
        self
    }

    /// Turns user input into a commit.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::MalformedEvent`] if:
    /// - the input shape does not match the widget (bounds for a radio, or the reverse),
    /// - a radio selection is not one of the domain values,
    /// - an age submission is missing a bound or has `min > max`.
    pub fn submit(&self, input: FilterInput) -> ListResult<FilterCommit> {
        let value = match (&self.domain, input) {
            (FilterDomain::Choices { values }, FilterInput::Selection(selected)) => {
                if !values.contains(&selected) {
                    return Err(ListError::MalformedEvent(format!(
                        "'{selected}' is not a {} option",
                        self.column
                    )));
                }
                FilterValue::Choice(selected)
            }
            (FilterDomain::Flags { labels }, FilterInput::Selection(selected)) => {
                let truth = labels
                    .iter()
                    .find(|(label, _)| *label == selected)
                    .map(|(_, truth)| *truth)
                    .ok_or_else(|| {
                        ListError::MalformedEvent(format!(
                            "'{selected}' is not a {} option",
                            self.column
                        ))
                    })?;
                FilterValue::Flag(truth)
            }
            (FilterDomain::Bounds { .. }, FilterInput::Bounds { min, max }) => {
                let (Some(min), Some(max)) = (min, max) else {
                    return Err(ListError::MalformedEvent(
                        "age filter requires both bounds".into(),
                    ));
                };
                if min > max {
                    return Err(ListError::MalformedEvent(format!(
                        "age lower bound {min} exceeds upper bound {max}"
                    )));
                }
                FilterValue::AgeRange { min, max }
            }
            (_, input) => {
                return Err(ListError::MalformedEvent(format!(
                    "{input:?} does not fit the {} filter",
                    self.column
                )));
            }
        };

        Ok(FilterCommit {
            column: self.column,
            value: Some(value),
        })
    }

    /// Clears the column's filter. For age this clears both bounds at once.
    pub fn reset(&self) -> FilterCommit {
        FilterCommit {
            column: self.column,
            value: None,
        }
    }
}

/// Builds the filter descriptor for a clicked column.
///
/// Returns `None` for a column id outside the filterable set. A reference list that has not
/// been fetched yet gives a radio with no options.
pub fn build_filter(column_id: &str, reference: &ReferenceData) -> Option<FilterDescriptor> {
    let column = FilterColumn::from_id(column_id)?;

    let domain = match column {
        FilterColumn::Gender | FilterColumn::Race | FilterColumn::Ethnicity => {
            FilterDomain::Choices {
                values: reference.list(column).to_vec(),
            }
        }
        FilterColumn::Age => FilterDomain::Bounds {
            min_label: AGE_BOUND_LABELS[0].to_string(),
            max_label: AGE_BOUND_LABELS[1].to_string(),
        },
        FilterColumn::IsDeath => FilterDomain::Flags {
            labels: DEATH_STATUS_LABELS
                .iter()
                .map(|(label, truth)| (label.to_string(), *truth))
                .collect(),
        },
    };

    Some(FilterDescriptor {
        column,
        widget: column.widget_kind(),
        domain,
        current: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> ReferenceData {
        ReferenceData {
            gender: vec!["M".into(), "F".into()],
            race: vec!["asian".into(), "white".into(), "black".into()],
            ethnicity: vec!["hispanic".into(), "nonhispanic".into()],
        }
    }

    #[test]
    fn categorical_columns_use_reference_lists() {
        let descriptor = build_filter("race", &reference()).expect("race is filterable");
        assert_eq!(descriptor.widget_kind(), WidgetKind::Radio);
        assert_eq!(descriptor.domain_values(), vec!["asian", "white", "black"]);

        let commit = descriptor
            .submit(FilterInput::Selection("white".into()))
            .expect("white is an option");
        assert_eq!(
            commit,
            FilterCommit {
                column: FilterColumn::Race,
                value: Some(FilterValue::Choice("white".into())),
            }
        );
    }

    #[test]
    fn categorical_submit_rejects_unknown_option() {
        let descriptor = build_filter("gender", &reference()).expect("gender is filterable");
        let err = descriptor
            .submit(FilterInput::Selection("X".into()))
            .expect_err("X is not an option");
        assert!(matches!(err, ListError::MalformedEvent(msg) if msg.contains("gender")));
    }

    #[test]
    fn missing_reference_list_gives_empty_domain() {
        let descriptor =
            build_filter("ethnicity", &ReferenceData::default()).expect("ethnicity is filterable");
        assert!(descriptor.domain_values().is_empty());
    }

    #[test]
    fn death_status_maps_labels_to_truth_values() {
        let descriptor = build_filter("isDeath", &reference()).expect("isDeath is filterable");
        assert_eq!(descriptor.domain_values(), vec!["T", "F"]);

        let commit = descriptor
            .submit(FilterInput::Selection("F".into()))
            .expect("F is an option");
        assert_eq!(commit.value, Some(FilterValue::Flag(false)));
    }

    #[test]
    fn age_commits_both_bounds_together() {
        let descriptor = build_filter("age", &reference()).expect("age is filterable");
        assert_eq!(descriptor.widget_kind(), WidgetKind::NumberRange);
        assert_eq!(descriptor.domain_values(), vec!["minAge", "maxAge"]);

        let input = FilterInput::parse(FilterColumn::Age, "20,40").expect("valid bounds");
        let commit = descriptor.submit(input).expect("both bounds present");
        let value = commit.value.expect("submit commits a value");
        let keys: Vec<String> = value
            .wire_entries(FilterColumn::Age)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["age_min", "age_max"]);
    }

    #[test]
    fn age_rejects_single_bound() {
        let descriptor = build_filter("age", &reference()).expect("age is filterable");
        for raw in ["20,", ",40", "20"] {
            let input = FilterInput::parse(FilterColumn::Age, raw).expect("parses");
            let err = descriptor.submit(input).expect_err("single bound must be rejected");
            assert!(matches!(err, ListError::MalformedEvent(msg) if msg.contains("both bounds")));
        }
    }

    #[test]
    fn age_rejects_inverted_bounds() {
        let descriptor = build_filter("age", &reference()).expect("age is filterable");
        let input = FilterInput::parse(FilterColumn::Age, "60,30").expect("parses");
        assert!(descriptor.submit(input).is_err());
    }

    #[test]
    fn age_reset_clears_whole_range() {
        let descriptor = build_filter("age", &reference()).expect("age is filterable");
        assert_eq!(
            descriptor.reset().to_action(),
            Action::SetFilter {
                column: FilterColumn::Age,
                value: None,
            }
        );
    }

    #[test]
    fn unknown_column_yields_no_descriptor() {
        assert!(build_filter("birthDatetime", &reference()).is_none());
        assert!(build_filter("", &reference()).is_none());
    }

    #[test]
    fn filter_value_serializes_adjacently_tagged() {
        let json = serde_json::to_value(FilterValue::AgeRange { min: 1, max: 9 }).expect("json");
        assert_eq!(
            json,
            serde_json::json!({"kind": "ageRange", "value": {"min": 1, "max": 9}})
        );
    }
}

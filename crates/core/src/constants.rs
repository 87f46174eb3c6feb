//! Constants used throughout the list core.
//!
//! Defaults for paging, the patient column catalogue and the fixed filter domains live here so
//! the orchestrator, the filter builder and the hosts agree on them.

use crate::dispatch::FetchType;
use pview_types::PageLength;

/// Number of page links offered for direct navigation at a time.
pub const PAGE_CNT: u32 = 10;

/// Largest page window a configuration may ask for.
pub const MAX_PAGE_WINDOW: u32 = 100;

/// Rows per page before the user picks a page size.
pub const DEFAULT_PAGE_LENGTH: PageLength = PageLength::from_const(10);

/// Page sizes offered by the page-size selector.
pub const PAGE_LENGTH_OPTIONS: [PageLength; 3] = [
    PageLength::from_const(10),
    PageLength::from_const(20),
    PageLength::from_const(50),
];

/// Reference lists fetched on mount for the filter descriptor builder.
pub const REFERENCE_LISTS: [FetchType; 3] =
    [FetchType::Race, FetchType::Gender, FetchType::Ethnicity];

/// Labels of the two age bounds, in widget order.
pub const AGE_BOUND_LABELS: [&str; 2] = ["minAge", "maxAge"];

/// Wire keys the age filter projects to. Both are always sent together.
pub const AGE_MIN_PARAM: &str = "age_min";
pub const AGE_MAX_PARAM: &str = "age_max";

/// Display labels of the death-status radio and the truth value each one stands for.
pub const DEATH_STATUS_LABELS: [(&str, bool); 2] = [("T", true), ("F", false)];

/// Environment variable naming an optional YAML config file.
pub const CONFIG_PATH_ENV: &str = "PVIEW_CONFIG";

/// Environment variable overriding the default page length.
pub const PAGE_LENGTH_ENV: &str = "PVIEW_PAGE_LENGTH";

/// One column of the patient table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Identifier carried by header and filter click events.
    pub id: &'static str,
    /// Header label.
    pub label: &'static str,
    /// Backing table column used for server-side ordering. `None` means not sortable.
    pub table_col: Option<&'static str>,
}

/// The patient table columns, in display order.
pub const PATIENT_COLUMNS: [ColumnSpec; 7] = [
    ColumnSpec { id: "personID", label: "Patient ID", table_col: Some("person_id") },
    ColumnSpec { id: "gender", label: "Gender", table_col: Some("gender") },
    ColumnSpec { id: "birthDatetime", label: "Date of birth", table_col: Some("birth") },
    ColumnSpec { id: "age", label: "Age", table_col: None },
    ColumnSpec { id: "race", label: "Race", table_col: Some("race") },
    ColumnSpec { id: "ethnicity", label: "Ethnicity", table_col: Some("ethnicity") },
    ColumnSpec { id: "isDeath", label: "Deceased", table_col: Some("death") },
];

/// Looks a column up by its event id or by its backing table column.
pub fn column_spec(id: &str) -> Option<&'static ColumnSpec> {
    PATIENT_COLUMNS
        .iter()
        .find(|spec| spec.id == id || spec.table_col == Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_spec_resolves_event_id_and_table_column() {
        assert_eq!(column_spec("birthDatetime").and_then(|c| c.table_col), Some("birth"));
        assert_eq!(column_spec("death").map(|c| c.id), Some("isDeath"));
        assert!(column_spec("unknown").is_none());
    }

    #[test]
    fn age_column_is_not_sortable() {
        let age = column_spec("age").expect("age column exists");
        assert_eq!(age.table_col, None);
    }
}

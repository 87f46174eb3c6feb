//! Sort-toggle tracking for header clicks.

/// Which column the list is sorted by and in which direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    pub active_column: Option<String>,
    pub descending: bool,
}

/// Decides the sort state after a header click.
///
/// Clicking the active column flips the direction; clicking another column makes it active and
/// ascending. A click without a column (outside any sortable header cell) leaves `prior` as is.
pub fn next_sort_state(clicked_column: Option<&str>, prior: &SortState) -> SortState {
    let Some(column) = clicked_column.map(str::trim).filter(|c| !c.is_empty()) else {
        return prior.clone();
    };

    if prior.active_column.as_deref() == Some(column) {
        SortState {
            active_column: prior.active_column.clone(),
            descending: !prior.descending,
        }
    } else {
        SortState {
            active_column: Some(column.to_string()),
            descending: false,
        }
    }
}

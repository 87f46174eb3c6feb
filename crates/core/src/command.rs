//! UI events and their typed form.
//!
//! The presentation layer reports every interaction as a flat [`UiCommand`]. Decision logic
//! never reads that shape; it works on [`Command`], which only exists once the event's fields
//! have been validated.

use crate::pagination::PageTransition;
use crate::{ListError, ListResult};
use pview_types::{PageLength, PageNumber};
use serde::{Deserialize, Serialize};

/// The interaction a [`UiCommand`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    /// The list page was mounted.
    Mount,
    /// The page-size selector changed. `value` is the new length.
    ChangeLength,
    /// A pagination control was clicked. `value` is `prev`, `next` or a page number.
    Paginate,
    /// A table header cell was clicked. `column_id` is the header id.
    HeaderClick,
    /// A filter icon was clicked. `column_id` is the header id.
    FilterClick,
    /// The active filter was submitted. `value` is the raw widget input.
    FilterSubmit,
    /// The active filter was reset.
    FilterReset,
    /// A row was opened. `value` is the person id.
    OpenDetail,
    /// A visit was selected on the detail page. `value` is the visit id.
    SelectVisit,
}

/// A UI event as reported by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiCommand {
    pub kind: CommandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl UiCommand {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            column_id: None,
            value: None,
        }
    }

    pub fn with_column(mut self, column_id: impl Into<String>) -> Self {
        self.column_id = Some(column_id.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// A validated interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mount,
    ChangeLength(PageLength),
    Paginate(PageTransition),
    HeaderClick(String),
    FilterClick(String),
    FilterSubmit(String),
    FilterReset,
    OpenDetail(String),
    SelectVisit(String),
}

impl Command {
    /// Validates a [`UiCommand`].
    ///
    /// Returns `Ok(None)` when the event carries no target (a click outside any header cell,
    /// an empty row id). Such events are no-ops, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::MalformedEvent`] or [`ListError::Types`] when a required value is
    /// missing or does not parse.
    pub fn parse(event: &UiCommand) -> ListResult<Option<Self>> {
        let column = non_blank(event.column_id.as_deref());
        let value = non_blank(event.value.as_deref());

        let command = match event.kind {
            CommandKind::Mount => Command::Mount,
            CommandKind::FilterReset => Command::FilterReset,
            CommandKind::ChangeLength => {
                Command::ChangeLength(PageLength::parse(required(value, "page length")?)?)
            }
            CommandKind::Paginate => {
                Command::Paginate(parse_transition(required(value, "pagination target")?)?)
            }
            CommandKind::FilterSubmit => {
                // An empty submit is still a submit; the descriptor decides if it is valid.
                Command::FilterSubmit(event.value.clone().unwrap_or_default())
            }
            CommandKind::HeaderClick => match column {
                Some(column) => Command::HeaderClick(column.to_string()),
                None => return Ok(None),
            },
            CommandKind::FilterClick => match column {
                Some(column) => Command::FilterClick(column.to_string()),
                None => return Ok(None),
            },
            CommandKind::OpenDetail => match value {
                Some(id) => Command::OpenDetail(id.to_string()),
                None => return Ok(None),
            },
            CommandKind::SelectVisit => match value {
                Some(id) => Command::SelectVisit(id.to_string()),
                None => return Ok(None),
            },
        };

        Ok(Some(command))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: Option<&'a str>, what: &str) -> ListResult<&'a str> {
    value.ok_or_else(|| ListError::MalformedEvent(format!("missing {what}")))
}

fn parse_transition(raw: &str) -> ListResult<PageTransition> {
    match raw {
        "prev" => Ok(PageTransition::Prev),
        "next" => Ok(PageTransition::Next),
        number => {
            let page = number.parse::<u32>().map_err(|_| {
                ListError::MalformedEvent(format!("'{number}' is not a pagination target"))
            })?;
            Ok(PageTransition::Num(PageNumber::new(page)?))
        }
    }
}

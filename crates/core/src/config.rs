//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the orchestrator as an
//! `Arc<CoreConfig>`. Helpers in this module take already-read values (`Option<String>`, file
//! paths) instead of reading process-wide environment variables themselves, so tests can build
//! any configuration without touching the environment.

use crate::constants::{
    DEFAULT_PAGE_LENGTH, MAX_PAGE_WINDOW, PAGE_CNT, PAGE_LENGTH_OPTIONS, REFERENCE_LISTS,
};
use crate::dispatch::FetchType;
use crate::{ListError, ListResult};
use pview_types::PageLength;
use serde::Deserialize;
use std::path::Path;

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    page_window: u32,
    default_length: PageLength,
    length_options: Vec<PageLength>,
    reference_lists: Vec<FetchType>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::InvalidConfig`] if:
    /// - `page_window` is zero or larger than [`MAX_PAGE_WINDOW`],
    /// - `length_options` is empty or does not contain `default_length`,
    /// - `reference_lists` names a fetch type that is not a reference list.
    pub fn new(
        page_window: u32,
        default_length: PageLength,
        length_options: Vec<PageLength>,
        reference_lists: Vec<FetchType>,
    ) -> ListResult<Self> {
        if page_window == 0 {
            return Err(ListError::InvalidConfig(
                "page_window must be a positive integer".into(),
            ));
        }
        if page_window > MAX_PAGE_WINDOW {
            return Err(ListError::InvalidConfig(format!(
                "page_window {page_window} exceeds the maximum of {MAX_PAGE_WINDOW}"
            )));
        }
        if length_options.is_empty() {
            return Err(ListError::InvalidConfig(
                "length_options cannot be empty".into(),
            ));
        }
        if !length_options.contains(&default_length) {
            return Err(ListError::InvalidConfig(format!(
                "default_length {default_length} is not one of the length_options"
            )));
        }
        if let Some(bad) = reference_lists.iter().find(|f| !f.is_reference_list()) {
            return Err(ListError::InvalidConfig(format!(
                "{bad} is not a reference list"
            )));
        }

        Ok(Self {
            page_window,
            default_length,
            length_options,
            reference_lists,
        })
    }

    pub fn page_window(&self) -> u32 {
        self.page_window
    }

    pub fn default_length(&self) -> PageLength {
        self.default_length
    }

    pub fn length_options(&self) -> &[PageLength] {
        &self.length_options
    }

    pub fn reference_lists(&self) -> &[FetchType] {
        &self.reference_lists
    }

    /// Returns true if `length` may be selected in the page-size selector.
    pub fn allows_length(&self, length: PageLength) -> bool {
        self.length_options.contains(&length)
    }

    /// Returns a copy with a different default page length.
    pub fn with_default_length(&self, default_length: PageLength) -> ListResult<Self> {
        Self::new(
            self.page_window,
            default_length,
            self.length_options.clone(),
            self.reference_lists.clone(),
        )
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            page_window: PAGE_CNT,
            default_length: DEFAULT_PAGE_LENGTH,
            length_options: PAGE_LENGTH_OPTIONS.to_vec(),
            reference_lists: REFERENCE_LISTS.to_vec(),
        }
    }
}

/// On-disk form of the configuration. Every key is optional and falls back to the defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CoreConfigFile {
    page_window: Option<u32>,
    default_length: Option<u32>,
    length_options: Option<Vec<u32>>,
    reference_lists: Option<Vec<FetchType>>,
}

/// Parse a configuration from YAML text.
///
/// This uses `serde_path_to_error` so a schema mismatch reports the failing key
/// (e.g. `length_options[1]`).
pub fn parse_config_yaml(yaml_text: &str) -> ListResult<CoreConfig> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

    let file = match serde_path_to_error::deserialize::<_, CoreConfigFile>(deserializer) {
        Ok(parsed) => parsed,
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            return Err(ListError::InvalidConfig(format!(
                "config schema mismatch at {path}: {source}"
            )));
        }
    };

    let defaults = CoreConfig::default();
    let default_length = match file.default_length {
        Some(value) => PageLength::new(value)?,
        None => defaults.default_length,
    };
    let length_options = match file.length_options {
        Some(values) => values
            .into_iter()
            .map(PageLength::new)
            .collect::<Result<Vec<_>, _>>()?,
        None => defaults.length_options,
    };

    CoreConfig::new(
        file.page_window.unwrap_or(defaults.page_window),
        default_length,
        length_options,
        file.reference_lists.unwrap_or(defaults.reference_lists),
    )
}

/// Load the configuration from an optional YAML file. `None` yields the defaults.
pub fn load_config(path: Option<&Path>) -> ListResult<CoreConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(ListError::ConfigRead)?;
            parse_config_yaml(&text)
        }
        None => Ok(CoreConfig::default()),
    }
}

/// Parse a default page length override from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `None`.
pub fn page_length_from_env_value(value: Option<String>) -> ListResult<Option<PageLength>> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    Ok(value.map(|v| PageLength::parse(&v)).transpose()?)
}

//! # PView Core
//!
//! List-management core of the patient viewer.
//!
//! This crate keeps a remote-backed, filterable, sortable, paginated patient list consistent
//! while fetches race against user interaction:
//! - Which request to issue next for each UI event ([`orchestrator`])
//! - How page numbers are windowed for display ([`pagination`])
//! - Which filter control a clicked column gets ([`filter`])
//! - How fetched rows are narrowed before rendering ([`rows`])
//!
//! **No rendering or transport concerns**: the core reads the store through a
//! [`StoreSnapshot`] and emits actions through a [`Dispatcher`]. Running fetches and drawing the
//! page belong to the host.

pub mod command;
pub mod config;
pub mod constants;
pub mod detail;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod pagination;
pub mod query;
pub mod rows;
pub mod session;
pub mod sort;
pub mod store;

pub use command::{Command, CommandKind, UiCommand};
pub use config::{load_config, page_length_from_env_value, parse_config_yaml, CoreConfig};
pub use dispatch::{Action, Dispatcher, FetchType, RecordingDispatcher};
pub use error::{ListError, ListResult};
pub use orchestrator::{ListOrchestrator, ListView, Outcome};
pub use session::{Handled, Session};
pub use store::{FetchCompletion, FetchPayload, Resolution, Store, StoreSnapshot};

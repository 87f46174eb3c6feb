//! The list fetch orchestrator.
//!
//! [`ListOrchestrator`] turns UI events into dispatched actions and keeps the local display
//! state (page window, sort toggle, active filter descriptor, detail selection). It reads the
//! store only through a [`StoreSnapshot`] and emits actions only through a [`Dispatcher`].
//!
//! Every handler follows the same shape: validate the event, build the complete set of actions,
//! dispatch them as one batch, and only then commit local state. A failure at any step is logged
//! and leaves local state as it was. Request ids are the exception: once staged they are
//! consumed, so an id is never issued twice even if the host delivered part of a failed batch.

use crate::command::{Command, UiCommand};
use crate::config::CoreConfig;
use crate::constants::column_spec;
use crate::detail::{detail_fetches, summarize, DetailView, PatientSummary, VisitRecords};
use crate::dispatch::{Action, Dispatcher, FetchType};
use crate::filter::{build_filter, FilterCommit, FilterDescriptor, FilterInput};
use crate::pagination::{
    apply_transition, clamp_to_limit, limit_page, make_seq_array, Boundary, PageRange,
    PageTransition, PagingContext, Transition,
};
use crate::query::{ListQuery, SortKey};
use crate::rows::{filter_rows, PatientRow};
use crate::sort::{next_sort_state, SortState};
use crate::store::StoreSnapshot;
use crate::{ListError, ListResult};
use pview_types::{NonEmptyText, PageLength, PageNumber};
use pview_uuid::{RequestId, RequestIdGenerator};
use serde::Serialize;
use std::sync::Arc;

/// What handling an event did.
#[derive(Debug)]
pub enum Outcome {
    /// Actions were dispatched; these are the ids of the fetches among them.
    Dispatched { request_ids: Vec<RequestId> },
    /// Local state changed without dispatching anything.
    Updated,
    /// A pagination click was declined at a list boundary.
    Rejected(Boundary),
    /// The event had no effect.
    Ignored,
    /// The event was malformed or dispatching failed. Local state is unchanged.
    Failed(ListError),
}

impl Outcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Outcome::Dispatched { .. })
    }
}

/// Actions staged by a handler, with the request-id generator state they were issued from.
struct Staged {
    ids: RequestIdGenerator,
    actions: Vec<Action>,
    request_ids: Vec<RequestId>,
}

impl Staged {
    fn new(ids: &RequestIdGenerator) -> Self {
        Self {
            ids: ids.clone(),
            actions: Vec::new(),
            request_ids: Vec::new(),
        }
    }

    fn fetch(&mut self, fetch_type: FetchType, query: Option<&ListQuery>) {
        let request_id = self.ids.next_id();
        self.request_ids.push(request_id.clone());
        self.actions.push(Action::FetchData {
            fetch_type,
            id: None,
            params: query.map(ListQuery::to_params),
            request_id,
        });
    }

    fn push(&mut self, action: Action) {
        if let Action::FetchData { request_id, .. } = &action {
            self.request_ids.push(request_id.clone());
        }
        self.actions.push(action);
    }
}

/// Keeps a remote-backed patient list consistent with user interaction.
#[derive(Debug)]
pub struct ListOrchestrator {
    cfg: Arc<CoreConfig>,
    ids: RequestIdGenerator,
    range: PageRange,
    sort: SortState,
    confirmed_sort: Option<SortKey>,
    active_filter: Option<FilterDescriptor>,
    last_query: Option<ListQuery>,
    detail: DetailView,
}

impl ListOrchestrator {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let range = PageRange::initial(cfg.page_window());
        Self {
            cfg,
            ids: RequestIdGenerator::new(),
            range,
            sort: SortState::default(),
            confirmed_sort: None,
            active_filter: None,
            last_query: None,
            detail: DetailView::default(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// The page window currently offered for direct navigation.
    pub fn range(&self) -> PageRange {
        self.range
    }

    /// The sort toggle state the next header click starts from.
    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    /// The sort carried by the last header-click request.
    pub fn confirmed_sort(&self) -> Option<&SortKey> {
        self.confirmed_sort.as_ref()
    }

    pub fn active_filter(&self) -> Option<&FilterDescriptor> {
        self.active_filter.as_ref()
    }

    /// The last patient-list query that was dispatched successfully.
    pub fn last_query(&self) -> Option<&ListQuery> {
        self.last_query.as_ref()
    }

    pub fn detail(&self) -> &DetailView {
        &self.detail
    }

    /// Handles one UI event.
    pub fn handle<D: Dispatcher>(
        &mut self,
        event: &UiCommand,
        snapshot: &StoreSnapshot,
        dispatcher: &mut D,
    ) -> Outcome {
        let command = match Command::parse(event) {
            Ok(Some(command)) => command,
            Ok(None) => {
                tracing::debug!(kind = ?event.kind, "event without a target ignored");
                return Outcome::Ignored;
            }
            Err(err) => {
                tracing::warn!(kind = ?event.kind, error = %err, "malformed event ignored");
                return Outcome::Failed(err);
            }
        };

        match self.execute(command, snapshot, dispatcher) {
            Ok(outcome) => outcome,
            Err(err) => {
                match &err {
                    ListError::Dispatch(_) | ListError::Serialization(_) => {
                        tracing::error!(kind = ?event.kind, error = %err, "dispatch failed, state kept")
                    }
                    _ => tracing::warn!(kind = ?event.kind, error = %err, "event rejected"),
                }
                Outcome::Failed(err)
            }
        }
    }

    fn execute<D: Dispatcher>(
        &mut self,
        command: Command,
        snapshot: &StoreSnapshot,
        dispatcher: &mut D,
    ) -> ListResult<Outcome> {
        match command {
            Command::Mount => self.mount(snapshot, dispatcher),
            Command::ChangeLength(length) => self.change_length(length, snapshot, dispatcher),
            Command::Paginate(transition) => self.paginate(transition, snapshot, dispatcher),
            Command::HeaderClick(column_id) => self.header_click(&column_id, snapshot, dispatcher),
            Command::FilterClick(column_id) => Ok(self.filter_click(&column_id, snapshot)),
            Command::FilterSubmit(raw) => self.filter_submit(&raw, snapshot, dispatcher),
            Command::FilterReset => self.filter_reset(snapshot, dispatcher),
            Command::OpenDetail(id) => self.open_detail(&id, dispatcher),
            Command::SelectVisit(visit_id) => Ok(self.select_visit(&visit_id, snapshot)),
        }
    }

    /// The query the store's current state describes, with the last confirmed sort.
    fn base_query(&self, snapshot: &StoreSnapshot) -> ListQuery {
        ListQuery::new(snapshot.pagination.page, snapshot.pagination.length)
            .with_sort(self.confirmed_sort.clone())
            .with_filters(snapshot.filters.clone())
    }

    fn send<D: Dispatcher>(&mut self, staged: Staged, dispatcher: &mut D) -> ListResult<Outcome> {
        let Staged {
            ids,
            actions,
            request_ids,
        } = staged;
        self.ids = ids;
        dispatcher.dispatch_batch(actions)?;
        Ok(Outcome::Dispatched { request_ids })
    }

    fn mount<D: Dispatcher>(
        &mut self,
        snapshot: &StoreSnapshot,
        dispatcher: &mut D,
    ) -> ListResult<Outcome> {
        let query = self.base_query(snapshot);
        let mut staged = Staged::new(&self.ids);
        staged.fetch(FetchType::Patient, Some(&query));
        for list in self.cfg.reference_lists() {
            staged.fetch(*list, None);
        }

        let outcome = self.send(staged, dispatcher)?;
        tracing::info!(page = %query.page(), length = %query.length(), "patient list mounted");
        self.last_query = Some(query);
        Ok(outcome)
    }

    fn change_length<D: Dispatcher>(
        &mut self,
        length: PageLength,
        snapshot: &StoreSnapshot,
        dispatcher: &mut D,
    ) -> ListResult<Outcome> {
        if !self.cfg.allows_length(length) {
            return Err(ListError::UnsupportedPageLength(length.get()));
        }

        let query = self.base_query(snapshot).with_length(length);
        let mut staged = Staged::new(&self.ids);
        staged.fetch(FetchType::Patient, Some(&query));
        staged.push(Action::SetPagination {
            page: PageNumber::FIRST,
            length,
        });

        let outcome = self.send(staged, dispatcher)?;
        tracing::debug!(%length, "page length changed");
        self.range = PageRange::initial(self.cfg.page_window());
        self.last_query = Some(query);
        Ok(outcome)
    }

    fn paginate<D: Dispatcher>(
        &mut self,
        transition: PageTransition,
        snapshot: &StoreSnapshot,
        dispatcher: &mut D,
    ) -> ListResult<Outcome> {
        let ctx = PagingContext {
            current_page: snapshot.pagination.page,
            length: snapshot.pagination.length,
            total_length: snapshot.total_length(),
            page_cnt: self.cfg.page_window(),
        };

        let (page, range) = match apply_transition(transition, &ctx) {
            Transition::Accepted { page, range } => (page, range),
            Transition::Rejected(boundary) => {
                tracing::debug!(?transition, ?boundary, current = %ctx.current_page, "pagination declined");
                return Ok(Outcome::Rejected(boundary));
            }
        };

        let query = self.base_query(snapshot).with_page(page);
        let mut staged = Staged::new(&self.ids);
        staged.fetch(FetchType::Patient, Some(&query));
        staged.push(Action::SetPage { page });

        let outcome = self.send(staged, dispatcher)?;
        tracing::debug!(?transition, %page, "page changed");
        if let Some(range) = range {
            self.range = range;
        }
        self.last_query = Some(query);
        Ok(outcome)
    }

    fn header_click<D: Dispatcher>(
        &mut self,
        column_id: &str,
        snapshot: &StoreSnapshot,
        dispatcher: &mut D,
    ) -> ListResult<Outcome> {
        let Some(table_col) = column_spec(column_id).and_then(|spec| spec.table_col) else {
            tracing::debug!(column_id, "header is not sortable");
            return Ok(Outcome::Ignored);
        };

        // The request carries the direction from before this click.
        let key = SortKey {
            column: table_col.to_string(),
            descending: self.sort.descending,
        };
        let query = self.base_query(snapshot).with_sort(Some(key.clone()));
        let mut staged = Staged::new(&self.ids);
        staged.fetch(FetchType::Patient, Some(&query));

        let outcome = self.send(staged, dispatcher)?;
        self.sort = next_sort_state(Some(table_col), &self.sort);
        tracing::debug!(column = table_col, descending = key.descending, "sort requested");
        self.confirmed_sort = Some(key);
        self.last_query = Some(query);
        Ok(outcome)
    }

    fn filter_click(&mut self, column_id: &str, snapshot: &StoreSnapshot) -> Outcome {
        let Some(descriptor) = build_filter(column_id, &snapshot.reference_data()) else {
            tracing::debug!(column_id, "column is not filterable, filter closed");
            return match self.active_filter.take() {
                Some(_) => Outcome::Updated,
                None => Outcome::Ignored,
            };
        };

        let current = snapshot.filters.get(&descriptor.column()).cloned();
        let descriptor = descriptor.with_current(current);
        tracing::debug!(column = %descriptor.column(), current = ?descriptor.current_value(), "filter opened");
        self.active_filter = Some(descriptor);
        Outcome::Updated
    }

    fn filter_submit<D: Dispatcher>(
        &mut self,
        raw: &str,
        snapshot: &StoreSnapshot,
        dispatcher: &mut D,
    ) -> ListResult<Outcome> {
        let Some(descriptor) = self.active_filter.clone() else {
            tracing::debug!("filter submit without an open filter");
            return Ok(Outcome::Ignored);
        };

        let input = FilterInput::parse(descriptor.column(), raw)?;
        let commit = descriptor.submit(input)?;
        self.commit_filter(descriptor, commit, snapshot, dispatcher)
    }

    fn filter_reset<D: Dispatcher>(
        &mut self,
        snapshot: &StoreSnapshot,
        dispatcher: &mut D,
    ) -> ListResult<Outcome> {
        let Some(descriptor) = self.active_filter.clone() else {
            tracing::debug!("filter reset without an open filter");
            return Ok(Outcome::Ignored);
        };

        let commit = descriptor.reset();
        self.commit_filter(descriptor, commit, snapshot, dispatcher)
    }

    fn commit_filter<D: Dispatcher>(
        &mut self,
        descriptor: FilterDescriptor,
        commit: FilterCommit,
        snapshot: &StoreSnapshot,
        dispatcher: &mut D,
    ) -> ListResult<Outcome> {
        let query = self
            .base_query(snapshot)
            .with_filter(commit.column, commit.value.clone());
        let mut staged = Staged::new(&self.ids);
        staged.push(commit.to_action());
        staged.fetch(FetchType::Patient, Some(&query));

        let outcome = self.send(staged, dispatcher)?;
        tracing::debug!(column = %commit.column, value = ?commit.value, "filter committed");
        self.active_filter = Some(descriptor.with_current(commit.value));
        self.last_query = Some(query);
        Ok(outcome)
    }

    fn open_detail<D: Dispatcher>(&mut self, id: &str, dispatcher: &mut D) -> ListResult<Outcome> {
        let patient_id = NonEmptyText::new(id)?;
        let mut staged = Staged::new(&self.ids);
        for action in detail_fetches(patient_id.as_str(), &mut staged.ids) {
            staged.push(action);
        }

        let outcome = self.send(staged, dispatcher)?;
        tracing::debug!(patient_id = %patient_id, "patient detail opened");
        self.detail.open(patient_id);
        Ok(outcome)
    }

    fn select_visit(&mut self, visit_id: &str, snapshot: &StoreSnapshot) -> Outcome {
        let visits = snapshot.api.patient_visit.as_deref().unwrap_or_default();
        if self.detail.select_visit(visit_id, visits) {
            Outcome::Updated
        } else {
            tracing::debug!(visit_id, "visit selection unchanged");
            Outcome::Ignored
        }
    }

    /// Derives what the list page renders from the store and local state.
    pub fn view(&self, snapshot: &StoreSnapshot) -> ListView {
        let total_length = snapshot.total_length();
        let page_numbers = match total_length {
            Some(total) => clamp_to_limit(&self.range, limit_page(total, snapshot.pagination.length)),
            None => make_seq_array(&self.range),
        };
        let rows = snapshot
            .api
            .patient
            .as_ref()
            .map(|set| filter_rows(set.rows(), &snapshot.filters))
            .unwrap_or_default();

        let api = &snapshot.api;
        let conditions = api.patient_cond.as_deref().unwrap_or_default();
        let drugs = api.patient_drug.as_deref().unwrap_or_default();
        let summary = match (self.detail.patient_id(), api.patient_visit.as_deref()) {
            (Some(_), Some(visits)) => Some(summarize(visits, conditions)),
            _ => None,
        };

        ListView {
            rows,
            total_length,
            current_page: snapshot.pagination.page,
            page_numbers,
            sort: self.confirmed_sort.clone(),
            active_filter: self.active_filter.clone(),
            detail_patient: self.detail.patient_id().map(|id| id.to_string()),
            summary,
            visit: self.detail.visit_records(conditions, drugs),
        }
    }
}

/// Everything the list page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub rows: Vec<PatientRow>,
    pub total_length: Option<u64>,
    pub current_page: PageNumber,
    pub page_numbers: Vec<u32>,
    pub sort: Option<SortKey>,
    pub active_filter: Option<FilterDescriptor>,
    pub detail_patient: Option<String>,
    pub summary: Option<PatientSummary>,
    pub visit: Option<VisitRecords>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use crate::dispatch::RecordingDispatcher;
    use crate::store::Store;

    fn orchestrator() -> ListOrchestrator {
        ListOrchestrator::new(Arc::new(CoreConfig::default()))
    }

    #[test]
    fn mount_fetches_patient_and_reference_lists() {
        let mut orch = orchestrator();
        let store = Store::new(orch.config());
        let mut dispatcher = RecordingDispatcher::new();

        let outcome = orch.handle(&UiCommand::new(CommandKind::Mount), store.snapshot(), &mut dispatcher);

        let Outcome::Dispatched { request_ids } = outcome else {
            panic!("expected dispatch, got {outcome:?}");
        };
        assert_eq!(request_ids.len(), 4);
        let types: Vec<FetchType> = dispatcher
            .fetches()
            .into_iter()
            .filter_map(|a| match a {
                Action::FetchData { fetch_type, .. } => Some(*fetch_type),
                _ => None,
            })
            .collect();
        assert_eq!(
            types,
            vec![
                FetchType::Patient,
                FetchType::Race,
                FetchType::Gender,
                FetchType::Ethnicity
            ]
        );
        assert!(orch.last_query().is_some());
    }

    #[test]
    fn unsupported_length_fails_without_dispatch() {
        let mut orch = orchestrator();
        let store = Store::new(orch.config());
        let mut dispatcher = RecordingDispatcher::new();

        let outcome = orch.handle(
            &UiCommand::new(CommandKind::ChangeLength).with_value("15"),
            store.snapshot(),
            &mut dispatcher,
        );
        assert!(matches!(outcome, Outcome::Failed(ListError::UnsupportedPageLength(15))));
        assert!(dispatcher.actions().is_empty());
    }

    #[test]
    fn age_header_is_not_sortable() {
        let mut orch = orchestrator();
        let store = Store::new(orch.config());
        let mut dispatcher = RecordingDispatcher::new();

        let outcome = orch.handle(
            &UiCommand::new(CommandKind::HeaderClick).with_column("age"),
            store.snapshot(),
            &mut dispatcher,
        );
        assert!(matches!(outcome, Outcome::Ignored));
        assert_eq!(orch.sort_state(), &SortState::default());
    }

    #[test]
    fn filter_click_opens_descriptor_without_fetch() {
        let mut orch = orchestrator();
        let store = Store::new(orch.config());
        let mut dispatcher = RecordingDispatcher::new();

        let outcome = orch.handle(
            &UiCommand::new(CommandKind::FilterClick).with_column("isDeath"),
            store.snapshot(),
            &mut dispatcher,
        );
        assert!(matches!(outcome, Outcome::Updated));
        assert!(dispatcher.actions().is_empty());
        assert_eq!(
            orch.active_filter().map(FilterDescriptor::column),
            Some(crate::filter::FilterColumn::IsDeath)
        );
    }

    #[test]
    fn unfilterable_column_closes_open_descriptor() {
        let mut orch = orchestrator();
        let store = Store::new(orch.config());
        let mut dispatcher = RecordingDispatcher::new();

        orch.handle(
            &UiCommand::new(CommandKind::FilterClick).with_column("age"),
            store.snapshot(),
            &mut dispatcher,
        );
        let outcome = orch.handle(
            &UiCommand::new(CommandKind::FilterClick).with_column("birthDatetime"),
            store.snapshot(),
            &mut dispatcher,
        );
        assert!(matches!(outcome, Outcome::Updated));
        assert!(orch.active_filter().is_none());
        assert!(dispatcher.actions().is_empty());

        // Nothing open, nothing to close.
        let outcome = orch.handle(
            &UiCommand::new(CommandKind::FilterClick).with_column("personID"),
            store.snapshot(),
            &mut dispatcher,
        );
        assert!(matches!(outcome, Outcome::Ignored));
    }

    #[test]
    fn submit_without_open_filter_is_ignored() {
        let mut orch = orchestrator();
        let store = Store::new(orch.config());
        let mut dispatcher = RecordingDispatcher::new();

        let outcome = orch.handle(
            &UiCommand::new(CommandKind::FilterSubmit).with_value("F"),
            store.snapshot(),
            &mut dispatcher,
        );
        assert!(matches!(outcome, Outcome::Ignored));
    }

    #[test]
    fn view_before_first_fetch_shows_whole_window() {
        let orch = orchestrator();
        let store = Store::new(orch.config());
        let view = orch.view(store.snapshot());
        assert!(view.rows.is_empty());
        assert_eq!(view.total_length, None);
        assert_eq!(view.page_numbers, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn open_detail_with_blank_id_is_ignored() {
        let mut orch = orchestrator();
        let store = Store::new(orch.config());
        let mut dispatcher = RecordingDispatcher::new();

        let outcome = orch.handle(
            &UiCommand::new(CommandKind::OpenDetail).with_value("  "),
            store.snapshot(),
            &mut dispatcher,
        );
        assert!(matches!(outcome, Outcome::Ignored));
        assert!(orch.detail().patient_id().is_none());
    }
}

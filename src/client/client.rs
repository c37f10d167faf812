use std::time::Duration;

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;
use tracing::{debug, info, warn};

use super::events::{self, Notification};
use super::slot::Workflow;
use crate::arena::{SlotArena, SlotId};
use crate::call::AsyncCall;
use crate::config::WorkshopConfig;
use crate::driver::PollDriver;
use crate::error::WorkshopError;
use crate::item::{DeletedItem, ItemEdit, ItemOutcome, ItemPhase, ItemWorkflow};
use crate::query::{
    BrowseFilter, ItemDetails, QueryDetails, QueryOptions, QueryResults, QueryStatus, QueryTarget,
    QueryWorkflow,
};
use crate::state::{DownloadProgress, InstallInfo, ItemState};
use crate::transport::{ItemId, Request, Transport};

/// Session with the workshop service.
///
/// Owns the transport and every open query or item workflow. Workflows
/// are addressed by [`SlotId`]; ids of finished workflows are reused.
/// Nothing advances on its own: call [`WorkshopClient::update`] after
/// pumping the transport, or let [`WorkshopClient::wait_until`] do both.
pub struct WorkshopClient<T: Transport> {
    transport: T,
    config: WorkshopConfig,
    slots: SlotArena<Workflow>,
    deletions: Vec<AsyncCall<DeletedItem>>,
    closed: bool,
    #[cfg(feature = "emitter")]
    emitter: EventEmitter,
}

impl<T: Transport> WorkshopClient<T> {
    /// Open a session on `transport`.
    pub fn connect(mut transport: T, config: WorkshopConfig) -> Result<Self, WorkshopError> {
        transport.connect()?;
        info!(app_id = config.app_id, "workshop session opened");
        Ok(WorkshopClient {
            transport,
            config,
            slots: SlotArena::new(),
            deletions: Vec::new(),
            closed: false,
            #[cfg(feature = "emitter")]
            emitter: EventEmitter::new(),
        })
    }

    /// Release every open slot and pending deletion, then disconnect.
    ///
    /// Runs once; later calls, including the one from `Drop`, do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        for id in self.slots.ids() {
            warn!(%id, "slot still open at shutdown");
            self.slots.release(id, &mut self.transport);
        }
        for mut deletion in self.deletions.drain(..) {
            if let Some(handle) = deletion.reset() {
                self.transport.release(handle);
            }
        }
        self.transport.disconnect();
        info!("workshop session closed");
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn config(&self) -> &WorkshopConfig {
        &self.config
    }

    /// Number of open query and item slots.
    pub fn open_slots(&self) -> usize {
        self.slots.len()
    }

    /// Advance every open slot in slot order, then pending deletions.
    pub fn update(&mut self) {
        for id in self.slots.ids() {
            if matches!(self.slots.get(id), Workflow::Query(_)) {
                self.advance_query(id);
            } else {
                self.advance_item(id);
            }
        }
        self.advance_deletions();
    }

    /// Pump and update until `condition` holds or `timeout` passes.
    ///
    /// Returns false on timeout; nothing is cancelled.
    pub fn wait_until<C>(&mut self, timeout: Duration, condition: C) -> bool
    where
        C: FnMut(&Self) -> bool,
    {
        let driver = PollDriver::new(timeout, self.config.poll_interval());
        driver.wait_until(
            self,
            |client| {
                client.transport.pump();
                client.update();
            },
            condition,
        )
    }

    /// Register a listener for one of the notifications in
    /// [`crate::client::events`]. The listener receives a JSON
    /// [`Notification`] on a background thread.
    #[cfg(feature = "emitter")]
    pub fn on<F>(&mut self, event: &str, listener: F) -> String
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.on(event, listener)
    }

    #[cfg(feature = "emitter")]
    fn emit(&mut self, event: &str, notification: &Notification) {
        match serde_json::to_string(notification) {
            Ok(body) => {
                self.emitter.emit(event, body);
            }
            Err(err) => warn!(event, error = %err, "notification not serializable"),
        }
    }

    #[cfg(not(feature = "emitter"))]
    fn emit(&mut self, _event: &str, _notification: &Notification) {}

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Query full details of `ids`.
    ///
    /// # Panics
    ///
    /// If `ids` is empty.
    pub fn create_details_query(&mut self, options: QueryOptions, ids: &[ItemId]) -> SlotId {
        let query = QueryWorkflow::submit(
            &mut self.transport,
            self.config.app_id,
            options,
            QueryTarget::Details(ids.to_vec()),
        );
        self.slots.allocate(Workflow::Query(query))
    }

    /// Query one page of items matching `filter`.
    ///
    /// # Panics
    ///
    /// If `filter.page` is 0.
    pub fn create_browse_query(&mut self, options: QueryOptions, filter: BrowseFilter) -> SlotId {
        let query = QueryWorkflow::submit(
            &mut self.transport,
            self.config.app_id,
            options,
            QueryTarget::Browse(filter),
        );
        self.slots.allocate(Workflow::Query(query))
    }

    fn query(&self, id: SlotId) -> &QueryWorkflow {
        match self.slots.get(id) {
            Workflow::Query(query) => query,
            Workflow::Item(_) => panic!("{} holds an item workflow, not a query", id),
        }
    }

    /// Whether `id` names an open query.
    pub fn is_query_valid(&self, id: SlotId) -> bool {
        self.slots.contains(id) && matches!(self.slots.get(id), Workflow::Query(_))
    }

    pub fn query_status(&self, id: SlotId) -> QueryStatus {
        self.query(id).status()
    }

    pub fn query_options(&self, id: SlotId) -> &QueryOptions {
        self.query(id).options()
    }

    pub fn query_results(&self, id: SlotId) -> QueryResults {
        self.query(id).results()
    }

    pub fn query_detail(&self, id: SlotId, index: usize) -> &ItemDetails {
        self.query(id).detail(index)
    }

    pub fn query_metadata(&self, id: SlotId, index: usize) -> &str {
        self.query(id).metadata(index)
    }

    pub fn query_key_value_tags(&self, id: SlotId, index: usize) -> &[(String, String)] {
        self.query(id).key_value_tags(index)
    }

    pub fn query_error(&self, id: SlotId) -> String {
        self.query(id).error()
    }

    /// Free the query's slot and release its handle.
    pub fn finish_query(&mut self, id: SlotId) {
        self.query(id);
        self.slots.release(id, &mut self.transport);
    }

    /// Read every result of a completed details query, then finish it.
    pub fn finish_details_query(&mut self, id: SlotId) -> Vec<QueryDetails> {
        let details = self.query(id).collect_details();
        self.finish_query(id);
        details
    }

    /// Read the ids of a completed browse query, then finish it.
    pub fn finish_browse_query(&mut self, id: SlotId) -> Vec<ItemId> {
        let ids = self.query(id).collect_ids();
        self.finish_query(id);
        ids
    }

    /// Wait until none of `ids` is pending. Returns false on timeout.
    pub fn wait_for_queries(&mut self, ids: &[SlotId], timeout: Duration) -> bool {
        let ids = ids.to_vec();
        self.wait_until(timeout, move |client| {
            ids.iter().all(|id| !client.query(*id).is_pending())
        })
    }

    fn advance_query(&mut self, id: SlotId) {
        let Workflow::Query(query) = self.slots.get_mut(id) else {
            return;
        };
        if !query.is_pending() {
            return;
        }
        query.poll(&mut self.transport);
        if query.is_pending() {
            return;
        }

        let (event, notification) = match query.status() {
            QueryStatus::Completed => (
                events::QUERY_COMPLETED,
                Notification {
                    slot: Some(id.index()),
                    count: Some(query.results().count),
                    ..Default::default()
                },
            ),
            _ => {
                warn!(%id, error = %query.error(), "query failed");
                (
                    events::QUERY_FAILED,
                    Notification {
                        slot: Some(id.index()),
                        error: Some(query.error()),
                        ..Default::default()
                    },
                )
            }
        };
        debug!(%id, event, "query finished");
        self.emit(event, &notification);
    }

    // ---------------------------------------------------------------------
    // Items
    // ---------------------------------------------------------------------

    /// Start creating a new item, or updating `existing_id`, with `edit`.
    ///
    /// # Panics
    ///
    /// If another unfinished workflow already updates `existing_id`.
    pub fn begin_item(&mut self, edit: ItemEdit, existing_id: Option<ItemId>) -> SlotId {
        if let Some(target) = existing_id {
            for id in self.slots.ids() {
                if let Workflow::Item(item) = self.slots.get(id) {
                    let busy = matches!(item.phase(), ItemPhase::Creating | ItemPhase::Updating)
                        && item.existing_id() == Some(target);
                    assert!(!busy, "item {} is already being updated in {}", target, id);
                }
            }
        }
        let workflow =
            ItemWorkflow::begin(&mut self.transport, self.config.app_id, edit, existing_id);
        self.slots.allocate(Workflow::Item(workflow))
    }

    fn item(&self, id: SlotId) -> &ItemWorkflow {
        match self.slots.get(id) {
            Workflow::Item(item) => item,
            Workflow::Query(_) => panic!("{} holds a query, not an item workflow", id),
        }
    }

    pub fn item_phase(&self, id: SlotId) -> ItemPhase {
        self.item(id).phase()
    }

    /// Advance the workflow; `Some` once it reached an outcome.
    pub fn poll_item(&mut self, id: SlotId) -> Option<ItemOutcome> {
        self.item(id);
        self.advance_item(id)
    }

    fn advance_item(&mut self, id: SlotId) -> Option<ItemOutcome> {
        let Workflow::Item(item) = self.slots.get_mut(id) else {
            return None;
        };
        let was_terminal = item.phase().is_terminal();
        let outcome = item.poll(&mut self.transport);
        if was_terminal {
            return outcome;
        }

        if let Some(finished) = &outcome {
            let (event, notification) = match finished {
                ItemOutcome::Succeeded {
                    item_id, created, ..
                } => (
                    events::ITEM_SUCCEEDED,
                    Notification {
                        slot: Some(id.index()),
                        item_id: Some(*item_id),
                        created: Some(*created),
                        ..Default::default()
                    },
                ),
                ItemOutcome::Failed {
                    reason,
                    item_id,
                    created,
                } => (
                    events::ITEM_FAILED,
                    Notification {
                        slot: Some(id.index()),
                        item_id: *item_id,
                        created: Some(*created),
                        error: Some(reason.to_string()),
                        ..Default::default()
                    },
                ),
            };
            self.emit(event, &notification);
        }
        outcome
    }

    /// Abandon an unfinished item workflow.
    ///
    /// An item minted by the workflow's create step is deleted. The slot
    /// stays open until [`WorkshopClient::finish_item`].
    ///
    /// # Panics
    ///
    /// If the workflow already reached an outcome.
    pub fn cancel_item(&mut self, id: SlotId) {
        let orphan = match self.slots.get_mut(id) {
            Workflow::Item(item) => item.cancel(&mut self.transport),
            Workflow::Query(_) => panic!("{} holds a query, not an item workflow", id),
        };
        if let Some(item_id) = orphan {
            info!(item_id, "removing item created by a cancelled workflow");
            self.delete_item(item_id);
        }
    }

    /// Free the item workflow's slot, returning its outcome if it had one.
    pub fn finish_item(&mut self, id: SlotId) -> Option<ItemOutcome> {
        self.item(id);
        match self.slots.release(id, &mut self.transport) {
            Workflow::Item(item) => item.outcome().cloned(),
            Workflow::Query(_) => None,
        }
    }

    /// Submit a deletion; it is tracked by `update` until it completes.
    pub fn delete_item(&mut self, item_id: ItemId) {
        info!(item_id, "deleting item");
        let call = AsyncCall::submit(&mut self.transport, Request::DeleteItem(item_id));
        self.deletions.push(call);
    }

    /// Deletions submitted but not yet confirmed.
    pub fn pending_deletions(&self) -> usize {
        self.deletions.len()
    }

    fn advance_deletions(&mut self) {
        let mut finished = Vec::new();
        let mut index = 0;
        while index < self.deletions.len() {
            let call = &mut self.deletions[index];
            call.poll(&mut self.transport);
            if call.is_terminal() {
                finished.push(self.deletions.remove(index));
            } else {
                index += 1;
            }
        }

        for mut call in finished {
            let notification = match call.take_result() {
                Some(reply) if reply.result.is_ok() => {
                    info!(item_id = reply.item_id, "item deleted");
                    Notification {
                        item_id: Some(reply.item_id),
                        ..Default::default()
                    }
                }
                Some(reply) => {
                    warn!(item_id = reply.item_id, result = %reply.result, "item deletion rejected");
                    Notification {
                        item_id: Some(reply.item_id),
                        error: Some(reply.result.error_text()),
                        ..Default::default()
                    }
                }
                None => {
                    let error = call.failure().map(|failure| failure.to_string());
                    warn!(error = ?error, "item deletion failed");
                    Notification {
                        error,
                        ..Default::default()
                    }
                }
            };
            if let Some(handle) = call.reset() {
                self.transport.release(handle);
            }
            self.emit(events::ITEM_DELETED, &notification);
        }
    }

    // ---------------------------------------------------------------------
    // Local install state
    // ---------------------------------------------------------------------

    pub fn item_state(&self, item_id: ItemId) -> ItemState {
        self.transport.item_state(item_id)
    }

    pub fn is_installed(&self, item_id: ItemId) -> bool {
        self.item_state(item_id).is_installed()
    }

    pub fn is_downloading(&self, item_id: ItemId) -> bool {
        self.item_state(item_id).is_downloading()
    }

    /// Request a download. Returns false if it could not start.
    pub fn download_item(&mut self, item_id: ItemId, high_priority: bool) -> bool {
        debug!(item_id, high_priority, "download requested");
        self.transport.start_download(item_id, high_priority)
    }

    pub fn download_progress(&self, item_id: ItemId) -> Option<DownloadProgress> {
        self.transport.download_progress(item_id)
    }

    pub fn install_info(&self, item_id: ItemId) -> Option<InstallInfo> {
        self.transport.install_info(item_id)
    }
}

impl<T: Transport> Drop for WorkshopClient<T> {
    fn drop(&mut self) {
        self.close();
    }
}

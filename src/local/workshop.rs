use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::catalog::{folder_size, Catalog, StoredItem};
use crate::call::CallPayload;
use crate::error::{CallFailure, ResultCode, TransportError};
use crate::item::{CreatedItem, DeletedItem, ItemUpdate, SubmittedUpdate};
use crate::query::{QueryEntry, QueryPage, QueryRequest, QueryTarget};
use crate::state::{DownloadProgress, InstallInfo, ItemState};
use crate::transport::{CallHandle, CallOutcome, ItemId, Request, Transport};

#[derive(Debug, Clone, Copy)]
enum Forced {
    Fail(CallFailure),
    Reject(ResultCode),
}

#[derive(Debug)]
enum Entry {
    Waiting {
        request: Request,
        ready_at: u64,
        forced: Option<Forced>,
    },
    Done(CallOutcome),
}

#[derive(Debug, Clone, Copy)]
struct Download {
    downloaded: u64,
    total: u64,
}

/// Single-process stand-in for the remote workshop service.
///
/// Requests complete `latency` pumps after submission, in handle order.
/// The catalog can be persisted as JSON, which is what the `workshop`
/// binary does between runs. Failure injection hooks make it usable as a
/// test double:
///
/// ```
/// use workshop_rust::{CallFailure, LocalWorkshop, Request, Transport, CallOutcome};
///
/// let mut workshop = LocalWorkshop::new();
/// workshop.fail_next(CallFailure::NetworkFailure);
/// let handle = workshop.submit(Request::DeleteItem(7));
/// workshop.pump();
/// assert_eq!(workshop.poll(handle), CallOutcome::Failed(CallFailure::NetworkFailure));
/// ```
#[derive(Debug)]
pub struct LocalWorkshop {
    catalog: Catalog,
    calls: BTreeMap<CallHandle, Entry>,
    downloads: HashMap<ItemId, Download>,
    next_handle: u64,
    tick: u64,
    latency: u64,
    download_pumps: u64,
    page_size: usize,
    connected: bool,
    offline: bool,
    refuse_submissions: bool,
    legal_agreement_accepted: bool,
    next_forced: Option<Forced>,
    requests: Vec<Request>,
    released: Vec<CallHandle>,
}

impl Default for LocalWorkshop {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalWorkshop {
    pub fn new() -> Self {
        Self::with_catalog(Catalog::default())
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        LocalWorkshop {
            catalog,
            calls: BTreeMap::new(),
            downloads: HashMap::new(),
            next_handle: 1,
            tick: 0,
            latency: 1,
            download_pumps: 4,
            page_size: 50,
            connected: false,
            offline: false,
            refuse_submissions: false,
            legal_agreement_accepted: true,
            next_forced: None,
            requests: Vec::new(),
            released: Vec::new(),
        }
    }

    /// Load the catalog stored at `path`, or start empty if there is none.
    pub fn open(path: &Path) -> Result<Self, TransportError> {
        Ok(Self::with_catalog(Catalog::load(path)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), TransportError> {
        self.catalog.save(path)
    }

    /// Pumps between submission and completion (at least one).
    pub fn with_latency(mut self, pumps: u64) -> Self {
        self.latency = pumps.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn set_latency(&mut self, pumps: u64) {
        self.latency = pumps.max(1);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    /// Make `connect` fail as if the service were not running.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Make `submit` return the invalid handle.
    pub fn refuse_submissions(&mut self, refuse: bool) {
        self.refuse_submissions = refuse;
    }

    pub fn set_legal_agreement_accepted(&mut self, accepted: bool) {
        self.legal_agreement_accepted = accepted;
    }

    /// Fail the next submitted request with a transport failure.
    pub fn fail_next(&mut self, failure: CallFailure) {
        self.next_forced = Some(Forced::Fail(failure));
    }

    /// Answer the next submitted request with an application error.
    pub fn reject_next(&mut self, result: ResultCode) {
        self.next_forced = Some(Forced::Reject(result));
    }

    /// Fail every request that has not completed yet.
    pub fn fail_pending(&mut self, failure: CallFailure) {
        for entry in self.calls.values_mut() {
            if let Entry::Waiting { forced, .. } = entry {
                *forced = Some(Forced::Fail(failure));
            }
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn item(&self, id: ItemId) -> Option<&StoredItem> {
        self.catalog.items.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut StoredItem> {
        self.catalog.items.get_mut(&id)
    }

    /// Add a public item owned by someone else directly to the catalog.
    pub fn publish(&mut self, title: &str, description: &str, tags: &[&str]) -> ItemId {
        let id = self.catalog.mint_id();
        let now = now_secs();
        self.catalog.items.insert(
            id,
            StoredItem {
                id,
                owner_id: self.catalog.owner_id + 1,
                title: title.to_string(),
                description: description.to_string(),
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
                created_at: now,
                updated_at: now,
                ..Default::default()
            },
        );
        id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Every request submitted so far, in order.
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Ids of every delete request submitted so far.
    pub fn delete_requests(&self) -> Vec<ItemId> {
        self.requests
            .iter()
            .filter_map(|request| match request {
                Request::DeleteItem(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Handles released so far, in order.
    pub fn released(&self) -> &[CallHandle] {
        &self.released
    }

    /// Handles submitted but not yet released.
    pub fn open_handles(&self) -> Vec<CallHandle> {
        self.calls.keys().copied().collect()
    }

    pub fn pumps(&self) -> u64 {
        self.tick
    }

    fn execute(&mut self, request: &Request) -> CallOutcome {
        match request {
            Request::Query(query) => reply(&self.run_query(query)),
            Request::CreateItem { app_id } => {
                let id = self.catalog.mint_id();
                let now = now_secs();
                self.catalog.items.insert(
                    id,
                    StoredItem {
                        id,
                        owner_id: self.catalog.owner_id,
                        created_at: now,
                        updated_at: now,
                        ..Default::default()
                    },
                );
                debug!(app_id, item_id = id, "local item created");
                reply(&CreatedItem {
                    result: ResultCode::Ok,
                    item_id: id,
                    legal_agreement_required: !self.legal_agreement_accepted,
                })
            }
            Request::SubmitUpdate(update) => {
                let result = self.apply_update(update);
                reply(&SubmittedUpdate {
                    result,
                    legal_agreement_required: !self.legal_agreement_accepted,
                })
            }
            Request::DeleteItem(id) => {
                let result = match self.catalog.items.remove(id) {
                    Some(_) => {
                        self.catalog.installs.remove(id);
                        ResultCode::Ok
                    }
                    None => ResultCode::FileNotFound,
                };
                reply(&DeletedItem {
                    result,
                    item_id: *id,
                })
            }
        }
    }

    fn rejection(request: &Request, result: ResultCode) -> CallOutcome {
        match request {
            Request::Query(_) => reply(&QueryPage {
                result,
                ..Default::default()
            }),
            Request::CreateItem { .. } => reply(&CreatedItem {
                result,
                ..Default::default()
            }),
            Request::SubmitUpdate(_) => reply(&SubmittedUpdate {
                result,
                legal_agreement_required: false,
            }),
            Request::DeleteItem(id) => reply(&DeletedItem {
                result,
                item_id: *id,
            }),
        }
    }

    fn run_query(&self, query: &QueryRequest) -> QueryPage {
        let toggles = &query.toggles;
        let entry = |item: &StoredItem| {
            if toggles.return_only_ids {
                let mut entry = QueryEntry::default();
                entry.details.id = item.id;
                return entry;
            }
            QueryEntry {
                details: item.details(
                    toggles.return_long_description,
                    toggles.return_playtime_stats.is_some(),
                ),
                metadata: toggles.return_metadata.then(|| item.metadata.clone()),
                key_value_tags: toggles
                    .return_key_value_tags
                    .then(|| item.key_value_tags.clone()),
                children: if toggles.return_children {
                    item.children.clone()
                } else {
                    Vec::new()
                },
                additional_previews: if toggles.return_additional_previews {
                    item.additional_previews.clone()
                } else {
                    Vec::new()
                },
            }
        };

        match &query.target {
            QueryTarget::Details(ids) => {
                let entries: Vec<QueryEntry> = ids
                    .iter()
                    .map(|id| match self.catalog.items.get(id) {
                        Some(item) => entry(item),
                        None => {
                            let mut missing = QueryEntry::default();
                            missing.details.id = *id;
                            missing.details.result = ResultCode::FileNotFound;
                            missing
                        }
                    })
                    .collect();
                QueryPage {
                    result: ResultCode::Ok,
                    total_matching: entries.len() as u32,
                    entries: if toggles.return_total_only {
                        Vec::new()
                    } else {
                        entries
                    },
                }
            }
            QueryTarget::Browse(filter) => {
                let matching = self.catalog.browse(filter, query.search_text.as_deref());
                let start = (filter.page.saturating_sub(1) as usize).saturating_mul(self.page_size);
                let entries = if toggles.return_total_only {
                    Vec::new()
                } else {
                    matching
                        .iter()
                        .skip(start)
                        .take(self.page_size)
                        .map(|item| entry(*item))
                        .collect()
                };
                QueryPage {
                    result: ResultCode::Ok,
                    entries,
                    total_matching: matching.len() as u32,
                }
            }
        }
    }

    fn apply_update(&mut self, update: &ItemUpdate) -> ResultCode {
        if !self.catalog.items.contains_key(&update.item_id) {
            return ResultCode::FileNotFound;
        }

        let preview = match &update.preview_file {
            Some(path) => match fs::read(path) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!(path = %path, error = %err, "preview not readable");
                    return ResultCode::FileNotFound;
                }
            },
            None => None,
        };
        let content_size = match &update.content_folder {
            Some(folder) => match folder_size(Path::new(folder)) {
                Ok(size) => Some(size),
                Err(err) => {
                    warn!(folder = %folder, error = %err, "content folder not readable");
                    return ResultCode::FileNotFound;
                }
            },
            None => None,
        };

        let Some(item) = self.catalog.items.get_mut(&update.item_id) else {
            return ResultCode::FileNotFound;
        };
        if let Some(title) = &update.title {
            item.title = title.clone();
        }
        if let Some(description) = &update.description {
            item.description = description.clone();
        }
        if let Some(folder) = &update.content_folder {
            item.content_folder = Some(folder.clone());
        }
        if let Some(size) = content_size {
            item.file_size = size;
        }
        if preview.is_some() {
            item.preview = preview;
        }
        if let Some(visibility) = update.visibility {
            item.visibility = visibility;
        }
        if let Some(tags) = &update.tags {
            item.tags = tags.clone();
        }
        if let Some(metadata) = &update.metadata {
            item.metadata = metadata.clone();
        }
        item.updated_at = now_secs();
        ResultCode::Ok
    }

    fn advance_downloads(&mut self) {
        let step_of = |total: u64, pumps: u64| total.div_ceil(pumps).max(1);
        let mut finished = Vec::new();
        for (id, download) in self.downloads.iter_mut() {
            download.downloaded =
                (download.downloaded + step_of(download.total, self.download_pumps)).min(download.total);
            if download.downloaded >= download.total {
                finished.push(*id);
            }
        }
        for id in finished {
            self.downloads.remove(&id);
            if let Some(item) = self.catalog.items.get(&id) {
                let folder = item
                    .content_folder
                    .clone()
                    .unwrap_or_else(|| format!("workshop/content/{}", id));
                debug!(item_id = id, %folder, "local download finished");
                self.catalog.installs.insert(
                    id,
                    InstallInfo {
                        size_on_disk: item.file_size,
                        folder,
                        timestamp: item.updated_at,
                    },
                );
            }
        }
    }
}

impl Transport for LocalWorkshop {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.offline {
            return Err(TransportError::NotRunning);
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn submit(&mut self, request: Request) -> CallHandle {
        if self.refuse_submissions {
            return CallHandle::INVALID;
        }
        let handle = CallHandle::new(self.next_handle);
        self.next_handle += 1;
        self.requests.push(request.clone());
        self.calls.insert(
            handle,
            Entry::Waiting {
                request,
                ready_at: self.tick + self.latency,
                forced: self.next_forced.take(),
            },
        );
        handle
    }

    fn pump(&mut self) {
        self.tick += 1;
        let ready: Vec<CallHandle> = self
            .calls
            .iter()
            .filter_map(|(handle, entry)| match entry {
                Entry::Waiting { ready_at, .. } if *ready_at <= self.tick => Some(*handle),
                _ => None,
            })
            .collect();

        for handle in ready {
            let Some(Entry::Waiting {
                request, forced, ..
            }) = self.calls.remove(&handle)
            else {
                continue;
            };
            let outcome = match forced {
                Some(Forced::Fail(failure)) => CallOutcome::Failed(failure),
                Some(Forced::Reject(result)) => Self::rejection(&request, result),
                None => self.execute(&request),
            };
            self.calls.insert(handle, Entry::Done(outcome));
        }

        self.advance_downloads();
    }

    fn poll(&mut self, handle: CallHandle) -> CallOutcome {
        match self.calls.get(&handle) {
            Some(Entry::Waiting { .. }) => CallOutcome::Pending,
            Some(Entry::Done(outcome)) => outcome.clone(),
            None => CallOutcome::Failed(CallFailure::InvalidHandle),
        }
    }

    fn release(&mut self, handle: CallHandle) {
        self.calls.remove(&handle);
        self.released.push(handle);
    }

    fn item_state(&self, id: ItemId) -> ItemState {
        let mut state = ItemState::NONE;
        if self.downloads.contains_key(&id) {
            state.insert(ItemState::SUBSCRIBED | ItemState::DOWNLOADING);
        }
        if let Some(install) = self.catalog.installs.get(&id) {
            state.insert(ItemState::SUBSCRIBED | ItemState::INSTALLED);
            let stale = self
                .catalog
                .items
                .get(&id)
                .map_or(false, |item| item.updated_at > install.timestamp);
            if stale {
                state.insert(ItemState::NEEDS_UPDATE);
            }
        }
        state
    }

    fn start_download(&mut self, id: ItemId, _high_priority: bool) -> bool {
        let Some(item) = self.catalog.items.get(&id) else {
            return false;
        };
        let total = item.file_size.max(1);
        self.downloads
            .entry(id)
            .or_insert(Download {
                downloaded: 0,
                total,
            });
        true
    }

    fn download_progress(&self, id: ItemId) -> Option<DownloadProgress> {
        self.downloads.get(&id).map(|download| DownloadProgress {
            bytes_downloaded: download.downloaded,
            bytes_total: download.total,
        })
    }

    fn install_info(&self, id: ItemId) -> Option<InstallInfo> {
        self.catalog.installs.get(&id).cloned()
    }
}

fn reply<T: CallPayload>(payload: &T) -> CallOutcome {
    match payload.encode() {
        Ok(payload) => CallOutcome::Completed {
            kind: T::KIND,
            payload,
        },
        Err(err) => {
            warn!(error = %err, "reply could not be encoded");
            CallOutcome::Failed(CallFailure::MismatchedCallback)
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemEdit;
    use crate::query::{BrowseFilter, QueryOptions};

    fn decode<T: CallPayload>(outcome: CallOutcome) -> T {
        match outcome {
            CallOutcome::Completed { kind, payload } => {
                assert_eq!(kind, T::KIND);
                T::decode(&payload).unwrap()
            }
            other => panic!("not completed: {:?}", other),
        }
    }

    #[test]
    fn calls_complete_after_latency() {
        let mut workshop = LocalWorkshop::new().with_latency(3);
        let handle = workshop.submit(Request::CreateItem { app_id: 1 });
        workshop.pump();
        workshop.pump();
        assert_eq!(workshop.poll(handle), CallOutcome::Pending);
        workshop.pump();
        let created: CreatedItem = decode(workshop.poll(handle));
        assert!(created.result.is_ok());
        assert!(workshop.item(created.item_id).is_some());
    }

    #[test]
    fn released_handles_are_forgotten() {
        let mut workshop = LocalWorkshop::new();
        let handle = workshop.submit(Request::DeleteItem(5));
        workshop.release(handle);
        assert_eq!(workshop.released(), &[handle]);
        assert_eq!(
            workshop.poll(handle),
            CallOutcome::Failed(CallFailure::InvalidHandle)
        );
        assert!(workshop.open_handles().is_empty());
    }

    #[test]
    fn refused_submission_returns_invalid_handle() {
        let mut workshop = LocalWorkshop::new();
        workshop.refuse_submissions(true);
        assert!(!workshop.submit(Request::DeleteItem(5)).is_valid());
        assert!(workshop.requests().is_empty());
    }

    #[test]
    fn browse_pages_are_sized() {
        let mut workshop = LocalWorkshop::new().with_page_size(2);
        for title in ["a", "b", "c"] {
            workshop.publish(title, "", &[]);
        }
        let page = |workshop: &mut LocalWorkshop, page: u32| {
            let request = QueryRequest::new(
                1,
                &QueryOptions::default(),
                QueryTarget::Browse(BrowseFilter {
                    page,
                    ..Default::default()
                }),
            );
            let handle = workshop.submit(Request::Query(request));
            workshop.pump();
            decode::<QueryPage>(workshop.poll(handle))
        };
        let first = page(&mut workshop, 1);
        assert_eq!(first.entries.len(), 2);
        assert_eq!(first.total_matching, 3);
        assert_eq!(page(&mut workshop, 2).entries.len(), 1);
        assert_eq!(page(&mut workshop, 3).entries.len(), 0);
    }

    #[test]
    fn update_of_unknown_item_is_rejected() {
        let mut workshop = LocalWorkshop::new();
        let update = ItemUpdate::start(1, 404).apply(&ItemEdit::default());
        let handle = workshop.submit(Request::SubmitUpdate(update));
        workshop.pump();
        let reply: SubmittedUpdate = decode(workshop.poll(handle));
        assert_eq!(reply.result, ResultCode::FileNotFound);
    }

    #[test]
    fn update_reads_preview_and_folder() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("content");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("data.txt"), b"0123456789").unwrap();
        let preview = dir.path().join("preview.png");
        fs::write(&preview, b"png").unwrap();

        let mut workshop = LocalWorkshop::new();
        let id = workshop.publish("Castle", "", &[]);
        let edit = ItemEdit {
            content_folder: Some(folder.display().to_string()),
            preview_file: Some(preview.display().to_string()),
            ..Default::default()
        };
        let handle = workshop.submit(Request::SubmitUpdate(ItemUpdate::start(1, id).apply(&edit)));
        workshop.pump();
        let reply: SubmittedUpdate = decode(workshop.poll(handle));
        assert!(reply.result.is_ok());

        let item = workshop.item(id).unwrap();
        assert_eq!(item.file_size, 10);
        assert_eq!(item.preview.as_deref(), Some(&b"png"[..]));
    }

    #[test]
    fn downloads_install_items() {
        let mut workshop = LocalWorkshop::new();
        let id = workshop.publish("Castle", "", &[]);
        workshop.item_mut(id).unwrap().file_size = 100;
        assert!(workshop.start_download(id, true));
        assert!(workshop.item_state(id).is_downloading());

        workshop.pump();
        assert_eq!(workshop.download_progress(id).unwrap().percentage(), 25);
        for _ in 0..3 {
            workshop.pump();
        }
        assert!(workshop.item_state(id).is_installed());
        assert_eq!(workshop.install_info(id).unwrap().size_on_disk, 100);
        assert!(!workshop.start_download(404, false));
    }

    #[test]
    fn offline_service_refuses_connection() {
        let mut workshop = LocalWorkshop::new();
        workshop.set_offline(true);
        assert!(matches!(workshop.connect(), Err(TransportError::NotRunning)));
    }
}

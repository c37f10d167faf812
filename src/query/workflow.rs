use crate::call::{AsyncCall, CallStatus};
use crate::transport::{CallHandle, ItemId, Request, Transport};

use super::{ItemDetails, QueryEntry, QueryOptions, QueryPage, QueryRequest, QueryResults, QueryTarget};

/// Status of a query; mirrors its single call.
pub type QueryStatus = CallStatus;

/// A single details or browse query held in an arena slot.
///
/// `Pending → {Completed | Failed}`. A reply with a non-OK result code
/// counts as `Failed`.
#[derive(Debug)]
pub struct QueryWorkflow {
    options: QueryOptions,
    target: QueryTarget,
    call: AsyncCall<QueryPage>,
}

impl QueryWorkflow {
    /// Translate and submit a query.
    ///
    /// # Panics
    ///
    /// On a details query without ids, or a browse query on page 0.
    pub fn submit<R: Transport + ?Sized>(
        transport: &mut R,
        app_id: u32,
        options: QueryOptions,
        target: QueryTarget,
    ) -> Self {
        match &target {
            QueryTarget::Details(ids) => {
                assert!(!ids.is_empty(), "details query needs at least one item id")
            }
            QueryTarget::Browse(filter) => {
                assert!(filter.page >= 1, "browse query pages start at 1")
            }
        }

        let request = QueryRequest::new(app_id, &options, target.clone());
        let call = AsyncCall::submit(transport, Request::Query(request));
        QueryWorkflow {
            options,
            target,
            call,
        }
    }

    pub fn poll<R: Transport + ?Sized>(&mut self, transport: &mut R) {
        self.call.poll(transport);
    }

    pub fn status(&self) -> QueryStatus {
        match self.call.status() {
            CallStatus::Completed if !self.call.result().result.is_ok() => CallStatus::Failed,
            status => status,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.call.is_pending()
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn target(&self) -> &QueryTarget {
        &self.target
    }

    /// Ids requested by a details query; empty for a browse query.
    pub fn requested_ids(&self) -> &[ItemId] {
        match &self.target {
            QueryTarget::Details(ids) => ids,
            QueryTarget::Browse(_) => &[],
        }
    }

    pub fn handle(&self) -> CallHandle {
        self.call.handle()
    }

    pub(crate) fn reset(&mut self) -> Option<CallHandle> {
        self.call.reset()
    }

    fn page(&self) -> &QueryPage {
        assert_eq!(
            self.status(),
            QueryStatus::Completed,
            "query results read before completion"
        );
        self.call.result()
    }

    fn entry(&self, index: usize) -> &QueryEntry {
        let page = self.page();
        match page.entries.get(index) {
            Some(entry) => entry,
            None => panic!(
                "query result index {} out of range ({} results)",
                index,
                page.entries.len()
            ),
        }
    }

    pub fn results(&self) -> QueryResults {
        let page = self.page();
        QueryResults {
            count: page.entries.len(),
            total: page.total_matching,
        }
    }

    pub fn detail(&self, index: usize) -> &ItemDetails {
        &self.entry(index).details
    }

    /// # Panics
    ///
    /// If the query was not created with `metadata` set.
    pub fn metadata(&self, index: usize) -> &str {
        assert!(self.options.metadata, "metadata was not requested by this query");
        self.entry(index).metadata.as_deref().unwrap_or_default()
    }

    /// # Panics
    ///
    /// If the query was not created with `key_value_tags` set.
    pub fn key_value_tags(&self, index: usize) -> &[(String, String)] {
        assert!(
            self.options.key_value_tags,
            "key-value tags were not requested by this query"
        );
        self.entry(index).key_value_tags.as_deref().unwrap_or_default()
    }

    pub fn children(&self, index: usize) -> &[ItemId] {
        assert!(self.options.children, "children were not requested by this query");
        &self.entry(index).children
    }

    /// Failure text; empty unless the query failed.
    pub fn error(&self) -> String {
        if let Some(failure) = self.call.failure() {
            return failure.to_string();
        }
        if self.call.is_completed() {
            return self.call.result().result.error_text();
        }
        String::new()
    }

    /// Details of every result, with metadata and key-values merged in when
    /// they were requested.
    pub fn collect_details(&self) -> Vec<QueryDetails> {
        (0..self.results().count)
            .map(|index| QueryDetails {
                details: self.detail(index).clone(),
                metadata: self.options.metadata.then(|| self.metadata(index).to_string()),
                key_value_tags: if self.options.key_value_tags {
                    self.key_value_tags(index).to_vec()
                } else {
                    Vec::new()
                },
            })
            .collect()
    }

    /// Ids of every result, in result order.
    pub fn collect_ids(&self) -> Vec<ItemId> {
        self.page().entries.iter().map(|entry| entry.details.id).collect()
    }
}

/// Details of one result plus the optional data it was queried with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryDetails {
    pub details: ItemDetails,
    pub metadata: Option<String>,
    pub key_value_tags: Vec<(String, String)>,
}

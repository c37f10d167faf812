use serde::{Deserialize, Serialize};

use super::ItemId;
use crate::item::ItemUpdate;
use crate::query::QueryRequest;

/// A request descriptor handed to [`super::Transport::submit`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Request {
    Query(QueryRequest),
    CreateItem { app_id: u32 },
    SubmitUpdate(ItemUpdate),
    DeleteItem(ItemId),
}

impl Request {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Query(_) => "query",
            Request::CreateItem { .. } => "create_item",
            Request::SubmitUpdate(_) => "submit_update",
            Request::DeleteItem(_) => "delete_item",
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::transport::ItemId;

pub const QUERY_COMPLETED: &str = "query.completed";
pub const QUERY_FAILED: &str = "query.failed";
pub const ITEM_SUCCEEDED: &str = "item.succeeded";
pub const ITEM_FAILED: &str = "item.failed";
pub const ITEM_DELETED: &str = "item.deleted";

/// JSON body handed to listeners registered with `WorkshopClient::on`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub slot: Option<usize>,
    pub item_id: Option<ItemId>,
    /// Results on the page of a completed query.
    pub count: Option<usize>,
    pub created: Option<bool>,
    pub error: Option<String>,
}

use serde::{Deserialize, Serialize};

use crate::call::{CallKind, CallPayload};
use crate::error::ResultCode;
use crate::item::Visibility;
use crate::transport::ItemId;

/// Usage statistics of an item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStats {
    pub subscriptions: u64,
    pub followers: u64,
    pub favorites: u64,
    pub comments: u64,
    pub unique_website_views: u64,
    /// Only present when a playtime window was requested.
    pub seconds_played: Option<u64>,
    pub playtime_sessions: Option<u64>,
}

/// Details of one published item as returned by a query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub id: ItemId,
    pub result: ResultCode,
    pub title: String,
    pub description: String,
    pub owner_id: u64,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub score: f32,
    pub votes_up: u32,
    pub votes_down: u32,
    pub created_at: u64,
    pub updated_at: u64,
    pub file_size: u64,
    pub num_children: u32,
    pub stats: ItemStats,
}

impl ItemDetails {
    /// Whether the service knew the item.
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything the service returned for one query result index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryEntry {
    pub details: ItemDetails,
    pub metadata: Option<String>,
    pub key_value_tags: Option<Vec<(String, String)>>,
    pub children: Vec<ItemId>,
    pub additional_previews: Vec<String>,
}

/// Reply payload of a completed query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPage {
    pub result: ResultCode,
    pub entries: Vec<QueryEntry>,
    pub total_matching: u32,
}

impl CallPayload for QueryPage {
    const KIND: CallKind = CallKind::QueryCompleted;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResults {
    /// Results on this page.
    pub count: usize,
    /// Items matching the query across all pages.
    pub total: u32,
}

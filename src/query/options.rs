use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::transport::ItemId;

/// What a query should return besides the basic item details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Free-text filter over title and description. Empty means no filter.
    pub search_text: Option<String>,
    /// Window, in days, for playtime statistics. `None` skips them.
    pub playtime_stats_days: Option<u32>,
    pub additional_previews: bool,
    pub children: bool,
    pub key_value_tags: bool,
    pub long_description: bool,
    pub metadata: bool,
    pub only_ids: bool,
    pub total_only: bool,
}

/// Sort order of a browse query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FindOrder {
    #[default]
    Votes,
    Date,
    Subscriptions,
    Playtime,
}

impl FindOrder {
    pub const ALL: [FindOrder; 4] = [
        FindOrder::Votes,
        FindOrder::Date,
        FindOrder::Subscriptions,
        FindOrder::Playtime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FindOrder::Votes => "votes",
            FindOrder::Date => "date",
            FindOrder::Subscriptions => "subscriptions",
            FindOrder::Playtime => "playtime",
        }
    }
}

impl fmt::Display for FindOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FindOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FindOrder::ALL
            .iter()
            .find(|order| order.as_str() == value)
            .copied()
            .ok_or_else(|| format!("invalid order: {}", value))
    }
}

/// Criteria for a paged browse over all items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseFilter {
    pub order: FindOrder,
    /// Items must carry all of these tags, or any of them with `match_any_tag`.
    pub tags: Vec<String>,
    pub match_any_tag: bool,
    /// 1-based page number.
    pub page: u32,
}

impl Default for BrowseFilter {
    fn default() -> Self {
        Self {
            order: FindOrder::default(),
            tags: Vec::new(),
            match_any_tag: false,
            page: 1,
        }
    }
}

impl BrowseFilter {
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryTarget {
    /// Full details about a known set of items.
    Details(Vec<ItemId>),
    /// One page of items matching a filter.
    Browse(BrowseFilter),
}

/// Request toggles sent to the service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryToggles {
    pub return_long_description: bool,
    pub return_key_value_tags: bool,
    pub return_metadata: bool,
    pub return_children: bool,
    pub return_additional_previews: bool,
    pub return_playtime_stats: Option<u32>,
    pub return_total_only: bool,
    pub return_only_ids: bool,
}

/// A fully translated query, ready for [`crate::Request::Query`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub app_id: u32,
    pub target: QueryTarget,
    pub toggles: QueryToggles,
    pub search_text: Option<String>,
}

impl QueryRequest {
    pub fn new(app_id: u32, options: &QueryOptions, target: QueryTarget) -> Self {
        let toggles = QueryToggles {
            return_long_description: options.long_description,
            return_key_value_tags: options.key_value_tags,
            return_metadata: options.metadata,
            return_children: options.children,
            return_additional_previews: options.additional_previews,
            return_playtime_stats: options.playtime_stats_days,
            return_total_only: options.total_only,
            return_only_ids: options.only_ids,
        };
        let search_text = options
            .search_text
            .as_ref()
            .filter(|text| !text.is_empty())
            .cloned();
        QueryRequest {
            app_id,
            target,
            toggles,
            search_text,
        }
    }
}

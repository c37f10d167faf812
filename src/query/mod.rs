//! Queries - details and browse requests against the item catalog
//!
//! A query lives in one arena slot and is backed by one call:
//!
//! ```text
//! create_*_query ──► Pending ──► Completed ──► results / detail / metadata
//!                       │                         │
//!                       └──────► Failed ──► error │
//!                                   │             │
//!                                   └─────────────┴──► finish_query (slot freed)
//! ```
//!
//! Browsing more than one page is done by the caller, one query per page;
//! see [`collect_browse_pages`].

mod details;
mod options;
mod paging;
mod workflow;

pub use details::{ItemDetails, ItemStats, QueryEntry, QueryPage, QueryResults};
pub use options::{BrowseFilter, FindOrder, QueryOptions, QueryRequest, QueryTarget, QueryToggles};
pub use paging::{collect_browse_pages, BrowseReport, PagingError};
pub use workflow::{QueryDetails, QueryStatus, QueryWorkflow};

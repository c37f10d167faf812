mod arena;
mod call;
pub mod cli;
pub mod client;
mod config;
mod driver;
mod error;
mod item;
mod local;
mod query;
mod state;
mod transport;

pub use arena::{SlotArena, SlotContent, SlotId};
pub use call::{AsyncCall, CallKind, CallPayload, CallStatus, PayloadError};
pub use client::{Notification, WorkshopClient};
pub use config::{ConfigError, WorkshopConfig, CATALOG_ENV, CONFIG_ENV};
pub use driver::PollDriver;
pub use error::{CallFailure, ResultCode, TransportError, WorkshopError};
pub use item::{
    format_tags, is_valid_tag, next_item_version, parse_item_version, parse_tag_list, CreatedItem,
    DeletedItem, ItemEdit, ItemFailure, ItemOutcome, ItemPhase, ItemUpdate, ItemWorkflow,
    SubmittedUpdate, Visibility, MAX_TAG_LENGTH,
};
pub use local::{folder_size, Catalog, LocalWorkshop, StoredItem};
pub use query::{
    collect_browse_pages, BrowseFilter, BrowseReport, FindOrder, ItemDetails, ItemStats,
    PagingError, QueryDetails, QueryEntry, QueryOptions, QueryPage, QueryRequest, QueryResults,
    QueryStatus, QueryTarget, QueryToggles, QueryWorkflow,
};
pub use state::{DownloadProgress, InstallInfo, ItemState};
pub use transport::{CallHandle, CallOutcome, ItemId, Request, Transport};

// Re-export the EventEmitter backing `WorkshopClient::on`
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
